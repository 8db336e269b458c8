//! Conflict detection against the target database.
//!
//! Before the generated script runs, every object it creates is looked up in
//! the target. Each hit becomes the root of a [`ConflictRecord`] tree holding
//! everything that must be dropped along with it.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::dialect::Dialect;
use crate::error::{ForwardError, Result};
use crate::pipeline::{CancelFlag, StageKind, StageProgress};
use crate::planner::{DropPlanner, PlannedDrop};
use crate::statement::{ObjectKind, Statement, Subject};
use crate::target::{ExistingObject, TargetDatabase};

/// An existing object in the way of the script, with its dependents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRecord {
    /// The existing object.
    pub object: ExistingObject,
    /// Objects depending on it, each with its own dependents.
    pub dependents: Vec<ConflictRecord>,
}

impl ConflictRecord {
    /// Number of objects in this tree.
    #[must_use]
    pub fn closure_size(&self) -> usize {
        1 + self.dependents.iter().map(Self::closure_size).sum::<usize>()
    }

    /// Renders this tree as indented text, one object per line. Tables
    /// below the root are flagged as dependent tables.
    #[must_use]
    pub fn tree(&self) -> String {
        let mut out = String::new();
        self.render(0, &mut out);
        out
    }

    fn render(&self, depth: usize, out: &mut String) {
        let _ = write!(out, "{:indent$}{}", "", self.object, indent = depth * 2);
        if depth > 0 && self.object.kind == ObjectKind::Table {
            out.push_str(" (dependent table, data will be lost)");
        }
        out.push('\n');
        for dependent in &self.dependents {
            dependent.render(depth + 1, out);
        }
    }
}

/// How a cancellable operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Ran to the end.
    Finished,
    /// Stopped because the cancel flag was set.
    Cancelled,
}

/// Finds objects in the target that collide with the script and drops them.
///
/// A resolver scans once; create a new one to scan again.
pub struct ConflictResolver {
    target: Arc<dyn TargetDatabase>,
    dialect: Dialect,
    subjects: Vec<Subject>,
    cancel: CancelFlag,
    progress_tx: Option<Arc<watch::Sender<StageProgress>>>,
    conflicts: Vec<ConflictRecord>,
    progress: usize,
    dropped: usize,
    started: bool,
    finished: bool,
}

impl std::fmt::Debug for ConflictResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConflictResolver")
            .field("dialect", &self.dialect.name)
            .field("subjects", &self.subjects.len())
            .field("conflicts", &self.conflicts.len())
            .field("progress", &self.progress)
            .field("started", &self.started)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl ConflictResolver {
    /// Creates a resolver for the objects created by `statements`.
    #[must_use]
    pub fn new(target: Arc<dyn TargetDatabase>, dialect: Dialect, statements: &[Statement]) -> Self {
        let subjects = statements
            .iter()
            .flat_map(|s| s.created_subjects())
            .cloned()
            .collect();
        Self {
            target,
            dialect,
            subjects,
            cancel: CancelFlag::new(),
            progress_tx: None,
            conflicts: Vec::new(),
            progress: 0,
            dropped: 0,
            started: false,
            finished: false,
        }
    }

    /// Uses a shared cancel flag.
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Publishes progress on a watch channel.
    #[must_use]
    pub fn with_progress(mut self, tx: Arc<watch::Sender<StageProgress>>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Number of objects to inspect.
    #[must_use]
    pub fn job_size(&self) -> usize {
        self.subjects.len()
    }

    /// Number of objects inspected so far.
    #[must_use]
    pub fn progress(&self) -> usize {
        self.progress
    }

    /// Number of objects dropped so far.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Returns true once [`find_conflicting`](Self::find_conflicting) was called.
    #[must_use]
    pub fn has_started(&self) -> bool {
        self.started
    }

    /// Returns true once the scan ran to the end.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Conflict trees in the order their roots were found.
    #[must_use]
    pub fn conflicts(&self) -> &[ConflictRecord] {
        &self.conflicts
    }

    /// Returns true if no conflicts were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    fn publish(&self, stage: StageKind, job_size: usize, progress: usize) {
        if let Some(tx) = &self.progress_tx {
            tx.send_replace(StageProgress {
                stage,
                job_size,
                progress,
            });
        }
    }

    /// Scans the target for every object the script creates.
    ///
    /// The cancel flag is checked before each object; on cancellation the
    /// partial results are discarded.
    pub async fn find_conflicting(&mut self) -> Result<Completion> {
        if self.started {
            return Err(ForwardError::InvalidState(
                "conflict scan already ran on this resolver".to_string(),
            ));
        }
        self.started = true;
        info!(objects = self.subjects.len(), "Scanning target for conflicts");
        self.publish(StageKind::Find, self.job_size(), 0);

        let subjects = self.subjects.clone();
        let outcome = self.scan(&subjects).await;

        match outcome {
            Ok(Completion::Finished) => {
                self.finished = true;
                info!(conflicts = self.conflicts.len(), "Conflict scan finished");
                Ok(Completion::Finished)
            }
            Ok(Completion::Cancelled) => {
                self.conflicts.clear();
                info!(inspected = self.progress, "Conflict scan cancelled");
                Ok(Completion::Cancelled)
            }
            Err(error) => {
                self.conflicts.clear();
                Err(error)
            }
        }
    }

    async fn scan(&mut self, subjects: &[Subject]) -> Result<Completion> {
        for subject in subjects {
            if self.cancel.is_cancelled() {
                return Ok(Completion::Cancelled);
            }

            let found = self
                .target
                .find_object(subject)
                .await
                .map_err(|e| scan_error(&subject.to_string(), &e))?;

            if let Some(object) = found {
                let record = self.closure(object).await?;
                info!(object = %record.object, dependents = record.closure_size() - 1, "Conflict found");
                self.conflicts.push(record);
            }

            self.progress += 1;
            self.publish(StageKind::Find, subjects.len(), self.progress);
        }
        Ok(Completion::Finished)
    }

    /// Collects `root` and everything depending on it, depth first. An
    /// object already in the tree is not visited again.
    async fn closure(&self, root: ExistingObject) -> Result<ConflictRecord> {
        // Arena of (object, children); expanded with an explicit stack.
        let mut nodes: Vec<(ExistingObject, Vec<usize>)> = vec![(root.clone(), Vec::new())];
        let mut seen = BTreeSet::from([root.key()]);
        let mut stack = vec![0];

        while let Some(id) = stack.pop() {
            let object = nodes[id].0.clone();
            let dependents = self
                .target
                .dependents_of(&object)
                .await
                .map_err(|e| scan_error(&object.to_string(), &e))?;

            let mut children = Vec::new();
            for dependent in dependents {
                if !seen.insert(dependent.key()) {
                    debug!(object = %dependent, "Dependent already collected");
                    continue;
                }
                nodes.push((dependent, Vec::new()));
                children.push(nodes.len() - 1);
            }
            stack.extend(children.iter().rev());
            nodes[id].1 = children;
        }

        Ok(assemble(&nodes, 0))
    }

    /// Renders the conflict trees as indented text.
    #[must_use]
    pub fn conflict_tree(&self) -> String {
        self.conflicts.iter().map(ConflictRecord::tree).collect()
    }

    /// The DROP statements [`drop_conflicting`](Self::drop_conflicting)
    /// would issue, in order.
    pub fn drop_statements(&self) -> Result<Vec<PlannedDrop>> {
        DropPlanner::new(&self.dialect).plan(&self.conflicts)
    }

    /// Drops every conflicting object in dependency order.
    ///
    /// The cancel flag is checked before each DROP. The first failure stops
    /// the run; objects already dropped stay dropped.
    pub async fn drop_conflicting(&mut self) -> Result<Completion> {
        if !self.finished {
            return Err(ForwardError::InvalidState(
                "conflicts must be found before they can be dropped".to_string(),
            ));
        }

        let drops = self.drop_statements()?;
        info!(drops = drops.len(), "Dropping conflicting objects");
        self.publish(StageKind::Resolve, drops.len(), 0);

        for (done, drop) in drops.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!(dropped = done, "Drop cancelled");
                return Ok(Completion::Cancelled);
            }
            debug!(sql = %drop.statement, "Dropping");
            self.target
                .execute(&drop.statement)
                .await
                .map_err(|e| ForwardError::Execution {
                    subject: drop.object.to_string(),
                    statement: drop.statement.clone(),
                    message: target_message(e),
                })?;
            self.dropped = done + 1;
            self.publish(StageKind::Resolve, drops.len(), self.dropped);
        }
        Ok(Completion::Finished)
    }
}

fn assemble(nodes: &[(ExistingObject, Vec<usize>)], id: usize) -> ConflictRecord {
    ConflictRecord {
        object: nodes[id].0.clone(),
        dependents: nodes[id].1.iter().map(|&c| assemble(nodes, c)).collect(),
    }
}

fn scan_error(object: &str, error: &ForwardError) -> ForwardError {
    ForwardError::ConflictScan {
        object: object.to_string(),
        message: error.to_string(),
    }
}

/// The target's own message for a failed statement.
pub(crate) fn target_message(error: ForwardError) -> String {
    match error {
        ForwardError::Execution { message, .. } => message,
        ForwardError::Database(e) => e.to_string(),
        other => other.to_string(),
    }
}
