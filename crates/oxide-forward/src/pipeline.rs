//! Find → Resolve → Execute.
//!
//! Each stage runs on its own tokio task and reports back with a single
//! message; live progress goes out on a watch channel. Stages run strictly
//! one after another, so the target is only ever used by one of them.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::conflict::{Completion, ConflictRecord, ConflictResolver, target_message};
use crate::dialect::Dialect;
use crate::error::ForwardError;
use crate::generator::DdlGenerator;
use crate::planner::PlannedDrop;
use crate::statement::Statement;
use crate::target::TargetDatabase;

/// Shared cooperative cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageKind {
    /// Look for conflicting objects.
    #[default]
    Find,
    /// Drop conflicting objects.
    Resolve,
    /// Run the generated script.
    Execute,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Find => "find",
            Self::Resolve => "resolve",
            Self::Execute => "execute",
        };
        f.write_str(s)
    }
}

/// Live progress of the running stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageProgress {
    /// Stage reporting.
    pub stage: StageKind,
    /// Units of work in the stage.
    pub job_size: usize,
    /// Units done.
    pub progress: usize,
}

/// How a stage ended.
#[derive(Debug)]
pub enum StageOutcome<T> {
    /// Ran to the end.
    Finished(T),
    /// Stopped on an error.
    Failed(ForwardError),
    /// Stopped because the cancel flag was set.
    Cancelled,
}

/// Answer of the approval gate once conflicts are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approval {
    /// Drop the conflicting objects, then run the script.
    Drop,
    /// Leave them in place and run the script anyway.
    Keep,
    /// Stop the pipeline.
    Cancel,
}

/// Decides what to do with conflicts before anything is dropped.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    /// Called once, only when conflicts were found.
    async fn approve(&self, conflicts: &[ConflictRecord], drops: &[PlannedDrop]) -> Approval;
}

/// A gate that always gives the same answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedApproval(pub Approval);

#[async_trait]
impl ApprovalGate for FixedApproval {
    async fn approve(&self, _conflicts: &[ConflictRecord], _drops: &[PlannedDrop]) -> Approval {
        self.0
    }
}

/// What the orchestrator knows about one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageStatus {
    /// When the stage task was spawned.
    pub started_at: Option<DateTime<Utc>>,
    /// When the stage reported back, whatever the outcome.
    pub finished_at: Option<DateTime<Utc>>,
    /// Units of work in the stage.
    pub job_size: usize,
    /// Units done.
    pub progress: usize,
    /// Whether the stage ran to the end.
    pub completed: bool,
}

impl StageStatus {
    /// Returns true if the stage was started.
    #[must_use]
    pub fn has_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// Returns true if the stage reported back.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// Final result of a pipeline run.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Every required stage finished.
    Completed,
    /// Cancelled during `stage`, or at the approval gate (reported as
    /// [`StageKind::Resolve`]).
    Cancelled {
        /// Stage that was running.
        stage: StageKind,
    },
    /// `stage` failed.
    Failed {
        /// Stage that failed.
        stage: StageKind,
        /// The error.
        error: ForwardError,
    },
}

/// Everything a pipeline run produced.
#[derive(Debug)]
pub struct PipelineReport {
    /// Find stage.
    pub find: StageStatus,
    /// Resolve stage.
    pub resolve: StageStatus,
    /// Execute stage.
    pub execute: StageStatus,
    /// Conflicts found.
    pub conflicts: Vec<ConflictRecord>,
    /// Drops planned for the conflicts.
    pub drops: Vec<PlannedDrop>,
    /// Gate answer, if it was asked.
    pub approval: Option<Approval>,
    /// How the run ended.
    pub outcome: PipelineOutcome,
}

impl PipelineReport {
    fn new() -> Self {
        Self {
            find: StageStatus::default(),
            resolve: StageStatus::default(),
            execute: StageStatus::default(),
            conflicts: Vec::new(),
            drops: Vec::new(),
            approval: None,
            outcome: PipelineOutcome::Completed,
        }
    }

    /// Returns true if the run completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, PipelineOutcome::Completed)
    }
}

/// Terminal message of a stage task.
struct StageDone<T> {
    outcome: StageOutcome<T>,
    job_size: usize,
    progress: usize,
}

/// Runs a generated script against a target.
pub struct ForwardPipeline {
    target: Arc<dyn TargetDatabase>,
    dialect: Dialect,
    statements: Arc<Vec<Statement>>,
    cancel: CancelFlag,
    progress: Arc<watch::Sender<StageProgress>>,
}

impl fmt::Debug for ForwardPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardPipeline")
            .field("dialect", &self.dialect.name)
            .field("statements", &self.statements.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl ForwardPipeline {
    /// Creates a pipeline for the statements of a finished generation.
    #[must_use]
    pub fn new(target: Arc<dyn TargetDatabase>, generator: &DdlGenerator) -> Self {
        Self::from_parts(
            target,
            generator.dialect().clone(),
            generator.statements().to_vec(),
        )
    }

    /// Creates a pipeline for an explicit statement list.
    #[must_use]
    pub fn from_parts(
        target: Arc<dyn TargetDatabase>,
        dialect: Dialect,
        statements: Vec<Statement>,
    ) -> Self {
        let (tx, _rx) = watch::channel(StageProgress::default());
        Self {
            target,
            dialect,
            statements: Arc::new(statements),
            cancel: CancelFlag::new(),
            progress: Arc::new(tx),
        }
    }

    /// Uses a shared cancel flag.
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// The flag that cancels this pipeline.
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Subscribes to live progress.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StageProgress> {
        self.progress.subscribe()
    }

    /// Runs Find, asks `gate` if conflicts were found, then Resolve and
    /// Execute.
    ///
    /// A stage starts only after the previous one finished without error.
    /// Cancelling stops the running stage at its next check and no later
    /// stage starts.
    pub async fn run(&self, gate: &dyn ApprovalGate) -> PipelineReport {
        let mut report = PipelineReport::new();

        // Find
        let resolver = ConflictResolver::new(
            self.target.clone(),
            self.dialect.clone(),
            &self.statements,
        )
        .with_cancel_flag(self.cancel.clone())
        .with_progress(self.progress.clone());

        let found = self
            .stage(StageKind::Find, &mut report.find, async move {
                let mut resolver = resolver;
                let result = resolver.find_conflicting().await;
                let (job_size, progress) = (resolver.job_size(), resolver.progress());
                let outcome = match result {
                    Ok(Completion::Finished) => StageOutcome::Finished(resolver),
                    Ok(Completion::Cancelled) => StageOutcome::Cancelled,
                    Err(e) => StageOutcome::Failed(e),
                };
                (outcome, job_size, progress)
            })
            .await;
        let resolver = match found {
            StageOutcome::Finished(resolver) => resolver,
            other => {
                report.outcome = stop(StageKind::Find, other);
                return report;
            }
        };
        report.conflicts = resolver.conflicts().to_vec();

        // Approval
        let mut drop_conflicts = false;
        if !resolver.is_empty() {
            report.drops = match resolver.drop_statements() {
                Ok(drops) => drops,
                Err(error) => {
                    report.outcome = PipelineOutcome::Failed {
                        stage: StageKind::Resolve,
                        error,
                    };
                    return report;
                }
            };
            let approval = gate.approve(&report.conflicts, &report.drops).await;
            info!(?approval, conflicts = report.conflicts.len(), "Approval received");
            report.approval = Some(approval);
            match approval {
                Approval::Drop => drop_conflicts = true,
                Approval::Keep => {}
                Approval::Cancel => {
                    report.outcome = PipelineOutcome::Cancelled {
                        stage: StageKind::Resolve,
                    };
                    return report;
                }
            }
        }

        // Resolve
        if drop_conflicts {
            let job_size = report.drops.len();
            let resolved = self
                .stage(StageKind::Resolve, &mut report.resolve, async move {
                    let mut resolver = resolver;
                    let result = resolver.drop_conflicting().await;
                    let outcome = match result {
                        Ok(Completion::Finished) => StageOutcome::Finished(()),
                        Ok(Completion::Cancelled) => StageOutcome::Cancelled,
                        Err(e) => StageOutcome::Failed(e),
                    };
                    (outcome, job_size, resolver.dropped())
                })
                .await;
            if !matches!(resolved, StageOutcome::Finished(())) {
                report.outcome = stop(StageKind::Resolve, resolved);
                return report;
            }
        }

        // Execute
        let target = self.target.clone();
        let statements = self.statements.clone();
        let cancel = self.cancel.clone();
        let progress = self.progress.clone();
        let executed = self
            .stage(StageKind::Execute, &mut report.execute, async move {
                execute_statements(target.as_ref(), &statements, &cancel, &progress).await
            })
            .await;
        if !matches!(executed, StageOutcome::Finished(())) {
            report.outcome = stop(StageKind::Execute, executed);
            return report;
        }

        info!("Pipeline completed");
        report
    }

    /// Spawns one stage, waits for its terminal message and joins the task
    /// before returning.
    async fn stage<T, F>(
        &self,
        kind: StageKind,
        status: &mut StageStatus,
        work: F,
    ) -> StageOutcome<T>
    where
        T: Send + 'static,
        F: Future<Output = (StageOutcome<T>, usize, usize)> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return StageOutcome::Cancelled;
        }

        let (tx, mut rx) = mpsc::channel::<StageDone<T>>(1);
        status.started_at = Some(Utc::now());
        info!(stage = %kind, "Stage started");

        let handle = tokio::spawn(async move {
            let (outcome, job_size, progress) = work.await;
            let _ = tx
                .send(StageDone {
                    outcome,
                    job_size,
                    progress,
                })
                .await;
        });

        let message = rx.recv().await;
        if let Err(e) = handle.await {
            error!(stage = %kind, error = %e, "Stage task failed");
        }
        status.finished_at = Some(Utc::now());

        match message {
            Some(done) => {
                status.job_size = done.job_size;
                status.progress = done.progress;
                status.completed = matches!(done.outcome, StageOutcome::Finished(_));
                match &done.outcome {
                    StageOutcome::Finished(_) => info!(stage = %kind, "Stage finished"),
                    StageOutcome::Cancelled => info!(stage = %kind, "Stage cancelled"),
                    StageOutcome::Failed(e) => warn!(stage = %kind, error = %e, "Stage failed"),
                }
                done.outcome
            }
            None => StageOutcome::Failed(ForwardError::InvalidState(format!(
                "{kind} stage ended without reporting"
            ))),
        }
    }
}

fn stop<T>(stage: StageKind, outcome: StageOutcome<T>) -> PipelineOutcome {
    match outcome {
        StageOutcome::Failed(error) => PipelineOutcome::Failed { stage, error },
        StageOutcome::Cancelled | StageOutcome::Finished(_) => PipelineOutcome::Cancelled { stage },
    }
}

/// Runs the script in order, skipping `--` comment lines. Stops at the first
/// failure or when cancelled.
async fn execute_statements(
    target: &dyn TargetDatabase,
    statements: &[Statement],
    cancel: &CancelFlag,
    progress: &watch::Sender<StageProgress>,
) -> (StageOutcome<()>, usize, usize) {
    let runnable: Vec<&Statement> = statements.iter().filter(|s| !s.is_comment_line()).collect();
    let job_size = runnable.len();
    progress.send_replace(StageProgress {
        stage: StageKind::Execute,
        job_size,
        progress: 0,
    });

    for (done, statement) in runnable.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return (StageOutcome::Cancelled, job_size, done);
        }
        debug!(sql = %statement.text, "Executing SQL");
        if let Err(e) = target.execute(&statement.text).await {
            let subject = statement
                .subject
                .as_ref()
                .map_or_else(|| "script".to_string(), ToString::to_string);
            return (
                StageOutcome::Failed(ForwardError::Execution {
                    subject,
                    statement: statement.text.clone(),
                    message: target_message(e),
                }),
                job_size,
                done,
            );
        }
        progress.send_replace(StageProgress {
            stage: StageKind::Execute,
            job_size,
            progress: done + 1,
        });
    }
    (StageOutcome::Finished(()), job_size, job_size)
}
