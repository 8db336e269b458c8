//! In-memory target for previews and tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ForwardError, Result};
use crate::statement::Subject;

use super::{ExistingObject, TargetDatabase};

#[derive(Debug, Default)]
struct State {
    objects: Vec<ExistingObject>,
    // (dependent, dependency)
    dependencies: Vec<(ExistingObject, ExistingObject)>,
    executed: Vec<String>,
    failures: Vec<(String, String)>,
    // (object name, message) for unreadable catalog entries
    catalog_failures: Vec<(String, String)>,
}

impl State {
    fn catalog_failure(&self, name: &str) -> Result<()> {
        match self
            .catalog_failures
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, message)) => Err(ForwardError::Database(sqlx::Error::Protocol(
                message.clone(),
            ))),
            None => Ok(()),
        }
    }
}

/// A target whose catalog is a list of objects.
///
/// Executed statements are recorded, not interpreted, so the catalog does not
/// change when objects are dropped or created.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    state: Mutex<State>,
    lookups: AtomicUsize,
}

impl MemoryTarget {
    /// Creates an empty target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an object to the catalog.
    #[must_use]
    pub fn with_object(self, object: ExistingObject) -> Self {
        self.state().objects.push(object);
        self
    }

    /// Adds `dependent`, which must be dropped before `dependency`.
    #[must_use]
    pub fn with_dependent(self, dependency: &ExistingObject, dependent: ExistingObject) -> Self {
        {
            let mut state = self.state();
            if !state.objects.contains(&dependent) {
                state.objects.push(dependent.clone());
            }
            state.dependencies.push((dependent, dependency.clone()));
        }
        self
    }

    /// Makes every statement containing `pattern` fail with `message`.
    #[must_use]
    pub fn failing_on(self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.state().failures.push((pattern.into(), message.into()));
        self
    }

    /// Makes catalog reads about objects named `name` fail with `message`,
    /// both lookups and dependency queries.
    #[must_use]
    pub fn failing_catalog(self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.state()
            .catalog_failures
            .push((name.into(), message.into()));
        self
    }

    /// Statements executed so far, in order.
    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.state().executed.clone()
    }

    /// Number of `find_object` calls so far.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TargetDatabase for MemoryTarget {
    async fn find_object(&self, subject: &Subject) -> Result<Option<ExistingObject>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        state.catalog_failure(&subject.name)?;
        Ok(state
            .objects
            .iter()
            .find(|o| o.matches(subject))
            .cloned())
    }

    async fn dependents_of(&self, object: &ExistingObject) -> Result<Vec<ExistingObject>> {
        let key = object.key();
        let state = self.state();
        state.catalog_failure(&object.name)?;
        Ok(state
            .dependencies
            .iter()
            .filter(|(_, dependency)| dependency.key() == key)
            .map(|(dependent, _)| dependent.clone())
            .collect())
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        let mut state = self.state();
        if let Some((_, message)) = state.failures.iter().find(|(p, _)| sql.contains(p.as_str())) {
            return Err(ForwardError::Execution {
                subject: String::new(),
                statement: sql.to_string(),
                message: message.clone(),
            });
        }
        debug!(sql, "Recorded statement");
        state.executed.push(sql.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::ObjectKind;

    #[tokio::test]
    async fn test_catalog_lookup_and_dependents() {
        let orders = ExistingObject::table("ORDERS");
        let target = MemoryTarget::new()
            .with_object(orders.clone())
            .with_dependent(&orders, ExistingObject::constraint("FK_LINE_ORD", "LINES"));

        let found = target
            .find_object(&Subject::new(ObjectKind::Table, "orders", None))
            .await
            .unwrap();
        assert_eq!(found, Some(orders.clone()));
        assert_eq!(target.lookups(), 1);

        let dependents = target.dependents_of(&orders).await.unwrap();
        assert_eq!(dependents, vec![ExistingObject::constraint("FK_LINE_ORD", "LINES")]);
    }

    #[tokio::test]
    async fn test_failures_are_not_recorded() {
        let target = MemoryTarget::new().failing_on("BROKEN", "table is locked");
        target.execute("DROP TABLE FINE").await.unwrap();
        let err = target.execute("DROP TABLE BROKEN").await.unwrap_err();
        assert!(matches!(err, ForwardError::Execution { message, .. } if message == "table is locked"));
        assert_eq!(target.executed(), vec!["DROP TABLE FINE".to_string()]);
    }

    #[tokio::test]
    async fn test_catalog_failures() {
        let target = MemoryTarget::new()
            .with_object(ExistingObject::table("ORDERS"))
            .failing_catalog("orders", "permission denied");

        let err = target
            .find_object(&Subject::new(ObjectKind::Table, "ORDERS", None))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("permission denied"));
        assert!(target.dependents_of(&ExistingObject::table("ORDERS")).await.is_err());
        assert!(target.dependents_of(&ExistingObject::table("LINES")).await.is_ok());
    }
}
