//! Live target databases.
//!
//! The conflict resolver and the pipeline talk to the database through
//! [`TargetDatabase`]: a metadata lookup plus plain statement execution.
//! The caller owns the connection; nothing here opens or closes it.

mod memory;
mod sqlite;

use std::fmt;

use async_trait::async_trait;

pub use memory::MemoryTarget;
pub use sqlite::SqliteTarget;

use crate::error::Result;
use crate::statement::{ObjectKind, Subject};

/// An object that exists in the target database.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExistingObject {
    /// Object kind.
    pub kind: ObjectKind,
    /// Name as stored by the database.
    pub name: String,
    /// Owning table, for indexes and constraints.
    pub table: Option<String>,
    /// Schema the object lives in.
    pub schema: Option<String>,
}

impl ExistingObject {
    /// Creates an object not owned by a table.
    #[must_use]
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            table: None,
            schema: None,
        }
    }

    /// A table.
    #[must_use]
    pub fn table(name: impl Into<String>) -> Self {
        Self::new(ObjectKind::Table, name)
    }

    /// A constraint on `table`.
    #[must_use]
    pub fn constraint(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self::new(ObjectKind::Constraint, name).on_table(table)
    }

    /// An index on `table`.
    #[must_use]
    pub fn index(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self::new(ObjectKind::Index, name).on_table(table)
    }

    /// Sets the owning table.
    #[must_use]
    pub fn on_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Sets the schema.
    #[must_use]
    pub fn in_schema(mut self, schema: Option<&str>) -> Self {
        self.schema = schema.map(str::to_string);
        self
    }

    /// Identity used to plan each object once. Names compare
    /// case-insensitively.
    #[must_use]
    pub fn key(&self) -> (ObjectKind, Option<String>, String) {
        (
            self.kind,
            self.schema.as_deref().map(str::to_ascii_uppercase),
            self.name.to_ascii_uppercase(),
        )
    }

    /// Returns true if this object is what `subject` would create.
    #[must_use]
    pub fn matches(&self, subject: &Subject) -> bool {
        let kind_matches = match subject.kind {
            ObjectKind::Constraint | ObjectKind::Relationship => matches!(
                self.kind,
                ObjectKind::Constraint | ObjectKind::Relationship
            ),
            kind => self.kind == kind,
        };
        kind_matches
            && self.name.eq_ignore_ascii_case(&subject.name)
            && same_schema(self.schema.as_deref(), subject.schema.as_deref())
    }
}

fn same_schema(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    }
}

impl fmt::Display for ExistingObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.kind)?;
        if let Some(schema) = &self.schema {
            write!(f, "{schema}.")?;
        }
        f.write_str(&self.name)?;
        if let Some(table) = &self.table {
            write!(f, " on {table}")?;
        }
        Ok(())
    }
}

/// Access to the database the generated DDL is forwarded to.
#[async_trait]
pub trait TargetDatabase: Send + Sync {
    /// Looks for an existing object colliding with `subject`.
    async fn find_object(&self, subject: &Subject) -> Result<Option<ExistingObject>>;

    /// Objects that must be dropped before `object` can be dropped.
    async fn dependents_of(&self, object: &ExistingObject) -> Result<Vec<ExistingObject>>;

    /// Executes one statement.
    async fn execute(&self, sql: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_subject() {
        let subject = Subject::new(ObjectKind::Relationship, "FK_ORD_CUST", None).on_table("ORDERS");
        assert!(ExistingObject::constraint("fk_ord_cust", "ORDERS").matches(&subject));
        assert!(!ExistingObject::table("FK_ORD_CUST").matches(&subject));

        let qualified = Subject::new(ObjectKind::Table, "ORDERS", Some("SALES"));
        assert!(!ExistingObject::table("ORDERS").matches(&qualified));
        assert!(
            ExistingObject::table("ORDERS")
                .in_schema(Some("sales"))
                .matches(&qualified)
        );
    }

    #[test]
    fn test_display() {
        let index = ExistingObject::index("IDX_DATE", "ORDERS").in_schema(Some("SALES"));
        assert_eq!(index.to_string(), "INDEX SALES.IDX_DATE on ORDERS");
    }
}
