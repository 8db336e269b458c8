//! Generated DDL statements.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kinds of database objects the generator creates and the resolver drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectKind {
    /// A table.
    Table,
    /// A constraint found in the target database.
    Constraint,
    /// An index.
    Index,
    /// A foreign key constraint created for a modelled relationship.
    Relationship,
}

impl ObjectKind {
    /// Order in which kinds are dropped when dependencies form a cycle.
    #[must_use]
    pub fn drop_priority(self) -> u8 {
        match self {
            Self::Constraint | Self::Relationship => 0,
            Self::Index => 1,
            Self::Table => 2,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Table => "TABLE",
            Self::Constraint => "CONSTRAINT",
            Self::Index => "INDEX",
            Self::Relationship => "RELATIONSHIP",
        };
        f.write_str(s)
    }
}

/// Kind of a generated statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementKind {
    /// `CREATE TABLE` or `CREATE INDEX`.
    Create,
    /// `ALTER TABLE .. ADD CONSTRAINT`.
    AlterAddConstraint,
    /// `DROP ..` of a conflicting object.
    Drop,
    /// A comment line or `COMMENT ON`.
    Comment,
}

/// The object a statement is about, by legal name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Subject {
    /// Object kind.
    pub kind: ObjectKind,
    /// Legal object name.
    pub name: String,
    /// Owning table, for indexes and constraints.
    pub table: Option<String>,
    /// Target schema the object lives in.
    pub schema: Option<String>,
}

impl Subject {
    /// Creates a subject not owned by a table.
    #[must_use]
    pub fn new(kind: ObjectKind, name: impl Into<String>, schema: Option<&str>) -> Self {
        Self {
            kind,
            name: name.into(),
            table: None,
            schema: schema.map(str::to_string),
        }
    }

    /// Sets the owning table.
    #[must_use]
    pub fn on_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Name qualified with the schema, if any.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(s) => format!("{s}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.qualified_name())?;
        if let Some(table) = &self.table {
            write!(f, " on {table}")?;
        }
        Ok(())
    }
}

/// One DDL statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Statement kind.
    pub kind: StatementKind,
    /// The object the statement creates, alters or documents. None for
    /// free-standing comments such as the script header.
    pub subject: Option<Subject>,
    /// Statement text without terminator.
    pub text: String,
    /// Further objects created along with the subject, such as the primary
    /// key declared inside a `CREATE TABLE`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub also_creates: Vec<Subject>,
}

impl Statement {
    /// Creates a statement.
    #[must_use]
    pub fn new(kind: StatementKind, subject: Option<Subject>, text: impl Into<String>) -> Self {
        Self {
            kind,
            subject,
            text: text.into(),
            also_creates: Vec::new(),
        }
    }

    /// Records another object created by this statement.
    #[must_use]
    pub fn and_creates(mut self, subject: Subject) -> Self {
        self.also_creates.push(subject);
        self
    }

    /// Returns true for `--` comment lines, which are never executed.
    #[must_use]
    pub fn is_comment_line(&self) -> bool {
        self.text.trim_start().starts_with("--")
    }

    /// Returns true if this statement creates an object the target could
    /// already contain.
    #[must_use]
    pub fn creates_object(&self) -> bool {
        matches!(
            self.kind,
            StatementKind::Create | StatementKind::AlterAddConstraint
        ) && self.subject.is_some()
    }

    /// Every object this statement creates, subject first. Empty unless
    /// [`creates_object`](Self::creates_object).
    pub fn created_subjects(&self) -> impl Iterator<Item = &Subject> {
        let creates = self.creates_object();
        self.subject
            .iter()
            .chain(&self.also_creates)
            .filter(move |_| creates)
    }
}
