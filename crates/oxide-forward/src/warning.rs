//! Warnings raised while generating DDL.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a warning was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningReason {
    /// A name was shortened to the dialect's maximum length.
    NameTruncated,
    /// A name clashed with another in its namespace and got a suffix.
    NameCollision,
    /// A column type was clamped or replaced by the fallback type.
    TypeCoerced,
    /// Characters, case or a reserved word were rewritten.
    NameRestricted,
}

impl WarningReason {
    /// Returns true for reasons concerning identifiers.
    #[must_use]
    pub fn is_name(self) -> bool {
        !matches!(self, Self::TypeCoerced)
    }
}

impl fmt::Display for WarningReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NameTruncated => "name truncated",
            Self::NameCollision => "name collision",
            Self::TypeCoerced => "type coerced",
            Self::NameRestricted => "name restricted",
        };
        f.write_str(s)
    }
}

/// A model object, identified by its modelled (not legalized) names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelObject {
    /// A table.
    Table {
        /// Table name.
        table: String,
    },
    /// A column of a table.
    Column {
        /// Owning table.
        table: String,
        /// Column name.
        column: String,
    },
    /// The primary key constraint of a table.
    PrimaryKey {
        /// Owning table.
        table: String,
    },
    /// An index of a table.
    Index {
        /// Owning table.
        table: String,
        /// Index name.
        index: String,
    },
    /// A relationship (foreign key constraint).
    Relationship {
        /// Relationship name.
        name: String,
    },
}

impl fmt::Display for ModelObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table { table } => write!(f, "table {table}"),
            Self::Column { table, column } => write!(f, "column {table}.{column}"),
            Self::PrimaryKey { table } => write!(f, "primary key of {table}"),
            Self::Index { table, index } => write!(f, "index {index} on {table}"),
            Self::Relationship { name } => write!(f, "relationship {name}"),
        }
    }
}

/// A change the generator made to the model while writing DDL.
///
/// `new_value` may be edited before the next generation; see
/// [`DdlGenerator::apply_overrides`](crate::generator::DdlGenerator::apply_overrides).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// The object affected.
    pub subject: ModelObject,
    /// Why the warning was raised.
    pub reason: WarningReason,
    /// Value before the change.
    pub old_value: String,
    /// Value after the change.
    pub new_value: String,
    #[serde(skip)]
    generated: String,
}

impl Warning {
    /// Creates a warning whose new value is what the generator produced.
    #[must_use]
    pub fn new(
        subject: ModelObject,
        reason: WarningReason,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
    ) -> Self {
        let new_value = new_value.into();
        Self {
            subject,
            reason,
            old_value: old_value.into(),
            generated: new_value.clone(),
            new_value,
        }
    }

    /// Returns true if `new_value` differs from what the generator produced.
    #[must_use]
    pub fn is_edited(&self) -> bool {
        self.new_value != self.generated
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({} -> {})",
            self.subject, self.reason, self.old_value, self.new_value
        )
    }
}
