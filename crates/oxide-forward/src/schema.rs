//! Schema graph consumed by the generator.
//!
//! The modelling tool owns these structures; the generator only reads them.
//! Declaration order (the order of the vectors) is significant: it drives
//! identifier assignment and statement order.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ForwardError, Result};
use crate::types::TypeCode;

/// Foreign key action (ON DELETE, ON UPDATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyAction {
    /// No action (error if referenced row is deleted/updated).
    #[default]
    NoAction,
    /// Restrict (same as NoAction but checked immediately).
    Restrict,
    /// Cascade the delete/update to referencing rows.
    Cascade,
    /// Set the foreign key column to NULL.
    SetNull,
    /// Set the foreign key column to its default value.
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of this action.
    #[must_use]
    pub fn to_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// A column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name as modelled.
    pub name: String,
    /// Portable type code.
    pub type_code: TypeCode,
    /// Requested precision or length.
    #[serde(default)]
    pub precision: Option<u32>,
    /// Requested scale.
    #[serde(default)]
    pub scale: Option<u32>,
    /// Whether the column allows NULL values.
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Position in the primary key (1-based), or None if not part of it.
    #[serde(default)]
    pub primary_key_seq: Option<u32>,
    /// Default value, written as a literal of the column's type.
    #[serde(default)]
    pub default_value: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub remarks: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ColumnSchema {
    /// Creates a nullable column outside the primary key.
    #[must_use]
    pub fn new(name: impl Into<String>, type_code: TypeCode) -> Self {
        Self {
            name: name.into(),
            type_code,
            precision: None,
            scale: None,
            nullable: true,
            primary_key_seq: None,
            default_value: None,
            remarks: None,
        }
    }

    /// Sets precision (or length).
    #[must_use]
    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Sets precision and scale.
    #[must_use]
    pub fn precision_scale(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Places the column in the primary key at position `seq` (1-based).
    #[must_use]
    pub fn primary_key(mut self, seq: u32) -> Self {
        self.primary_key_seq = Some(seq);
        self.nullable = false;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Sets the remarks.
    #[must_use]
    pub fn remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    /// Returns true if the column is part of the primary key.
    #[must_use]
    pub fn in_primary_key(&self) -> bool {
        self.primary_key_seq.is_some()
    }
}

/// An index on a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexSchema {
    /// Index name.
    pub name: String,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Whether this is a unique index.
    #[serde(default)]
    pub unique: bool,
}

impl IndexSchema {
    /// Creates a non-unique index.
    #[must_use]
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            unique: false,
        }
    }

    /// Makes the index unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name as modelled.
    pub name: String,
    /// Columns in declaration order.
    #[serde(default)]
    pub columns: Vec<ColumnSchema>,
    /// Name of the primary key constraint; defaults to `<table>_PK`.
    #[serde(default)]
    pub primary_key_name: Option<String>,
    /// Indexes in declaration order.
    #[serde(default)]
    pub indexes: Vec<IndexSchema>,
    /// Free-form description.
    #[serde(default)]
    pub remarks: Option<String>,
}

impl TableSchema {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key_name: None,
            indexes: Vec::new(),
            remarks: None,
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: IndexSchema) -> Self {
        self.indexes.push(index);
        self
    }

    /// Names the primary key constraint.
    #[must_use]
    pub fn primary_key_name(mut self, name: impl Into<String>) -> Self {
        self.primary_key_name = Some(name.into());
        self
    }

    /// Sets the remarks.
    #[must_use]
    pub fn remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary key columns ordered by their key position. Columns sharing a
    /// position keep declaration order.
    #[must_use]
    pub fn primary_key(&self) -> Vec<&ColumnSchema> {
        let mut pk: Vec<&ColumnSchema> = self
            .columns
            .iter()
            .filter(|c| c.in_primary_key())
            .collect();
        pk.sort_by_key(|c| c.primary_key_seq);
        pk
    }
}

/// One column pairing of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Column in the parent (primary key) table.
    pub pk_column: String,
    /// Column in the child (foreign key) table.
    pub fk_column: String,
}

/// A foreign key relationship between two tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipSchema {
    /// Constraint name as modelled.
    pub name: String,
    /// Parent (primary key side) table.
    pub pk_table: String,
    /// Child (foreign key side) table.
    pub fk_table: String,
    /// Column mappings in key order.
    pub mappings: Vec<ColumnMapping>,
    /// Action on delete.
    #[serde(default)]
    pub on_delete: ForeignKeyAction,
    /// Action on update.
    #[serde(default)]
    pub on_update: ForeignKeyAction,
}

impl RelationshipSchema {
    /// Creates a relationship with no mappings.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        pk_table: impl Into<String>,
        fk_table: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            pk_table: pk_table.into(),
            fk_table: fk_table.into(),
            mappings: Vec::new(),
            on_delete: ForeignKeyAction::NoAction,
            on_update: ForeignKeyAction::NoAction,
        }
    }

    /// Maps a parent column to a child column.
    #[must_use]
    pub fn map(mut self, pk_column: impl Into<String>, fk_column: impl Into<String>) -> Self {
        self.mappings.push(ColumnMapping {
            pk_column: pk_column.into(),
            fk_column: fk_column.into(),
        });
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        self
    }
}

/// A database model: tables and the relationships between them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DatabaseSchema {
    /// Model name.
    #[serde(default)]
    pub name: String,
    /// Tables in declaration order.
    #[serde(default)]
    pub tables: Vec<TableSchema>,
    /// Relationships in declaration order.
    #[serde(default)]
    pub relationships: Vec<RelationshipSchema>,
}

impl DatabaseSchema {
    /// Creates a new empty database schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Loads a schema from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| ForwardError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Adds a table to the schema.
    #[must_use]
    pub fn table(mut self, table: TableSchema) -> Self {
        self.tables.push(table);
        self
    }

    /// Adds a relationship to the schema.
    #[must_use]
    pub fn relationship(mut self, relationship: RelationshipSchema) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Gets a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Checks that every relationship and index refers to tables and columns
    /// present in the graph.
    pub fn validate(&self) -> Result<()> {
        for table in &self.tables {
            for index in &table.indexes {
                if let Some(missing) = index
                    .columns
                    .iter()
                    .find(|c| table.get_column(c).is_none())
                {
                    return Err(ForwardError::Structural(format!(
                        "index '{}' refers to column '{}' missing from table '{}'",
                        index.name, missing, table.name
                    )));
                }
            }
        }

        for rel in &self.relationships {
            let parent = self.get_table(&rel.pk_table).ok_or_else(|| {
                ForwardError::Structural(format!(
                    "relationship '{}' refers to missing table '{}'",
                    rel.name, rel.pk_table
                ))
            })?;
            let child = self.get_table(&rel.fk_table).ok_or_else(|| {
                ForwardError::Structural(format!(
                    "relationship '{}' refers to missing table '{}'",
                    rel.name, rel.fk_table
                ))
            })?;
            if rel.mappings.is_empty() {
                return Err(ForwardError::Structural(format!(
                    "relationship '{}' maps no columns",
                    rel.name
                )));
            }
            for mapping in &rel.mappings {
                if parent.get_column(&mapping.pk_column).is_none() {
                    return Err(ForwardError::Structural(format!(
                        "relationship '{}' refers to missing column '{}.{}'",
                        rel.name, rel.pk_table, mapping.pk_column
                    )));
                }
                if child.get_column(&mapping.fk_column).is_none() {
                    return Err(ForwardError::Structural(format!(
                        "relationship '{}' refers to missing column '{}.{}'",
                        rel.name, rel.fk_table, mapping.fk_column
                    )));
                }
            }
        }
        Ok(())
    }
}
