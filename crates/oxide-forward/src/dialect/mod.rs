//! Database dialects.
//!
//! A [`Dialect`] is a plain configuration value: a type map, identifier rules
//! and statement templates. One generator works for every dialect; the
//! built-in ones differ only in their tables, and custom dialects can be
//! loaded from JSON.

mod builtin;
mod ddl;
mod typemap;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use ddl::{ColumnDef, ForeignKeyDef, PrimaryKeyDef};
pub use typemap::{DialectTypeMap, Resolution, TypeCoercion};

use crate::error::{ForwardError, Result};
use crate::types::{TypeCode, TypeDescriptor};

/// Names of the built-in dialects.
pub const BUILTIN_DIALECTS: &[&str] = &[
    "generic",
    "postgresql",
    "oracle",
    "sqlserver",
    "db2",
    "mysql",
    "sqlite",
];

/// How unquoted identifiers are case-folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierCase {
    /// Fold to upper case.
    Upper,
    /// Fold to lower case.
    Lower,
    /// Keep as written.
    #[default]
    Preserve,
}

/// Rules an identifier must satisfy to be legal in a dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifierRules {
    /// Maximum identifier length in characters, if limited.
    pub max_length: Option<usize>,
    /// Case folding applied to every identifier.
    pub case: IdentifierCase,
    /// Characters allowed besides ASCII letters and digits.
    pub extra_chars: String,
    /// Prepended when a name does not start with a letter.
    pub leading_prefix: String,
    /// Words that cannot be used as identifiers (compared case-insensitively).
    pub reserved_words: Vec<String>,
    /// Largest numeric suffix tried before giving up on a collision.
    pub max_suffix: u32,
    /// Whether the database compares identifiers case-insensitively even
    /// when it preserves their case.
    pub case_insensitive: bool,
    /// Whether index names share the table namespace.
    pub indexes_share_table_namespace: bool,
}

impl Default for IdentifierRules {
    fn default() -> Self {
        Self {
            max_length: None,
            case: IdentifierCase::Preserve,
            extra_chars: "_".to_string(),
            leading_prefix: "X".to_string(),
            reserved_words: Vec::new(),
            max_suffix: 9999,
            case_insensitive: false,
            indexes_share_table_namespace: false,
        }
    }
}

impl IdentifierRules {
    /// Returns whether `c` may appear in an identifier.
    #[must_use]
    pub fn is_allowed(&self, c: char) -> bool {
        c.is_ascii_alphanumeric() || self.extra_chars.contains(c)
    }

    /// Returns whether `name` is a reserved word.
    #[must_use]
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved_words
            .iter()
            .any(|w| w.eq_ignore_ascii_case(name))
    }

    /// Applies the dialect's case folding.
    #[must_use]
    pub fn fold(&self, name: &str) -> String {
        match self.case {
            IdentifierCase::Upper => name.to_ascii_uppercase(),
            IdentifierCase::Lower => name.to_ascii_lowercase(),
            IdentifierCase::Preserve => name.to_string(),
        }
    }

    /// Normalized key for collision checks. Two identifiers denote the same
    /// object exactly when their keys are equal.
    #[must_use]
    pub fn key(&self, name: &str) -> String {
        match self.case {
            IdentifierCase::Preserve if !self.case_insensitive => name.to_string(),
            _ => name.to_ascii_uppercase(),
        }
    }

    /// Checks that a name is legal in this dialect.
    #[must_use]
    pub fn is_legal(&self, name: &str) -> bool {
        let mut chars = name.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        first.is_ascii_alphabetic()
            && chars.all(|c| self.is_allowed(c))
            && self.max_length.is_none_or(|max| name.chars().count() <= max)
            && !self.is_reserved(name)
    }
}

/// How a dialect drops an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropIndexStyle {
    /// `DROP INDEX name`
    #[default]
    Plain,
    /// `DROP INDEX name ON table`
    OnTable,
}

/// Dialect-specific statement shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementTemplates {
    /// Appended to each statement when rendering a script.
    pub terminator: String,
    /// Whether `ALTER TABLE .. ADD CONSTRAINT` is available. Without it,
    /// foreign keys are declared inside `CREATE TABLE`.
    pub supports_add_constraint: bool,
    /// Whether `COMMENT ON` is available.
    pub supports_comments: bool,
    /// Whether foreign keys accept `ON UPDATE`.
    pub supports_on_update: bool,
    /// Syntax for dropping indexes.
    pub drop_index: DropIndexStyle,
    /// Keyword after `ALTER TABLE t DROP` when removing a foreign key.
    pub drop_constraint_keyword: String,
}

impl Default for StatementTemplates {
    fn default() -> Self {
        Self {
            terminator: ";".to_string(),
            supports_add_constraint: true,
            supports_comments: false,
            supports_on_update: true,
            drop_index: DropIndexStyle::Plain,
            drop_constraint_keyword: "CONSTRAINT".to_string(),
        }
    }
}

/// A complete dialect definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialect {
    /// Dialect name, used in headers and logs.
    pub name: String,
    /// Portable type code to native type mapping.
    pub types: DialectTypeMap,
    /// Identifier legality rules.
    #[serde(default)]
    pub identifiers: IdentifierRules,
    /// Statement templates.
    #[serde(default)]
    pub templates: StatementTemplates,
}

impl Dialect {
    /// Returns a built-in dialect by name (case-insensitive).
    pub fn builtin(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "generic" => Ok(builtin::generic()),
            "postgresql" | "postgres" => Ok(builtin::postgres()),
            "oracle" => Ok(builtin::oracle()),
            "sqlserver" | "mssql" => Ok(builtin::sqlserver()),
            "db2" => Ok(builtin::db2()),
            "mysql" => Ok(builtin::mysql()),
            "sqlite" => Ok(builtin::sqlite()),
            _ => Err(ForwardError::UnknownDialect(name.to_string())),
        }
    }

    /// Loads a custom dialect from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| ForwardError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Looks up the descriptor for a type code.
    pub fn descriptor(&self, code: TypeCode) -> Result<&TypeDescriptor> {
        self.types.get(code).ok_or_else(|| ForwardError::UnmappedType {
            code,
            dialect: self.name.clone(),
        })
    }

    /// The comment line written at the top of every script.
    #[must_use]
    pub fn header(&self) -> String {
        format!(
            "-- Created by oxide-forward {} DDL generator {}",
            self.name,
            env!("CARGO_PKG_VERSION")
        )
    }

    /// Qualifies a name with the target schema, if any.
    #[must_use]
    pub fn qualify(&self, schema: Option<&str>, name: &str) -> String {
        match schema {
            Some(s) if !s.is_empty() => format!("{s}.{name}"),
            _ => name.to_string(),
        }
    }

    /// `DROP TABLE` for a table.
    #[must_use]
    pub fn drop_table(&self, schema: Option<&str>, table: &str) -> String {
        format!("DROP TABLE {}", self.qualify(schema, table))
    }

    /// Drops a named constraint from its table.
    #[must_use]
    pub fn drop_constraint(&self, schema: Option<&str>, table: &str, name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP {} {}",
            self.qualify(schema, table),
            self.templates.drop_constraint_keyword,
            name
        )
    }

    /// Drops an index.
    #[must_use]
    pub fn drop_index(&self, schema: Option<&str>, table: Option<&str>, name: &str) -> String {
        match (self.templates.drop_index, table) {
            (DropIndexStyle::OnTable, Some(t)) => format!(
                "DROP INDEX {} ON {}",
                name,
                self.qualify(schema, t)
            ),
            _ => format!("DROP INDEX {}", self.qualify(schema, name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_dialects_resolve() {
        for name in BUILTIN_DIALECTS {
            let dialect = Dialect::builtin(name).unwrap();
            assert_eq!(dialect.name, *name);
            assert!(dialect.types.contains(TypeCode::VarChar));
            assert!(!dialect.types.contains(TypeCode::Other));
        }
        assert!(matches!(
            Dialect::builtin("informix"),
            Err(ForwardError::UnknownDialect(_))
        ));
    }

    #[test]
    fn test_oracle_types() {
        let oracle = Dialect::builtin("oracle").unwrap();
        let r = oracle.types.resolve(TypeCode::VarChar, Some(100), None);
        assert_eq!(r.text, "VARCHAR2(100)");
        let r = oracle.types.resolve(TypeCode::Decimal, Some(12), Some(2));
        assert_eq!(r.text, "NUMBER(12,2)");
        assert!(matches!(
            oracle.descriptor(TypeCode::Other),
            Err(ForwardError::UnmappedType { dialect, .. }) if dialect == "oracle"
        ));
    }

    #[test]
    fn test_identifier_rules() {
        let oracle = Dialect::builtin("oracle").unwrap();
        let rules = &oracle.identifiers;
        assert!(rules.is_legal("ORDERS"));
        assert!(rules.is_legal("A$B#C_1"));
        assert!(!rules.is_legal("1ORDERS"));
        assert!(!rules.is_legal("ORDER LINES"));
        assert!(!rules.is_legal("ORDER"));
        assert!(!rules.is_legal(&"X".repeat(31)));
        assert_eq!(rules.key("orders"), rules.key("ORDERS"));

        let sqlite = Dialect::builtin("sqlite").unwrap();
        assert_eq!(sqlite.identifiers.fold("Orders"), "Orders");
        assert_eq!(sqlite.identifiers.key("Orders"), sqlite.identifiers.key("ORDERS"));
        assert!(sqlite.identifiers.indexes_share_table_namespace);

        let mysql = Dialect::builtin("mysql").unwrap();
        assert_ne!(mysql.identifiers.key("Orders"), mysql.identifiers.key("ORDERS"));
        assert!(!mysql.identifiers.indexes_share_table_namespace);
    }

    #[test]
    fn test_drop_templates() {
        let mysql = Dialect::builtin("mysql").unwrap();
        assert_eq!(
            mysql.drop_constraint(None, "orders", "fk_cust"),
            "ALTER TABLE orders DROP FOREIGN KEY fk_cust"
        );
        assert_eq!(
            mysql.drop_index(None, Some("orders"), "idx_date"),
            "DROP INDEX idx_date ON orders"
        );

        let pg = Dialect::builtin("postgresql").unwrap();
        assert_eq!(
            pg.drop_index(Some("sales"), Some("orders"), "idx_date"),
            "DROP INDEX sales.idx_date"
        );
        assert_eq!(pg.drop_table(Some("sales"), "orders"), "DROP TABLE sales.orders");
    }

    #[test]
    fn test_custom_dialect_from_json() {
        let json = r#"{
            "name": "tiny",
            "types": [
                {"name": "TXT", "code": "VARCHAR", "max_precision": 80,
                 "literal_prefix": "'", "literal_suffix": "'", "precision_supported": true}
            ],
            "identifiers": {"max_length": 8, "case": "upper"}
        }"#;
        let dialect: Dialect = serde_json::from_str(json).unwrap();
        assert_eq!(dialect.identifiers.max_length, Some(8));
        assert!(!dialect.identifiers.case_insensitive);
        assert_eq!(dialect.identifiers.max_suffix, 9999);
        assert_eq!(dialect.templates.terminator, ";");
        let r = dialect.types.resolve(TypeCode::VarChar, Some(120), None);
        assert_eq!(r.text, "TXT(80)");
        assert_eq!(r.warnings.len(), 1);
    }
}
