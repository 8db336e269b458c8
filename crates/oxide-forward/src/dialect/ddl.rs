//! Statement text for the objects the generator creates.

use crate::schema::ForeignKeyAction;

use super::Dialect;

/// A column definition with its native type already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Legal column name.
    pub name: String,
    /// Native type text.
    pub type_text: String,
    /// Default value, already rendered as a literal.
    pub default: Option<String>,
    /// Whether `NOT NULL` is emitted.
    pub not_null: bool,
}

/// A named primary key clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyDef {
    /// Legal constraint name.
    pub name: String,
    /// Legal column names in key order.
    pub columns: Vec<String>,
}

/// A foreign key between two tables, by legal names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDef {
    /// Constraint name.
    pub name: String,
    /// Child (referencing) table.
    pub child: String,
    /// Referencing columns.
    pub child_columns: Vec<String>,
    /// Parent (referenced) table.
    pub parent: String,
    /// Referenced columns.
    pub parent_columns: Vec<String>,
    /// ON DELETE action.
    pub on_delete: ForeignKeyAction,
    /// ON UPDATE action.
    pub on_update: ForeignKeyAction,
}

impl Dialect {
    /// Generates SQL for creating a table.
    ///
    /// Inline foreign keys are only passed for dialects that cannot add
    /// constraints after creation.
    #[must_use]
    pub fn create_table_sql(
        &self,
        schema: Option<&str>,
        name: &str,
        columns: &[ColumnDef],
        primary_key: Option<&PrimaryKeyDef>,
        inline_foreign_keys: &[ForeignKeyDef],
    ) -> String {
        let mut sql = String::from("CREATE TABLE ");
        sql.push_str(&self.qualify(schema, name));
        sql.push_str(" (\n");

        let mut defs: Vec<String> = columns.iter().map(column_definition).collect();

        if let Some(pk) = primary_key.filter(|pk| !pk.columns.is_empty()) {
            defs.push(format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                pk.name,
                pk.columns.join(", ")
            ));
        }
        for fk in inline_foreign_keys {
            defs.push(format!(
                "CONSTRAINT {} {}",
                fk.name,
                self.foreign_key_clause(schema, fk)
            ));
        }

        sql.push_str("  ");
        sql.push_str(&defs.join(",\n  "));
        sql.push_str("\n)");
        sql
    }

    /// Generates SQL for creating an index.
    #[must_use]
    pub fn create_index_sql(
        &self,
        schema: Option<&str>,
        name: &str,
        table: &str,
        columns: &[String],
        unique: bool,
    ) -> String {
        let mut sql = String::from("CREATE ");
        if unique {
            sql.push_str("UNIQUE ");
        }
        sql.push_str("INDEX ");
        sql.push_str(name);
        sql.push_str(" ON ");
        sql.push_str(&self.qualify(schema, table));
        sql.push_str(" (");
        sql.push_str(&columns.join(", "));
        sql.push(')');
        sql
    }

    /// Generates SQL for adding a foreign key to an existing table.
    #[must_use]
    pub fn add_foreign_key_sql(&self, schema: Option<&str>, fk: &ForeignKeyDef) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} {}",
            self.qualify(schema, &fk.child),
            fk.name,
            self.foreign_key_clause(schema, fk)
        )
    }

    /// `FOREIGN KEY (..) REFERENCES parent (..)` plus the supported rules.
    fn foreign_key_clause(&self, schema: Option<&str>, fk: &ForeignKeyDef) -> String {
        let mut sql = format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            fk.child_columns.join(", "),
            self.qualify(schema, &fk.parent),
            fk.parent_columns.join(", ")
        );
        if fk.on_delete != ForeignKeyAction::NoAction {
            sql.push_str(" ON DELETE ");
            sql.push_str(fk.on_delete.to_sql());
        }
        if fk.on_update != ForeignKeyAction::NoAction && self.templates.supports_on_update {
            sql.push_str(" ON UPDATE ");
            sql.push_str(fk.on_update.to_sql());
        }
        sql
    }

    /// `COMMENT ON TABLE`.
    #[must_use]
    pub fn comment_on_table_sql(&self, schema: Option<&str>, table: &str, text: &str) -> String {
        format!(
            "COMMENT ON TABLE {} IS {}",
            self.qualify(schema, table),
            quote_text(text)
        )
    }

    /// `COMMENT ON COLUMN`.
    #[must_use]
    pub fn comment_on_column_sql(
        &self,
        schema: Option<&str>,
        table: &str,
        column: &str,
        text: &str,
    ) -> String {
        format!(
            "COMMENT ON COLUMN {}.{} IS {}",
            self.qualify(schema, table),
            column,
            quote_text(text)
        )
    }
}

fn column_definition(column: &ColumnDef) -> String {
    let mut def = format!("{} {}", column.name, column.type_text);
    if let Some(default) = &column.default {
        def.push_str(" DEFAULT ");
        def.push_str(default);
    }
    if column.not_null {
        def.push_str(" NOT NULL");
    }
    def
}

fn quote_text(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
