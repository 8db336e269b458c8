//! DDL generation.
//!
//! [`DdlGenerator`] walks a [`DatabaseSchema`] once and produces an ordered
//! list of [`Statement`]s plus the [`Warning`]s describing every change made
//! to fit the dialect. The same generator serves every dialect; all
//! differences live in the [`Dialect`] value it is built with.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::dialect::{ColumnDef, Dialect, ForeignKeyDef, PrimaryKeyDef};
use crate::error::{ForwardError, Result};
use crate::legalize::{IdentifierLegalizer, Namespace, UsedNames};
use crate::schema::{ColumnSchema, DatabaseSchema, RelationshipSchema, TableSchema};
use crate::statement::{ObjectKind, Statement, StatementKind, Subject};
use crate::types::Nullability;
use crate::warning::{ModelObject, Warning, WarningReason};

/// Phases of one generation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeneratorState {
    /// Nothing generated yet, or the last pass failed validation.
    #[default]
    NotStarted,
    /// Writing the script header.
    WritingHeader,
    /// Emitting tables, indexes and comments.
    EmittingTables,
    /// Emitting foreign key constraints.
    EmittingConstraints,
    /// Writing the script footer.
    WritingFooter,
    /// The statement list is complete.
    Done,
}

/// An object that could not be generated. Other objects are unaffected.
#[derive(Debug)]
pub struct ObjectError {
    /// The object that was skipped.
    pub object: ModelObject,
    /// Why it was skipped.
    pub error: ForwardError,
}

/// A legal identifier given to a model object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedName {
    /// The model object.
    pub object: ModelObject,
    /// Namespace the name is unique in.
    pub namespace: Namespace,
    /// The legal identifier.
    pub name: String,
}

/// Legal names for one table and everything it owns.
#[derive(Debug, Clone)]
struct TableNames {
    table: String,
    columns: Vec<String>,
    primary_key: String,
    indexes: Vec<String>,
}

impl TableNames {
    fn column(&self, table: &TableSchema, raw: &str) -> Option<&str> {
        table
            .columns
            .iter()
            .position(|c| c.name == raw)
            .map(|i| self.columns[i].as_str())
    }
}

/// Identifier assignment for a whole schema, in declaration order. `None`
/// marks a skipped object.
#[derive(Debug, Default)]
struct Naming {
    tables: Vec<Option<TableNames>>,
    relationships: Vec<Option<String>>,
}

/// Assigns legal names while collecting warnings and object errors.
struct NamePass<'a> {
    dialect: &'a Dialect,
    legalizer: IdentifierLegalizer<'a>,
    overrides: &'a BTreeMap<ModelObject, String>,
    used: UsedNames,
    names: Vec<AssignedName>,
    warnings: Vec<Warning>,
    errors: Vec<ObjectError>,
}

impl<'a> NamePass<'a> {
    fn new(dialect: &'a Dialect, overrides: &'a BTreeMap<ModelObject, String>) -> Self {
        Self {
            dialect,
            legalizer: IdentifierLegalizer::new(&dialect.identifiers),
            overrides,
            used: UsedNames::new(),
            names: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn assign(&mut self, object: ModelObject, raw: &str, namespace: &Namespace) -> Result<String> {
        let requested = self.overrides.get(&object).map_or(raw, String::as_str);
        let legal = self.legalizer.legalize(requested, namespace, &mut self.used)?;
        for change in legal.changes {
            self.warnings
                .push(Warning::new(object.clone(), change.reason, change.old, change.new));
        }
        self.names.push(AssignedName {
            object,
            namespace: namespace.clone(),
            name: legal.name.clone(),
        });
        Ok(legal.name)
    }

    fn table(&mut self, table: &TableSchema) -> Result<TableNames> {
        let name = self.assign(
            ModelObject::Table {
                table: table.name.clone(),
            },
            &table.name,
            &Namespace::Table,
        )?;

        let column_ns = Namespace::Column(name.clone());
        let mut columns = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            columns.push(self.assign(
                ModelObject::Column {
                    table: table.name.clone(),
                    column: column.name.clone(),
                },
                &column.name,
                &column_ns,
            )?);
        }

        let default_pk = self.dialect.identifiers.fold(&format!("{name}_PK"));
        let primary_key = self.assign(
            ModelObject::PrimaryKey {
                table: table.name.clone(),
            },
            table.primary_key_name.as_deref().unwrap_or(&default_pk),
            &Namespace::Constraint,
        )?;

        let index_ns = if self.dialect.identifiers.indexes_share_table_namespace {
            Namespace::Table
        } else {
            Namespace::Index
        };
        let mut indexes = Vec::with_capacity(table.indexes.len());
        for index in &table.indexes {
            indexes.push(self.assign(
                ModelObject::Index {
                    table: table.name.clone(),
                    index: index.name.clone(),
                },
                &index.name,
                &index_ns,
            )?);
        }

        Ok(TableNames {
            table: name,
            columns,
            primary_key,
            indexes,
        })
    }

    fn run(mut self, database: &DatabaseSchema) -> (Naming, NamePassOutput) {
        let mut naming = Naming::default();

        for table in &database.tables {
            let (mark, name_mark) = (self.warnings.len(), self.names.len());
            match self.table(table) {
                Ok(names) => naming.tables.push(Some(names)),
                Err(error) => {
                    warn!(table = %table.name, %error, "Skipping table");
                    self.warnings.truncate(mark);
                    self.names.truncate(name_mark);
                    self.errors.push(ObjectError {
                        object: ModelObject::Table {
                            table: table.name.clone(),
                        },
                        error,
                    });
                    naming.tables.push(None);
                }
            }
        }

        for rel in &database.relationships {
            let skipped = |name: &str| {
                !database
                    .tables
                    .iter()
                    .zip(&naming.tables)
                    .any(|(t, n)| t.name == name && n.is_some())
            };
            if skipped(&rel.pk_table) || skipped(&rel.fk_table) {
                debug!(relationship = %rel.name, "Skipping relationship of skipped table");
                naming.relationships.push(None);
                continue;
            }

            let object = ModelObject::Relationship {
                name: rel.name.clone(),
            };
            match self.assign(object.clone(), &rel.name, &Namespace::Constraint) {
                Ok(name) => naming.relationships.push(Some(name)),
                Err(error) => {
                    warn!(relationship = %rel.name, %error, "Skipping relationship");
                    self.errors.push(ObjectError { object, error });
                    naming.relationships.push(None);
                }
            }
        }

        let output = NamePassOutput {
            names: self.names,
            warnings: self.warnings,
            errors: self.errors,
        };
        (naming, output)
    }
}

struct NamePassOutput {
    names: Vec<AssignedName>,
    warnings: Vec<Warning>,
    errors: Vec<ObjectError>,
}

/// Generates DDL for one dialect.
#[derive(Debug)]
pub struct DdlGenerator {
    dialect: Dialect,
    target_schema: Option<String>,
    state: GeneratorState,
    statements: Vec<Statement>,
    names: Vec<AssignedName>,
    warnings: Vec<Warning>,
    errors: Vec<ObjectError>,
    overrides: BTreeMap<ModelObject, String>,
}

impl DdlGenerator {
    /// Creates a generator for a dialect.
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            target_schema: None,
            state: GeneratorState::NotStarted,
            statements: Vec::new(),
            names: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            overrides: BTreeMap::new(),
        }
    }

    /// Qualifies every object with `schema`.
    #[must_use]
    pub fn with_target_schema(mut self, schema: impl Into<String>) -> Self {
        self.set_target_schema(Some(schema.into()));
        self
    }

    /// Sets or clears the target schema. Takes effect on the next generation.
    pub fn set_target_schema(&mut self, schema: Option<String>) {
        self.target_schema = schema.filter(|s| !s.is_empty());
    }

    /// The target schema, if any.
    #[must_use]
    pub fn target_schema(&self) -> Option<&str> {
        self.target_schema.as_deref()
    }

    /// The dialect in use.
    #[must_use]
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Current phase.
    #[must_use]
    pub fn state(&self) -> GeneratorState {
        self.state
    }

    /// Statements of the last generation, in execution order.
    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Identifiers assigned by the last generation, in declaration order.
    /// Skipped tables contribute nothing.
    #[must_use]
    pub fn names(&self) -> &[AssignedName] {
        &self.names
    }

    /// Warnings of the last generation.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Warnings of the last generation, with editable new values.
    pub fn warnings_mut(&mut self) -> &mut [Warning] {
        &mut self.warnings
    }

    /// Objects skipped by the last generation.
    #[must_use]
    pub fn errors(&self) -> &[ObjectError] {
        &self.errors
    }

    /// Requests a name for a model object in later generations. The name is
    /// still legalized.
    pub fn set_override(&mut self, object: ModelObject, name: impl Into<String>) {
        self.overrides.insert(object, name.into());
    }

    /// Turns edited name warnings into overrides for the next generation.
    ///
    /// Returns the number of overrides taken from the warnings.
    pub fn apply_overrides(&mut self) -> usize {
        let mut applied = 0;
        for warning in &self.warnings {
            if warning.reason.is_name() && warning.is_edited() {
                debug!(subject = %warning.subject, name = %warning.new_value, "Name override");
                self.overrides
                    .insert(warning.subject.clone(), warning.new_value.clone());
                applied += 1;
            }
        }
        applied
    }

    /// Forgets all overrides.
    pub fn clear_overrides(&mut self) {
        self.overrides.clear();
    }

    /// Generates the statement list for `database`.
    ///
    /// Replaces the results of any previous call. Fails only when the schema
    /// graph is inconsistent; per-object problems are recorded in
    /// [`errors`](Self::errors) and the remaining objects are still generated.
    pub fn generate_ddl(&mut self, database: &DatabaseSchema) -> Result<()> {
        self.statements.clear();
        self.names.clear();
        self.warnings.clear();
        self.errors.clear();
        self.state = GeneratorState::NotStarted;

        database.validate()?;

        info!(
            dialect = %self.dialect.name,
            tables = database.tables.len(),
            relationships = database.relationships.len(),
            "Generating DDL"
        );

        self.state = GeneratorState::WritingHeader;
        self.statements.push(Statement::new(
            StatementKind::Comment,
            None,
            self.dialect.header(),
        ));

        self.state = GeneratorState::EmittingTables;
        let (naming, output) = NamePass::new(&self.dialect, &self.overrides).run(database);
        self.names = output.names;
        self.warnings = output.warnings;
        self.errors = output.errors;

        for (table, names) in database.tables.iter().zip(&naming.tables) {
            if let Some(names) = names {
                self.emit_table(database, &naming, table, names);
            }
        }

        self.state = GeneratorState::EmittingConstraints;
        if self.dialect.templates.supports_add_constraint {
            for (rel, name) in database.relationships.iter().zip(&naming.relationships) {
                if let Some(name) = name {
                    let fk = foreign_key(database, &naming, rel, name);
                    let subject = Subject::new(
                        ObjectKind::Relationship,
                        name.clone(),
                        self.target_schema.as_deref(),
                    )
                    .on_table(fk.child.clone());
                    let text = self
                        .dialect
                        .add_foreign_key_sql(self.target_schema.as_deref(), &fk);
                    self.statements.push(Statement::new(
                        StatementKind::AlterAddConstraint,
                        Some(subject),
                        text,
                    ));
                }
            }
        }

        self.state = GeneratorState::WritingFooter;
        for warning in &self.warnings {
            warn!(
                subject = %warning.subject,
                reason = %warning.reason,
                old = %warning.old_value,
                new = %warning.new_value,
                "DDL warning"
            );
        }
        self.state = GeneratorState::Done;

        info!(
            statements = self.statements.len(),
            warnings = self.warnings.len(),
            skipped = self.errors.len(),
            "DDL generated"
        );
        Ok(())
    }

    fn emit_table(
        &mut self,
        database: &DatabaseSchema,
        naming: &Naming,
        table: &TableSchema,
        names: &TableNames,
    ) {
        let schema = self.target_schema.clone();
        let schema = schema.as_deref();

        let columns: Vec<ColumnDef> = table
            .columns
            .iter()
            .zip(&names.columns)
            .map(|(column, legal)| self.column_def(table, column, legal))
            .collect();

        let primary_key = PrimaryKeyDef {
            name: names.primary_key.clone(),
            columns: table
                .primary_key()
                .iter()
                .filter_map(|c| names.column(table, &c.name))
                .map(str::to_string)
                .collect(),
        };

        let inline: Vec<ForeignKeyDef> = if self.dialect.templates.supports_add_constraint {
            Vec::new()
        } else {
            database
                .relationships
                .iter()
                .zip(&naming.relationships)
                .filter(|(rel, _)| rel.fk_table == table.name)
                .filter_map(|(rel, name)| {
                    name.as_ref()
                        .map(|n| foreign_key(database, naming, rel, n))
                })
                .collect()
        };

        let table_subject = Subject::new(ObjectKind::Table, names.table.clone(), schema);
        let text = self.dialect.create_table_sql(
            schema,
            &names.table,
            &columns,
            Some(&primary_key),
            &inline,
        );
        debug!(table = %names.table, "CREATE TABLE");
        let mut create = Statement::new(StatementKind::Create, Some(table_subject.clone()), text);
        if !primary_key.columns.is_empty() {
            create = create.and_creates(
                Subject::new(ObjectKind::Constraint, primary_key.name.clone(), schema)
                    .on_table(names.table.clone()),
            );
        }
        for fk in &inline {
            create = create.and_creates(
                Subject::new(ObjectKind::Relationship, fk.name.clone(), schema)
                    .on_table(names.table.clone()),
            );
        }
        self.statements.push(create);

        for (index, legal) in table.indexes.iter().zip(&names.indexes) {
            let columns: Vec<String> = index
                .columns
                .iter()
                .filter_map(|c| names.column(table, c))
                .map(str::to_string)
                .collect();
            let text =
                self.dialect
                    .create_index_sql(schema, legal, &names.table, &columns, index.unique);
            self.statements.push(Statement::new(
                StatementKind::Create,
                Some(Subject::new(ObjectKind::Index, legal.clone(), schema).on_table(names.table.clone())),
                text,
            ));
        }

        if self.dialect.templates.supports_comments {
            if let Some(remarks) = table.remarks.as_deref().filter(|r| !r.is_empty()) {
                let text = self.dialect.comment_on_table_sql(schema, &names.table, remarks);
                self.statements.push(Statement::new(
                    StatementKind::Comment,
                    Some(table_subject.clone()),
                    text,
                ));
            }
            for (column, legal) in table.columns.iter().zip(&names.columns) {
                if let Some(remarks) = column.remarks.as_deref().filter(|r| !r.is_empty()) {
                    let text =
                        self.dialect
                            .comment_on_column_sql(schema, &names.table, legal, remarks);
                    self.statements.push(Statement::new(
                        StatementKind::Comment,
                        Some(table_subject.clone()),
                        text,
                    ));
                }
            }
        }
    }

    fn column_def(&mut self, table: &TableSchema, column: &ColumnSchema, legal: &str) -> ColumnDef {
        let resolution = self
            .dialect
            .types
            .resolve(column.type_code, column.precision, column.scale);

        for coercion in &resolution.warnings {
            self.warnings.push(Warning::new(
                ModelObject::Column {
                    table: table.name.clone(),
                    column: column.name.clone(),
                },
                WarningReason::TypeCoerced,
                coercion.old.clone(),
                coercion.new.clone(),
            ));
        }

        ColumnDef {
            name: legal.to_string(),
            type_text: resolution.text.clone(),
            default: column
                .default_value
                .as_deref()
                .map(|v| resolution.descriptor.render_default(v)),
            not_null: !column.nullable
                || column.in_primary_key()
                || resolution.descriptor.nullability == Nullability::NotNullOnly,
        }
    }

    /// Renders the statement list as a script, terminating each statement
    /// with the dialect's terminator.
    #[must_use]
    pub fn script(&self) -> String {
        render_script(&self.dialect, &self.statements)
    }
}

/// Renders statements as a script for `dialect`.
#[must_use]
pub fn render_script(dialect: &Dialect, statements: &[Statement]) -> String {
    let mut script = String::new();
    for statement in statements {
        if !script.is_empty() {
            script.push('\n');
        }
        script.push_str(&statement.text);
        if !statement.is_comment_line() {
            script.push_str(&dialect.templates.terminator);
        }
        script.push('\n');
    }
    script
}

fn foreign_key(
    database: &DatabaseSchema,
    naming: &Naming,
    rel: &RelationshipSchema,
    name: &str,
) -> ForeignKeyDef {
    let (child, child_columns) = resolve_side(
        database,
        naming,
        &rel.fk_table,
        rel.mappings.iter().map(|m| m.fk_column.as_str()),
    );
    let (parent, parent_columns) = resolve_side(
        database,
        naming,
        &rel.pk_table,
        rel.mappings.iter().map(|m| m.pk_column.as_str()),
    );
    ForeignKeyDef {
        name: name.to_string(),
        child,
        child_columns,
        parent,
        parent_columns,
        on_delete: rel.on_delete,
        on_update: rel.on_update,
    }
}

/// Legal table and column names for one side of a relationship. The first
/// generated table with the modelled name wins.
fn resolve_side<'m>(
    database: &DatabaseSchema,
    naming: &Naming,
    table_name: &str,
    columns: impl Iterator<Item = &'m str>,
) -> (String, Vec<String>) {
    let found = database
        .tables
        .iter()
        .zip(&naming.tables)
        .find_map(|(t, n)| match n {
            Some(n) if t.name == table_name => Some((t, n)),
            _ => None,
        });
    match found {
        Some((table, names)) => (
            names.table.clone(),
            columns
                .filter_map(|c| names.column(table, c))
                .map(str::to_string)
                .collect(),
        ),
        None => (String::new(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSchema, ForeignKeyAction, IndexSchema, RelationshipSchema};
    use crate::types::TypeCode;

    fn shop() -> DatabaseSchema {
        DatabaseSchema::new("shop")
            .table(
                TableSchema::new("CUSTOMERS")
                    .column(ColumnSchema::new("ID", TypeCode::Integer).primary_key(1))
                    .column(ColumnSchema::new("NAME", TypeCode::VarChar).precision(80).not_null())
                    .remarks("People who buy things"),
            )
            .table(
                TableSchema::new("ORDERS")
                    .column(ColumnSchema::new("ID", TypeCode::Integer).primary_key(1))
                    .column(ColumnSchema::new("CUSTOMER_ID", TypeCode::Integer))
                    .column(
                        ColumnSchema::new("STATUS", TypeCode::VarChar)
                            .precision(10)
                            .default_value("NEW"),
                    )
                    .index(IndexSchema::new("ORDERS_CUSTOMER_IDX", &["CUSTOMER_ID"])),
            )
            .relationship(
                RelationshipSchema::new("FK_ORD_CUST", "CUSTOMERS", "ORDERS")
                    .map("ID", "CUSTOMER_ID")
                    .on_delete(ForeignKeyAction::Cascade),
            )
    }

    fn position(statements: &[Statement], needle: &str) -> usize {
        statements
            .iter()
            .position(|s| s.text.starts_with(needle))
            .unwrap_or_else(|| panic!("no statement starting with {needle}"))
    }

    #[test]
    fn test_generate_orders_statements() {
        let mut generator = DdlGenerator::new(Dialect::builtin("oracle").unwrap());
        generator.generate_ddl(&shop()).unwrap();

        assert_eq!(generator.state(), GeneratorState::Done);
        let statements = generator.statements();
        assert_eq!(statements[0].kind, StatementKind::Comment);
        assert!(statements[0].text.starts_with("-- Created by oxide-forward oracle"));

        let create = &statements[position(statements, "CREATE TABLE ORDERS")];
        assert_eq!(
            create.text,
            "CREATE TABLE ORDERS (\n  ID INTEGER NOT NULL,\n  CUSTOMER_ID INTEGER,\n  STATUS VARCHAR2(10) DEFAULT 'NEW',\n  CONSTRAINT ORDERS_PK PRIMARY KEY (ID)\n)"
        );

        let alter = statements.last().unwrap();
        assert_eq!(alter.kind, StatementKind::AlterAddConstraint);
        assert_eq!(
            alter.text,
            "ALTER TABLE ORDERS ADD CONSTRAINT FK_ORD_CUST FOREIGN KEY (CUSTOMER_ID) REFERENCES CUSTOMERS (ID) ON DELETE CASCADE"
        );
        assert!(generator.warnings().is_empty());
        assert!(generator.errors().is_empty());
    }

    #[test]
    fn test_creates_precede_alters() {
        let mut generator = DdlGenerator::new(Dialect::builtin("postgresql").unwrap());
        generator.generate_ddl(&shop()).unwrap();
        let statements = generator.statements();

        for (i, s) in statements.iter().enumerate() {
            if s.kind != StatementKind::AlterAddConstraint {
                continue;
            }
            for table in ["customers", "orders"] {
                let create = position(statements, &format!("CREATE TABLE {table}"));
                assert!(create < i);
            }
        }
    }

    #[test]
    fn test_comments_only_when_supported() {
        let mut oracle = DdlGenerator::new(Dialect::builtin("oracle").unwrap());
        oracle.generate_ddl(&shop()).unwrap();
        assert!(
            oracle
                .statements()
                .iter()
                .any(|s| s.text == "COMMENT ON TABLE CUSTOMERS IS 'People who buy things'")
        );

        let mut mysql = DdlGenerator::new(Dialect::builtin("mysql").unwrap());
        mysql.generate_ddl(&shop()).unwrap();
        assert!(!mysql.statements().iter().any(|s| s.text.starts_with("COMMENT ON")));
    }

    #[test]
    fn test_regeneration_is_identical() {
        let mut generator = DdlGenerator::new(Dialect::builtin("oracle").unwrap());
        let model = shop().table(
            TableSchema::new("ORDERS_CUSTOMERS_VERY_LONG_TABLE_NAME")
                .column(ColumnSchema::new("ID", TypeCode::Integer).primary_key(1)),
        );
        generator.generate_ddl(&model).unwrap();
        let first = generator.statements().to_vec();
        let first_warnings = generator.warnings().to_vec();

        generator.generate_ddl(&model).unwrap();
        assert_eq!(generator.statements(), first.as_slice());
        assert_eq!(generator.warnings(), first_warnings.as_slice());
    }

    #[test]
    fn test_unmapped_type_falls_back_with_one_warning() {
        let model = DatabaseSchema::new("geo").table(
            TableSchema::new("SHAPES")
                .column(ColumnSchema::new("ID", TypeCode::Integer).primary_key(1))
                .column(ColumnSchema::new("OUTLINE", TypeCode::Other)),
        );
        let mut generator = DdlGenerator::new(Dialect::builtin("oracle").unwrap());
        generator.generate_ddl(&model).unwrap();

        assert!(
            generator
                .statements()
                .iter()
                .any(|s| s.text.contains("OUTLINE CLOB"))
        );
        assert_eq!(generator.warnings().len(), 1);
        assert_eq!(generator.warnings()[0].reason, WarningReason::TypeCoerced);
    }

    #[test]
    fn test_structural_error_fails_call() {
        let model = shop().relationship(
            RelationshipSchema::new("FK_MISSING", "INVOICES", "ORDERS").map("ID", "ID"),
        );
        let mut generator = DdlGenerator::new(Dialect::builtin("generic").unwrap());
        let err = generator.generate_ddl(&model).unwrap_err();
        assert!(matches!(err, ForwardError::Structural(_)));
        assert!(generator.statements().is_empty());
        assert_eq!(generator.state(), GeneratorState::NotStarted);
    }

    #[test]
    fn test_legalization_failure_skips_table_and_its_relationships() {
        let mut dialect = Dialect::builtin("generic").unwrap();
        dialect.identifiers.max_length = Some(2);
        let model = DatabaseSchema::new("tiny")
            .table(
                TableSchema::new("AA")
                    .primary_key_name("P1")
                    .column(ColumnSchema::new("ID", TypeCode::Integer).primary_key(1)),
            )
            .table(
                TableSchema::new("AA")
                    .primary_key_name("P2")
                    .column(ColumnSchema::new("ID", TypeCode::Integer).primary_key(1)),
            )
            .table(
                TableSchema::new("BB")
                    .primary_key_name("P3")
                    .column(ColumnSchema::new("ID", TypeCode::Integer).primary_key(1)),
            )
            .relationship(RelationshipSchema::new("F1", "AA", "BB").map("ID", "ID"));

        let mut generator = DdlGenerator::new(dialect);
        generator.generate_ddl(&model).unwrap();

        assert_eq!(generator.errors().len(), 1);
        let creates = generator
            .statements()
            .iter()
            .filter(|s| s.kind == StatementKind::Create)
            .count();
        assert_eq!(creates, 2);
        // The relationship refers to AA by model name; the first AA table
        // survived, so the constraint is still emitted.
        assert!(
            generator
                .statements()
                .iter()
                .any(|s| s.kind == StatementKind::AlterAddConstraint)
        );
    }

    #[test]
    fn test_sqlite_inlines_foreign_keys() {
        let mut generator = DdlGenerator::new(Dialect::builtin("sqlite").unwrap());
        generator.generate_ddl(&shop()).unwrap();

        assert!(
            !generator
                .statements()
                .iter()
                .any(|s| s.kind == StatementKind::AlterAddConstraint)
        );
        let orders = &generator.statements()[position(generator.statements(), "CREATE TABLE ORDERS")];
        assert!(orders.text.contains(
            "CONSTRAINT FK_ORD_CUST FOREIGN KEY (CUSTOMER_ID) REFERENCES CUSTOMERS (ID) ON DELETE CASCADE"
        ));
    }

    #[test]
    fn test_target_schema_qualifies_names() {
        let mut generator =
            DdlGenerator::new(Dialect::builtin("generic").unwrap()).with_target_schema("SALES");
        generator.generate_ddl(&shop()).unwrap();

        let alter = generator.statements().last().unwrap();
        assert!(alter.text.starts_with("ALTER TABLE SALES.ORDERS"));
        assert!(alter.text.contains("REFERENCES SALES.CUSTOMERS"));
        assert_eq!(
            alter.subject.as_ref().unwrap().qualified_name(),
            "SALES.FK_ORD_CUST"
        );
    }

    #[test]
    fn test_edited_warning_becomes_override() {
        let model = DatabaseSchema::new("shop").table(
            TableSchema::new("CUSTOMER_ORDER_HISTORY_ARCHIVE_TABLE")
                .column(ColumnSchema::new("ID", TypeCode::Integer).primary_key(1)),
        );
        let mut generator = DdlGenerator::new(Dialect::builtin("oracle").unwrap());
        generator.generate_ddl(&model).unwrap();

        let warning = generator
            .warnings_mut()
            .iter_mut()
            .find(|w| w.reason == WarningReason::NameTruncated)
            .unwrap();
        assert_eq!(warning.new_value, "CUSTOMER_ORDER_HISTORY_ARCHIVE");
        warning.new_value = "order history".to_string();

        assert_eq!(generator.apply_overrides(), 1);
        generator.generate_ddl(&model).unwrap();
        assert!(
            generator
                .statements()
                .iter()
                .any(|s| s.text.starts_with("CREATE TABLE ORDER_HISTORY ("))
        );
    }

    #[test]
    fn test_case_variants_collide_in_case_insensitive_dialect() {
        let model = DatabaseSchema::new("shop")
            .table(TableSchema::new("Orders").column(ColumnSchema::new("ID", TypeCode::Integer)))
            .table(TableSchema::new("ORDERS").column(ColumnSchema::new("ID", TypeCode::Integer)));
        let mut generator = DdlGenerator::new(Dialect::builtin("sqlite").unwrap());
        generator.generate_ddl(&model).unwrap();

        let tables: Vec<&str> = generator
            .names()
            .iter()
            .filter(|n| n.namespace == Namespace::Table)
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(tables, ["Orders", "ORDERS_1"]);
        let collisions: Vec<&Warning> = generator
            .warnings()
            .iter()
            .filter(|w| w.reason == WarningReason::NameCollision)
            .collect();
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].new_value, "ORDERS_1");
        assert!(
            generator
                .statements()
                .iter()
                .any(|s| s.text.starts_with("CREATE TABLE ORDERS_1 ("))
        );
    }

    #[test]
    fn test_index_and_table_share_namespace() {
        let model = DatabaseSchema::new("shop")
            .table(
                TableSchema::new("orders")
                    .column(ColumnSchema::new("id", TypeCode::Integer))
                    .index(IndexSchema::new("lines", &["id"])),
            )
            .table(TableSchema::new("lines").column(ColumnSchema::new("id", TypeCode::Integer)));

        let mut postgres = DdlGenerator::new(Dialect::builtin("postgresql").unwrap());
        postgres.generate_ddl(&model).unwrap();
        assert!(
            postgres
                .statements()
                .iter()
                .any(|s| s.text.starts_with("CREATE INDEX lines ON orders"))
        );
        assert!(
            postgres
                .statements()
                .iter()
                .any(|s| s.text.starts_with("CREATE TABLE lines_1 ("))
        );
        assert!(postgres.warnings().iter().any(|w| {
            w.reason == WarningReason::NameCollision
                && w.subject
                    == ModelObject::Table {
                        table: "lines".to_string(),
                    }
        }));

        let mut mysql = DdlGenerator::new(Dialect::builtin("mysql").unwrap());
        mysql.generate_ddl(&model).unwrap();
        assert!(mysql.warnings().is_empty());
    }

    #[test]
    fn test_create_table_also_creates_its_constraints() {
        let mut oracle = DdlGenerator::new(Dialect::builtin("oracle").unwrap());
        oracle.generate_ddl(&shop()).unwrap();
        let orders = &oracle.statements()[position(oracle.statements(), "CREATE TABLE ORDERS")];
        let created: Vec<(ObjectKind, &str, Option<&str>)> = orders
            .created_subjects()
            .map(|s| (s.kind, s.name.as_str(), s.table.as_deref()))
            .collect();
        assert_eq!(
            created,
            [
                (ObjectKind::Table, "ORDERS", None),
                (ObjectKind::Constraint, "ORDERS_PK", Some("ORDERS")),
            ]
        );

        let mut sqlite = DdlGenerator::new(Dialect::builtin("sqlite").unwrap());
        sqlite.generate_ddl(&shop()).unwrap();
        let orders = &sqlite.statements()[position(sqlite.statements(), "CREATE TABLE ORDERS")];
        assert!(orders.created_subjects().any(|s| {
            s.kind == ObjectKind::Relationship && s.name == "FK_ORD_CUST"
        }));

        let keyless = DatabaseSchema::new("shop")
            .table(TableSchema::new("LOG").column(ColumnSchema::new("LINE", TypeCode::VarChar)));
        oracle.generate_ddl(&keyless).unwrap();
        let log = &oracle.statements()[position(oracle.statements(), "CREATE TABLE LOG")];
        assert_eq!(log.created_subjects().count(), 1);
    }

    fn awkward_model() -> DatabaseSchema {
        let long = "CUSTOMER_ORDER_HISTORY_ARCHIVE_RECORDS_KEPT_FOR_AUDIT_PURPOSES_AND_MORE_THAN_SIXTY_FOUR";
        DatabaseSchema::new("awkward")
            .table(
                TableSchema::new("Orders")
                    .column(ColumnSchema::new("ID", TypeCode::Integer).primary_key(1))
                    .column(ColumnSchema::new("select", TypeCode::VarChar).precision(10))
                    .column(ColumnSchema::new("SELECT", TypeCode::VarChar).precision(10))
                    .column(ColumnSchema::new("unit price", TypeCode::Decimal).precision_scale(9, 2))
                    .column(ColumnSchema::new("2nd address", TypeCode::VarChar).precision(40))
                    .index(IndexSchema::new("order lines", &["ID"])),
            )
            .table(
                TableSchema::new("ORDERS")
                    .column(ColumnSchema::new("ID", TypeCode::Integer).primary_key(1))
                    .column(ColumnSchema::new("Größe", TypeCode::Integer))
                    .column(ColumnSchema::new("Grö", TypeCode::Integer)),
            )
            .table(TableSchema::new("from").column(ColumnSchema::new("group", TypeCode::Integer)))
            .table(TableSchema::new("order lines").column(ColumnSchema::new("ID", TypeCode::Integer)))
            .table(
                TableSchema::new(format!("{long}_A"))
                    .column(ColumnSchema::new("ID", TypeCode::Integer).primary_key(1)),
            )
            .table(
                TableSchema::new(format!("{long}_B"))
                    .column(ColumnSchema::new("ID", TypeCode::Integer).primary_key(1))
                    .column(ColumnSchema::new("ORDER_ID", TypeCode::Integer)),
            )
            .table(TableSchema::new("2nd orders").column(ColumnSchema::new("ID", TypeCode::Integer)))
            .relationship(
                RelationshipSchema::new(format!("{long}_FK_ONE"), "Orders", format!("{long}_B"))
                    .map("ID", "ORDER_ID"),
            )
            .relationship(
                RelationshipSchema::new(format!("{long}_FK_TWO"), "ORDERS", format!("{long}_B"))
                    .map("ID", "ORDER_ID"),
            )
    }

    #[test]
    fn test_assigned_names_are_legal_and_unique_in_every_dialect() {
        let model = awkward_model();
        for name in crate::dialect::BUILTIN_DIALECTS {
            let mut generator = DdlGenerator::new(Dialect::builtin(name).unwrap());
            generator.generate_ddl(&model).unwrap();
            assert!(generator.errors().is_empty(), "{name}: {:?}", generator.errors());

            let rules = &generator.dialect().identifiers;
            let mut seen: BTreeMap<&Namespace, Vec<String>> = BTreeMap::new();
            for assigned in generator.names() {
                assert!(
                    rules.is_legal(&assigned.name),
                    "{name}: {} is not legal for {}",
                    assigned.name,
                    assigned.object
                );
                let keys = seen.entry(&assigned.namespace).or_default();
                let key = rules.key(&assigned.name);
                assert!(
                    !keys.contains(&key),
                    "{name}: {} reused in {} namespace",
                    assigned.name,
                    assigned.namespace
                );
                keys.push(key);
            }
            // 7 tables, 14 columns, 7 primary key names, 1 index, 2 relationships
            assert_eq!(generator.names().len(), 31, "{name}");
        }
    }

    #[test]
    fn test_script_uses_terminator() {
        let mut generator = DdlGenerator::new(Dialect::builtin("sqlserver").unwrap());
        generator.generate_ddl(&shop()).unwrap();
        let script = generator.script();

        assert!(script.starts_with("-- Created by oxide-forward sqlserver"));
        assert!(script.contains(")\nGO\n"));
        assert!(!script.lines().next().unwrap().ends_with("GO"));
    }
}
