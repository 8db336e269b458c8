//! Built-in dialect tables.
//!
//! Each table is a literal; the type map and rules are built from it once
//! when the dialect is constructed.

use crate::types::{TypeCode, TypeDescriptor};

use super::{Dialect, DialectTypeMap, DropIndexStyle, IdentifierCase, IdentifierRules, StatementTemplates};

/// One row of a built-in type table.
struct TypeRow {
    code: TypeCode,
    name: &'static str,
    max_precision: u32,
    quoted: bool,
    precision: bool,
    scale: bool,
}

const fn row(code: TypeCode, name: &'static str, max_precision: u32) -> TypeRow {
    TypeRow {
        code,
        name,
        max_precision,
        quoted: false,
        precision: false,
        scale: false,
    }
}

impl TypeRow {
    /// Literals of this type are written between single quotes.
    const fn quoted(mut self) -> Self {
        self.quoted = true;
        self
    }

    /// Accepts a precision (length).
    const fn len(mut self) -> Self {
        self.precision = true;
        self
    }

    /// Accepts precision and scale.
    const fn exact(mut self) -> Self {
        self.precision = true;
        self.scale = true;
        self
    }

    fn descriptor(&self) -> TypeDescriptor {
        let mut d = TypeDescriptor::new(self.name, self.code, self.max_precision);
        if self.quoted {
            d = d.literal(Some("'"), Some("'"));
        }
        if self.precision {
            d = d.precision(self.scale);
        }
        d
    }
}

const MAX_LOB: u32 = 2_147_483_647;

static GENERIC_TYPES: &[TypeRow] = &[
    row(TypeCode::BigInt, "BIGINT", 19),
    row(TypeCode::Binary, "BINARY", 2000).len(),
    row(TypeCode::Bit, "BIT", 1),
    row(TypeCode::Blob, "BLOB", MAX_LOB),
    row(TypeCode::Boolean, "BOOLEAN", 1),
    row(TypeCode::Char, "CHAR", 2000).quoted().len(),
    row(TypeCode::Clob, "CLOB", MAX_LOB).quoted(),
    row(TypeCode::Date, "DATE", 10).quoted(),
    row(TypeCode::Decimal, "DECIMAL", 38).exact(),
    row(TypeCode::Double, "DOUBLE PRECISION", 38),
    row(TypeCode::Float, "FLOAT", 38).len(),
    row(TypeCode::Integer, "INTEGER", 10),
    row(TypeCode::LongVarBinary, "BLOB", MAX_LOB),
    row(TypeCode::LongVarChar, "CLOB", MAX_LOB).quoted(),
    row(TypeCode::Numeric, "NUMERIC", 38).exact(),
    row(TypeCode::Real, "REAL", 38),
    row(TypeCode::SmallInt, "SMALLINT", 5),
    row(TypeCode::Time, "TIME", 8).quoted(),
    row(TypeCode::Timestamp, "TIMESTAMP", 26).quoted(),
    row(TypeCode::TinyInt, "SMALLINT", 5),
    row(TypeCode::VarBinary, "VARBINARY", 2000).len(),
    row(TypeCode::VarChar, "VARCHAR", 4000).quoted().len(),
];

static POSTGRES_TYPES: &[TypeRow] = &[
    row(TypeCode::BigInt, "BIGINT", 19),
    row(TypeCode::Binary, "BYTEA", MAX_LOB),
    row(TypeCode::Bit, "BIT", 83_886_080).len(),
    row(TypeCode::Blob, "BYTEA", MAX_LOB),
    row(TypeCode::Boolean, "BOOLEAN", 1),
    row(TypeCode::Char, "CHAR", 10_485_760).quoted().len(),
    row(TypeCode::Clob, "TEXT", MAX_LOB).quoted(),
    row(TypeCode::Date, "DATE", 10).quoted(),
    row(TypeCode::Decimal, "NUMERIC", 1000).exact(),
    row(TypeCode::Double, "DOUBLE PRECISION", 53),
    row(TypeCode::Float, "FLOAT", 53).len(),
    row(TypeCode::Integer, "INTEGER", 10),
    row(TypeCode::LongVarBinary, "BYTEA", MAX_LOB),
    row(TypeCode::LongVarChar, "TEXT", MAX_LOB).quoted(),
    row(TypeCode::Numeric, "NUMERIC", 1000).exact(),
    row(TypeCode::Real, "REAL", 24),
    row(TypeCode::SmallInt, "SMALLINT", 5),
    row(TypeCode::Time, "TIME", 15).quoted(),
    row(TypeCode::Timestamp, "TIMESTAMP", 26).quoted(),
    row(TypeCode::TinyInt, "SMALLINT", 5),
    row(TypeCode::VarBinary, "BYTEA", MAX_LOB),
    row(TypeCode::VarChar, "VARCHAR", 10_485_760).quoted().len(),
];

static ORACLE_TYPES: &[TypeRow] = &[
    row(TypeCode::BigInt, "NUMBER", 38),
    row(TypeCode::Binary, "RAW", 2000).len(),
    row(TypeCode::Bit, "NUMBER", 1).len(),
    row(TypeCode::Blob, "BLOB", MAX_LOB),
    row(TypeCode::Boolean, "NUMBER", 1).len(),
    row(TypeCode::Char, "CHAR", 2000).quoted().len(),
    row(TypeCode::Clob, "CLOB", MAX_LOB).quoted(),
    row(TypeCode::Date, "DATE", 10).quoted(),
    row(TypeCode::Decimal, "NUMBER", 38).exact(),
    row(TypeCode::Double, "BINARY_DOUBLE", 53),
    row(TypeCode::Float, "FLOAT", 126).len(),
    row(TypeCode::Integer, "INTEGER", 38),
    row(TypeCode::LongVarBinary, "BLOB", MAX_LOB),
    row(TypeCode::LongVarChar, "CLOB", MAX_LOB).quoted(),
    row(TypeCode::Numeric, "NUMBER", 38).exact(),
    row(TypeCode::Real, "BINARY_FLOAT", 24),
    row(TypeCode::SmallInt, "SMALLINT", 38),
    row(TypeCode::Time, "DATE", 10).quoted(),
    row(TypeCode::Timestamp, "TIMESTAMP", 9).quoted(),
    row(TypeCode::TinyInt, "SMALLINT", 38),
    row(TypeCode::VarBinary, "RAW", 2000).len(),
    row(TypeCode::VarChar, "VARCHAR2", 4000).quoted().len(),
];

static SQLSERVER_TYPES: &[TypeRow] = &[
    row(TypeCode::BigInt, "BIGINT", 19),
    row(TypeCode::Binary, "BINARY", 8000).len(),
    row(TypeCode::Bit, "BIT", 1),
    row(TypeCode::Blob, "IMAGE", MAX_LOB),
    row(TypeCode::Boolean, "BIT", 1),
    row(TypeCode::Char, "CHAR", 8000).quoted().len(),
    row(TypeCode::Clob, "TEXT", MAX_LOB).quoted(),
    row(TypeCode::Date, "DATETIME", 23).quoted(),
    row(TypeCode::Decimal, "DECIMAL", 38).exact(),
    row(TypeCode::Double, "FLOAT", 53),
    row(TypeCode::Float, "FLOAT", 53).len(),
    row(TypeCode::Integer, "INT", 10),
    row(TypeCode::LongVarBinary, "IMAGE", MAX_LOB),
    row(TypeCode::LongVarChar, "TEXT", MAX_LOB).quoted(),
    row(TypeCode::Numeric, "NUMERIC", 38).exact(),
    row(TypeCode::Real, "REAL", 24),
    row(TypeCode::SmallInt, "SMALLINT", 5),
    row(TypeCode::Time, "DATETIME", 23).quoted(),
    row(TypeCode::Timestamp, "DATETIME", 23).quoted(),
    row(TypeCode::TinyInt, "TINYINT", 3),
    row(TypeCode::VarBinary, "VARBINARY", 8000).len(),
    row(TypeCode::VarChar, "VARCHAR", 8000).quoted().len(),
];

static DB2_TYPES: &[TypeRow] = &[
    row(TypeCode::BigInt, "BIGINT", 38),
    row(TypeCode::Binary, "BLOB", MAX_LOB).len(),
    row(TypeCode::Bit, "DECIMAL", 1).len(),
    row(TypeCode::Blob, "BLOB", MAX_LOB).len(),
    row(TypeCode::Char, "CHAR", 254).quoted().len(),
    row(TypeCode::Clob, "CLOB", MAX_LOB).quoted().len(),
    row(TypeCode::Date, "DATE", 10).quoted(),
    row(TypeCode::Decimal, "DECIMAL", 31).exact(),
    row(TypeCode::Double, "DOUBLE", 53).len(),
    row(TypeCode::Float, "FLOAT", 53).len(),
    row(TypeCode::Integer, "INTEGER", 10),
    row(TypeCode::LongVarBinary, "BLOB", MAX_LOB).len(),
    row(TypeCode::LongVarChar, "CLOB", MAX_LOB).quoted().len(),
    row(TypeCode::Numeric, "DECIMAL", 31).exact(),
    row(TypeCode::Real, "FLOAT", 31).len(),
    row(TypeCode::SmallInt, "SMALLINT", 5),
    row(TypeCode::Time, "TIME", 8).quoted(),
    row(TypeCode::Timestamp, "TIMESTAMP", 26).quoted(),
    row(TypeCode::TinyInt, "SMALLINT", 5),
    row(TypeCode::VarBinary, "BLOB", MAX_LOB).len(),
    row(TypeCode::VarChar, "VARCHAR", 32672).quoted().len(),
];

static MYSQL_TYPES: &[TypeRow] = &[
    row(TypeCode::BigInt, "BIGINT", 20),
    row(TypeCode::Binary, "BINARY", 255).len(),
    row(TypeCode::Bit, "BIT", 64).len(),
    row(TypeCode::Blob, "LONGBLOB", MAX_LOB),
    row(TypeCode::Boolean, "BOOLEAN", 1),
    row(TypeCode::Char, "CHAR", 255).quoted().len(),
    row(TypeCode::Clob, "LONGTEXT", MAX_LOB).quoted(),
    row(TypeCode::Date, "DATE", 10).quoted(),
    row(TypeCode::Decimal, "DECIMAL", 65).exact(),
    row(TypeCode::Double, "DOUBLE", 53),
    row(TypeCode::Float, "FLOAT", 53).len(),
    row(TypeCode::Integer, "INT", 11),
    row(TypeCode::LongVarBinary, "LONGBLOB", MAX_LOB),
    row(TypeCode::LongVarChar, "LONGTEXT", MAX_LOB).quoted(),
    row(TypeCode::Numeric, "DECIMAL", 65).exact(),
    row(TypeCode::Real, "REAL", 24),
    row(TypeCode::SmallInt, "SMALLINT", 6),
    row(TypeCode::Time, "TIME", 8).quoted(),
    row(TypeCode::Timestamp, "DATETIME", 19).quoted(),
    row(TypeCode::TinyInt, "TINYINT", 4),
    row(TypeCode::VarBinary, "VARBINARY", 65535).len(),
    row(TypeCode::VarChar, "VARCHAR", 65535).quoted().len(),
];

static SQLITE_TYPES: &[TypeRow] = &[
    row(TypeCode::BigInt, "INTEGER", 19),
    row(TypeCode::Binary, "BLOB", MAX_LOB),
    row(TypeCode::Bit, "INTEGER", 1),
    row(TypeCode::Blob, "BLOB", MAX_LOB),
    row(TypeCode::Boolean, "INTEGER", 1),
    row(TypeCode::Char, "TEXT", MAX_LOB).quoted(),
    row(TypeCode::Clob, "TEXT", MAX_LOB).quoted(),
    row(TypeCode::Date, "TEXT", 10).quoted(),
    row(TypeCode::Decimal, "NUMERIC", 38).exact(),
    row(TypeCode::Double, "REAL", 53),
    row(TypeCode::Float, "REAL", 53),
    row(TypeCode::Integer, "INTEGER", 10),
    row(TypeCode::LongVarBinary, "BLOB", MAX_LOB),
    row(TypeCode::LongVarChar, "TEXT", MAX_LOB).quoted(),
    row(TypeCode::Numeric, "NUMERIC", 38).exact(),
    row(TypeCode::Real, "REAL", 24),
    row(TypeCode::SmallInt, "INTEGER", 5),
    row(TypeCode::Time, "TEXT", 8).quoted(),
    row(TypeCode::Timestamp, "TEXT", 26).quoted(),
    row(TypeCode::TinyInt, "INTEGER", 3),
    row(TypeCode::VarBinary, "BLOB", MAX_LOB),
    row(TypeCode::VarChar, "TEXT", MAX_LOB).quoted(),
];

/// Words no dialect accepts unquoted as an object name.
static SQL92_RESERVED: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "AS", "BETWEEN", "BY", "CHECK", "COLUMN", "CONSTRAINT",
    "CREATE", "DEFAULT", "DELETE", "DISTINCT", "DROP", "FOREIGN", "FROM", "GRANT", "GROUP",
    "HAVING", "IN", "INDEX", "INSERT", "INTO", "IS", "KEY", "NOT", "NULL", "ON", "OR", "ORDER",
    "PRIMARY", "REFERENCES", "SELECT", "SET", "TABLE", "TO", "UNION", "UNIQUE", "UPDATE",
    "USER", "VALUES", "VIEW", "WHERE",
];

static ORACLE_RESERVED: &[&str] = &[
    "ACCESS", "AUDIT", "COMMENT", "DATE", "FILE", "LEVEL", "LONG", "MODE", "NUMBER", "RAW",
    "RESOURCE", "ROW", "ROWID", "ROWNUM", "SESSION", "SIZE", "SYNONYM", "UID", "VARCHAR2",
];

fn build(
    name: &str,
    rows: &[TypeRow],
    identifiers: IdentifierRules,
    templates: StatementTemplates,
) -> Dialect {
    Dialect {
        name: name.to_string(),
        types: DialectTypeMap::new(rows.iter().map(TypeRow::descriptor)),
        identifiers,
        templates,
    }
}

fn reserved(extra: &[&str]) -> Vec<String> {
    SQL92_RESERVED
        .iter()
        .chain(extra)
        .map(|w| (*w).to_string())
        .collect()
}

pub(super) fn generic() -> Dialect {
    build(
        "generic",
        GENERIC_TYPES,
        IdentifierRules {
            max_length: None,
            case: IdentifierCase::Preserve,
            extra_chars: "_".to_string(),
            reserved_words: reserved(&[]),
            ..IdentifierRules::default()
        },
        StatementTemplates::default(),
    )
}

pub(super) fn postgres() -> Dialect {
    build(
        "postgresql",
        POSTGRES_TYPES,
        IdentifierRules {
            max_length: Some(63),
            case: IdentifierCase::Lower,
            extra_chars: "_$".to_string(),
            reserved_words: reserved(&["ANALYSE", "ANALYZE", "LIMIT", "OFFSET", "RETURNING"]),
            indexes_share_table_namespace: true,
            ..IdentifierRules::default()
        },
        StatementTemplates {
            supports_comments: true,
            ..StatementTemplates::default()
        },
    )
}

pub(super) fn oracle() -> Dialect {
    build(
        "oracle",
        ORACLE_TYPES,
        IdentifierRules {
            max_length: Some(30),
            case: IdentifierCase::Upper,
            extra_chars: "_$#".to_string(),
            reserved_words: reserved(ORACLE_RESERVED),
            ..IdentifierRules::default()
        },
        StatementTemplates {
            supports_comments: true,
            supports_on_update: false,
            ..StatementTemplates::default()
        },
    )
}

pub(super) fn sqlserver() -> Dialect {
    build(
        "sqlserver",
        SQLSERVER_TYPES,
        IdentifierRules {
            max_length: Some(128),
            case: IdentifierCase::Preserve,
            extra_chars: "_@#$".to_string(),
            reserved_words: reserved(&["IDENTITY", "TOP", "TRAN", "TRANSACTION"]),
            case_insensitive: true,
            ..IdentifierRules::default()
        },
        StatementTemplates {
            terminator: "\nGO".to_string(),
            drop_index: DropIndexStyle::OnTable,
            ..StatementTemplates::default()
        },
    )
}

pub(super) fn db2() -> Dialect {
    build(
        "db2",
        DB2_TYPES,
        IdentifierRules {
            max_length: Some(128),
            case: IdentifierCase::Upper,
            extra_chars: "_".to_string(),
            reserved_words: reserved(&[]),
            ..IdentifierRules::default()
        },
        StatementTemplates {
            supports_comments: true,
            supports_on_update: false,
            ..StatementTemplates::default()
        },
    )
}

pub(super) fn mysql() -> Dialect {
    build(
        "mysql",
        MYSQL_TYPES,
        IdentifierRules {
            max_length: Some(64),
            case: IdentifierCase::Preserve,
            extra_chars: "_$".to_string(),
            reserved_words: reserved(&["LIMIT", "RANGE", "READ", "WRITE"]),
            ..IdentifierRules::default()
        },
        StatementTemplates {
            drop_index: DropIndexStyle::OnTable,
            drop_constraint_keyword: "FOREIGN KEY".to_string(),
            ..StatementTemplates::default()
        },
    )
}

pub(super) fn sqlite() -> Dialect {
    build(
        "sqlite",
        SQLITE_TYPES,
        IdentifierRules {
            max_length: None,
            case: IdentifierCase::Preserve,
            extra_chars: "_".to_string(),
            reserved_words: reserved(&["AUTOINCREMENT", "PRAGMA", "VACUUM"]),
            case_insensitive: true,
            indexes_share_table_namespace: true,
            ..IdentifierRules::default()
        },
        StatementTemplates {
            supports_add_constraint: false,
            ..StatementTemplates::default()
        },
    )
}
