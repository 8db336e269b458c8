//! Portable type codes and native type descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Vendor-neutral identifier for a column's logical data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TypeCode {
    /// Single bit.
    Bit,
    /// True/false.
    Boolean,
    /// 8-bit integer.
    TinyInt,
    /// 16-bit integer.
    SmallInt,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    BigInt,
    /// Single precision floating point.
    Real,
    /// Floating point with requested precision.
    Float,
    /// Double precision floating point.
    Double,
    /// Exact numeric with precision and scale.
    Numeric,
    /// Exact decimal with precision and scale.
    Decimal,
    /// Fixed-length character string.
    Char,
    /// Variable-length character string.
    VarChar,
    /// Long variable-length character string.
    LongVarChar,
    /// Character large object.
    Clob,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    Timestamp,
    /// Fixed-length binary string.
    Binary,
    /// Variable-length binary string.
    VarBinary,
    /// Long variable-length binary string.
    LongVarBinary,
    /// Binary large object.
    Blob,
    /// Anything the modelling tool could not classify.
    Other,
}

impl TypeCode {
    /// Every portable type code, in declaration order.
    pub const ALL: [Self; 23] = [
        Self::Bit,
        Self::Boolean,
        Self::TinyInt,
        Self::SmallInt,
        Self::Integer,
        Self::BigInt,
        Self::Real,
        Self::Float,
        Self::Double,
        Self::Numeric,
        Self::Decimal,
        Self::Char,
        Self::VarChar,
        Self::LongVarChar,
        Self::Clob,
        Self::Date,
        Self::Time,
        Self::Timestamp,
        Self::Binary,
        Self::VarBinary,
        Self::LongVarBinary,
        Self::Blob,
        Self::Other,
    ];

    /// Returns the canonical upper-case name of this code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bit => "BIT",
            Self::Boolean => "BOOLEAN",
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Real => "REAL",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Numeric => "NUMERIC",
            Self::Decimal => "DECIMAL",
            Self::Char => "CHAR",
            Self::VarChar => "VARCHAR",
            Self::LongVarChar => "LONGVARCHAR",
            Self::Clob => "CLOB",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Binary => "BINARY",
            Self::VarBinary => "VARBINARY",
            Self::LongVarBinary => "LONGVARBINARY",
            Self::Blob => "BLOB",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether columns of a native type may hold NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Nullability {
    /// The type can never be NULL.
    NotNullOnly,
    /// The type may be NULL.
    #[default]
    Nullable,
    /// The dialect does not say.
    Unknown,
}

/// Describes how a dialect spells one portable type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Native type name (e.g. `VARCHAR2`).
    pub name: String,
    /// Portable code this descriptor implements.
    pub code: TypeCode,
    /// Largest precision (or length) the native type accepts.
    pub max_precision: u32,
    /// Prefix for literal default values (e.g. `'`).
    #[serde(default)]
    pub literal_prefix: Option<String>,
    /// Suffix for literal default values.
    #[serde(default)]
    pub literal_suffix: Option<String>,
    /// Nullability support.
    #[serde(default)]
    pub nullability: Nullability,
    /// Whether a precision/length may be given.
    #[serde(default)]
    pub precision_supported: bool,
    /// Whether a scale may be given.
    #[serde(default)]
    pub scale_supported: bool,
}

impl TypeDescriptor {
    /// Creates a descriptor with no literal affixes.
    #[must_use]
    pub fn new(name: impl Into<String>, code: TypeCode, max_precision: u32) -> Self {
        Self {
            name: name.into(),
            code,
            max_precision,
            literal_prefix: None,
            literal_suffix: None,
            nullability: Nullability::Nullable,
            precision_supported: false,
            scale_supported: false,
        }
    }

    /// Sets the literal prefix and suffix.
    #[must_use]
    pub fn literal(mut self, prefix: Option<&str>, suffix: Option<&str>) -> Self {
        self.literal_prefix = prefix.map(str::to_string);
        self.literal_suffix = suffix.map(str::to_string);
        self
    }

    /// Marks precision (and optionally scale) as supported.
    #[must_use]
    pub fn precision(mut self, scale: bool) -> Self {
        self.precision_supported = true;
        self.scale_supported = scale;
        self
    }

    /// Sets nullability support.
    #[must_use]
    pub fn nullability(mut self, nullability: Nullability) -> Self {
        self.nullability = nullability;
        self
    }

    /// Renders the native type text for an already clamped precision and scale.
    #[must_use]
    pub fn render(&self, precision: Option<u32>, scale: Option<u32>) -> String {
        match (self.precision_supported, precision.filter(|p| *p > 0)) {
            (true, Some(p)) => match (self.scale_supported, scale) {
                (true, Some(s)) => format!("{}({p},{s})", self.name),
                _ => format!("{}({p})", self.name),
            },
            _ => self.name.clone(),
        }
    }

    /// Renders a default value as a literal of this type.
    ///
    /// Values that already form a complete literal pass through as is, so
    /// `'N/A'` stays quoted once and expressions such as `CURRENT_TIMESTAMP`
    /// survive untouched on types without affixes.
    #[must_use]
    pub fn render_default(&self, value: &str) -> String {
        let prefix = self.literal_prefix.as_deref().unwrap_or("");
        let suffix = self.literal_suffix.as_deref().unwrap_or("");
        if prefix.is_empty() && suffix.is_empty() {
            return value.to_string();
        }
        if value.len() >= prefix.len() + suffix.len()
            && value.starts_with(prefix)
            && value.ends_with(suffix)
        {
            let inner = &value[prefix.len()..value.len() - suffix.len()];
            // A lone quote inside means the value is not a literal yet.
            if prefix != "'" || !inner.replace("''", "").contains('\'') {
                return value.to_string();
            }
        }
        let body = if prefix == "'" {
            value.replace('\'', "''")
        } else {
            value.to_string()
        };
        format!("{prefix}{body}{suffix}")
    }
}
