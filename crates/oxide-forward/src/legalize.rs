//! Identifier legalization.
//!
//! Turns arbitrary model names into identifiers that are legal in a dialect
//! and unique within their namespace. Every rewrite is reported as a
//! [`NameChange`] so the caller can surface it as a warning.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::debug;

use crate::dialect::IdentifierRules;
use crate::error::{ForwardError, Result};
use crate::warning::WarningReason;

/// Scope in which an identifier must be unique.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Namespace {
    /// Table names.
    Table,
    /// Column names of one table (keyed by the table's legal name).
    Column(String),
    /// Constraint names, schema-wide.
    Constraint,
    /// Index names, schema-wide. Dialects whose indexes share the table
    /// namespace use `Table` instead.
    Index,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => f.write_str("table"),
            Self::Column(table) => write!(f, "column of {table}"),
            Self::Constraint => f.write_str("constraint"),
            Self::Index => f.write_str("index"),
        }
    }
}

/// Identifiers already assigned, per namespace.
#[derive(Debug, Clone, Default)]
pub struct UsedNames {
    names: BTreeMap<Namespace, BTreeSet<String>>,
}

impl UsedNames {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `key` is taken in `namespace`.
    #[must_use]
    pub fn contains(&self, namespace: &Namespace, key: &str) -> bool {
        self.names
            .get(namespace)
            .is_some_and(|set| set.contains(key))
    }

    fn insert(&mut self, namespace: &Namespace, key: String) {
        self.names.entry(namespace.clone()).or_default().insert(key);
    }

    /// Number of names taken in `namespace`.
    #[must_use]
    pub fn len(&self, namespace: &Namespace) -> usize {
        self.names.get(namespace).map_or(0, BTreeSet::len)
    }
}

/// One rewrite applied to a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameChange {
    /// Kind of rewrite.
    pub reason: WarningReason,
    /// Name before the rewrite.
    pub old: String,
    /// Name after the rewrite.
    pub new: String,
}

/// A legal identifier and the rewrites that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Legalized {
    /// The legal, unique identifier.
    pub name: String,
    /// Rewrites in the order they were applied.
    pub changes: Vec<NameChange>,
}

/// Produces legal identifiers for one dialect.
#[derive(Debug, Clone)]
pub struct IdentifierLegalizer<'a> {
    rules: &'a IdentifierRules,
}

impl<'a> IdentifierLegalizer<'a> {
    /// Creates a legalizer for the given rules.
    #[must_use]
    pub fn new(rules: &'a IdentifierRules) -> Self {
        Self { rules }
    }

    /// Legalizes `raw` in `namespace` and records the result in `used`.
    ///
    /// Steps: restrict characters and case, truncate to the maximum length,
    /// then resolve collisions with a numeric suffix. Fails only when no
    /// suffix can make the name unique.
    pub fn legalize(
        &self,
        raw: &str,
        namespace: &Namespace,
        used: &mut UsedNames,
    ) -> Result<Legalized> {
        let mut changes = Vec::new();

        let restricted = self.restrict(raw);
        if restricted != raw {
            changes.push(NameChange {
                reason: WarningReason::NameRestricted,
                old: raw.to_string(),
                new: restricted.clone(),
            });
        }

        let truncated = match self.rules.max_length {
            Some(max) => truncate(&restricted, max),
            None => restricted.clone(),
        };
        if truncated != restricted {
            changes.push(NameChange {
                reason: WarningReason::NameTruncated,
                old: restricted.clone(),
                new: truncated.clone(),
            });
        }

        let name = if self.is_taken(&truncated, namespace, used) {
            let unique = self.with_suffix(&truncated, namespace, used)?;
            changes.push(NameChange {
                reason: WarningReason::NameCollision,
                old: truncated,
                new: unique.clone(),
            });
            unique
        } else {
            truncated
        };

        if !changes.is_empty() {
            debug!(%namespace, raw, legal = %name, "Legalized identifier");
        }
        used.insert(namespace, self.rules.key(&name));
        Ok(Legalized { name, changes })
    }

    /// Replaces disallowed characters, fixes the leading character, folds case
    /// and escapes reserved words.
    fn restrict(&self, raw: &str) -> String {
        let mut name: String = raw
            .chars()
            .map(|c| if self.rules.is_allowed(c) { c } else { '_' })
            .collect();

        if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
            name.insert_str(0, &self.rules.leading_prefix);
        }

        name = self.rules.fold(&name);

        if self.rules.is_reserved(&name) {
            name.push('_');
        }
        name
    }

    // Truncation can turn an escaped reserved word back into the bare word,
    // so reserved words count as taken.
    fn is_taken(&self, name: &str, namespace: &Namespace, used: &UsedNames) -> bool {
        used.contains(namespace, &self.rules.key(name)) || self.rules.is_reserved(name)
    }

    fn with_suffix(&self, base: &str, namespace: &Namespace, used: &UsedNames) -> Result<String> {
        for n in 1..=self.rules.max_suffix {
            let suffix = format!("_{n}");
            let stem = match self.rules.max_length {
                Some(max) if suffix.len() >= max => {
                    return Err(ForwardError::Legalization {
                        namespace: namespace.clone(),
                        name: base.to_string(),
                        reason: format!("maximum length {max} leaves no room for suffix {suffix}"),
                    });
                }
                Some(max) => truncate(base, max - suffix.len()),
                None => base.to_string(),
            };
            let candidate = format!("{stem}{suffix}");
            if !self.is_taken(&candidate, namespace, used) {
                return Ok(candidate);
            }
        }
        Err(ForwardError::Legalization {
            namespace: namespace.clone(),
            name: base.to_string(),
            reason: format!("all suffixes up to _{} are taken", self.rules.max_suffix),
        })
    }
}

fn truncate(name: &str, max: usize) -> String {
    name.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    fn oracle_rules() -> IdentifierRules {
        Dialect::builtin("oracle").unwrap().identifiers
    }

    #[test]
    fn test_truncates_long_constraint_name() {
        let rules = oracle_rules();
        let legalizer = IdentifierLegalizer::new(&rules);
        let mut used = UsedNames::new();

        let result = legalizer
            .legalize(
                "ORDERS_CUSTOMERS_VERY_LONG_CONSTRAINT_NAME_FK",
                &Namespace::Constraint,
                &mut used,
            )
            .unwrap();

        assert_eq!(result.name, "ORDERS_CUSTOMERS_VERY_LONG_CON");
        assert_eq!(
            result.changes,
            vec![NameChange {
                reason: WarningReason::NameTruncated,
                old: "ORDERS_CUSTOMERS_VERY_LONG_CONSTRAINT_NAME_FK".to_string(),
                new: "ORDERS_CUSTOMERS_VERY_LONG_CON".to_string(),
            }]
        );
    }

    #[test]
    fn test_collision_gets_numeric_suffix_within_length() {
        let rules = oracle_rules();
        let legalizer = IdentifierLegalizer::new(&rules);
        let mut used = UsedNames::new();
        let long = "A_VERY_LONG_TABLE_NAME_THAT_IS_TOO_LONG";

        let first = legalizer.legalize(long, &Namespace::Table, &mut used).unwrap();
        let second = legalizer.legalize(long, &Namespace::Table, &mut used).unwrap();
        let third = legalizer.legalize(long, &Namespace::Table, &mut used).unwrap();

        assert_eq!(first.name, "A_VERY_LONG_TABLE_NAME_THAT_IS");
        assert_eq!(second.name, "A_VERY_LONG_TABLE_NAME_THAT__1");
        assert_eq!(third.name, "A_VERY_LONG_TABLE_NAME_THAT__2");
        assert!(second.name.len() <= 30);
        assert_eq!(
            second.changes.last().unwrap().reason,
            WarningReason::NameCollision
        );
        assert_eq!(used.len(&Namespace::Table), 3);
    }

    #[test]
    fn test_namespaces_are_independent() {
        let rules = oracle_rules();
        let legalizer = IdentifierLegalizer::new(&rules);
        let mut used = UsedNames::new();

        legalizer.legalize("ID", &Namespace::Column("A".into()), &mut used).unwrap();
        let other = legalizer
            .legalize("ID", &Namespace::Column("B".into()), &mut used)
            .unwrap();
        assert_eq!(other.name, "ID");
        assert!(other.changes.is_empty());
    }

    #[test]
    fn test_restriction_rewrites() {
        let rules = oracle_rules();
        let legalizer = IdentifierLegalizer::new(&rules);
        let mut used = UsedNames::new();

        let r = legalizer
            .legalize("order lines", &Namespace::Table, &mut used)
            .unwrap();
        assert_eq!(r.name, "ORDER_LINES");
        assert_eq!(r.changes[0].reason, WarningReason::NameRestricted);

        let r = legalizer.legalize("2nd", &Namespace::Table, &mut used).unwrap();
        assert_eq!(r.name, "X2ND");

        let r = legalizer.legalize("order", &Namespace::Table, &mut used).unwrap();
        assert_eq!(r.name, "ORDER_");
        assert!(rules.is_legal(&r.name));
    }

    #[test]
    fn test_case_insensitive_collision_when_folding() {
        let rules = Dialect::builtin("postgresql").unwrap().identifiers;
        let legalizer = IdentifierLegalizer::new(&rules);
        let mut used = UsedNames::new();

        legalizer.legalize("Orders", &Namespace::Table, &mut used).unwrap();
        let r = legalizer.legalize("ORDERS", &Namespace::Table, &mut used).unwrap();
        assert_eq!(r.name, "orders_1");
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let rules = IdentifierRules {
            max_length: Some(2),
            ..IdentifierRules::default()
        };
        let legalizer = IdentifierLegalizer::new(&rules);
        let mut used = UsedNames::new();

        legalizer.legalize("AB", &Namespace::Index, &mut used).unwrap();
        let err = legalizer
            .legalize("AB", &Namespace::Index, &mut used)
            .unwrap_err();
        assert!(matches!(err, ForwardError::Legalization { .. }));

        let rules = IdentifierRules {
            max_suffix: 2,
            ..IdentifierRules::default()
        };
        let legalizer = IdentifierLegalizer::new(&rules);
        let mut used = UsedNames::new();
        for _ in 0..3 {
            legalizer.legalize("T", &Namespace::Table, &mut used).unwrap();
        }
        assert!(legalizer.legalize("T", &Namespace::Table, &mut used).is_err());
    }

    #[test]
    fn test_legalization_is_deterministic() {
        let rules = oracle_rules();
        let names = ["Customer", "customer", "ORDER", "line item", "CUSTOMER"];
        let run = || {
            let legalizer = IdentifierLegalizer::new(&rules);
            let mut used = UsedNames::new();
            names
                .iter()
                .map(|n| legalizer.legalize(n, &Namespace::Table, &mut used).unwrap().name)
                .collect::<Vec<_>>()
        };
        let first = run();
        assert_eq!(first, run());
        assert_eq!(
            first,
            vec!["CUSTOMER", "CUSTOMER_1", "ORDER_", "LINE_ITEM", "CUSTOMER_2"]
        );
    }
}
