//! Per-dialect lookup from portable type codes to native types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{TypeCode, TypeDescriptor};

/// Character codes eligible as fallback, smallest first.
const FALLBACK_CANDIDATES: [TypeCode; 4] = [
    TypeCode::Char,
    TypeCode::VarChar,
    TypeCode::LongVarChar,
    TypeCode::Clob,
];

/// A type that had to be changed to fit the dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCoercion {
    /// The type as requested by the model.
    pub old: String,
    /// The native type actually emitted.
    pub new: String,
}

/// Outcome of resolving one column type.
#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    /// Native type text, ready to be placed in a column definition.
    pub text: String,
    /// The descriptor that produced `text`.
    pub descriptor: &'a TypeDescriptor,
    /// At most one coercion describing what changed.
    pub warnings: Vec<TypeCoercion>,
}

/// Immutable mapping from portable type code to native type descriptor.
///
/// Built once from a table of descriptors and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<TypeDescriptor>", into = "Vec<TypeDescriptor>")]
pub struct DialectTypeMap {
    entries: BTreeMap<TypeCode, TypeDescriptor>,
    fallback: TypeDescriptor,
}

impl DialectTypeMap {
    /// Builds a type map from descriptors. Later entries for the same code
    /// replace earlier ones.
    #[must_use]
    pub fn new(descriptors: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        let entries: BTreeMap<TypeCode, TypeDescriptor> =
            descriptors.into_iter().map(|d| (d.code, d)).collect();

        // Largest character type available; ties go to the later candidate.
        let fallback = FALLBACK_CANDIDATES
            .iter()
            .filter_map(|code| entries.get(code))
            .fold(None::<&TypeDescriptor>, |best, d| match best {
                Some(b) if b.max_precision > d.max_precision => Some(b),
                _ => Some(d),
            })
            .cloned()
            .unwrap_or_else(|| {
                TypeDescriptor::new("VARCHAR", TypeCode::VarChar, 4000)
                    .literal(Some("'"), Some("'"))
                    .precision(false)
            });

        Self { entries, fallback }
    }

    /// Looks up the descriptor for a type code.
    #[must_use]
    pub fn get(&self, code: TypeCode) -> Option<&TypeDescriptor> {
        self.entries.get(&code)
    }

    /// Returns true if the code has its own descriptor.
    #[must_use]
    pub fn contains(&self, code: TypeCode) -> bool {
        self.entries.contains_key(&code)
    }

    /// The descriptor substituted for unmapped codes.
    #[must_use]
    pub fn fallback(&self) -> &TypeDescriptor {
        &self.fallback
    }

    /// Iterates over the mapped descriptors in type code order.
    pub fn descriptors(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.entries.values()
    }

    /// Resolves a portable type to native type text.
    ///
    /// Precision and scale are clamped to what the descriptor accepts. Unmapped
    /// codes use the fallback descriptor. Either case yields one coercion; this
    /// never fails.
    #[must_use]
    pub fn resolve(
        &self,
        code: TypeCode,
        precision: Option<u32>,
        scale: Option<u32>,
    ) -> Resolution<'_> {
        match self.get(code) {
            Some(descriptor) => {
                let (p, s) = clamp(descriptor, precision, scale);
                let text = descriptor.render(p, s);
                let mut warnings = Vec::new();
                if (p, s) != (precision, scale) && descriptor.precision_supported {
                    warnings.push(TypeCoercion {
                        old: descriptor.render(precision, scale),
                        new: text.clone(),
                    });
                }
                Resolution {
                    text,
                    descriptor,
                    warnings,
                }
            }
            None => {
                let descriptor = &self.fallback;
                let requested = precision.or_else(|| {
                    descriptor
                        .precision_supported
                        .then_some(descriptor.max_precision)
                });
                let (p, s) = clamp(descriptor, requested, scale);
                let text = descriptor.render(p, s);
                debug!(%code, fallback = %text, "Unmapped type code, using fallback");
                Resolution {
                    warnings: vec![TypeCoercion {
                        old: render_requested(code, precision, scale),
                        new: text.clone(),
                    }],
                    text,
                    descriptor,
                }
            }
        }
    }
}

impl From<Vec<TypeDescriptor>> for DialectTypeMap {
    fn from(descriptors: Vec<TypeDescriptor>) -> Self {
        Self::new(descriptors)
    }
}

impl From<DialectTypeMap> for Vec<TypeDescriptor> {
    fn from(map: DialectTypeMap) -> Self {
        map.entries.into_values().collect()
    }
}

/// Clamps precision and scale to the descriptor's limits. Scale never
/// exceeds precision.
fn clamp(
    descriptor: &TypeDescriptor,
    precision: Option<u32>,
    scale: Option<u32>,
) -> (Option<u32>, Option<u32>) {
    if !descriptor.precision_supported {
        return (precision, scale);
    }
    let p = precision.map(|p| p.min(descriptor.max_precision));
    let s = match (descriptor.scale_supported, scale, p) {
        (true, Some(s), Some(p)) => Some(s.min(p)),
        (true, Some(s), None) => Some(s.min(descriptor.max_precision)),
        _ => scale,
    };
    (p, s)
}

fn render_requested(code: TypeCode, precision: Option<u32>, scale: Option<u32>) -> String {
    match (precision, scale) {
        (Some(p), Some(s)) => format!("{code}({p},{s})"),
        (Some(p), None) => format!("{code}({p})"),
        _ => code.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DialectTypeMap {
        DialectTypeMap::new([
            TypeDescriptor::new("DECIMAL", TypeCode::Decimal, 31).precision(true),
            TypeDescriptor::new("VARCHAR", TypeCode::VarChar, 32672)
                .literal(Some("'"), Some("'"))
                .precision(false),
            TypeDescriptor::new("CLOB", TypeCode::Clob, 2_147_483_647)
                .literal(Some("'"), Some("'")),
            TypeDescriptor::new("INTEGER", TypeCode::Integer, 10),
        ])
    }

    #[test]
    fn test_resolve_within_limits() {
        let map = sample();
        let r = map.resolve(TypeCode::Decimal, Some(10), Some(2));
        assert_eq!(r.text, "DECIMAL(10,2)");
        assert!(r.warnings.is_empty());

        let r = map.resolve(TypeCode::Integer, Some(10), Some(0));
        assert_eq!(r.text, "INTEGER");
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn test_resolve_clamps_precision() {
        let map = sample();
        let r = map.resolve(TypeCode::Decimal, Some(50), Some(40));
        assert_eq!(r.text, "DECIMAL(31,31)");
        assert_eq!(
            r.warnings,
            vec![TypeCoercion {
                old: "DECIMAL(50,40)".to_string(),
                new: "DECIMAL(31,31)".to_string(),
            }]
        );
    }

    #[test]
    fn test_resolve_unmapped_uses_largest_character_type() {
        let map = sample();
        assert_eq!(map.fallback().name, "CLOB");

        let r = map.resolve(TypeCode::Other, Some(12), None);
        assert_eq!(r.text, "CLOB");
        assert_eq!(r.warnings.len(), 1);
        assert_eq!(r.warnings[0].old, "OTHER(12)");
        assert_eq!(r.warnings[0].new, "CLOB");
    }

    #[test]
    fn test_fallback_without_character_types() {
        let map = DialectTypeMap::new([TypeDescriptor::new("INTEGER", TypeCode::Integer, 10)]);
        let r = map.resolve(TypeCode::Blob, None, None);
        assert_eq!(r.text, "VARCHAR(4000)");
        assert_eq!(r.warnings.len(), 1);
    }

    #[test]
    fn test_serde_round_trip_keeps_fallback() {
        let map = sample();
        let json = serde_json::to_string(&map).unwrap();
        let back: DialectTypeMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
        assert_eq!(back.fallback().name, "CLOB");
    }
}
