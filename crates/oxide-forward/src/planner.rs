//! Drop ordering for conflicting objects.
//!
//! Given conflict trees where each node's children depend on it, produces a
//! flat list of DROP statements in which every dependent is dropped before
//! the object it depends on.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::conflict::ConflictRecord;
use crate::dialect::Dialect;
use crate::error::{ForwardError, Result};
use crate::statement::ObjectKind;
use crate::target::ExistingObject;

/// One planned DROP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDrop {
    /// The object dropped.
    pub object: ExistingObject,
    /// Statement text.
    pub statement: String,
}

/// Orders conflicting objects for removal.
#[derive(Debug, Clone, Copy)]
pub struct DropPlanner<'a> {
    dialect: &'a Dialect,
}

impl<'a> DropPlanner<'a> {
    /// Creates a planner rendering statements for `dialect`.
    #[must_use]
    pub fn new(dialect: &'a Dialect) -> Self {
        Self { dialect }
    }

    /// Plans drops for the closure of `roots`.
    ///
    /// Objects appearing under several roots are planned once. Among objects
    /// whose dependents are all planned, the first discovered goes first.
    /// Dependency cycles are broken by dropping constraints first, then
    /// indexes, then tables.
    pub fn plan(&self, roots: &[ConflictRecord]) -> Result<Vec<PlannedDrop>> {
        let graph = Graph::build(roots);
        let order = graph.order();
        order
            .into_iter()
            .map(|i| {
                let object = &graph.nodes[i];
                Ok(PlannedDrop {
                    statement: self.drop_statement(object)?,
                    object: object.clone(),
                })
            })
            .collect()
    }

    /// Renders the DROP statement for one object.
    pub fn drop_statement(&self, object: &ExistingObject) -> Result<String> {
        let schema = object.schema.as_deref();
        match object.kind {
            ObjectKind::Table => Ok(self.dialect.drop_table(schema, &object.name)),
            ObjectKind::Index => Ok(self.dialect.drop_index(
                schema,
                object.table.as_deref(),
                &object.name,
            )),
            ObjectKind::Constraint | ObjectKind::Relationship => {
                let table = object.table.as_deref().ok_or_else(|| {
                    ForwardError::InvalidState(format!(
                        "cannot drop {object}: owning table unknown"
                    ))
                })?;
                Ok(self.dialect.drop_constraint(schema, table, &object.name))
            }
        }
    }
}

/// Deduplicated dependency graph in discovery order.
#[derive(Debug, Default)]
struct Graph {
    nodes: Vec<ExistingObject>,
    // dependents[i]: nodes that must be dropped before node i
    dependents: Vec<BTreeSet<usize>>,
}

impl Graph {
    fn build(roots: &[ConflictRecord]) -> Self {
        let mut graph = Self::default();
        let mut index = BTreeMap::new();
        for root in roots {
            graph.visit(root, &mut index);
        }
        graph.link_owned(&index);
        graph
    }

    // An index or constraint goes before its own table when both are planned.
    fn link_owned(&mut self, index: &BTreeMap<(ObjectKind, Option<String>, String), usize>) {
        for (id, object) in self.nodes.iter().enumerate() {
            if object.kind == ObjectKind::Table {
                continue;
            }
            let Some(table) = object.table.as_deref() else {
                continue;
            };
            let key = ExistingObject::table(table)
                .in_schema(object.schema.as_deref())
                .key();
            if let Some(&table_id) = index.get(&key) {
                self.dependents[table_id].insert(id);
            }
        }
    }

    fn visit(
        &mut self,
        record: &ConflictRecord,
        index: &mut BTreeMap<(ObjectKind, Option<String>, String), usize>,
    ) -> usize {
        let id = *index.entry(record.object.key()).or_insert_with(|| {
            self.nodes.push(record.object.clone());
            self.dependents.push(BTreeSet::new());
            self.nodes.len() - 1
        });
        for child in &record.dependents {
            let child_id = self.visit(child, index);
            if child_id != id {
                self.dependents[id].insert(child_id);
            }
        }
        id
    }

    fn order(&self) -> Vec<usize> {
        let mut planned = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());

        while order.len() < self.nodes.len() {
            let ready = (0..self.nodes.len())
                .find(|&i| !planned[i] && self.dependents[i].iter().all(|&d| planned[d]));
            let next = ready.unwrap_or_else(|| {
                let pick = (0..self.nodes.len())
                    .filter(|&i| !planned[i])
                    .min_by_key(|&i| (self.nodes[i].kind.drop_priority(), i))
                    .unwrap_or_default();
                debug!(object = %self.nodes[pick], "Breaking dependency cycle");
                pick
            });
            planned[next] = true;
            order.push(next);
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(object: ExistingObject, dependents: Vec<ConflictRecord>) -> ConflictRecord {
        ConflictRecord { object, dependents }
    }

    fn statements(plan: &[PlannedDrop]) -> Vec<&str> {
        plan.iter().map(|d| d.statement.as_str()).collect()
    }

    #[test]
    fn test_dependent_dropped_first() {
        let dialect = Dialect::builtin("oracle").unwrap();
        let roots = vec![record(
            ExistingObject::table("ORDERS"),
            vec![record(ExistingObject::constraint("FK_ORD_CUST", "ORDER_LINES"), vec![])],
        )];

        let plan = DropPlanner::new(&dialect).plan(&roots).unwrap();
        assert_eq!(
            statements(&plan),
            vec![
                "ALTER TABLE ORDER_LINES DROP CONSTRAINT FK_ORD_CUST",
                "DROP TABLE ORDERS",
            ]
        );
    }

    #[test]
    fn test_shared_dependents_planned_once() {
        let dialect = Dialect::builtin("generic").unwrap();
        let fk = || record(ExistingObject::constraint("FK_SHARED", "LINES"), vec![]);
        let roots = vec![
            record(ExistingObject::table("ORDERS"), vec![fk()]),
            record(ExistingObject::table("INVOICES"), vec![fk()]),
        ];

        let plan = DropPlanner::new(&dialect).plan(&roots).unwrap();
        assert_eq!(
            statements(&plan),
            vec![
                "ALTER TABLE LINES DROP CONSTRAINT FK_SHARED",
                "DROP TABLE ORDERS",
                "DROP TABLE INVOICES",
            ]
        );
    }

    #[test]
    fn test_nested_closure_order() {
        let dialect = Dialect::builtin("generic").unwrap();
        let roots = vec![record(
            ExistingObject::table("A"),
            vec![
                record(
                    ExistingObject::table("B"),
                    vec![record(ExistingObject::table("C"), vec![])],
                ),
                record(ExistingObject::index("A_IDX", "A"), vec![]),
            ],
        )];

        let plan = DropPlanner::new(&dialect).plan(&roots).unwrap();
        assert_eq!(
            statements(&plan),
            vec!["DROP TABLE C", "DROP TABLE B", "DROP INDEX A_IDX", "DROP TABLE A"]
        );
    }

    #[test]
    fn test_cycle_breaks_on_constraint() {
        let dialect = Dialect::builtin("generic").unwrap();
        // A -> FK -> A: the table reappears under its own constraint.
        let roots = vec![record(
            ExistingObject::table("A"),
            vec![record(
                ExistingObject::constraint("FK_SELF", "A"),
                vec![record(ExistingObject::table("A"), vec![])],
            )],
        )];

        let plan = DropPlanner::new(&dialect).plan(&roots).unwrap();
        assert_eq!(
            statements(&plan),
            vec!["ALTER TABLE A DROP CONSTRAINT FK_SELF", "DROP TABLE A"]
        );
    }

    #[test]
    fn test_owned_objects_dropped_before_their_table() {
        let dialect = Dialect::builtin("oracle").unwrap();
        // Found separately: the table as one conflict, its key and index as others.
        let roots = vec![
            record(ExistingObject::table("LEGACY_ORDERS"), vec![]),
            record(ExistingObject::constraint("ORDERS_PK", "legacy_orders"), vec![]),
            record(ExistingObject::index("ORDERS_IDX", "LEGACY_ORDERS"), vec![]),
            record(ExistingObject::index("OTHER_IDX", "OTHER"), vec![]),
        ];

        let plan = DropPlanner::new(&dialect).plan(&roots).unwrap();
        assert_eq!(
            statements(&plan),
            vec![
                "ALTER TABLE legacy_orders DROP CONSTRAINT ORDERS_PK",
                "DROP INDEX ORDERS_IDX",
                "DROP TABLE LEGACY_ORDERS",
                "DROP INDEX OTHER_IDX",
            ]
        );
    }

    #[test]
    fn test_constraint_without_table_is_rejected() {
        let dialect = Dialect::builtin("generic").unwrap();
        let roots = vec![record(
            ExistingObject::new(ObjectKind::Constraint, "FK_LOST"),
            vec![],
        )];
        assert!(matches!(
            DropPlanner::new(&dialect).plan(&roots),
            Err(ForwardError::InvalidState(_))
        ));
    }
}
