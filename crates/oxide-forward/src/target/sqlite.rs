//! SQLite target backed by a `sqlx` pool.

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::error::Result;
use crate::statement::{ObjectKind, Subject};

use super::{ExistingObject, TargetDatabase};

/// A live SQLite database.
///
/// SQLite keeps constraints inside table definitions, so constraint lookups
/// never find anything and foreign keys show up as dependent child tables.
#[derive(Debug, Clone)]
pub struct SqliteTarget {
    pool: SqlitePool,
}

impl SqliteTarget {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to a database URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn lookup(&self, kind: &str, name: &str) -> Result<Option<(String, String)>> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT name, tbl_name FROM sqlite_master WHERE type = ? AND name = ? COLLATE NOCASE",
        )
        .bind(kind)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl TargetDatabase for SqliteTarget {
    async fn find_object(&self, subject: &Subject) -> Result<Option<ExistingObject>> {
        let found = match subject.kind {
            ObjectKind::Table => self
                .lookup("table", &subject.name)
                .await?
                .map(|(name, _)| ExistingObject::table(name)),
            ObjectKind::Index => self
                .lookup("index", &subject.name)
                .await?
                .map(|(name, table)| ExistingObject::index(name, table)),
            ObjectKind::Constraint | ObjectKind::Relationship => None,
        };
        if let Some(object) = &found {
            debug!(%object, "Found existing object");
        }
        Ok(found.map(|o| o.in_schema(subject.schema.as_deref())))
    }

    async fn dependents_of(&self, object: &ExistingObject) -> Result<Vec<ExistingObject>> {
        if object.kind != ObjectKind::Table {
            return Ok(Vec::new());
        }

        let children: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT m.name FROM sqlite_master AS m \
             JOIN pragma_foreign_key_list(m.name) AS fk \
             WHERE m.type = 'table' AND fk.\"table\" = ? COLLATE NOCASE \
             AND m.name <> ? COLLATE NOCASE ORDER BY m.name",
        )
        .bind(object.name.as_str())
        .bind(object.name.as_str())
        .fetch_all(&self.pool)
        .await?;

        // Automatic indexes have no SQL and cannot be dropped.
        let indexes: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master \
             WHERE type = 'index' AND tbl_name = ? COLLATE NOCASE AND sql IS NOT NULL \
             ORDER BY name",
        )
        .bind(object.name.as_str())
        .fetch_all(&self.pool)
        .await?;

        let schema = object.schema.as_deref();
        Ok(children
            .into_iter()
            .map(|(name,)| ExistingObject::table(name).in_schema(schema))
            .chain(
                indexes
                    .into_iter()
                    .map(|(name,)| ExistingObject::index(name, &object.name).in_schema(schema)),
            )
            .collect())
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_target() -> SqliteTarget {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        let target = SqliteTarget::new(pool);
        for sql in [
            "CREATE TABLE customers (id INTEGER PRIMARY KEY)",
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER REFERENCES customers (id))",
            "CREATE INDEX orders_customer_idx ON orders (customer_id)",
        ] {
            target.execute(sql).await.unwrap();
        }
        target
    }

    #[tokio::test]
    async fn test_find_object_case_insensitive() {
        let target = setup_target().await;

        let found = target
            .find_object(&Subject::new(ObjectKind::Table, "CUSTOMERS", None))
            .await
            .unwrap();
        assert_eq!(found, Some(ExistingObject::table("customers")));

        let index = target
            .find_object(&Subject::new(ObjectKind::Index, "ORDERS_CUSTOMER_IDX", None))
            .await
            .unwrap();
        assert_eq!(index, Some(ExistingObject::index("orders_customer_idx", "orders")));

        let missing = target
            .find_object(&Subject::new(ObjectKind::Table, "INVOICES", None))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_dependents_of_table() {
        let target = setup_target().await;

        let customers = target
            .dependents_of(&ExistingObject::table("customers"))
            .await
            .unwrap();
        assert_eq!(customers, vec![ExistingObject::table("orders")]);

        let orders = target
            .dependents_of(&ExistingObject::table("orders"))
            .await
            .unwrap();
        assert_eq!(
            orders,
            vec![ExistingObject::index("orders_customer_idx", "orders")]
        );
    }

    #[tokio::test]
    async fn test_execute_reports_database_error() {
        let target = setup_target().await;
        let err = target.execute("DROP TABLE nope").await.unwrap_err();
        assert!(err.to_string().contains("no such table"));
    }
}
