//! Forward engineering of relational schema models.
//!
//! `oxide-forward` compiles a schema model into dialect-specific DDL and
//! applies it to a live database:
//! - Names are legalized per dialect (length, characters, reserved words,
//!   uniqueness) and every change is reported as a warning
//! - Types are mapped through per-dialect tables with a fallback for
//!   anything unmapped
//! - Objects already present in the target are found, together with
//!   everything depending on them, and dropped in a safe order
//! - The whole run is a cancellable pipeline reporting its progress
//!
//! # Architecture
//!
//! - **Dialect** - Type map, identifier rules and statement templates
//! - **Legalizer** - Turns model names into unique legal identifiers
//! - **Generator** - Walks the schema and emits ordered statements
//! - **Conflict resolver** - Finds colliding objects in the target
//! - **Drop planner** - Orders conflicting objects for removal
//! - **Pipeline** - Runs Find, Resolve and Execute as tokio tasks
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use oxide_forward::prelude::*;
//!
//! let schema = DatabaseSchema::new("shop")
//!     .table(
//!         TableSchema::new("CUSTOMERS")
//!             .column(ColumnSchema::new("ID", TypeCode::Integer).primary_key(1))
//!             .column(ColumnSchema::new("NAME", TypeCode::VarChar).precision(80)),
//!     )
//!     .table(
//!         TableSchema::new("ORDERS")
//!             .column(ColumnSchema::new("ID", TypeCode::Integer).primary_key(1))
//!             .column(ColumnSchema::new("CUSTOMER_ID", TypeCode::Integer)),
//!     )
//!     .relationship(
//!         RelationshipSchema::new("FK_ORD_CUST", "CUSTOMERS", "ORDERS").map("ID", "CUSTOMER_ID"),
//!     );
//!
//! let mut generator = DdlGenerator::new(Dialect::builtin("oracle")?);
//! generator.generate_ddl(&schema)?;
//! println!("{}", generator.script());
//!
//! let target = Arc::new(SqliteTarget::connect("sqlite:shop.db").await?);
//! let report = ForwardPipeline::new(target, &generator)
//!     .run(&FixedApproval(Approval::Drop))
//!     .await;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Print the DDL for a model
//! oxide-forward generate model.json --dialect oracle
//!
//! # Apply it to a database, dropping conflicting objects
//! oxide-forward --database sqlite:shop.db forward model.json --dialect sqlite --yes
//!
//! # List built-in dialects
//! oxide-forward dialects
//! ```

pub mod config;
pub mod conflict;
pub mod dialect;
pub mod error;
pub mod generator;
pub mod legalize;
pub mod pipeline;
pub mod planner;
pub mod schema;
pub mod statement;
pub mod target;
pub mod types;
pub mod warning;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{DropPolicy, ForwardConfig};
    pub use crate::conflict::{Completion, ConflictRecord, ConflictResolver};
    pub use crate::dialect::Dialect;
    pub use crate::error::{ForwardError, Result};
    pub use crate::generator::{AssignedName, DdlGenerator, GeneratorState};
    pub use crate::pipeline::{
        Approval, ApprovalGate, CancelFlag, FixedApproval, ForwardPipeline, PipelineOutcome,
        PipelineReport, StageKind, StageProgress,
    };
    pub use crate::planner::{DropPlanner, PlannedDrop};
    pub use crate::schema::{
        ColumnSchema, DatabaseSchema, ForeignKeyAction, IndexSchema, RelationshipSchema,
        TableSchema,
    };
    pub use crate::statement::{ObjectKind, Statement, StatementKind, Subject};
    pub use crate::target::{ExistingObject, MemoryTarget, SqliteTarget, TargetDatabase};
    pub use crate::types::TypeCode;
    pub use crate::warning::{ModelObject, Warning, WarningReason};
}
