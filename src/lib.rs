// Courier Dispatch - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod db;
pub mod schema;         // Shape Layer - record validation
pub mod deduplication;  // Id collisions within and across batches
pub mod temporal;       // Time windows and wire timestamps
pub mod entities;       // Courier and Order models
pub mod store;          // Storage seam
pub mod matching;       // Eligibility rules
pub mod assignment;     // Assign / dismiss / complete
pub mod metrics;        // Rating and earnings
pub mod service;        // Request orchestration
pub mod error;
pub mod config;

#[cfg(feature = "server")]
pub mod api;            // REST shell over the service

// Re-export commonly used types
pub use db::{setup_database, SqliteStore};
pub use schema::{ValidationError, ValidationResult, MAX_WEIGHT, MIN_WEIGHT};
pub use deduplication::{DeduplicationEngine, Partition};
pub use temporal::{PeriodError, TimePeriod};
pub use entities::{Courier, CourierPatch, CourierType, EntityKind, Identified, Order};
pub use store::{CompletionFilter, EntityStore};
pub use assignment::{AssignmentManager, AssignmentResult};
pub use metrics::{CourierInfo, CourierMetrics};
pub use service::{CompleteRequest, DispatchService};
pub use error::{DispatchError, Result};
pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
