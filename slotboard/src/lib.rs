pub mod batch;
pub mod config;
pub mod db;
pub mod lifecycle;
pub mod metrics;
pub mod service;
pub mod slot;

pub mod error;
pub mod time;

pub use batch::types::{BatchClassification, BatchOperationResult, SlotFailure, SlotOutcome};
pub use error::{BatchError, SlotError, SlotErrorType};
pub use service::{RequestContext, SlotService};
pub use slot::model::{DraftStatus, InvariantViolation, Slot, SlotId, SlotStatus};
pub use lifecycle::availability::Availability;
pub use lifecycle::maintenance::MaintenanceOperation;
pub use lifecycle::occupancy::ListingWindow;
