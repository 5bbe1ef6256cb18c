//! Job lifecycle core.
//!
//! Everything between the HTTP surface and the infrastructure clients:
//! - job submission with compensating cleanup,
//! - idempotent, conflict-resolving status reconciliation,
//! - on-demand polling,
//! - push-notification handling with ack/nack dispositions.
//!
//! The workflows only depend on the collaborator traits in [`stores`], so
//! scenario tests drive them with in-memory doubles while the binaries wire
//! in the concrete Firestore, storage and engine clients.

pub mod error;
pub mod listener;
pub mod poll;
pub mod reconcile;
pub mod stores;
pub mod submit;

pub use error::{LifecycleError, LifecycleResult};
pub use listener::{disposition, MessageDisposition, NotificationHandler};
pub use poll::{PollAdapter, ReconcileDisposition, StatusSnapshot};
pub use reconcile::{decide, ReconcileOutcome, StatusDecision, StatusReconciler};
pub use stores::{ObjectStore, RecordStore, TranscodeEngine};
pub use submit::JobSubmitter;
