//! Best-effort synchronization with the remote endpoint.
//!
//! Local writes are queued in the change log by the store. A sync pushes
//! the queue, pulls remote deltas since the watermark and merges them with
//! last-write-wins on `updated_at`.

pub mod engine;
pub mod http;
pub mod status;
pub mod types;

pub use engine::{PullOutcome, PushOutcome, SyncEngine, SyncReport};
pub use http::{login_and_store, HttpTransport, DEFAULT_TIMEOUT};
pub use status::{SyncGuard, SyncLabel, SyncStatus};
pub use types::{
    MergeCount, MergeReport, PullPayload, PushBatch, SyncStore, SyncTransport, TransportError,
    TransportErrorKind,
};
