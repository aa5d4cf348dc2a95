//! Remote training-calendar sync boundary.
//!
//! The core treats the remote service as an opaque blocking peer with three
//! outcomes per call: success, retryable transient failure, fatal auth
//! failure. Retries are the caller's decision; the core only surfaces
//! per-item results.

pub mod connect;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::workouts::types::Workout;

pub use connect::ConnectClient;

/// Sync-related errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Authentication rejected; abort remaining items
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Rate limiting or timeout; the call may be retried
    #[error("transient failure: {0}")]
    Transient(String),

    /// The service rejected the request
    #[error("api error: {0}")]
    Api(String),

    /// Transport-level failure
    #[error("network error: {0}")]
    Network(String),
}

/// Per-item outcome of a push or schedule call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Ids of items the service accepted
    pub succeeded: Vec<String>,
    /// Ids the service rejected, with the reason
    pub failed: Vec<(String, String)>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Upload status of one sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncRecordStatus {
    Pending,
    Completed,
    Failed,
}

/// Record of one upload attempt, kept for history display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRecord {
    /// Unique record id
    pub id: Uuid,
    /// Name of the workout that was pushed
    pub workout: String,
    pub status: SyncRecordStatus,
    /// Id assigned by the remote service
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub error_message: Option<String>,
}

/// Contract of the remote fitness-tracking service.
///
/// Implementations block for the duration of the round-trip; cancellation
/// and timeout policy live behind this boundary.
pub trait RemoteService {
    /// Fetch all workout definitions stored remotely.
    fn pull(&self) -> Result<Vec<Workout>, SyncError>;

    /// Upload workout definitions. A fatal auth failure aborts the run;
    /// anything else is reported per item.
    fn push(&self, workouts: &[Workout]) -> Result<SyncReport, SyncError>;

    /// Place a remote workout on a calendar date.
    fn schedule(&self, workout_id: &str, date: NaiveDate) -> Result<SyncReport, SyncError>;

    /// Delete a remote workout definition.
    fn delete(&self, workout_id: &str) -> Result<(), SyncError>;

    /// Remove a calendar placement.
    fn unschedule(&self, schedule_id: &str) -> Result<(), SyncError>;
}
