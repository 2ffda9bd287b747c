use crate::jobs::JobRunner;
use crate::notify::Notifier;
use crate::store::AttendanceStore;
use crate::sync::SyncClient;
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// What the main loop should write back for a request.
#[derive(Debug)]
pub enum Reply {
    Now(serde_json::Value),
    /// Answered later, when the background job finishes.
    Pending,
}

/// Bookkeeping for load/save jobs in flight.
#[derive(Debug, Default)]
pub struct SyncState {
    /// Number handed to the most recently started load.
    pub last_load_started: u64,
    /// Number of the newest load whose roster was applied.
    pub last_load_applied: u64,
    pub loads_in_flight: usize,
    pub save_in_flight: bool,
}

impl SyncState {
    pub fn outstanding(&self) -> usize {
        self.loads_in_flight + usize::from(self.save_in_flight)
    }
}

pub struct AppState {
    pub store: AttendanceStore,
    pub active_date: NaiveDate,
    pub client: Option<SyncClient>,
    pub jobs: JobRunner,
    pub notifier: Box<dyn Notifier>,
    pub sync: SyncState,
}

impl AppState {
    pub fn new(
        active_date: NaiveDate,
        client: Option<SyncClient>,
        jobs: JobRunner,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            store: AttendanceStore::default(),
            active_date,
            client,
            jobs,
            notifier,
            sync: SyncState::default(),
        }
    }
}
