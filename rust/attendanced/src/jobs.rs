//! Background sync jobs and the event stream feeding the main loop.
//!
//! Everything that touches [`crate::ipc::AppState`] happens on the main loop.
//! Jobs only run the HTTP exchange and post the outcome back as an [`Event`].

use crate::model::StudentAttendance;
use crate::sync::{SaveAck, SyncClient, SyncError};
use anyhow::Context;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

pub enum Event {
    Line(String),
    InputClosed,
    JobDone(JobResult),
}

#[derive(Debug)]
pub enum JobOutcome {
    Loaded {
        generation: u64,
        result: Result<Vec<StudentAttendance>, SyncError>,
    },
    Saved(Result<SaveAck, SyncError>),
}

/// A finished job, tagged with the IPC request waiting for it.
#[derive(Debug)]
pub struct JobResult {
    pub request_id: String,
    pub outcome: JobOutcome,
}

#[derive(Clone)]
pub struct JobRunner {
    events: Sender<Event>,
}

impl JobRunner {
    pub fn new(events: Sender<Event>) -> Self {
        Self { events }
    }

    pub fn spawn_load(
        &self,
        client: SyncClient,
        request_id: String,
        generation: u64,
    ) -> anyhow::Result<()> {
        let events = self.events.clone();
        thread::Builder::new()
            .name(format!("sync-load-{}", generation))
            .spawn(move || {
                let result = client.load();
                let done = JobResult {
                    request_id,
                    outcome: JobOutcome::Loaded { generation, result },
                };
                if events.send(Event::JobDone(done)).is_err() {
                    log::warn!("main loop gone before load {} finished", generation);
                }
            })
            .context("failed to start load job")?;
        Ok(())
    }

    pub fn spawn_save(
        &self,
        client: SyncClient,
        request_id: String,
        snapshot: Vec<Arc<StudentAttendance>>,
    ) -> anyhow::Result<()> {
        let events = self.events.clone();
        thread::Builder::new()
            .name("sync-save".to_string())
            .spawn(move || {
                let result = client.save(&snapshot);
                let done = JobResult {
                    request_id,
                    outcome: JobOutcome::Saved(result),
                };
                if events.send(Event::JobDone(done)).is_err() {
                    log::warn!("main loop gone before save finished");
                }
            })
            .context("failed to start save job")?;
        Ok(())
    }
}
