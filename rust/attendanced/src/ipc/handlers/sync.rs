use crate::ipc::error::{err, ok};
use crate::ipc::helpers::HandlerErr;
use crate::ipc::types::{AppState, Reply, Request};
use crate::jobs::{JobOutcome, JobResult};
use crate::model::StudentAttendance;
use crate::notify::{Notice, NoticeLevel};
use crate::sync::{SaveAck, SyncError};
use serde_json::json;

const SAVED_FALLBACK_MESSAGE: &str = "Attendance saved to the sheet.";

fn handle_sync_load(state: &mut AppState, req: &Request) -> Reply {
    let Some(client) = state.client.clone() else {
        return Reply::Now(err(&req.id, "no_backend", "no sheet endpoint configured", None));
    };
    if state.sync.loads_in_flight > 0 {
        return Reply::Now(err(
            &req.id,
            "load_in_flight",
            "a load is already in progress",
            None,
        ));
    }
    let generation = state.sync.last_load_started + 1;
    if let Err(e) = state.jobs.spawn_load(client, req.id.clone(), generation) {
        log::error!("{:#}", e);
        return Reply::Now(err(&req.id, "job_failed", format!("{:#}", e), None));
    }
    state.sync.last_load_started = generation;
    state.sync.loads_in_flight += 1;
    log::info!("load {} started", generation);
    Reply::Pending
}

fn handle_sync_save(state: &mut AppState, req: &Request) -> Reply {
    let Some(client) = state.client.clone() else {
        return Reply::Now(err(&req.id, "no_backend", "no sheet endpoint configured", None));
    };
    if state.sync.save_in_flight {
        return Reply::Now(err(
            &req.id,
            "save_in_flight",
            "a save is already in progress",
            None,
        ));
    }
    // Saving an empty roster would wipe the sheet.
    if state.store.is_empty() {
        return Reply::Now(err(&req.id, "empty_roster", "nothing loaded to save", None));
    }

    let snapshot = state.store.snapshot();
    let count = snapshot.len();
    if let Err(e) = state.jobs.spawn_save(client, req.id.clone(), snapshot) {
        log::error!("{:#}", e);
        return Reply::Now(err(&req.id, "job_failed", format!("{:#}", e), None));
    }
    state.sync.save_in_flight = true;
    state.notifier.notify(Notice::new(
        NoticeLevel::Info,
        "Saving",
        format!("Sending {} students to the sheet.", count),
    ));
    Reply::Pending
}

fn complete_load(
    state: &mut AppState,
    request_id: &str,
    generation: u64,
    result: Result<Vec<StudentAttendance>, SyncError>,
) -> serde_json::Value {
    state.sync.loads_in_flight = state.sync.loads_in_flight.saturating_sub(1);
    match result {
        Ok(_) if generation <= state.sync.last_load_applied => {
            log::info!(
                "discarding load {}, load {} already applied",
                generation,
                state.sync.last_load_applied
            );
            ok(
                request_id,
                json!({ "applied": false, "stale": true, "generation": generation }),
            )
        }
        Ok(students) => {
            state.sync.last_load_applied = generation;
            let collapsed = state.store.replace_all(students);
            let filled = state.store.fill_default(state.active_date);
            log::info!(
                "load {} applied: {} students, {} defaulted to present on {}",
                generation,
                state.store.len(),
                filled,
                state.active_date
            );
            ok(
                request_id,
                json!({
                    "applied": true,
                    "stale": false,
                    "generation": generation,
                    "studentCount": state.store.len(),
                    "filled": filled,
                    "collapsed": collapsed,
                }),
            )
        }
        Err(e) if generation <= state.sync.last_load_applied => {
            log::info!("load {} failed after newer data was applied: {}", generation, e);
            HandlerErr::from(e).response(request_id)
        }
        Err(e) => {
            log::warn!("load {} failed: {}", generation, e);
            state.notifier.notify(Notice::new(
                NoticeLevel::Error,
                "Could not load attendance data",
                e.message(),
            ));
            HandlerErr::from(e).response(request_id)
        }
    }
}

fn complete_save(
    state: &mut AppState,
    request_id: &str,
    result: Result<SaveAck, SyncError>,
) -> serde_json::Value {
    state.sync.save_in_flight = false;
    match result {
        Ok(ack) => {
            let message = ack
                .message
                .clone()
                .unwrap_or_else(|| SAVED_FALLBACK_MESSAGE.to_string());
            state
                .notifier
                .notify(Notice::new(NoticeLevel::Success, "Saved", message));
            ok(
                request_id,
                json!({ "status": ack.status, "message": ack.message }),
            )
        }
        Err(e) => {
            log::warn!("save failed: {}", e);
            state.notifier.notify(Notice::new(
                NoticeLevel::Error,
                "Save failed",
                e.message(),
            ));
            HandlerErr::from(e).response(request_id)
        }
    }
}

pub fn complete(state: &mut AppState, done: JobResult) -> serde_json::Value {
    match done.outcome {
        JobOutcome::Loaded { generation, result } => {
            complete_load(state, &done.request_id, generation, result)
        }
        JobOutcome::Saved(result) => complete_save(state, &done.request_id, result),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Reply> {
    match req.method.as_str() {
        "sync.load" => Some(handle_sync_load(state, req)),
        "sync.save" => Some(handle_sync_save(state, req)),
        _ => None,
    }
}
