use crate::backup;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn backup_export(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let out_path = PathBuf::from(get_required_str(params, "path")?);
    let summary = backup::export_snapshot(&state.store.snapshot(), &out_path).map_err(|e| {
        HandlerErr::new("backup_failed", format!("{:#}", e))
    })?;
    Ok(json!({
        "path": out_path.to_string_lossy(),
        "bundleId": summary.bundle_id,
        "studentCount": summary.student_count,
        "sha256": summary.sha256,
    }))
}

fn backup_import(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let in_path = PathBuf::from(get_required_str(params, "path")?);
    let imported = backup::import_snapshot(&in_path)
        .map_err(|e| HandlerErr::new("backup_failed", format!("{:#}", e)))?;
    let collapsed = state.store.replace_all(imported.students);
    // A load still running would overwrite the imported roster when it lands.
    state.sync.last_load_applied = state.sync.last_load_started;
    let filled = state.store.fill_default(state.active_date);
    Ok(json!({
        "bundleId": imported.bundle_id,
        "studentCount": state.store.len(),
        "filled": filled,
        "collapsed": collapsed,
    }))
}

fn handle_backup_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    match backup_export(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_backup_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    match backup_import(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.export" => Some(handle_backup_export(state, req)),
        "backup.import" => Some(handle_backup_import(state, req)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::handlers::sync;
    use crate::jobs::{JobOutcome, JobResult, JobRunner};
    use crate::model::{AttendanceRecord, AttendanceStatus, Student, StudentAttendance};
    use crate::notify::testing::RecordingNotifier;
    use chrono::NaiveDate;
    use std::sync::mpsc::channel;
    use std::sync::Arc;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).expect("date")
    }

    fn bundled_student() -> StudentAttendance {
        StudentAttendance {
            student: Student {
                id: "30001".to_string(),
                student_number: 1,
                name: "C".to_string(),
                grade: "ม.5".to_string(),
                classroom: 3,
            },
            attendance: vec![AttendanceRecord {
                date: d(4),
                status: AttendanceStatus::Absent,
            }],
        }
    }

    #[test]
    fn import_wins_over_load_still_running() {
        let dir = std::env::temp_dir().join(format!("attendanced-import-{}", uuid::Uuid::new_v4()));
        let path = dir.join("snap.zip");
        backup::export_snapshot(&[Arc::new(bundled_student())], &path).expect("export");

        let (tx, _rx) = channel();
        let mut state = AppState::new(
            d(4),
            None,
            JobRunner::new(tx),
            Box::new(RecordingNotifier::default()),
        );
        state.sync.last_load_started = 1;
        state.sync.loads_in_flight = 1;

        let result = backup_import(&mut state, &json!({ "path": path.to_string_lossy() }))
            .unwrap_or_else(|e| panic!("import failed: {}", e.message));
        assert_eq!(result["studentCount"], json!(1));
        assert_eq!(result["filled"], json!(0));

        let late = sync::complete(
            &mut state,
            JobResult {
                request_id: "load".to_string(),
                outcome: JobOutcome::Loaded {
                    generation: 1,
                    result: Ok(Vec::new()),
                },
            },
        );
        assert_eq!(late["result"]["stale"], json!(true));
        assert_eq!(state.store.len(), 1);
        assert_eq!(state.sync.outstanding(), 0);
    }
}
