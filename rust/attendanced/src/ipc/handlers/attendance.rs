use crate::ipc::error::ok;
use crate::ipc::helpers::{get_classroom_filter, get_date_or, get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{AttendanceStatus, DisplayStatus};
use serde_json::json;

fn handle_classrooms_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "classrooms": state.store.classrooms() }))
}

fn attendance_day(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = get_date_or(params, "date", state.active_date)?;
    let classroom = get_classroom_filter(params, "classroom")?;

    let rows: Vec<serde_json::Value> = state
        .store
        .roster(classroom)
        .into_iter()
        .map(|s| {
            let status = DisplayStatus::from(s.record_on(date).map(|r| &r.status));
            json!({
                "id": s.student.id,
                "studentNumber": s.student.student_number,
                "name": s.student.name,
                "grade": s.student.grade,
                "classroom": s.student.classroom,
                "status": status.code(),
                "statusLabel": status.label(),
            })
        })
        .collect();

    Ok(json!({
        "date": date,
        "classroom": classroom,
        "rows": rows
    }))
}

fn attendance_set(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let raw_status = get_required_str(params, "status")?;
    let status = AttendanceStatus::parse_input(&raw_status).ok_or_else(|| {
        HandlerErr::bad_params(format!(
            "status must be one of PRESENT, SICK_LEAVE, ABSENT, ACTIVITY (got {:?})",
            raw_status
        ))
    })?;
    let date = get_date_or(params, "date", state.active_date)?;

    let outcome = state.store.upsert(&student_id, date, status.clone());
    log::debug!(
        "attendance.set {} {} {} -> {}",
        student_id,
        date,
        status.code(),
        outcome.as_str()
    );
    let now = state.store.status_on(&student_id, date);
    Ok(json!({
        "studentId": student_id,
        "date": date,
        "status": now.as_ref().map(|s| s.code()),
        "outcome": outcome.as_str(),
    }))
}

fn handle_attendance_day(state: &mut AppState, req: &Request) -> serde_json::Value {
    match attendance_day(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_attendance_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    match attendance_set(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classrooms.list" => Some(handle_classrooms_list(state, req)),
        "attendance.day" => Some(handle_attendance_day(state, req)),
        "attendance.set" => Some(handle_attendance_set(state, req)),
        _ => None,
    }
}
