use crate::aggregate::{self, DeficiencyThreshold};
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_classroom_filter, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_dates_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "dates": state.store.reference_dates() }))
}

fn reports_attendance(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let classroom = get_classroom_filter(params, "classroom")?;
    let dates = state.store.reference_dates();
    let rows = aggregate::attendance_report(state.store.students(), &dates, classroom);
    Ok(json!({
        "classroom": classroom,
        "referenceDates": dates,
        "rows": rows,
    }))
}

fn parse_threshold(params: &serde_json::Value) -> Result<DeficiencyThreshold, HandlerErr> {
    match params.get("threshold") {
        None | Some(serde_json::Value::Null) => Ok(DeficiencyThreshold::default()),
        Some(v) => v
            .as_i64()
            .and_then(DeficiencyThreshold::from_percent)
            .ok_or_else(|| HandlerErr::bad_params("threshold must be 80 or 60")),
    }
}

fn reports_deficiency(
    state: &AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let threshold = parse_threshold(params)?;
    let dates = state.store.reference_dates();
    let report = aggregate::deficiency_report(state.store.students(), &dates, threshold);
    serde_json::to_value(report)
        .map_err(|e| HandlerErr::new("internal", format!("failed to encode report: {}", e)))
}

fn handle_reports_attendance(state: &mut AppState, req: &Request) -> serde_json::Value {
    match reports_attendance(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_reports_deficiency(state: &mut AppState, req: &Request) -> serde_json::Value {
    match reports_deficiency(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dates.list" => Some(handle_dates_list(state, req)),
        "reports.attendance" => Some(handle_reports_attendance(state, req)),
        "reports.deficiency" => Some(handle_reports_deficiency(state, req)),
        _ => None,
    }
}
