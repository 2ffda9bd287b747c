use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::parse_date_param;
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "endpoint": state.client.as_ref().map(|c| c.endpoint().to_string()),
            "activeDate": state.active_date,
            "studentCount": state.store.len(),
            "loading": state.sync.loads_in_flight > 0,
            "saving": state.sync.save_in_flight,
        }),
    )
}

fn session_set_active_date(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let raw = get_required_str(params, "date")?;
    let date = parse_date_param(&raw).map_err(HandlerErr::bad_params)?;
    state.active_date = date;
    let filled = state.store.fill_default(date);
    if filled > 0 {
        log::info!("{} students defaulted to present on {}", filled, date);
    }
    Ok(json!({ "activeDate": date, "filled": filled }))
}

fn handle_session_set_active_date(state: &mut AppState, req: &Request) -> serde_json::Value {
    match session_set_active_date(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "session.setActiveDate" => Some(handle_session_set_active_date(state, req)),
        _ => None,
    }
}
