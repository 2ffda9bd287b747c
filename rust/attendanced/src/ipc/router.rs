use super::handlers;
use super::types::{AppState, Reply, Request};
use crate::ipc::error::err;
use crate::jobs::JobResult;

pub fn handle_request(state: &mut AppState, req: Request) -> Reply {
    log::debug!("request {} {}", req.id, req.method);
    if let Some(reply) = handlers::sync::try_handle(state, &req) {
        return reply;
    }
    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return Reply::Now(resp);
    }
    if let Some(resp) = handlers::attendance::try_handle(state, &req) {
        return Reply::Now(resp);
    }
    if let Some(resp) = handlers::reports::try_handle(state, &req) {
        return Reply::Now(resp);
    }
    if let Some(resp) = handlers::backup::try_handle(state, &req) {
        return Reply::Now(resp);
    }

    Reply::Now(err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    ))
}

/// Applies a finished background job and returns the response owed to the
/// request that started it.
pub fn handle_job_done(state: &mut AppState, done: JobResult) -> serde_json::Value {
    handlers::sync::complete(state, done)
}
