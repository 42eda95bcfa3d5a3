//! HTTP trigger surface.
//!
//! Each sync is invoked with a POST; the time-tracking sync accepts an
//! optional JSON body `{"days_back": N}`. Responses are JSON with a
//! `success` flag: 200 on success, 500 on fatal failure. This is the
//! whole surface — scheduling and retries belong to whatever calls it.


use tiny_http::{Header, Method, Response, Server};

use crate::error::{Error, Result};
use crate::sync::{NoopProgress, SyncOptions};
use crate::AgencyDW;

/// Run the trigger server. Blocks the calling thread; each request hops
/// onto the provided runtime handle for the actual sync.
pub fn serve(dw: &AgencyDW, handle: &tokio::runtime::Handle, port: u16) -> Result<()> {
    let server =
        Server::http(("0.0.0.0", port)).map_err(|e| Error::Other(e.to_string()))?;
    log::info!("Sync trigger listening on port {port}");

    for mut request in server.incoming_requests() {
        let mut body = String::new();
        if let Err(e) = request.as_reader().read_to_string(&mut body) {
            log::warn!("Failed to read request body: {e}");
        }

        let (status, payload) = route(dw, handle, request.method(), request.url(), &body);

        let response = Response::from_string(payload.to_string())
            .with_status_code(status)
            .with_header(
                Header::from_bytes("Content-Type", "application/json")
                    .expect("static header"),
            );
        if let Err(e) = request.respond(response) {
            log::warn!("Failed to send response: {e}");
        }
    }

    Ok(())
}

fn route(
    dw: &AgencyDW,
    handle: &tokio::runtime::Handle,
    method: &Method,
    url: &str,
    body: &str,
) -> (u16, serde_json::Value) {
    match (method, url) {
        (Method::Post, "/sync/clockify") => {
            let options = SyncOptions {
                days_back: days_back_from_body(body),
            };
            let result = handle.block_on(dw.sync_clockify(&options, &NoopProgress));
            respond(result.map(|r| serde_json::to_value(r).unwrap_or_default()))
        }
        (Method::Post, "/sync/monday") => {
            let result = handle.block_on(dw.sync_monday(&NoopProgress));
            respond(result.map(|r| serde_json::to_value(r).unwrap_or_default()))
        }
        _ => (404, serde_json::json!({"error": "not found"})),
    }
}

/// Optional `days_back` override. No body, invalid JSON, or a
/// non-numeric value all fall back to the default.
fn days_back_from_body(body: &str) -> i64 {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("days_back")?.as_i64())
        .unwrap_or(crate::sync::DEFAULT_DAYS_BACK)
}

fn respond(result: Result<serde_json::Value>) -> (u16, serde_json::Value) {
    match result {
        Ok(mut payload) => {
            if let Some(object) = payload.as_object_mut() {
                object.insert("success".to_string(), serde_json::Value::Bool(true));
            }
            (200, payload)
        }
        Err(e) => {
            log::error!("Sync failed: {e}");
            (
                500,
                serde_json::json!({"success": false, "error": e.to_string()}),
            )
        }
    }
}
