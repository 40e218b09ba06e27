//! Drives player sessions from outside a browser.
//!
//! `replay` runs a recorded script of API calls against one session; `rpc`
//! serves line-delimited JSON requests so a host process can play the role
//! of the content frame.

use crate::core::api::ApiFunction;
use crate::core::error;
use crate::core::time;
use crate::plugins::player::{PlayerSession, SessionKey, SessionRegistry, SessionStats};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// One recorded call, e.g. `{"call": "LMSSetValue", "args": ["cmi.core.lesson_status", "passed"]}`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ScriptedCall {
    pub call: String,
    #[serde(default)]
    pub args: Vec<String>,
}

pub fn parse_script(raw: &str) -> Result<Vec<ScriptedCall>, error::ScormError> {
    serde_json::from_str(raw)
        .map_err(|e| error::ScormError::ValidationError(format!("invalid replay script: {}", e)))
}

fn run_call(session: &mut PlayerSession, call: &str, args: &[String]) -> (String, String) {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let result = session.call(call, &args);
    let last_error = session.runtime().last_error().as_str().to_string();
    (result, last_error)
}

/// Runs `calls` in order and returns one result envelope per call.
pub fn replay(session: &mut PlayerSession, calls: &[ScriptedCall]) -> Vec<JsonValue> {
    calls
        .iter()
        .map(|scripted| {
            let (result, last_error) = run_call(session, &scripted.call, &scripted.args);
            time::call_envelope(
                &scripted.call,
                &result,
                &last_error,
                serde_json::json!({ "args": scripted.args }),
            )
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcRequest {
    /// Request ID for correlation
    #[serde(default = "default_request_id")]
    pub id: String,
    pub enrollment_id: String,
    pub sco_id: String,
    /// Wire name of the API function
    pub call: String,
    #[serde(default)]
    pub args: Vec<String>,
}

pub fn default_request_id() -> String {
    time::new_event_id()
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RpcResponse {
    pub id: String,
    /// False only when the request could not reach a session at all.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Present on the response that closed the session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionStats>,
}

impl RpcResponse {
    fn failure(id: String, message: String) -> Self {
        Self {
            id,
            success: false,
            result: None,
            last_error: None,
            error: Some(message),
            session: None,
        }
    }
}

/// Handles one request line. A successful `LMSFinish` closes the session, so
/// the next request for the same key resumes from the stored snapshot.
pub async fn handle_rpc_line(registry: &mut SessionRegistry, line: &str) -> RpcResponse {
    let request: RpcRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => return RpcResponse::failure(default_request_id(), format!("invalid request: {}", e)),
    };

    let key = SessionKey::new(request.enrollment_id, request.sco_id);
    let (result, last_error) = match registry.open_or_get(key.clone()) {
        Ok(session) => run_call(session, &request.call, &request.args),
        Err(e) => return RpcResponse::failure(request.id, e.to_string()),
    };
    debug!(id = %request.id, session = %key, call = %request.call, "rpc call");

    let finished = ApiFunction::from_name(&request.call) == Some(ApiFunction::LMSFinish)
        && last_error == "0";
    let session = if finished {
        match registry.close(&key).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(session = %key, "close after finish failed: {}", e);
                None
            }
        }
    } else {
        None
    };

    RpcResponse {
        id: request.id,
        success: true,
        result: Some(result),
        last_error: Some(last_error),
        error: None,
        session,
    }
}

/// Serves requests until `reader` hits EOF, then closes every open session.
/// Returns the number of requests handled.
pub async fn serve_rpc<R, W>(
    registry: &mut SessionRegistry,
    reader: R,
    mut writer: W,
) -> Result<usize, error::ScormError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut handled = 0;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_rpc_line(registry, &line).await;
        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        writer.write_all(out.as_bytes()).await?;
        writer.flush().await?;
        handled += 1;
    }

    for stats in registry.close_all().await {
        debug!(
            enrollment = %stats.enrollment_id,
            sco = %stats.sco_id,
            "session closed at end of input"
        );
    }
    Ok(handled)
}
