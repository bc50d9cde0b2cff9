//! Blocking HTTP client for the review system's Conduit-style RPC
//!
//! Every action is one synchronous POST of a url-encoded body with two
//! fields: `params` (a single JSON document carrying the call arguments and
//! the auth token) and `output=json`. Responses are JSON envelopes of the
//! form `{error_code, error_info, result}`.

use crier_core::{ApiError, InlineComment, LintEntry, ReviewApi, UnitEntry};
use serde_json::{json, Value};
use std::time::Duration;

const TIMEOUT_SECS: u64 = 30;

/// Conduit-compatible transport for [`ReviewApi`].
pub struct ConduitClient {
    base_url: String,
    token: String,
    client: reqwest::blocking::Client,
}

impl ConduitClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(concat!("crier/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        })
    }

    fn call(&self, method: &str, params: Value) -> Result<Value, ApiError> {
        let params = with_token(params, &self.token);
        let encoded =
            serde_json::to_string(&params).map_err(|e| ApiError::Malformed(e.to_string()))?;

        let resp = self
            .client
            .post(format!("{}/api/{}", self.base_url, method))
            .form(&[("params", encoded.as_str()), ("output", "json")])
            .send()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ApiError::Http(resp.status().as_u16()));
        }

        let body = resp.text().map_err(|e| ApiError::Network(e.to_string()))?;
        decode_response(&body)
    }
}

/// Embed the auth token into a params document, the way the review system
/// expects it.
pub fn with_token(mut params: Value, token: &str) -> Value {
    if let Some(map) = params.as_object_mut() {
        map.insert("__conduit__".to_string(), json!({ "token": token }));
    }
    params
}

/// Decode a `{error_code, error_info, result}` envelope into its result.
pub fn decode_response(body: &str) -> Result<Value, ApiError> {
    let envelope: Value =
        serde_json::from_str(body).map_err(|e| ApiError::Malformed(e.to_string()))?;

    match envelope.get("error_code") {
        None => Err(ApiError::Malformed(
            "response missing error_code".to_string(),
        )),
        Some(Value::Null) => Ok(envelope.get("result").cloned().unwrap_or(Value::Null)),
        Some(code) => {
            let info = envelope
                .get("error_info")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let code = code
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| code.to_string());
            Err(ApiError::Remote { code, info })
        }
    }
}

impl ReviewApi for ConduitClient {
    fn create_inline(&self, diff_id: u64, inline: &InlineComment) -> Result<String, ApiError> {
        let params = json!({
            "diffID": diff_id,
            "filePath": inline.file_path,
            "lineNumber": inline.line_number,
            "lineLength": inline.line_length,
            "content": inline.content,
            "isNewFile": if inline.is_new_file { 1 } else { 0 },
        });

        let result = self.call("differential.createinline", params)?;
        Ok(result
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    fn create_comment(
        &self,
        revision_id: u64,
        message: &str,
        attach_inlines: bool,
    ) -> Result<(), ApiError> {
        let params = json!({
            "revision_id": revision_id,
            "message": message,
            "attach_inlines": if attach_inlines { 1 } else { 0 },
        });

        self.call("differential.createcomment", params)?;
        Ok(())
    }

    fn send_build_result(
        &self,
        build_target: &str,
        lint: &[LintEntry],
        unit: &[UnitEntry],
    ) -> Result<(), ApiError> {
        let params = json!({
            "buildTargetPHID": build_target,
            "lint": lint,
            "unit": unit,
            "type": "work",
        });

        self.call("harbormaster.sendmessage", params)?;
        Ok(())
    }
}
