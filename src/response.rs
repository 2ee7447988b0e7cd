//! Response envelope: `{ code, msg, data }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: u16,
    pub msg: String,
    pub data: Value,
}

impl Envelope {
    pub fn success(data: Value) -> Self {
        Envelope {
            code: 0,
            msg: "success".into(),
            data,
        }
    }

    pub fn error(code: u16, msg: impl Into<String>) -> Self {
        Envelope {
            code,
            msg: msg.into(),
            data: Value::Null,
        }
    }

    /// HTTP status carried by the envelope. Codes that are not client or server errors are sent as 500.
    pub fn http_status(&self) -> StatusCode {
        if self.code == 0 {
            return StatusCode::OK;
        }
        match StatusCode::from_u16(self.code) {
            Ok(s) if s.is_client_error() || s.is_server_error() => s,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.http_status(), Json(self)).into_response()
    }
}
