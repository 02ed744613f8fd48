use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

const JSON_CONTENT_TYPE: &str = "application/json";
const RAW_CONTENT_TYPE: &str = "application/octet-stream";

/// Outcome of a dispatched command
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Success with nothing to return
    Ok,
    /// Stored bytes, sent verbatim
    Value(Vec<u8>),
    /// Key listing, sent as a JSON array of strings
    Keys(Vec<String>),
    /// Key absent or request not routable
    NotFound(String),
    /// Backend or payload failure
    ServerError,
}

#[derive(Serialize)]
struct Message<'a> {
    message: &'a str,
}

impl Reply {
    /// Not found reply for a specific key
    pub fn no_such_key(key: &str) -> Self {
        Reply::NotFound(format!("No such key {}", key))
    }

    /// Not found reply for a request that maps to no command
    pub fn not_found() -> Self {
        Reply::NotFound("not found".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Reply::Ok | Reply::Value(_) | Reply::Keys(_) => StatusCode::OK,
            Reply::NotFound(_) => StatusCode::NOT_FOUND,
            Reply::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Content type of the encoded body, if there is one
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Reply::Ok => None,
            Reply::Value(_) => Some(RAW_CONTENT_TYPE),
            Reply::Keys(_) | Reply::NotFound(_) | Reply::ServerError => Some(JSON_CONTENT_TYPE),
        }
    }

    /// Encode the reply body
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Reply::Ok => Vec::new(),
            Reply::Value(data) => data.clone(),
            Reply::Keys(keys) => encode_json(keys),
            Reply::NotFound(msg) => encode_json(&Message { message: msg }),
            Reply::ServerError => encode_json(&Message {
                message: "server error",
            }),
        }
    }

    fn into_body(self) -> Vec<u8> {
        match self {
            Reply::Value(data) => data,
            other => other.encode(),
        }
    }
}

/// JSON document followed by a newline
fn encode_json<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    // Serializing strings and string slices cannot fail.
    let mut buf = serde_json::to_vec(value).unwrap_or_default();
    buf.push(b'\n');
    buf
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.content_type() {
            Some(content_type) => {
                (status, [(header::CONTENT_TYPE, content_type)], self.into_body()).into_response()
            }
            None => status.into_response(),
        }
    }
}
