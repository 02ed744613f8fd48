use axum::http::Method;
use percent_encoding::percent_decode_str;

/// Operations a request can map onto
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// GET / - list every key
    List,
    /// GET /key
    Get(String),
    /// PUT /key with the request body as value
    Put(String),
    /// DELETE /key
    Delete(String),
    /// Anything else, including an empty key on a verb that needs one
    Unknown,
}

impl Command {
    /// Parse a request method and path into a Command
    pub fn parse(method: &Method, path: &str) -> Self {
        let Some(key) = Self::key_from_path(path) else {
            return Command::Unknown;
        };

        if key.is_empty() {
            return match *method {
                Method::GET => Command::List,
                _ => Command::Unknown,
            };
        }

        match *method {
            Method::GET => Command::Get(key),
            Method::PUT => Command::Put(key),
            Method::DELETE => Command::Delete(key),
            _ => Command::Unknown,
        }
    }

    /// Everything after the first '/', percent-decoded.
    /// Returns None when the decoded key is not valid UTF-8.
    fn key_from_path(path: &str) -> Option<String> {
        let raw = match path.split_once('/') {
            Some((_, rest)) => rest,
            None => "",
        };
        percent_decode_str(raw)
            .decode_utf8()
            .ok()
            .map(|key| key.into_owned())
    }

    /// Name used in log lines
    pub fn name(&self) -> &'static str {
        match self {
            Command::List => "LIST",
            Command::Get(_) => "GET",
            Command::Put(_) => "PUT",
            Command::Delete(_) => "DELETE",
            Command::Unknown => "UNKNOWN",
        }
    }
}
