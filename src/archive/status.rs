use serde::Serialize;

/// Outcome of one workflow invocation.
///
/// Only `Ok` and `ServerError` are produced by the workflow itself; the
/// others belong to whatever layer decides whether to invoke it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Ok,
    BadRequest,
    Forbidden,
    NotFound,
    ServerError,
}

impl StatusCode {
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::ServerError => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Ok => "ok",
            StatusCode::BadRequest => "bad_request",
            StatusCode::Forbidden => "forbidden",
            StatusCode::NotFound => "not_found",
            StatusCode::ServerError => "server_error",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, StatusCode::Ok)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.as_str())
    }
}

/// Per-invocation options. Currently empty.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct WorkflowOptions {}
