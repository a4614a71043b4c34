//! Wire protocol types for the control socket.
//!
//! Each request and response is one JSON-RPC 2.0 object followed by a single
//! newline. Error responses carry a numeric JSON-RPC code plus a stable
//! semantic tag under `error.data.name`; clients branch on the tag, humans
//! read the message.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use croupier_host::GameError;

/// Protocol version string required in every request envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Correlation id echoed back in the response; `Value::Null` when the
/// request never parsed far enough to produce one.
pub type RequestId = Value;

/// Stable machine-readable failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed frame, bad envelope, or unknown endpoint.
    BadRequest,
    /// A required argument is absent.
    SchemaMissingRequired,
    /// An argument has the wrong type.
    SchemaInvalidType,
    /// An array argument holds an element of the wrong type.
    SchemaInvalidArrayItems,
    /// Arguments are well-typed but semantically unusable.
    SchemaInvalidValue,
    /// The endpoint is gated on states the application is not in.
    StateInvalidState,
    /// The game rejected the action from its current situation.
    GameInvalidState,
    /// The action needs an active run.
    GameNotInRun,
    /// A deferred completion exhausted its tick budget.
    CompletionTimeout,
    /// The handler failed unexpectedly.
    Internal,
}

impl ErrorKind {
    /// Semantic tag serialised under `error.data.name`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::SchemaMissingRequired => "SCHEMA_MISSING_REQUIRED",
            Self::SchemaInvalidType => "SCHEMA_INVALID_TYPE",
            Self::SchemaInvalidArrayItems => "SCHEMA_INVALID_ARRAY_ITEMS",
            Self::SchemaInvalidValue => "SCHEMA_INVALID_VALUE",
            Self::StateInvalidState => "STATE_INVALID_STATE",
            Self::GameInvalidState => "GAME_INVALID_STATE",
            Self::GameNotInRun => "GAME_NOT_IN_RUN",
            Self::CompletionTimeout => "COMPLETION_TIMEOUT",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Numeric JSON-RPC error code.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::BadRequest
            | Self::SchemaMissingRequired
            | Self::SchemaInvalidType
            | Self::SchemaInvalidArrayItems
            | Self::SchemaInvalidValue => -32001,
            Self::StateInvalidState | Self::GameInvalidState => -32002,
            Self::GameNotInRun => -32003,
            Self::CompletionTimeout | Self::Internal => -32000,
        }
    }
}

/// Structured failure surfaced to the client as an error response.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    /// Failure category.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl ApiError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a protocol-tier bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    /// Creates a missing-required-field error.
    pub fn missing_required(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaMissingRequired, message)
    }

    /// Creates a wrong-type error.
    pub fn invalid_type(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaInvalidType, message)
    }

    /// Creates a wrong-item-type error for array fields.
    pub fn invalid_array_items(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaInvalidArrayItems, message)
    }

    /// Creates a semantic argument error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaInvalidValue, message)
    }

    /// Creates a precondition-tier state gate error.
    pub fn state_gate(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StateInvalidState, message)
    }

    /// Creates a game-level invalid situation error.
    pub fn game_state(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GameInvalidState, message)
    }

    /// Creates a no-active-run error.
    pub fn not_in_run(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GameNotInRun, message)
    }

    /// Creates a deferred-completion timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CompletionTimeout, message)
    }

    /// Creates an internal handler failure error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl From<GameError> for ApiError {
    fn from(error: GameError) -> Self {
        match error {
            GameError::InvalidValue(message) => Self::invalid_value(message),
            GameError::InvalidState(message) => Self::game_state(message),
            GameError::NotInRun(message) => Self::not_in_run(message),
            GameError::Internal(message) => Self::internal(message),
        }
    }
}

/// Parsed request envelope.
#[derive(Debug)]
pub struct Request {
    /// Endpoint name.
    pub method: String,
    /// Raw arguments value; the validator enforces the object shape.
    pub params: Value,
    /// Correlation id, echoed verbatim.
    pub id: RequestId,
}

impl Request {
    /// Parses a trimmed request line into an envelope.
    ///
    /// The transport guarantees the line starts with `{`. Returns the
    /// correlation id alongside the error where one could be extracted, so
    /// protocol-tier failures still echo the caller's id.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::bad_request`] for invalid JSON, a non-object
    /// body, a missing or non-`2.0` version field, a missing or non-string
    /// `method`, or missing `params`.
    pub fn parse(line: &str) -> Result<Self, (ApiError, RequestId)> {
        let value: Value = serde_json::from_str(line)
            .map_err(|error| (ApiError::bad_request(format!("invalid JSON: {error}")), Value::Null))?;
        let Value::Object(mut body) = value else {
            return Err((
                ApiError::bad_request("request must be a JSON object"),
                Value::Null,
            ));
        };

        let id = body.remove("id").unwrap_or(Value::Null);

        match body.get("jsonrpc").and_then(Value::as_str) {
            Some(JSONRPC_VERSION) => {}
            _ => {
                return Err((
                    ApiError::bad_request("request must carry jsonrpc \"2.0\""),
                    id,
                ));
            }
        }

        let method = match body.remove("method") {
            None => {
                return Err((
                    ApiError::bad_request("request is missing 'method'"),
                    id,
                ));
            }
            Some(Value::String(method)) => method,
            Some(_) => {
                return Err((ApiError::bad_request("'method' must be a string"), id));
            }
        };

        let Some(params) = body.remove("params") else {
            return Err((ApiError::bad_request("request is missing 'params'"), id));
        };

        Ok(Self { method, params, id })
    }
}

#[derive(Serialize)]
struct ResultResponse<'a> {
    jsonrpc: &'static str,
    result: &'a Map<String, Value>,
    id: &'a RequestId,
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    jsonrpc: &'static str,
    error: ErrorBody<'a>,
    id: &'a RequestId,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: i64,
    message: &'a str,
    data: ErrorData,
}

#[derive(Serialize)]
struct ErrorData {
    name: &'static str,
}

/// Serialises a success response as one newline-terminated frame.
#[must_use]
pub fn result_frame(id: &RequestId, result: &Map<String, Value>) -> Vec<u8> {
    let response = ResultResponse {
        jsonrpc: JSONRPC_VERSION,
        result,
        id,
    };
    finish_frame(serde_json::to_vec(&response))
}

/// Serialises an error response as one newline-terminated frame.
#[must_use]
pub fn error_frame(id: &RequestId, error: &ApiError) -> Vec<u8> {
    let response = ErrorResponse {
        jsonrpc: JSONRPC_VERSION,
        error: ErrorBody {
            code: error.kind.code(),
            message: &error.message,
            data: ErrorData {
                name: error.kind.name(),
            },
        },
        id,
    };
    finish_frame(serde_json::to_vec(&response))
}

fn finish_frame(serialised: Result<Vec<u8>, serde_json::Error>) -> Vec<u8> {
    let mut bytes = serialised.unwrap_or_else(|error| {
        tracing::error!(target: "croupierd::protocol", %error, "response serialisation failed");
        br#"{"jsonrpc":"2.0","error":{"code":-32000,"message":"response serialisation failed","data":{"name":"INTERNAL_ERROR"}},"id":null}"#
            .to_vec()
    });
    bytes.push(b'\n');
    bytes
}
