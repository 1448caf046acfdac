use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::raft::engine::EngineError;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("expected a JSON object carrying a `$type` discriminator")]
    NotAnObject,
    #[error("payload has no string `$type` discriminator")]
    MissingTypeTag,
    #[error("type `{0}` is not registered with the codec")]
    UnknownType(String),
}

/// Failure of one inbound RPC, named after the request lifecycle state it left.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("could not read request body: {reason}")]
    TransportRead { status: StatusCode, reason: String },
    #[error("caller is not authorized")]
    Unauthorized,
    #[error(transparent)]
    MalformedMessage(CodecError),
    #[error("unknown command type `{0}`")]
    UnknownCommandType(String),
    #[error("engine failed to process command: {0}")]
    EngineFailure(#[source] EngineError),
    #[error("could not encode response: {0}")]
    Encode(#[source] CodecError),
}

impl From<CodecError> for RpcError {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::UnknownType(tag) => RpcError::UnknownCommandType(tag),
            other => RpcError::MalformedMessage(other),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = match &self {
            RpcError::TransportRead { status, .. } => return (*status).into_response(),
            RpcError::Unauthorized => return StatusCode::UNAUTHORIZED.into_response(),
            RpcError::MalformedMessage(_) | RpcError::UnknownCommandType(_) => StatusCode::BAD_REQUEST,
            RpcError::EngineFailure(_) | RpcError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
