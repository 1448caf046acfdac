use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use crate::raft::diagnostics::Diagnostics;
use crate::raft::engine::{ConsensusEngine, EngineError};
use crate::raft::rpc::codec::WireCodec;
use crate::raft::rpc::error::RpcError;
use crate::raft::rpc::Operation;

/// Everything a request needs, shared by all in-flight requests. Nothing in here is
/// mutable: synchronization is the engine's business.
pub struct AcceptorState<E: ConsensusEngine> {
    pub(crate) engine: Arc<E>,
    pub(crate) codec: Arc<WireCodec<E::Command, E::Response>>,
    pub(crate) diagnostics: Arc<dyn Diagnostics>,
}

impl<E: ConsensusEngine> Clone for AcceptorState<E> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            codec: self.codec.clone(),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

/// An already encoded JSON reply.
#[derive(Debug)]
pub struct JsonBody(pub Vec<u8>);

impl IntoResponse for JsonBody {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "application/json")], self.0).into_response()
    }
}

fn read_body(body: Result<Bytes, BytesRejection>) -> Result<Bytes, RpcError> {
    body.map_err(|rejection| {
        tracing::debug!("Failed to read request body: {}", rejection.body_text());
        RpcError::TransportRead { status: rejection.status(), reason: rejection.body_text() }
    })
}

pub(crate) fn dispatch_append_entries<E: ConsensusEngine>(state: &AcceptorState<E>, body: &[u8]) -> Result<JsonBody, RpcError> {
    let request = state.codec.decode_append_entries(body)?;
    state.diagnostics.dispatching(Operation::AppendEntries, &state.engine.current_state());

    let response = state.engine.handle_append_entries(request);
    state.codec.encode_response(&response).map(JsonBody).map_err(RpcError::Encode)
}

pub(crate) fn dispatch_request_vote<E: ConsensusEngine>(state: &AcceptorState<E>, body: &[u8]) -> Result<JsonBody, RpcError> {
    let request = state.codec.decode_request_vote(body)?;
    state.diagnostics.dispatching(Operation::RequestVote, &state.engine.current_state());

    let response = state.engine.handle_request_vote(request);
    state.codec.encode_response(&response).map(JsonBody).map_err(RpcError::Encode)
}

/// The failure is recorded here and only here; the returned error carries it to the caller.
/// A panicking engine counts as a failed command.
pub(crate) fn dispatch_command<E: ConsensusEngine>(state: &AcceptorState<E>, body: &[u8]) -> Result<JsonBody, RpcError> {
    let command = state.codec.decode_command(body)?;
    state.diagnostics.dispatching(Operation::Command, &state.engine.current_state());

    let outcome = catch_unwind(AssertUnwindSafe(|| state.engine.accept_command(command)))
        .unwrap_or_else(|panic| Err(EngineError::Internal(panic_message(&*panic))));

    match outcome {
        Ok(response) => state.codec.encode_command_response(&response).map(JsonBody).map_err(RpcError::Encode),
        Err(error) => {
            state.diagnostics.command_failed(&state.engine.current_state(), &error);
            Err(RpcError::EngineFailure(error))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic.downcast_ref::<&str>().copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str));
    match detail {
        Some(detail) => format!("engine panicked while handling a command: {}", detail),
        None => "engine panicked while handling a command".to_string(),
    }
}

pub(crate) async fn append_entries<E: ConsensusEngine>(
    State(state): State<AcceptorState<E>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<JsonBody, RpcError> {
    let body = read_body(body)?;
    dispatch_append_entries(&state, &body)
}

pub(crate) async fn request_vote<E: ConsensusEngine>(
    State(state): State<AcceptorState<E>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<JsonBody, RpcError> {
    let body = read_body(body)?;
    dispatch_request_vote(&state, &body)
}

pub(crate) async fn command<E: ConsensusEngine>(
    State(state): State<AcceptorState<E>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<JsonBody, RpcError> {
    let body = read_body(body)?;
    dispatch_command(&state, &body)
}
