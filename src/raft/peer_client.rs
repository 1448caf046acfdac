use std::sync::Arc;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use thiserror::Error;
use crate::raft::rpc::codec::{TypedPayload, WireCodec};
use crate::raft::rpc::error::CodecError;
use crate::raft::rpc::raft::dto::{AppendEntriesRequest, AppendEntriesResponse, RequestVoteRequest, RequestVoteResponse};
use crate::raft::rpc::Operation;

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("error while calling peer: {0}")]
    Http(#[from] reqwest::Error),
    #[error("peer answered with status {0}: {1}")]
    Status(StatusCode, String),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Sends the three raft calls to other nodes. One attempt per call: retrying is up to the caller.
pub struct RaftPeerClient<C, R> {
    client: reqwest::Client,
    codec: Arc<WireCodec<C, R>>,
    auth_token: Option<String>,
}

impl<C: TypedPayload, R: TypedPayload> RaftPeerClient<C, R> {
    pub fn new(codec: Arc<WireCodec<C, R>>) -> Self {
        let client = reqwest::Client::new();
        Self {
            client,
            codec,
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub async fn append_entries(&self, host: &str, request: &AppendEntriesRequest<C>) -> Result<AppendEntriesResponse, PeerError> {
        let body = self.codec.encode_append_entries(request)?;
        let reply = self.perform_request(host, Operation::AppendEntries, body).await?;
        Ok(self.codec.decode_append_entries_response(&reply)?)
    }

    pub async fn request_vote(&self, host: &str, request: &RequestVoteRequest) -> Result<RequestVoteResponse, PeerError> {
        let body = self.codec.encode_request_vote(request)?;
        let reply = self.perform_request(host, Operation::RequestVote, body).await?;
        Ok(self.codec.decode_request_vote_response(&reply)?)
    }

    pub async fn send_command(&self, host: &str, command: &C) -> Result<R, PeerError> {
        let body = self.codec.encode_command(command)?;
        let reply = self.perform_request(host, Operation::Command, body).await?;
        Ok(self.codec.decode_command_response(&reply)?)
    }

    async fn perform_request(&self, host: &str, operation: Operation, body: Vec<u8>) -> Result<Vec<u8>, PeerError> {
        let endpoint = format!("http://{}{}", host, operation.path());

        let mut request = self.client.post(&endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|error| {
            tracing::error!("Error while calling endpoint {}: {}", endpoint, error);
            error
        })?;
        let status = response.status();
        let reply = response.bytes().await?;

        if !status.is_success() {
            return Err(PeerError::Status(status, String::from_utf8_lossy(&reply).into_owned()));
        }

        Ok(reply.to_vec())
    }
}
