use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use raft_transport::raft::acceptor::authorization::BearerTokenAuthorizer;
use raft_transport::raft::acceptor::RaftRequestAcceptor;
use raft_transport::raft::diagnostics::Diagnostics;
use raft_transport::raft::engine::in_memory::InMemoryEngine;
use raft_transport::raft::engine::{ConsensusEngine, EngineError};
use raft_transport::raft::model::log::LogEntry;
use raft_transport::raft::model::state::{NodeRole, NodeSnapshot, RoleCell};
use raft_transport::raft::peer_client::{PeerError, RaftPeerClient};
use raft_transport::raft::rpc::application::dto::{kv_codec, GetValue, KvCommand, KvResponse, SetValue, ValueFound, ValueSet};
use raft_transport::raft::rpc::error::ErrorBody;
use raft_transport::raft::rpc::raft::dto::{AppendEntriesRequest, AppendEntriesResponse, RequestVoteRequest, RequestVoteResponse};
use raft_transport::raft::rpc::Operation;
use reqwest::StatusCode;

#[derive(Default)]
struct RecordingDiagnostics {
    dispatched: Mutex<Vec<(Operation, NodeRole)>>,
    failures: Mutex<Vec<(String, String)>>,
}

impl RecordingDiagnostics {
    fn dispatched(&self) -> Vec<(Operation, NodeRole)> {
        self.dispatched.lock().unwrap().clone()
    }

    fn failures(&self) -> Vec<(String, String)> {
        self.failures.lock().unwrap().clone()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn dispatching(&self, operation: Operation, node: &NodeSnapshot) {
        self.dispatched.lock().unwrap().push((operation, node.role));
    }

    fn command_failed(&self, node: &NodeSnapshot, error: &EngineError) {
        self.failures.lock().unwrap().push((node.node_id.clone(), error.to_string()));
    }
}

fn spawn_acceptor<E: ConsensusEngine>(acceptor: RaftRequestAcceptor<E>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(acceptor.serve(listener));
    addr.to_string()
}

fn spawn_node(engine: Arc<InMemoryEngine>) -> (String, Arc<RecordingDiagnostics>) {
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let acceptor = RaftRequestAcceptor::new(engine, kv_codec()).with_diagnostics(diagnostics.clone());
    (spawn_acceptor(acceptor), diagnostics)
}

fn peer_client() -> RaftPeerClient<KvCommand, KvResponse> {
    RaftPeerClient::new(Arc::new(kv_codec()))
}

async fn post_raw(host: &str, operation: Operation, body: &'static str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{}{}", host, operation.path()))
        .body(body)
        .send()
        .await
        .unwrap()
}

fn set(key: &str, value: &str) -> KvCommand {
    KvCommand::from(SetValue { key: key.to_string(), value: value.to_string() })
}

#[tokio::test]
async fn request_vote_is_granted_end_to_end() {
    let (host, diagnostics) = spawn_node(Arc::new(InMemoryEngine::new("A")));

    let response = peer_client().request_vote(&host, &RequestVoteRequest {
        term: 5,
        candidate_id: "B".to_string(),
        last_log_index: 10,
        last_log_term: 4,
    }).await.unwrap();

    assert_eq!(response, RequestVoteResponse { term: 5, vote_granted: true });
    assert_eq!(diagnostics.dispatched(), vec![(Operation::RequestVote, NodeRole::Follower)]);
}

#[tokio::test]
async fn request_vote_wire_format_is_camel_case() {
    let (host, _) = spawn_node(Arc::new(InMemoryEngine::new("A")));

    let response = post_raw(&host, Operation::RequestVote, r#"{"term":5,"candidateId":"B","lastLogIndex":10,"lastLogTerm":4}"#).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), r#"{"term":5,"voteGranted":true}"#);
}

#[tokio::test]
async fn unregistered_command_is_a_client_error_without_dispatch() {
    let engine = Arc::new(InMemoryEngine::single_node("A"));
    let (host, diagnostics) = spawn_node(engine.clone());

    let response = post_raw(&host, Operation::Command, r#"{"$type":"Unregistered","key":"x","value":"1"}"#).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = response.json().await.unwrap();
    assert!(body.error.contains("Unregistered"));
    assert!(diagnostics.dispatched().is_empty());
    assert_eq!(engine.commit_index(), -1);
}

#[tokio::test]
async fn malformed_payloads_are_rejected_and_the_node_keeps_serving() {
    let (host, diagnostics) = spawn_node(Arc::new(InMemoryEngine::new("A")));

    let truncated = post_raw(&host, Operation::AppendEntries, r#"{"term":1,"leaderId":"#).await;
    assert_eq!(truncated.status(), StatusCode::BAD_REQUEST);

    let wrong_shape = post_raw(&host, Operation::RequestVote, r#"{"term":"five"}"#).await;
    assert_eq!(wrong_shape.status(), StatusCode::BAD_REQUEST);

    let untagged = post_raw(&host, Operation::Command, r#"{"key":"x"}"#).await;
    assert_eq!(untagged.status(), StatusCode::BAD_REQUEST);

    assert!(diagnostics.dispatched().is_empty());

    let heartbeat = post_raw(&host, Operation::AppendEntries,
        r#"{"term":1,"leaderId":"B","previousLogIndex":-1,"previousLogTerm":0,"entries":[],"leaderCommitIndex":-1}"#).await;
    assert_eq!(heartbeat.status(), StatusCode::OK);
    assert_eq!(diagnostics.dispatched(), vec![(Operation::AppendEntries, NodeRole::Follower)]);
}

#[tokio::test]
async fn commands_keep_their_variant_across_the_wire() {
    let (host, diagnostics) = spawn_node(Arc::new(InMemoryEngine::single_node("A")));
    let client = peer_client();

    let set_response = client.send_command(&host, &set("x", "1")).await.unwrap();
    assert_eq!(set_response, KvResponse::from(ValueSet { key: "x".to_string(), value: "1".to_string() }));

    let get_response = client.send_command(&host, &KvCommand::from(GetValue { key: "x".to_string() })).await.unwrap();
    assert_eq!(get_response, KvResponse::from(ValueFound { key: "x".to_string(), value: Some("1".to_string()) }));

    assert_eq!(diagnostics.dispatched(), vec![
        (Operation::Command, NodeRole::Leader),
        (Operation::Command, NodeRole::Leader),
    ]);
}

#[tokio::test]
async fn command_response_body_carries_the_discriminator() {
    let (host, _) = spawn_node(Arc::new(InMemoryEngine::single_node("A")));

    let response = post_raw(&host, Operation::Command, r#"{"$type":"SetValue","key":"x","value":"1"}"#).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"$type": "ValueSet", "key": "x", "value": "1"}));
}

#[tokio::test]
async fn engine_failure_is_logged_once_and_surfaces_as_server_error() {
    let (host, diagnostics) = spawn_node(Arc::new(InMemoryEngine::new("A")));
    let client = peer_client();

    let error = client.send_command(&host, &set("x", "1")).await.unwrap_err();

    match error {
        PeerError::Status(status, body) => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(body.contains("cannot accept writes"));
        }
        other => panic!("expected an error status, got {other:?}"),
    }
    let failures = diagnostics.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "A");

    // the node is still up after the failed command
    let read = client.send_command(&host, &KvCommand::from(GetValue { key: "x".to_string() })).await.unwrap();
    assert_eq!(read, KvResponse::from(ValueFound { key: "x".to_string(), value: None }));
    assert_eq!(diagnostics.failures().len(), 1);
}

/// Leader whose writes always panic inside the engine.
struct PanickingEngine;

impl ConsensusEngine for PanickingEngine {
    type Command = KvCommand;
    type Response = KvResponse;

    fn handle_append_entries(&self, request: AppendEntriesRequest<KvCommand>) -> AppendEntriesResponse {
        AppendEntriesResponse { term: request.term, success: false }
    }

    fn handle_request_vote(&self, request: RequestVoteRequest) -> RequestVoteResponse {
        RequestVoteResponse { term: request.term, vote_granted: true }
    }

    fn accept_command(&self, _command: KvCommand) -> Result<KvResponse, EngineError> {
        panic!("disk on fire")
    }

    fn current_state(&self) -> NodeSnapshot {
        NodeSnapshot { node_id: "P".to_string(), role: NodeRole::Leader }
    }
}

#[tokio::test]
async fn engine_panic_answers_server_error_and_is_logged_once() {
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let acceptor = RaftRequestAcceptor::new(Arc::new(PanickingEngine), kv_codec()).with_diagnostics(diagnostics.clone());
    let host = spawn_acceptor(acceptor);
    let client = peer_client();

    let error = client.send_command(&host, &set("x", "1")).await.unwrap_err();

    match error {
        PeerError::Status(status, body) => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(body.contains("disk on fire"));
        }
        other => panic!("expected an error status, got {other:?}"),
    }
    let failures = diagnostics.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "P");

    let vote = client.request_vote(&host, &RequestVoteRequest {
        term: 1,
        candidate_id: "B".to_string(),
        last_log_index: -1,
        last_log_term: 0,
    }).await.unwrap();
    assert!(vote.vote_granted);
}

#[tokio::test]
async fn append_entries_reach_the_engine_with_decoded_commands() {
    let engine = Arc::new(InMemoryEngine::new("A"));
    let (host, _) = spawn_node(engine.clone());

    let response = peer_client().append_entries(&host, &AppendEntriesRequest {
        term: 2,
        leader_id: "B".to_string(),
        previous_log_index: -1,
        previous_log_term: 0,
        entries: vec![LogEntry { term: 2, index: 0, command: set("x", "1") }],
        leader_commit_index: 0,
    }).await.unwrap();

    assert_eq!(response, AppendEntriesResponse { term: 2, success: true });
    assert_eq!(engine.value_of("x"), Some("1".to_string()));
}

#[tokio::test]
async fn unauthorized_callers_are_turned_away_before_decoding() {
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let acceptor = RaftRequestAcceptor::new(Arc::new(InMemoryEngine::new("A")), kv_codec())
        .with_diagnostics(diagnostics.clone())
        .with_authorizer(Arc::new(BearerTokenAuthorizer::new("secret")));
    let host = spawn_acceptor(acceptor);
    let vote = RequestVoteRequest { term: 1, candidate_id: "B".to_string(), last_log_index: -1, last_log_term: 0 };

    let anonymous = peer_client().request_vote(&host, &vote).await.unwrap_err();
    assert!(matches!(anonymous, PeerError::Status(status, _) if status == StatusCode::UNAUTHORIZED));

    let garbage = post_raw(&host, Operation::Command, "not json").await;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
    assert!(diagnostics.dispatched().is_empty());

    let authorized = peer_client().with_auth_token("secret").request_vote(&host, &vote).await.unwrap();
    assert!(authorized.vote_granted);
}

#[tokio::test]
async fn oversized_bodies_fail_while_receiving() {
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let acceptor = RaftRequestAcceptor::new(Arc::new(InMemoryEngine::new("A")), kv_codec())
        .with_diagnostics(diagnostics.clone())
        .with_max_body_bytes(64);
    let host = spawn_acceptor(acceptor);

    let response = reqwest::Client::new()
        .post(format!("http://{}{}", host, Operation::Command.path()))
        .body(format!(r#"{{"$type":"SetValue","key":"x","value":"{}"}}"#, "v".repeat(1024)))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(diagnostics.dispatched().is_empty());
}

/// Append entries parks inside the engine until a vote request shows up.
#[derive(Default)]
struct RendezvousEngine {
    role: RoleCell,
    append_entered: AtomicBool,
    vote_seen: Mutex<bool>,
    vote_arrived: Condvar,
}

impl ConsensusEngine for RendezvousEngine {
    type Command = KvCommand;
    type Response = KvResponse;

    fn handle_append_entries(&self, request: AppendEntriesRequest<KvCommand>) -> AppendEntriesResponse {
        self.append_entered.store(true, Ordering::SeqCst);
        let seen = self.vote_seen.lock().unwrap();
        let (seen, _) = self.vote_arrived
            .wait_timeout_while(seen, Duration::from_secs(5), |seen| !*seen)
            .unwrap();
        AppendEntriesResponse { term: request.term, success: *seen }
    }

    fn handle_request_vote(&self, request: RequestVoteRequest) -> RequestVoteResponse {
        *self.vote_seen.lock().unwrap() = true;
        self.vote_arrived.notify_all();
        RequestVoteResponse { term: request.term, vote_granted: true }
    }

    fn accept_command(&self, _command: KvCommand) -> Result<KvResponse, EngineError> {
        Err(EngineError::Internal("not supported".to_string()))
    }

    fn current_state(&self) -> NodeSnapshot {
        NodeSnapshot { node_id: "rendezvous".to_string(), role: self.role.load() }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_are_not_serialized_by_the_transport() {
    let engine = Arc::new(RendezvousEngine::default());
    let host = spawn_acceptor(RaftRequestAcceptor::new(engine.clone(), kv_codec()));
    let client = Arc::new(peer_client());

    let append = {
        let client = client.clone();
        let host = host.clone();
        tokio::spawn(async move {
            client.append_entries(&host, &AppendEntriesRequest {
                term: 1,
                leader_id: "B".to_string(),
                previous_log_index: -1,
                previous_log_term: 0,
                entries: vec![],
                leader_commit_index: -1,
            }).await
        })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while !engine.append_entered.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }).await.expect("append entries never reached the engine");

    let vote = tokio::time::timeout(
        Duration::from_secs(3),
        client.request_vote(&host, &RequestVoteRequest { term: 1, candidate_id: "C".to_string(), last_log_index: -1, last_log_term: 0 }),
    ).await.expect("request vote waited behind append entries").unwrap();
    assert!(vote.vote_granted);

    let append = append.await.unwrap().unwrap();
    assert!(append.success, "append entries finished without seeing the vote");
}
