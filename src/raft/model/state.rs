use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub node_id: String,
    pub bind_address: [u8; 4],
    pub port: u16,
    /// Shared secret expected in `Authorization: Bearer <token>`. No token means every caller is accepted.
    pub auth_token: Option<String>,
    pub max_body_bytes: usize,
}

impl TransportConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.bind_address, self.port))
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            node_id: "node-1".to_string(),
            bind_address: [127, 0, 0, 1],
            port: DEFAULT_PORT,
            auth_token: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum NodeRole {
    Follower,
    Candidate,
    Leader
}

impl NodeRole {
    fn as_u8(self) -> u8 {
        match self {
            NodeRole::Follower => 0,
            NodeRole::Candidate => 1,
            NodeRole::Leader => 2,
        }
    }

    fn from_u8(value: u8) -> NodeRole {
        match value {
            1 => NodeRole::Candidate,
            2 => NodeRole::Leader,
            _ => NodeRole::Follower,
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeRole::Follower => "follower",
            NodeRole::Candidate => "candidate",
            NodeRole::Leader => "leader",
        };
        f.write_str(name)
    }
}

/// Role holder that engines embed so the transport can read the role on every request
/// without taking the engine's lock.
#[derive(Debug)]
pub struct RoleCell {
    role: AtomicU8,
}

impl RoleCell {
    pub fn new(role: NodeRole) -> Self {
        Self { role: AtomicU8::new(role.as_u8()) }
    }

    pub fn load(&self) -> NodeRole {
        NodeRole::from_u8(self.role.load(Ordering::Acquire))
    }

    pub fn store(&self, role: NodeRole) {
        self.role.store(role.as_u8(), Ordering::Release)
    }
}

impl Default for RoleCell {
    fn default() -> Self {
        Self::new(NodeRole::Follower)
    }
}

/// Point-in-time view of who this node is, used only for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub node_id: String,
    pub role: NodeRole,
}
