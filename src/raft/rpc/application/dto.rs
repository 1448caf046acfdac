use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::raft::rpc::codec::{TypeRegistry, TypedPayload, WireCodec};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SetValue {
    pub key: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GetValue {
    pub key: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeleteValue {
    pub key: String,
}

/// Commands understood by the key-value state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvCommand {
    SetValue(SetValue),
    GetValue(GetValue),
    DeleteValue(DeleteValue),
}

impl TypedPayload for KvCommand {
    fn type_tag(&self) -> &'static str {
        match self {
            KvCommand::SetValue(_) => "SetValue",
            KvCommand::GetValue(_) => "GetValue",
            KvCommand::DeleteValue(_) => "DeleteValue",
        }
    }

    fn fields(&self) -> serde_json::Result<Value> {
        match self {
            KvCommand::SetValue(command) => serde_json::to_value(command),
            KvCommand::GetValue(command) => serde_json::to_value(command),
            KvCommand::DeleteValue(command) => serde_json::to_value(command),
        }
    }
}

impl From<SetValue> for KvCommand {
    fn from(command: SetValue) -> Self {
        KvCommand::SetValue(command)
    }
}

impl From<GetValue> for KvCommand {
    fn from(command: GetValue) -> Self {
        KvCommand::GetValue(command)
    }
}

impl From<DeleteValue> for KvCommand {
    fn from(command: DeleteValue) -> Self {
        KvCommand::DeleteValue(command)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ValueSet {
    pub key: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ValueFound {
    pub key: String,
    pub value: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ValueDeleted {
    pub key: String,
    pub existed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvResponse {
    ValueSet(ValueSet),
    ValueFound(ValueFound),
    ValueDeleted(ValueDeleted),
}

impl TypedPayload for KvResponse {
    fn type_tag(&self) -> &'static str {
        match self {
            KvResponse::ValueSet(_) => "ValueSet",
            KvResponse::ValueFound(_) => "ValueFound",
            KvResponse::ValueDeleted(_) => "ValueDeleted",
        }
    }

    fn fields(&self) -> serde_json::Result<Value> {
        match self {
            KvResponse::ValueSet(response) => serde_json::to_value(response),
            KvResponse::ValueFound(response) => serde_json::to_value(response),
            KvResponse::ValueDeleted(response) => serde_json::to_value(response),
        }
    }
}

impl From<ValueSet> for KvResponse {
    fn from(response: ValueSet) -> Self {
        KvResponse::ValueSet(response)
    }
}

impl From<ValueFound> for KvResponse {
    fn from(response: ValueFound) -> Self {
        KvResponse::ValueFound(response)
    }
}

impl From<ValueDeleted> for KvResponse {
    fn from(response: ValueDeleted) -> Self {
        KvResponse::ValueDeleted(response)
    }
}

pub fn command_registry() -> TypeRegistry<KvCommand> {
    TypeRegistry::new()
        .register::<SetValue>("SetValue")
        .register::<GetValue>("GetValue")
        .register::<DeleteValue>("DeleteValue")
}

pub fn response_registry() -> TypeRegistry<KvResponse> {
    TypeRegistry::new()
        .register::<ValueSet>("ValueSet")
        .register::<ValueFound>("ValueFound")
        .register::<ValueDeleted>("ValueDeleted")
}

pub fn kv_codec() -> WireCodec<KvCommand, KvResponse> {
    WireCodec::new(command_registry(), response_registry())
}
