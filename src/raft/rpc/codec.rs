use std::collections::HashMap;
use std::fmt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use crate::raft::model::log::LogEntry;
use crate::raft::rpc::error::CodecError;
use crate::raft::rpc::raft::dto::{AppendEntriesRequest, AppendEntriesResponse, AppendEntriesWire, LogEntryWire, RequestVoteRequest, RequestVoteResponse};

/// Key of the discriminator embedded in every command and command response object.
pub const TYPE_TAG_KEY: &str = "$type";

/// An application payload whose concrete variant must survive the wire.
pub trait TypedPayload: Send + 'static {
    /// Discriminator written under [`TYPE_TAG_KEY`]; must match the tag the variant is registered with.
    fn type_tag(&self) -> &'static str;

    /// The variant's own fields as a JSON object, without the discriminator.
    fn fields(&self) -> serde_json::Result<Value>;
}

type Decoder<T> = Box<dyn Fn(Value) -> serde_json::Result<T> + Send + Sync>;

/// Closed set of variants a codec is allowed to instantiate from untrusted input.
pub struct TypeRegistry<T> {
    decoders: HashMap<&'static str, Decoder<T>>,
}

impl<T> TypeRegistry<T> {
    pub fn new() -> Self {
        Self { decoders: HashMap::new() }
    }

    pub fn register<V>(mut self, tag: &'static str) -> Self
    where
        V: DeserializeOwned + Into<T> + 'static,
        T: 'static,
    {
        let decoder: Decoder<T> = Box::new(|fields| serde_json::from_value::<V>(fields).map(Into::into));
        self.decoders.insert(tag, decoder);
        self
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.decoders.contains_key(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.decoders.keys().copied()
    }

    /// The tag is resolved before any field is read, so an unregistered tag never reaches a decoder.
    fn decode_value(&self, value: Value) -> Result<T, CodecError> {
        let Value::Object(mut fields) = value else {
            return Err(CodecError::NotAnObject);
        };
        let tag = match fields.remove(TYPE_TAG_KEY) {
            Some(Value::String(tag)) => tag,
            _ => return Err(CodecError::MissingTypeTag),
        };
        let decoder = self.decoders.get(tag.as_str())
            .ok_or(CodecError::UnknownType(tag))?;

        decoder(Value::Object(fields)).map_err(CodecError::Malformed)
    }
}

impl<T> Default for TypeRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TypeRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags = self.tags().collect::<Vec<_>>();
        tags.sort_unstable();
        f.debug_struct("TypeRegistry").field("tags", &tags).finish()
    }
}

fn to_tagged_value<T: TypedPayload>(payload: &T) -> Result<Value, CodecError> {
    let mut fields = match payload.fields()? {
        Value::Object(fields) => fields,
        Value::Null => Map::new(),
        _ => return Err(CodecError::NotAnObject),
    };
    fields.insert(TYPE_TAG_KEY.to_string(), Value::String(payload.type_tag().to_string()));
    Ok(Value::Object(fields))
}

/// JSON codec for the three RPCs. Protocol messages have fixed shapes and use plain serde;
/// commands and command responses go through their registries.
#[derive(Debug)]
pub struct WireCodec<C, R> {
    commands: TypeRegistry<C>,
    responses: TypeRegistry<R>,
}

impl<C: TypedPayload, R: TypedPayload> WireCodec<C, R> {
    pub fn new(commands: TypeRegistry<C>, responses: TypeRegistry<R>) -> Self {
        Self { commands, responses }
    }

    pub fn commands(&self) -> &TypeRegistry<C> {
        &self.commands
    }

    pub fn decode_append_entries(&self, bytes: &[u8]) -> Result<AppendEntriesRequest<C>, CodecError> {
        let wire: AppendEntriesWire = serde_json::from_slice(bytes)?;

        let entries = wire.entries.into_iter()
            .map(|entry| -> Result<LogEntry<C>, CodecError> {
                let command = self.commands.decode_value(entry.command)?;
                Ok(LogEntry { term: entry.term, index: entry.index, command })
            })
            .collect::<Result<Vec<_>, CodecError>>()?;

        Ok(AppendEntriesRequest {
            term: wire.term,
            leader_id: wire.leader_id,
            previous_log_index: wire.previous_log_index,
            previous_log_term: wire.previous_log_term,
            entries,
            leader_commit_index: wire.leader_commit_index,
        })
    }

    pub fn encode_append_entries(&self, request: &AppendEntriesRequest<C>) -> Result<Vec<u8>, CodecError> {
        let entries = request.entries.iter()
            .map(|entry| -> Result<LogEntryWire, CodecError> {
                Ok(LogEntryWire {
                    term: entry.term,
                    index: entry.index,
                    command: to_tagged_value(&entry.command)?,
                })
            })
            .collect::<Result<Vec<_>, CodecError>>()?;

        let wire = AppendEntriesWire {
            term: request.term,
            leader_id: request.leader_id.clone(),
            previous_log_index: request.previous_log_index,
            previous_log_term: request.previous_log_term,
            entries,
            leader_commit_index: request.leader_commit_index,
        };
        Ok(serde_json::to_vec(&wire)?)
    }

    pub fn decode_request_vote(&self, bytes: &[u8]) -> Result<RequestVoteRequest, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn encode_request_vote(&self, request: &RequestVoteRequest) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(request)?)
    }

    pub fn decode_command(&self, bytes: &[u8]) -> Result<C, CodecError> {
        let value: Value = serde_json::from_slice(bytes)?;
        self.commands.decode_value(value)
    }

    pub fn encode_command(&self, command: &C) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(&to_tagged_value(command)?)?)
    }

    pub fn decode_command_response(&self, bytes: &[u8]) -> Result<R, CodecError> {
        let value: Value = serde_json::from_slice(bytes)?;
        self.responses.decode_value(value)
    }

    pub fn encode_command_response(&self, response: &R) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(&to_tagged_value(response)?)?)
    }

    /// Plain structural encoding, used for the fixed-shape protocol messages.
    pub fn encode_response<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub fn decode_append_entries_response(&self, bytes: &[u8]) -> Result<AppendEntriesResponse, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn decode_request_vote_response(&self, bytes: &[u8]) -> Result<RequestVoteResponse, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
