//! Type Cells - Built-in Scalars and References to Definitions

use std::fmt;

use serde::Serialize;

use crate::ids::{Definition, EnumId, MessageId};

/// Built-in scalar types usable as field or map value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl ScalarType {
    pub const ALL: [ScalarType; 15] = [
        ScalarType::Double,
        ScalarType::Float,
        ScalarType::Int32,
        ScalarType::Int64,
        ScalarType::Uint32,
        ScalarType::Uint64,
        ScalarType::Sint32,
        ScalarType::Sint64,
        ScalarType::Fixed32,
        ScalarType::Fixed64,
        ScalarType::Sfixed32,
        ScalarType::Sfixed64,
        ScalarType::Bool,
        ScalarType::String,
        ScalarType::Bytes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::Double => "double",
            ScalarType::Float => "float",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Uint32 => "uint32",
            ScalarType::Uint64 => "uint64",
            ScalarType::Sint32 => "sint32",
            ScalarType::Sint64 => "sint64",
            ScalarType::Fixed32 => "fixed32",
            ScalarType::Fixed64 => "fixed64",
            ScalarType::Sfixed32 => "sfixed32",
            ScalarType::Sfixed64 => "sfixed64",
            ScalarType::Bool => "bool",
            ScalarType::String => "string",
            ScalarType::Bytes => "bytes",
        }
    }

    /// The map key counterpart, if this scalar may key a map.
    pub fn key_type(&self) -> Option<KeyType> {
        KeyType::ALL.into_iter().find(|k| ScalarType::from(*k) == *self)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map key types: every scalar except `double`, `float` and `bytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
}

impl KeyType {
    pub const ALL: [KeyType; 12] = [
        KeyType::Int32,
        KeyType::Int64,
        KeyType::Uint32,
        KeyType::Uint64,
        KeyType::Sint32,
        KeyType::Sint64,
        KeyType::Fixed32,
        KeyType::Fixed64,
        KeyType::Sfixed32,
        KeyType::Sfixed64,
        KeyType::Bool,
        KeyType::String,
    ];
}

impl From<KeyType> for ScalarType {
    fn from(key: KeyType) -> Self {
        match key {
            KeyType::Int32 => ScalarType::Int32,
            KeyType::Int64 => ScalarType::Int64,
            KeyType::Uint32 => ScalarType::Uint32,
            KeyType::Uint64 => ScalarType::Uint64,
            KeyType::Sint32 => ScalarType::Sint32,
            KeyType::Sint64 => ScalarType::Sint64,
            KeyType::Fixed32 => ScalarType::Fixed32,
            KeyType::Fixed64 => ScalarType::Fixed64,
            KeyType::Sfixed32 => ScalarType::Sfixed32,
            KeyType::Sfixed64 => ScalarType::Sfixed64,
            KeyType::Bool => ScalarType::Bool,
            KeyType::String => ScalarType::String,
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ScalarType::from(*self).as_str())
    }
}

/// Value of a type cell: a scalar or a committed definition.
///
/// Definitions can only be named through handles, which exist only for
/// committed entities, so a type cell never points at a tentative one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Scalar(ScalarType),
    Message(MessageId),
    Enum(EnumId),
}

impl ValueType {
    pub fn definition(&self) -> Option<Definition> {
        match self {
            ValueType::Scalar(_) => None,
            ValueType::Message(id) => Some(Definition::Message(*id)),
            ValueType::Enum(id) => Some(Definition::Enum(*id)),
        }
    }
}

impl From<ScalarType> for ValueType {
    fn from(scalar: ScalarType) -> Self {
        ValueType::Scalar(scalar)
    }
}

impl From<KeyType> for ValueType {
    fn from(key: KeyType) -> Self {
        ValueType::Scalar(key.into())
    }
}

impl From<MessageId> for ValueType {
    fn from(id: MessageId) -> Self {
        ValueType::Message(id)
    }
}

impl From<EnumId> for ValueType {
    fn from(id: EnumId) -> Self {
        ValueType::Enum(id)
    }
}

impl From<Definition> for ValueType {
    fn from(definition: Definition) -> Self {
        match definition {
            Definition::Message(id) => ValueType::Message(id),
            Definition::Enum(id) => ValueType::Enum(id),
        }
    }
}

/// Request or response of an RPC: a committed message, optionally streamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MessageType {
    message: MessageId,
    stream: bool,
}

impl MessageType {
    pub(crate) fn new(message: MessageId, stream: bool) -> Self {
        Self { message, stream }
    }

    pub fn message(&self) -> MessageId {
        self.message
    }

    pub fn stream(&self) -> bool {
        self.stream
    }

    pub(crate) fn message_mut(&mut self) -> &mut MessageId {
        &mut self.message
    }

    pub(crate) fn stream_mut(&mut self) -> &mut bool {
        &mut self.stream
    }
}
