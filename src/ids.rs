//! Handles for committed entities.
//!
//! A [`Document`](crate::Document) mints a handle when an entity is committed.
//! Nothing is ever removed from a document, so a handle stays valid for the
//! document's whole life. Every handle carries the tag of the document that
//! minted it; handing it to another document panics, and offering it as a
//! type reference there is rejected.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Serialize, Serializer};

static NEXT_DOCUMENT_TAG: AtomicU32 = AtomicU32::new(0);

/// Identity of one [`Document`](crate::Document) within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct DocumentTag(u32);

impl DocumentTag {
    pub(crate) fn next() -> Self {
        DocumentTag(NEXT_DOCUMENT_TAG.fetch_add(1, Ordering::Relaxed))
    }
}

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub(crate) usize, pub(crate) DocumentTag);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($what, " #{}"), self.0)
            }
        }

        // The tag differs between runs, so only the index is serialized.
        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.0.serialize(serializer)
            }
        }
    };
}

arena_id!(
    /// A committed message, top-level or nested.
    MessageId,
    "message"
);
arena_id!(
    /// A committed enum, top-level or nested.
    EnumId,
    "enum"
);
arena_id!(ServiceId, "service");
arena_id!(ImportId, "import");

/// A message or enum that a type cell can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Definition {
    Message(MessageId),
    Enum(EnumId),
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Message(id) => id.fmt(f),
            Definition::Enum(id) => id.fmt(f),
        }
    }
}

impl From<MessageId> for Definition {
    fn from(id: MessageId) -> Self {
        Definition::Message(id)
    }
}

impl From<EnumId> for Definition {
    fn from(id: EnumId) -> Self {
        Definition::Enum(id)
    }
}

/// Position in a message's field list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub(crate) struct FieldSlot {
    pub(crate) message: MessageId,
    pub(crate) index: usize,
}

macro_rules! field_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub(crate) FieldSlot);

        impl $name {
            pub fn message(&self) -> MessageId {
                self.0.message
            }
        }
    };
}

field_id!(
    /// A plain (optionally repeated) message field.
    FieldId
);
field_id!(MapId);
field_id!(OneOfId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct OneOfFieldId {
    pub(crate) oneof: OneOfId,
    pub(crate) index: usize,
}

impl OneOfFieldId {
    pub fn oneof(&self) -> OneOfId {
        self.oneof
    }

    pub fn message(&self) -> MessageId {
        self.oneof.message()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VariantId {
    pub(crate) enumeration: EnumId,
    pub(crate) index: usize,
}

impl VariantId {
    pub fn enumeration(&self) -> EnumId {
        self.enumeration
    }
}

/// Position in a message's or enum's reservation list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub(crate) struct ReservationSlot {
    pub(crate) owner: Definition,
    pub(crate) index: usize,
}

macro_rules! reservation_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub(crate) ReservationSlot);

        impl $name {
            pub fn owner(&self) -> Definition {
                self.0.owner
            }
        }
    };
}

reservation_id!(ReservedNumberId);
reservation_id!(ReservedRangeId);
reservation_id!(ReservedLabelId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RpcId {
    pub(crate) service: ServiceId,
    pub(crate) index: usize,
}

impl RpcId {
    pub fn service(&self) -> ServiceId {
        self.service
    }
}
