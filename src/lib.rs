//! ProtoForge Core - Invariant-Preserving Schema Construction
//!
//! # The Five Laws (Non-Negotiable)
//! 1. Committed Means Valid
//! 2. Rejected Writes Change Nothing
//! 3. Every Commit Validates
//! 4. Owners Judge Their Children
//! 5. Handles Never Dangle

pub mod config;
pub mod document;
pub mod enumeration;
pub mod error;
pub mod field;
pub mod hashing;
pub mod identifier;
pub mod ids;
pub mod message;
pub mod number;
pub mod oneof;
pub mod references;
pub mod reserved;
mod scope;
pub mod service;
pub mod types;

pub use config::{ConfigError, SchemaConfig, MIN_MESSAGE_NUMBER};
pub use document::{Container, Document, Import, ImportMut, NewImport};
pub use enumeration::{Enum, EnumMut, NewEnum, NewVariant, Variant, VariantMut};
pub use error::{Attribute, Declared, ErrorKind, Rejected, SchemaError};
pub use field::{Field, FieldMut, MapField, MapMut, MessageField, NewField, NewMap};
pub use hashing::{canonical_json, compute_fingerprint};
pub use identifier::{Identifier, ImportPath, PackageName};
pub use ids::{
    Definition, EnumId, FieldId, ImportId, MapId, MessageId, OneOfFieldId, OneOfId, ReservedLabelId,
    ReservedNumberId, ReservedRangeId, RpcId, ServiceId, VariantId,
};
pub use message::{Message, MessageMut, NewMessage};
pub use number::{FieldNumber, NumberRange};
pub use oneof::{NewOneOf, NewOneOfField, OneOf, OneOfField, OneOfFieldMut, OneOfMut};
pub use references::TypeSite;
pub use reserved::{
    NewReservedLabel, NewReservedNumber, NewReservedRange, Reservation, ReservedLabel,
    ReservedLabelMut, ReservedNumber, ReservedNumberMut, ReservedRange, ReservedRangeMut,
};
pub use service::{NewRpc, NewService, Rpc, RpcMut, Service, ServiceMut};
pub use types::{KeyType, MessageType, ScalarType, ValueType};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
