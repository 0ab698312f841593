//! Scope System - Owners Validate Their Children
//!
//! A scalar checks its own syntax, then defers to the owner of its scope.
//! Owners implement the narrow traits below; each scans only its direct
//! children, skipping the site being validated.

use tracing::trace;

use crate::document::Document;
use crate::error::SchemaError;
use crate::identifier::Identifier;
use crate::ids::{
    EnumId, FieldSlot, ImportId, MessageId, OneOfFieldId, ReservationSlot, RpcId, ServiceId,
    VariantId,
};
use crate::number::FieldNumber;

/// Where a label or number lives, so a scope can skip it while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Site {
    Service(ServiceId),
    Message(MessageId),
    Enum(EnumId),
    Field(FieldSlot),
    OneOfField(OneOfFieldId),
    Variant(VariantId),
    Reservation(ReservationSlot),
    Rpc(RpcId),
    Import(ImportId),
}

/// What kind of declaration claims a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Claimant {
    Field,
    Variant,
    Reservation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlagKind {
    AllowAlias,
    Repeated,
    Deprecated,
    Public,
    Stream,
}

pub(crate) trait LabelScope {
    fn validate_label(
        &self,
        doc: &Document,
        label: &Identifier,
        site: Option<Site>,
    ) -> Result<(), SchemaError>;
}

pub(crate) trait NumberScope {
    fn validate_number(
        &self,
        doc: &Document,
        number: FieldNumber,
        claimant: Claimant,
        site: Option<Site>,
    ) -> Result<(), SchemaError>;
}

/// Owners accept every flag transition unless they say otherwise.
pub(crate) trait FlagScope {
    fn validate_flag(&self, _flag: FlagKind, _value: bool) -> Result<(), SchemaError> {
        Ok(())
    }
}

/// Messages and enums own both a label and a number namespace.
pub(crate) trait DefinitionScope: LabelScope + NumberScope {}

impl<T: LabelScope + NumberScope> DefinitionScope for T {}

/// Writes `candidate` into `place`, then runs `validate` against the updated
/// state. On failure the previous value is restored before returning the
/// error; on success the previous value is handed back.
pub(crate) fn replace_validated<S, T>(
    state: &mut S,
    place: impl Fn(&mut S) -> &mut T,
    candidate: T,
    validate: impl FnOnce(&S) -> Result<(), SchemaError>,
) -> Result<T, SchemaError> {
    let previous = std::mem::replace(place(state), candidate);
    match validate(state) {
        Ok(()) => Ok(previous),
        Err(error) => {
            *place(state) = previous;
            trace!(%error, "write rejected, previous value restored");
            Err(error)
        }
    }
}
