//! Error System - Validation Failures Surface at the Point of Mutation
//!
//! Every rejected write or commit yields a [`SchemaError`]. A rejected write
//! leaves the target untouched; a rejected commit hands the builder back
//! inside [`Rejected`].

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::ids::Definition;
use crate::number::FieldNumber;

/// Coarse classification of a [`SchemaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// An identifier or path does not match its pattern.
    Syntax,
    /// A mandatory scalar was never assigned.
    Unset,
    /// A label or number collides with a sibling or a reservation.
    Uniqueness,
    /// A rule beyond uniqueness forbids the value.
    Policy,
}

/// The scalar a commit found unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Label,
    Number,
    RangeStart,
    RangeEnd,
    Type,
    KeyType,
    Request,
    Response,
    Path,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Attribute::Label => "label",
            Attribute::Number => "field number",
            Attribute::RangeStart => "start of number range",
            Attribute::RangeEnd => "end of number range",
            Attribute::Type => "type",
            Attribute::KeyType => "map key type",
            Attribute::Request => "request type",
            Attribute::Response => "response type",
            Attribute::Path => "import path",
        })
    }
}

/// What kind of declaration already holds a colliding label or number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Declared {
    Service,
    Message,
    Enum,
    Field,
    OneOf,
    Variant,
    Reservation,
    Rpc,
}

impl fmt::Display for Declared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Declared::Service => "a service",
            Declared::Message => "a message",
            Declared::Enum => "an enum",
            Declared::Field => "a field",
            Declared::OneOf => "a oneof",
            Declared::Variant => "an enum variant",
            Declared::Reservation => "a reservation",
            Declared::Rpc => "an rpc",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("identifier {value:?} must match {pattern}")]
    Syntax { value: String, pattern: &'static str },

    #[error("{0} not set")]
    Unset(Attribute),

    #[error("label {label:?} already declared for {by}")]
    LabelInUse { label: String, by: Declared },

    #[error("import {path:?} already declared")]
    ImportInUse { path: String },

    #[error("{number} already in use by {by}")]
    NumberInUse { number: FieldNumber, by: Declared },

    #[error("field number {number} already in use, set \"allow_alias = true\" to allow multiple labels for one number")]
    AliasingDisabled { number: u32 },

    #[error("field number {number} is used multiple times, remove aliasing before setting \"allow_alias = false\"")]
    AliasesPresent { number: u32 },

    #[error("end of number range must be greater than start, got {start} to {end}")]
    InvalidRange { start: u32, end: u32 },

    #[error("{number} is below the lowest allowed field number {min}")]
    BelowMinimum { number: FieldNumber, min: u32 },

    #[error("{number} exceeds the highest allowed field number {max}")]
    AboveMaximum { number: FieldNumber, max: u32 },

    #[error("{number} falls into range {start} to {end} reserved for the implementation")]
    ImplementationReserved { number: FieldNumber, start: u32, end: u32 },

    #[error("oneof must contain at least one field")]
    EmptyOneOf,

    #[error("{0} is not part of this document")]
    UnknownDefinition(Definition),

    #[error("oneof field belongs to a different or uncommitted oneof")]
    Detached,
}

impl SchemaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchemaError::Syntax { .. } => ErrorKind::Syntax,
            SchemaError::Unset(_) => ErrorKind::Unset,
            SchemaError::LabelInUse { .. }
            | SchemaError::ImportInUse { .. }
            | SchemaError::NumberInUse { .. }
            | SchemaError::AliasingDisabled { .. } => ErrorKind::Uniqueness,
            SchemaError::AliasesPresent { .. }
            | SchemaError::InvalidRange { .. }
            | SchemaError::BelowMinimum { .. }
            | SchemaError::AboveMaximum { .. }
            | SchemaError::ImplementationReserved { .. }
            | SchemaError::EmptyOneOf
            | SchemaError::UnknownDefinition(_)
            | SchemaError::Detached => ErrorKind::Policy,
        }
    }
}

/// A commit that failed validation.
///
/// The builder comes back unchanged so the caller can fix it and retry.
pub struct Rejected<B> {
    builder: B,
    error: SchemaError,
}

impl<B> Rejected<B> {
    pub(crate) fn new(builder: B, error: SchemaError) -> Self {
        Self { builder, error }
    }

    pub fn error(&self) -> &SchemaError {
        &self.error
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub fn into_builder(self) -> B {
        self.builder
    }

    pub fn into_parts(self) -> (B, SchemaError) {
        (self.builder, self.error)
    }
}

impl<B> fmt::Debug for Rejected<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejected")
            .field("builder", &std::any::type_name::<B>())
            .field("error", &self.error)
            .finish()
    }
}

impl<B> fmt::Display for Rejected<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl<B> std::error::Error for Rejected<B> {}

impl<B> From<Rejected<B>> for SchemaError {
    fn from(rejected: Rejected<B>) -> Self {
        rejected.error
    }
}
