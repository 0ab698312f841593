//! Message Fields - Plain Fields and Maps
//!
//! Both kinds claim a label and a number in their message. A field can be
//! repeated; a map pairs a restricted key type with any value type.

use serde::Serialize;
use tracing::debug;

use crate::document::{finalize, Document};
use crate::error::{Attribute, Declared, Rejected, SchemaError};
use crate::identifier::Identifier;
use crate::ids::{FieldId, FieldSlot, MapId, MessageId};
use crate::oneof::OneOf;
use crate::references::TypeSite;
use crate::scope::{replace_validated, Claimant, FlagKind, FlagScope, LabelScope, NumberScope, Site};
use crate::types::{KeyType, ValueType};

/// Anything a message lists among its fields.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageField {
    Field(Field),
    Map(MapField),
    OneOf(OneOf),
}

impl MessageField {
    pub fn label(&self) -> &Identifier {
        match self {
            MessageField::Field(f) => &f.label,
            MessageField::Map(m) => &m.label,
            MessageField::OneOf(o) => &o.label,
        }
    }

    /// Labels this entry holds in the message namespace.
    pub(crate) fn labels(&self) -> Vec<(Site, &Identifier, Declared)> {
        match self {
            MessageField::Field(f) => vec![(Site::Field(f.id.0), &f.label, Declared::Field)],
            MessageField::Map(m) => vec![(Site::Field(m.id.0), &m.label, Declared::Field)],
            MessageField::OneOf(o) => std::iter::once((Site::Field(o.id.0), &o.label, Declared::OneOf))
                .chain(
                    o.fields
                        .iter()
                        .map(|f| (Site::OneOfField(f.id), &f.label, Declared::Field)),
                )
                .collect(),
        }
    }

    /// Numbers this entry claims in the message.
    pub(crate) fn numbers(&self) -> Vec<(Site, u32)> {
        match self {
            MessageField::Field(f) => vec![(Site::Field(f.id.0), f.number)],
            MessageField::Map(m) => vec![(Site::Field(m.id.0), m.number)],
            MessageField::OneOf(o) => o
                .fields
                .iter()
                .map(|f| (Site::OneOfField(f.id), f.number))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub(crate) id: FieldId,
    pub(crate) label: Identifier,
    pub(crate) number: u32,
    pub(crate) value_type: ValueType,
    pub(crate) repeated: bool,
    pub(crate) deprecated: bool,
}

impl Field {
    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn label(&self) -> &Identifier {
        &self.label
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn repeated(&self) -> bool {
        self.repeated
    }

    pub fn deprecated(&self) -> bool {
        self.deprecated
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapField {
    pub(crate) id: MapId,
    pub(crate) label: Identifier,
    pub(crate) number: u32,
    pub(crate) key_type: KeyType,
    pub(crate) value_type: ValueType,
    pub(crate) deprecated: bool,
}

impl MapField {
    pub fn id(&self) -> MapId {
        self.id
    }

    pub fn label(&self) -> &Identifier {
        &self.label
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn deprecated(&self) -> bool {
        self.deprecated
    }
}

pub(crate) fn required_label<S: LabelScope + ?Sized>(
    scope: &S,
    doc: &Document,
    label: Option<&Identifier>,
) -> Result<Identifier, SchemaError> {
    let label = label.ok_or(SchemaError::Unset(Attribute::Label))?;
    scope.validate_label(doc, label, None)?;
    Ok(label.clone())
}

pub(crate) fn required_number<S: NumberScope + ?Sized>(
    scope: &S,
    doc: &Document,
    number: Option<u32>,
) -> Result<u32, SchemaError> {
    let number = number.ok_or(SchemaError::Unset(Attribute::Number))?;
    scope.validate_number(doc, number.into(), Claimant::Field, None)?;
    Ok(number)
}

pub(crate) fn required_type(doc: &Document, value_type: Option<ValueType>) -> Result<ValueType, SchemaError> {
    let value_type = value_type.ok_or(SchemaError::Unset(Attribute::Type))?;
    doc.check_value_type(&value_type)?;
    Ok(value_type)
}

impl Document {
    pub fn field(&self, id: FieldId) -> &Field {
        match &self.message(id.message()).fields[id.0.index] {
            MessageField::Field(f) => f,
            _ => unreachable!("field handle points at another field kind"),
        }
    }

    pub fn map(&self, id: MapId) -> &MapField {
        match &self.message(id.message()).fields[id.0.index] {
            MessageField::Map(m) => m,
            _ => unreachable!("map handle points at another field kind"),
        }
    }

    pub fn field_mut(&mut self, id: FieldId) -> FieldMut<'_> {
        self.field(id);
        FieldMut { doc: self, id }
    }

    pub fn map_mut(&mut self, id: MapId) -> MapMut<'_> {
        self.map(id);
        MapMut { doc: self, id }
    }

    pub(crate) fn next_field_slot(&self, message: MessageId) -> FieldSlot {
        FieldSlot {
            message,
            index: self.message(message).fields.len(),
        }
    }
}

fn field_entry(doc: &mut Document, id: FieldId) -> &mut Field {
    match &mut doc.messages[id.0.message.0].fields[id.0.index] {
        MessageField::Field(f) => f,
        _ => unreachable!("field handle points at another field kind"),
    }
}

fn map_entry(doc: &mut Document, id: MapId) -> &mut MapField {
    match &mut doc.messages[id.0.message.0].fields[id.0.index] {
        MessageField::Map(m) => m,
        _ => unreachable!("map handle points at another field kind"),
    }
}

/// Tentative field.
#[derive(Debug, Clone)]
pub struct NewField {
    message: MessageId,
    label: Option<Identifier>,
    number: Option<u32>,
    value_type: Option<ValueType>,
    repeated: bool,
    deprecated: bool,
}

impl NewField {
    pub(crate) fn new(message: MessageId) -> Self {
        Self {
            message,
            label: None,
            number: None,
            value_type: None,
            repeated: false,
            deprecated: false,
        }
    }

    pub fn message(&self) -> MessageId {
        self.message
    }

    pub fn label(&self) -> Option<&Identifier> {
        self.label.as_ref()
    }

    pub fn number(&self) -> Option<u32> {
        self.number
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.value_type
    }

    pub fn repeated(&self) -> bool {
        self.repeated
    }

    pub fn deprecated(&self) -> bool {
        self.deprecated
    }

    pub fn set_label(&mut self, doc: &Document, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        replace_validated(self, |f| &mut f.label, Some(label), |f| {
            required_label(doc.message(f.message), doc, f.label.as_ref()).map(drop)
        })
        .map(drop)
    }

    pub fn set_number(&mut self, doc: &Document, value: u32) -> Result<(), SchemaError> {
        replace_validated(self, |f| &mut f.number, Some(value), |f| {
            required_number(doc.message(f.message), doc, f.number).map(drop)
        })
        .map(drop)
    }

    pub fn set_value_type(&mut self, doc: &Document, value: impl Into<ValueType>) -> Result<(), SchemaError> {
        replace_validated(self, |f| &mut f.value_type, Some(value.into()), |f| {
            required_type(doc, f.value_type).map(drop)
        })
        .map(drop)
    }

    pub fn set_repeated(&mut self, value: bool) {
        self.repeated = value;
    }

    pub fn set_deprecated(&mut self, value: bool) {
        self.deprecated = value;
    }

    pub fn insert_into_parent(self, doc: &mut Document) -> Result<FieldId, Rejected<Self>> {
        let id = FieldId(doc.next_field_slot(self.message));
        let field = finalize(self, "field", |f| {
            let scope = doc.message(f.message);
            Ok(Field {
                id,
                label: required_label(scope, doc, f.label.as_ref())?,
                number: required_number(scope, doc, f.number)?,
                value_type: required_type(doc, f.value_type)?,
                repeated: f.repeated,
                deprecated: f.deprecated,
            })
        })?;
        debug!(parent = %id.message(), label = %field.label, number = field.number, "field committed");
        doc.references
            .rebind(TypeSite::Field(id), None, field.value_type.definition());
        doc.messages[id.message().0].fields.push(MessageField::Field(field));
        Ok(id)
    }
}

/// Tentative map field.
#[derive(Debug, Clone)]
pub struct NewMap {
    message: MessageId,
    label: Option<Identifier>,
    number: Option<u32>,
    key_type: Option<KeyType>,
    value_type: Option<ValueType>,
    deprecated: bool,
}

impl NewMap {
    pub(crate) fn new(message: MessageId) -> Self {
        Self {
            message,
            label: None,
            number: None,
            key_type: None,
            value_type: None,
            deprecated: false,
        }
    }

    pub fn message(&self) -> MessageId {
        self.message
    }

    pub fn label(&self) -> Option<&Identifier> {
        self.label.as_ref()
    }

    pub fn number(&self) -> Option<u32> {
        self.number
    }

    pub fn key_type(&self) -> Option<KeyType> {
        self.key_type
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.value_type
    }

    pub fn deprecated(&self) -> bool {
        self.deprecated
    }

    pub fn set_label(&mut self, doc: &Document, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        replace_validated(self, |m| &mut m.label, Some(label), |m| {
            required_label(doc.message(m.message), doc, m.label.as_ref()).map(drop)
        })
        .map(drop)
    }

    pub fn set_number(&mut self, doc: &Document, value: u32) -> Result<(), SchemaError> {
        replace_validated(self, |m| &mut m.number, Some(value), |m| {
            required_number(doc.message(m.message), doc, m.number).map(drop)
        })
        .map(drop)
    }

    /// Key types are closed over the allowed scalars, so this never fails.
    pub fn set_key_type(&mut self, value: KeyType) {
        self.key_type = Some(value);
    }

    pub fn set_value_type(&mut self, doc: &Document, value: impl Into<ValueType>) -> Result<(), SchemaError> {
        replace_validated(self, |m| &mut m.value_type, Some(value.into()), |m| {
            required_type(doc, m.value_type).map(drop)
        })
        .map(drop)
    }

    pub fn set_deprecated(&mut self, value: bool) {
        self.deprecated = value;
    }

    pub fn insert_into_parent(self, doc: &mut Document) -> Result<MapId, Rejected<Self>> {
        let id = MapId(doc.next_field_slot(self.message));
        let map = finalize(self, "map", |m| {
            let scope = doc.message(m.message);
            Ok(MapField {
                id,
                label: required_label(scope, doc, m.label.as_ref())?,
                number: required_number(scope, doc, m.number)?,
                key_type: m.key_type.ok_or(SchemaError::Unset(Attribute::KeyType))?,
                value_type: required_type(doc, m.value_type)?,
                deprecated: m.deprecated,
            })
        })?;
        debug!(parent = %id.message(), label = %map.label, number = map.number, "map committed");
        doc.references
            .rebind(TypeSite::MapValue(id), None, map.value_type.definition());
        doc.messages[id.message().0].fields.push(MessageField::Map(map));
        Ok(id)
    }
}

pub struct FieldMut<'a> {
    doc: &'a mut Document,
    id: FieldId,
}

impl FieldMut<'_> {
    pub fn set_label(&mut self, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        let id = self.id;
        replace_validated(self.doc, |doc| &mut field_entry(doc, id).label, label, |doc| {
            doc.message(id.message())
                .validate_label(doc, &doc.field(id).label, Some(Site::Field(id.0)))
        })
        .map(drop)
    }

    pub fn set_number(&mut self, value: u32) -> Result<(), SchemaError> {
        let id = self.id;
        replace_validated(self.doc, |doc| &mut field_entry(doc, id).number, value, |doc| {
            doc.message(id.message()).validate_number(
                doc,
                value.into(),
                Claimant::Field,
                Some(Site::Field(id.0)),
            )
        })
        .map(drop)
    }

    pub fn set_value_type(&mut self, value: impl Into<ValueType>) -> Result<(), SchemaError> {
        let value = value.into();
        let id = self.id;
        let previous = replace_validated(self.doc, |doc| &mut field_entry(doc, id).value_type, value, |doc| {
            doc.check_value_type(&value)
        })?;
        self.doc
            .references
            .rebind(TypeSite::Field(id), previous.definition(), value.definition());
        Ok(())
    }

    pub fn set_repeated(&mut self, value: bool) -> Result<(), SchemaError> {
        let id = self.id;
        replace_validated(self.doc, |doc| &mut field_entry(doc, id).repeated, value, |doc| {
            doc.message(id.message()).validate_flag(FlagKind::Repeated, value)
        })
        .map(drop)
    }

    pub fn set_deprecated(&mut self, value: bool) -> Result<(), SchemaError> {
        let id = self.id;
        replace_validated(self.doc, |doc| &mut field_entry(doc, id).deprecated, value, |doc| {
            doc.message(id.message()).validate_flag(FlagKind::Deprecated, value)
        })
        .map(drop)
    }
}

pub struct MapMut<'a> {
    doc: &'a mut Document,
    id: MapId,
}

impl MapMut<'_> {
    pub fn set_label(&mut self, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        let id = self.id;
        replace_validated(self.doc, |doc| &mut map_entry(doc, id).label, label, |doc| {
            doc.message(id.message())
                .validate_label(doc, &doc.map(id).label, Some(Site::Field(id.0)))
        })
        .map(drop)
    }

    pub fn set_number(&mut self, value: u32) -> Result<(), SchemaError> {
        let id = self.id;
        replace_validated(self.doc, |doc| &mut map_entry(doc, id).number, value, |doc| {
            doc.message(id.message()).validate_number(
                doc,
                value.into(),
                Claimant::Field,
                Some(Site::Field(id.0)),
            )
        })
        .map(drop)
    }

    pub fn set_key_type(&mut self, value: KeyType) {
        map_entry(self.doc, self.id).key_type = value;
    }

    pub fn set_value_type(&mut self, value: impl Into<ValueType>) -> Result<(), SchemaError> {
        let value = value.into();
        let id = self.id;
        let previous = replace_validated(self.doc, |doc| &mut map_entry(doc, id).value_type, value, |doc| {
            doc.check_value_type(&value)
        })?;
        self.doc
            .references
            .rebind(TypeSite::MapValue(id), previous.definition(), value.definition());
        Ok(())
    }

    pub fn set_deprecated(&mut self, value: bool) -> Result<(), SchemaError> {
        let id = self.id;
        replace_validated(self.doc, |doc| &mut map_entry(doc, id).deprecated, value, |doc| {
            doc.message(id.message()).validate_flag(FlagKind::Deprecated, value)
        })
        .map(drop)
    }
}
