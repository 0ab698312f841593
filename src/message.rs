//! Messages - Field Containers and Nested Definitions
//!
//! A message owns two namespaces. Labels of its fields, oneofs, reserved
//! labels and nested definitions are mutually unique. Numbers of its fields,
//! oneof members and reservations never intersect.

use serde::Serialize;
use tracing::debug;

use crate::config::MIN_MESSAGE_NUMBER;
use crate::document::{finalize, Container, Document};
use crate::enumeration::NewEnum;
use crate::error::{Attribute, Declared, Rejected, SchemaError};
use crate::field::{MessageField, NewField, NewMap};
use crate::identifier::Identifier;
use crate::ids::{EnumId, MessageId};
use crate::number::FieldNumber;
use crate::oneof::NewOneOf;
use crate::reserved::{
    check_reserved_label, check_reserved_number, NewReservedLabel, NewReservedNumber,
    NewReservedRange, Reservation,
};
use crate::scope::{replace_validated, Claimant, FlagScope, LabelScope, NumberScope, Site};

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub(crate) id: MessageId,
    pub(crate) parent: Container,
    pub(crate) label: Identifier,
    pub(crate) fields: Vec<MessageField>,
    pub(crate) reserved: Vec<Reservation>,
    pub(crate) messages: Vec<MessageId>,
    pub(crate) enums: Vec<EnumId>,
}

impl Message {
    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn parent(&self) -> Container {
        self.parent
    }

    pub fn label(&self) -> &Identifier {
        &self.label
    }

    /// Fields, maps and oneofs in commit order.
    pub fn fields(&self) -> &[MessageField] {
        &self.fields
    }

    pub fn reserved(&self) -> &[Reservation] {
        &self.reserved
    }

    /// Nested messages in commit order.
    pub fn messages(&self) -> &[MessageId] {
        &self.messages
    }

    /// Nested enums in commit order.
    pub fn enums(&self) -> &[EnumId] {
        &self.enums
    }

    pub fn new_field(&self) -> NewField {
        NewField::new(self.id)
    }

    pub fn new_map(&self) -> NewMap {
        NewMap::new(self.id)
    }

    pub fn new_oneof(&self) -> NewOneOf {
        NewOneOf::new(self.id)
    }

    pub fn new_reserved_number(&self) -> NewReservedNumber {
        NewReservedNumber::new(self.id.into())
    }

    pub fn new_reserved_range(&self) -> NewReservedRange {
        NewReservedRange::new(self.id.into())
    }

    pub fn new_reserved_label(&self) -> NewReservedLabel {
        NewReservedLabel::new(self.id.into())
    }

    pub fn new_message(&self) -> NewMessage {
        NewMessage::new(Container::Message(self.id))
    }

    pub fn new_enum(&self) -> NewEnum {
        NewEnum::new(Container::Message(self.id))
    }
}

impl LabelScope for Message {
    fn validate_label(
        &self,
        doc: &Document,
        label: &Identifier,
        site: Option<Site>,
    ) -> Result<(), SchemaError> {
        let in_use = |by| {
            Err(SchemaError::LabelInUse {
                label: label.to_string(),
                by,
            })
        };
        for field in &self.fields {
            for (held_site, held, by) in field.labels() {
                if site != Some(held_site) && held == label {
                    return in_use(by);
                }
            }
        }
        check_reserved_label(&self.reserved, label, site)?;
        for &id in &self.messages {
            if site != Some(Site::Message(id)) && doc.message(id).label() == label {
                return in_use(Declared::Message);
            }
        }
        for &id in &self.enums {
            if site != Some(Site::Enum(id)) && doc.enumeration(id).label() == label {
                return in_use(Declared::Enum);
            }
        }
        Ok(())
    }
}

impl NumberScope for Message {
    fn validate_number(
        &self,
        doc: &Document,
        number: FieldNumber,
        claimant: Claimant,
        site: Option<Site>,
    ) -> Result<(), SchemaError> {
        let config = doc.config();
        if number.lowest() < MIN_MESSAGE_NUMBER {
            return Err(SchemaError::BelowMinimum {
                number,
                min: MIN_MESSAGE_NUMBER,
            });
        }
        if number.highest() > config.max_message_number {
            return Err(SchemaError::AboveMaximum {
                number,
                max: config.max_message_number,
            });
        }
        if let (Claimant::Field, Some(band)) = (claimant, config.implementation_reserved) {
            if number.intersects(&band.into()) {
                return Err(SchemaError::ImplementationReserved {
                    number,
                    start: band.start(),
                    end: band.end(),
                });
            }
        }
        for field in &self.fields {
            for (held_site, held) in field.numbers() {
                if site != Some(held_site) && number.intersects(&held.into()) {
                    return Err(SchemaError::NumberInUse {
                        number,
                        by: Declared::Field,
                    });
                }
            }
        }
        check_reserved_number(&self.reserved, number, site)
    }
}

impl FlagScope for Message {}

impl Document {
    pub fn message(&self, id: MessageId) -> &Message {
        self.assert_owned(id.1, id);
        &self.messages[id.0]
    }

    pub fn message_mut(&mut self, id: MessageId) -> MessageMut<'_> {
        self.message(id);
        MessageMut { doc: self, id }
    }

    /// A tentative top-level message.
    pub fn new_message(&self) -> NewMessage {
        NewMessage::new(Container::Document)
    }
}

/// Tentative message.
#[derive(Debug, Clone)]
pub struct NewMessage {
    parent: Container,
    label: Option<Identifier>,
}

impl NewMessage {
    fn new(parent: Container) -> Self {
        Self {
            parent,
            label: None,
        }
    }

    pub fn parent(&self) -> Container {
        self.parent
    }

    pub fn label(&self) -> Option<&Identifier> {
        self.label.as_ref()
    }

    pub fn set_label(&mut self, doc: &Document, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        replace_validated(self, |m| &mut m.label, Some(label), |m| m.check_label(doc).map(drop))
            .map(drop)
    }

    pub fn insert_into_parent(self, doc: &mut Document) -> Result<MessageId, Rejected<Self>> {
        let id = MessageId(doc.messages.len(), doc.tag);
        let message = finalize(self, "message", |m| {
            Ok(Message {
                id,
                parent: m.parent,
                label: m.check_label(doc)?,
                fields: Vec::new(),
                reserved: Vec::new(),
                messages: Vec::new(),
                enums: Vec::new(),
            })
        })?;
        debug!(%id, label = %message.label, parent = %message.parent, "message committed");
        let parent = message.parent;
        doc.messages.push(message);
        match parent {
            Container::Document => doc.top_messages.push(id),
            Container::Message(outer) => doc.messages[outer.0].messages.push(id),
        }
        Ok(id)
    }

    fn check_label(&self, doc: &Document) -> Result<Identifier, SchemaError> {
        let label = self.label.as_ref().ok_or(SchemaError::Unset(Attribute::Label))?;
        doc.label_scope(self.parent).validate_label(doc, label, None)?;
        Ok(label.clone())
    }
}

pub struct MessageMut<'a> {
    doc: &'a mut Document,
    id: MessageId,
}

impl MessageMut<'_> {
    pub fn set_label(&mut self, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        let id = self.id;
        replace_validated(self.doc, |doc| &mut doc.messages[id.0].label, label, |doc| {
            let message = doc.message(id);
            doc.label_scope(message.parent)
                .validate_label(doc, &message.label, Some(Site::Message(id)))
        })
        .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaConfig;
    use crate::error::ErrorKind;
    use crate::number::NumberRange;
    use crate::types::ScalarType;

    fn message(doc: &mut Document, label: &str) -> MessageId {
        let mut m = doc.new_message();
        m.set_label(doc, label).unwrap();
        m.insert_into_parent(doc).unwrap()
    }

    fn field(doc: &mut Document, id: MessageId, label: &str, number: u32) -> Result<(), SchemaError> {
        let mut f = doc.message(id).new_field();
        f.set_label(doc, label)?;
        f.set_number(doc, number)?;
        f.set_value_type(doc, ScalarType::String)?;
        f.insert_into_parent(doc)?;
        Ok(())
    }

    #[test]
    fn test_label_is_required() {
        let mut doc = Document::new();
        let rejected = doc.new_message().insert_into_parent(&mut doc).unwrap_err();
        assert_eq!(rejected.error(), &SchemaError::Unset(Attribute::Label));
        assert_eq!(doc.messages().count(), 0);
    }

    #[test]
    fn test_nested_labels_share_field_namespace() {
        let mut doc = Document::new();
        let outer = message(&mut doc, "Outer");
        field(&mut doc, outer, "inner", 1).unwrap();

        let mut nested = doc.message(outer).new_message();
        let err = nested.set_label(&doc, "inner").unwrap_err();
        assert_eq!(err, SchemaError::LabelInUse { label: "inner".into(), by: Declared::Field });

        nested.set_label(&doc, "Inner").unwrap();
        let inner = nested.insert_into_parent(&mut doc).unwrap();
        assert_eq!(doc.message(outer).messages(), [inner]);
        assert_eq!(doc.message(inner).parent(), Container::Message(outer));
        // nested messages never reach the top-level namespace
        assert_eq!(doc.messages().count(), 1);
        message(&mut doc, "Inner");
    }

    #[test]
    fn test_message_label_checked_against_document() {
        let mut doc = Document::new();
        let a = message(&mut doc, "A");
        message(&mut doc, "B");
        let err = doc.message_mut(a).set_label("B").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Uniqueness);
        assert_eq!(doc.message(a).label(), "A");
        doc.message_mut(a).set_label("A").unwrap();
        doc.message_mut(a).set_label("C").unwrap();
        assert_eq!(doc.message(a).label(), "C");
    }

    #[test]
    fn test_number_limits() {
        let mut doc = Document::new();
        let id = message(&mut doc, "Limits");
        assert!(matches!(field(&mut doc, id, "zero", 0), Err(SchemaError::BelowMinimum { .. })));
        assert!(matches!(
            field(&mut doc, id, "huge", 536_870_912),
            Err(SchemaError::AboveMaximum { .. })
        ));
        assert!(matches!(
            field(&mut doc, id, "internal", 19_500),
            Err(SchemaError::ImplementationReserved { .. })
        ));
        field(&mut doc, id, "highest", 536_870_911).unwrap();
    }

    #[test]
    fn test_reservations_may_cover_implementation_band() {
        let mut doc = Document::new();
        let id = message(&mut doc, "Band");
        let mut range = doc.message(id).new_reserved_range();
        range.set_start(&doc, 18_000).unwrap();
        range.set_end(&doc, 20_000).unwrap();
        range.insert_into_parent(&mut doc).unwrap();
    }

    #[test]
    fn test_configured_limits_apply() {
        let config = SchemaConfig {
            max_message_number: 100,
            implementation_reserved: Some(NumberRange::new(50, 60).unwrap()),
            ..SchemaConfig::default()
        };
        let mut doc = Document::with_config(config);
        let id = message(&mut doc, "Small");
        assert!(matches!(field(&mut doc, id, "big", 101), Err(SchemaError::AboveMaximum { max: 100, .. })));
        assert!(matches!(
            field(&mut doc, id, "mid", 55),
            Err(SchemaError::ImplementationReserved { start: 50, end: 60, .. })
        ));
        field(&mut doc, id, "fine", 61).unwrap();
    }
}
