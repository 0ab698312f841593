//! OneOfs - Exclusive Field Groups
//!
//! A oneof's label and its members' labels and numbers live in the owning
//! message's namespaces. A tentative oneof collects its members before it is
//! committed and must carry at least one.

use serde::Serialize;
use tracing::{debug, trace};

use crate::document::{finalize, Document};
use crate::error::{Declared, Rejected, SchemaError};
use crate::field::{required_label, required_number, required_type, MessageField};
use crate::identifier::Identifier;
use crate::ids::{MessageId, OneOfFieldId, OneOfId};
use crate::number::FieldNumber;
use crate::references::TypeSite;
use crate::scope::{
    replace_validated, Claimant, DefinitionScope, FlagKind, FlagScope, LabelScope, NumberScope, Site,
};
use crate::types::ValueType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OneOf {
    pub(crate) id: OneOfId,
    pub(crate) label: Identifier,
    pub(crate) fields: Vec<OneOfField>,
}

impl OneOf {
    pub fn id(&self) -> OneOfId {
        self.id
    }

    pub fn label(&self) -> &Identifier {
        &self.label
    }

    pub fn fields(&self) -> &[OneOfField] {
        &self.fields
    }

    /// A tentative member for this committed oneof.
    pub fn new_field(&self) -> NewOneOfField {
        NewOneOfField::new(OneOfParent::Committed(self.id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OneOfField {
    pub(crate) id: OneOfFieldId,
    pub(crate) label: Identifier,
    pub(crate) number: u32,
    pub(crate) value_type: ValueType,
    pub(crate) deprecated: bool,
}

impl OneOfField {
    pub fn id(&self) -> OneOfFieldId {
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

    pub fn deprecated(&self) -> bool {
        self.deprecated
    }
}

// Members share the message namespaces, which already cover every oneof.
impl LabelScope for OneOf {
    fn validate_label(
        &self,
        doc: &Document,
        label: &Identifier,
        site: Option<Site>,
    ) -> Result<(), SchemaError> {
        doc.message(self.id.message()).validate_label(doc, label, site)
    }
}

impl NumberScope for OneOf {
    fn validate_number(
        &self,
        doc: &Document,
        number: FieldNumber,
        claimant: Claimant,
        site: Option<Site>,
    ) -> Result<(), SchemaError> {
        doc.message(self.id.message())
            .validate_number(doc, number, claimant, site)
    }
}

impl FlagScope for OneOf {}

impl Document {
    pub fn oneof(&self, id: OneOfId) -> &OneOf {
        match &self.message(id.message()).fields[id.0.index] {
            MessageField::OneOf(o) => o,
            _ => unreachable!("oneof handle points at another field kind"),
        }
    }

    pub fn oneof_field(&self, id: OneOfFieldId) -> &OneOfField {
        &self.oneof(id.oneof()).fields[id.index]
    }

    pub fn oneof_mut(&mut self, id: OneOfId) -> OneOfMut<'_> {
        self.oneof(id);
        OneOfMut { doc: self, id }
    }

    pub fn oneof_field_mut(&mut self, id: OneOfFieldId) -> OneOfFieldMut<'_> {
        self.oneof_field(id);
        OneOfFieldMut { doc: self, id }
    }
}

fn oneof_entry(doc: &mut Document, id: OneOfId) -> &mut OneOf {
    match &mut doc.messages[id.0.message.0].fields[id.0.index] {
        MessageField::OneOf(o) => o,
        _ => unreachable!("oneof handle points at another field kind"),
    }
}

fn member_entry(doc: &mut Document, id: OneOfFieldId) -> &mut OneOfField {
    &mut oneof_entry(doc, id.oneof).fields[id.index]
}

/// Tentative oneof with its attached members.
#[derive(Debug, Clone)]
pub struct NewOneOf {
    message: MessageId,
    label: Option<Identifier>,
    fields: Vec<NewOneOfField>,
}

impl NewOneOf {
    pub(crate) fn new(message: MessageId) -> Self {
        Self {
            message,
            label: None,
            fields: Vec::new(),
        }
    }

    pub fn message(&self) -> MessageId {
        self.message
    }

    pub fn label(&self) -> Option<&Identifier> {
        self.label.as_ref()
    }

    /// Members attached so far.
    pub fn fields(&self) -> &[NewOneOfField] {
        &self.fields
    }

    /// A tentative member, to be handed back through [`NewOneOf::attach`].
    pub fn new_field(&self) -> NewOneOfField {
        NewOneOfField::new(OneOfParent::Pending(self.message))
    }

    pub fn set_label(&mut self, doc: &Document, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        replace_validated(self, |o| &mut o.label, Some(label), |o| o.check_label(doc).map(drop))
            .map(drop)
    }

    /// Adds a fully set member after checking it against the message and the
    /// members already attached.
    pub fn attach(&mut self, doc: &Document, field: NewOneOfField) -> Result<(), Rejected<NewOneOfField>> {
        match self.check_member(doc, &field, &self.fields) {
            Ok(_) => {
                self.fields.push(field);
                Ok(())
            }
            Err(error) => {
                trace!(%error, "oneof member rejected");
                Err(Rejected::new(field, error))
            }
        }
    }

    pub fn insert_into_parent(self, doc: &mut Document) -> Result<OneOfId, Rejected<Self>> {
        let id = OneOfId(doc.next_field_slot(self.message));
        let oneof = finalize(self, "oneof", |o| o.validated(doc, id))?;
        for field in &oneof.fields {
            doc.references
                .rebind(TypeSite::OneOfField(field.id), None, field.value_type.definition());
        }
        debug!(
            parent = %id.message(),
            label = %oneof.label,
            members = oneof.fields.len(),
            "oneof committed"
        );
        doc.messages[id.message().0].fields.push(MessageField::OneOf(oneof));
        Ok(id)
    }

    fn check_label(&self, doc: &Document) -> Result<Identifier, SchemaError> {
        let label = required_label(doc.message(self.message), doc, self.label.as_ref())?;
        if self.fields.iter().any(|f| f.label.as_ref() == Some(&label)) {
            return Err(SchemaError::LabelInUse {
                label: label.to_string(),
                by: Declared::Field,
            });
        }
        Ok(label)
    }

    fn check_member(
        &self,
        doc: &Document,
        field: &NewOneOfField,
        siblings: &[NewOneOfField],
    ) -> Result<(Identifier, u32, ValueType), SchemaError> {
        if field.parent != OneOfParent::Pending(self.message) {
            return Err(SchemaError::Detached);
        }
        let (label, number, value_type) = field.parts(doc)?;
        if self.label.as_ref() == Some(&label) {
            return Err(SchemaError::LabelInUse {
                label: label.to_string(),
                by: Declared::OneOf,
            });
        }
        for sibling in siblings {
            if sibling.label.as_ref() == Some(&label) {
                return Err(SchemaError::LabelInUse {
                    label: label.to_string(),
                    by: Declared::Field,
                });
            }
            if sibling.number == Some(number) {
                return Err(SchemaError::NumberInUse {
                    number: number.into(),
                    by: Declared::Field,
                });
            }
        }
        Ok((label, number, value_type))
    }

    fn validated(&self, doc: &Document, id: OneOfId) -> Result<OneOf, SchemaError> {
        let label = self.check_label(doc)?;
        if self.fields.is_empty() {
            return Err(SchemaError::EmptyOneOf);
        }
        let mut fields = Vec::with_capacity(self.fields.len());
        for (index, field) in self.fields.iter().enumerate() {
            let (label, number, value_type) = self.check_member(doc, field, &self.fields[..index])?;
            fields.push(OneOfField {
                id: OneOfFieldId { oneof: id, index },
                label,
                number,
                value_type,
                deprecated: field.deprecated,
            });
        }
        Ok(OneOf { id, label, fields })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OneOfParent {
    /// Created by a tentative oneof of this message.
    Pending(MessageId),
    Committed(OneOfId),
}

/// Tentative oneof member.
#[derive(Debug, Clone)]
pub struct NewOneOfField {
    parent: OneOfParent,
    label: Option<Identifier>,
    number: Option<u32>,
    value_type: Option<ValueType>,
    deprecated: bool,
}

impl NewOneOfField {
    fn new(parent: OneOfParent) -> Self {
        Self {
            parent,
            label: None,
            number: None,
            value_type: None,
            deprecated: false,
        }
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

    pub fn deprecated(&self) -> bool {
        self.deprecated
    }

    pub fn set_label(&mut self, doc: &Document, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        replace_validated(self, |f| &mut f.label, Some(label), |f| {
            required_label(f.scope(doc), doc, f.label.as_ref()).map(drop)
        })
        .map(drop)
    }

    pub fn set_number(&mut self, doc: &Document, value: u32) -> Result<(), SchemaError> {
        replace_validated(self, |f| &mut f.number, Some(value), |f| {
            required_number(f.scope(doc), doc, f.number).map(drop)
        })
        .map(drop)
    }

    pub fn set_value_type(&mut self, doc: &Document, value: impl Into<ValueType>) -> Result<(), SchemaError> {
        replace_validated(self, |f| &mut f.value_type, Some(value.into()), |f| {
            required_type(doc, f.value_type).map(drop)
        })
        .map(drop)
    }

    pub fn set_deprecated(&mut self, value: bool) {
        self.deprecated = value;
    }

    /// Commits a member of an already committed oneof. Members of a tentative
    /// oneof go through [`NewOneOf::attach`] instead.
    pub fn insert_into_parent(self, doc: &mut Document) -> Result<OneOfFieldId, Rejected<Self>> {
        let field = finalize(self, "oneof field", |f| {
            let OneOfParent::Committed(oneof) = f.parent else {
                return Err(SchemaError::Detached);
            };
            let (label, number, value_type) = f.parts(doc)?;
            Ok(OneOfField {
                id: OneOfFieldId {
                    oneof,
                    index: doc.oneof(oneof).fields.len(),
                },
                label,
                number,
                value_type,
                deprecated: f.deprecated,
            })
        })?;
        let id = field.id;
        debug!(parent = %id.message(), label = %field.label, number = field.number, "oneof field committed");
        doc.references
            .rebind(TypeSite::OneOfField(id), None, field.value_type.definition());
        oneof_entry(doc, id.oneof).fields.push(field);
        Ok(id)
    }

    fn scope<'d>(&self, doc: &'d Document) -> &'d dyn DefinitionScope {
        match self.parent {
            OneOfParent::Pending(message) => doc.message(message),
            OneOfParent::Committed(oneof) => doc.oneof(oneof),
        }
    }

    fn parts(&self, doc: &Document) -> Result<(Identifier, u32, ValueType), SchemaError> {
        let scope = self.scope(doc);
        Ok((
            required_label(scope, doc, self.label.as_ref())?,
            required_number(scope, doc, self.number)?,
            required_type(doc, self.value_type)?,
        ))
    }
}

pub struct OneOfMut<'a> {
    doc: &'a mut Document,
    id: OneOfId,
}

impl OneOfMut<'_> {
    pub fn set_label(&mut self, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        let id = self.id;
        replace_validated(self.doc, |doc| &mut oneof_entry(doc, id).label, label, |doc| {
            let oneof = doc.oneof(id);
            oneof.validate_label(doc, &oneof.label, Some(Site::Field(id.0)))
        })
        .map(drop)
    }
}

pub struct OneOfFieldMut<'a> {
    doc: &'a mut Document,
    id: OneOfFieldId,
}

impl OneOfFieldMut<'_> {
    pub fn set_label(&mut self, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        let id = self.id;
        replace_validated(self.doc, |doc| &mut member_entry(doc, id).label, label, |doc| {
            doc.oneof(id.oneof())
                .validate_label(doc, &doc.oneof_field(id).label, Some(Site::OneOfField(id)))
        })
        .map(drop)
    }

    pub fn set_number(&mut self, value: u32) -> Result<(), SchemaError> {
        let id = self.id;
        replace_validated(self.doc, |doc| &mut member_entry(doc, id).number, value, |doc| {
            doc.oneof(id.oneof()).validate_number(
                doc,
                value.into(),
                Claimant::Field,
                Some(Site::OneOfField(id)),
            )
        })
        .map(drop)
    }

    pub fn set_value_type(&mut self, value: impl Into<ValueType>) -> Result<(), SchemaError> {
        let value = value.into();
        let id = self.id;
        let previous = replace_validated(self.doc, |doc| &mut member_entry(doc, id).value_type, value, |doc| {
            doc.check_value_type(&value)
        })?;
        self.doc
            .references
            .rebind(TypeSite::OneOfField(id), previous.definition(), value.definition());
        Ok(())
    }

    pub fn set_deprecated(&mut self, value: bool) -> Result<(), SchemaError> {
        let id = self.id;
        replace_validated(self.doc, |doc| &mut member_entry(doc, id).deprecated, value, |doc| {
            doc.oneof(id.oneof()).validate_flag(FlagKind::Deprecated, value)
        })
        .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Attribute, ErrorKind};
    use crate::types::ScalarType;

    fn message(doc: &mut Document, label: &str) -> MessageId {
        let mut m = doc.new_message();
        m.set_label(doc, label).unwrap();
        m.insert_into_parent(doc).unwrap()
    }

    fn member(doc: &Document, oneof: &NewOneOf, label: &str, number: u32) -> NewOneOfField {
        let mut f = oneof.new_field();
        f.set_label(doc, label).unwrap();
        f.set_number(doc, number).unwrap();
        f.set_value_type(doc, ScalarType::Int32).unwrap();
        f
    }

    #[test]
    fn test_oneof_requires_member() {
        let mut doc = Document::new();
        let id = message(&mut doc, "Shape");
        let mut oneof = doc.message(id).new_oneof();
        oneof.set_label(&doc, "kind").unwrap();
        let rejected = oneof.insert_into_parent(&mut doc).unwrap_err();
        assert_eq!(rejected.error(), &SchemaError::EmptyOneOf);

        let mut oneof = rejected.into_builder();
        let circle = member(&doc, &oneof, "circle", 1);
        oneof.attach(&doc, circle).unwrap();
        let oid = oneof.insert_into_parent(&mut doc).unwrap();
        assert_eq!(doc.oneof(oid).fields().len(), 1);
        assert_eq!(doc.message(id).fields()[0].label(), "kind");
    }

    #[test]
    fn test_members_checked_against_each_other() {
        let mut doc = Document::new();
        let id = message(&mut doc, "Shape");
        let mut oneof = doc.message(id).new_oneof();
        oneof.set_label(&doc, "kind").unwrap();
        let first = member(&doc, &oneof, "circle", 1);
        oneof.attach(&doc, first).unwrap();

        let same_number = member(&doc, &oneof, "square", 1);
        let rejected = oneof.attach(&doc, same_number).unwrap_err();
        assert_eq!(rejected.error().kind(), ErrorKind::Uniqueness);

        let same_label = member(&doc, &oneof, "circle", 2);
        assert!(oneof.attach(&doc, same_label).is_err());

        let own_label = member(&doc, &oneof, "kind", 3);
        assert!(oneof.attach(&doc, own_label).is_err());
        assert_eq!(oneof.fields().len(), 1);
    }

    #[test]
    fn test_members_checked_against_message() {
        let mut doc = Document::new();
        let id = message(&mut doc, "Shape");
        let mut f = doc.message(id).new_field();
        f.set_label(&doc, "name").unwrap();
        f.set_number(&doc, 1).unwrap();
        f.set_value_type(&doc, ScalarType::String).unwrap();
        f.insert_into_parent(&mut doc).unwrap();

        let mut oneof = doc.message(id).new_oneof();
        assert!(oneof.set_label(&doc, "name").is_err());
        let mut candidate = oneof.new_field();
        assert!(candidate.set_label(&doc, "name").is_err());
        assert!(candidate.set_number(&doc, 1).is_err());
        assert_eq!((candidate.label(), candidate.number()), (None, None));
    }

    #[test]
    fn test_member_from_other_message_is_detached() {
        let mut doc = Document::new();
        let a = message(&mut doc, "A");
        let b = message(&mut doc, "B");
        let mut oneof_a = doc.message(a).new_oneof();
        let oneof_b = doc.message(b).new_oneof();
        let stray = member(&doc, &oneof_b, "value", 1);
        let rejected = oneof_a.attach(&doc, stray).unwrap_err();
        assert_eq!(rejected.error(), &SchemaError::Detached);

        let loose = member(&doc, &oneof_b, "loose", 2);
        let rejected = loose.insert_into_parent(&mut doc).unwrap_err();
        assert_eq!(rejected.error(), &SchemaError::Detached);
    }

    #[test]
    fn test_committed_oneof_grows() {
        let mut doc = Document::new();
        let id = message(&mut doc, "Shape");
        let mut oneof = doc.message(id).new_oneof();
        oneof.set_label(&doc, "kind").unwrap();
        let circle = member(&doc, &oneof, "circle", 1);
        oneof.attach(&doc, circle).unwrap();
        let oid = oneof.insert_into_parent(&mut doc).unwrap();

        let mut square = doc.oneof(oid).new_field();
        assert!(square.set_number(&doc, 1).is_err());
        square.set_label(&doc, "square").unwrap();
        square.set_number(&doc, 2).unwrap();
        square.set_value_type(&doc, ScalarType::Double).unwrap();
        let sid = square.insert_into_parent(&mut doc).unwrap();
        assert_eq!(doc.oneof_field(sid).number(), 2);

        assert!(doc.oneof_field_mut(sid).set_label("circle").is_err());
        assert!(doc.oneof_mut(oid).set_label("square").is_err());
        doc.oneof_mut(oid).set_label("shape").unwrap();
        doc.oneof_field_mut(sid).set_deprecated(true).unwrap();
        assert!(doc.oneof_field(sid).deprecated());

        // a plain field cannot reuse a member's number
        let mut f = doc.message(id).new_field();
        assert!(f.set_number(&doc, 2).is_err());
        let rejected = f.insert_into_parent(&mut doc).unwrap_err();
        assert_eq!(rejected.error(), &SchemaError::Unset(Attribute::Label));
    }
}
