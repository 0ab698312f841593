//! Reservations - Numbers, Ranges and Labels Withheld from a Definition
//!
//! Messages and enums own reservations. A reservation claims its number or
//! label in the owner's scope exactly like a field does, but it can never
//! alias an enum variant and it is not subject to the implementation
//! reserved band.

use serde::Serialize;
use tracing::debug;

use crate::document::{finalize, Document};
use crate::error::{Attribute, Declared, Rejected, SchemaError};
use crate::identifier::Identifier;
use crate::ids::{Definition, ReservationSlot, ReservedLabelId, ReservedNumberId, ReservedRangeId};
use crate::number::{FieldNumber, NumberRange};
use crate::scope::{replace_validated, Claimant, Site};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservedNumber {
    id: ReservedNumberId,
    number: u32,
}

impl ReservedNumber {
    pub fn id(&self) -> ReservedNumberId {
        self.id
    }

    pub fn number(&self) -> u32 {
        self.number
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservedRange {
    id: ReservedRangeId,
    range: NumberRange,
}

impl ReservedRange {
    pub fn id(&self) -> ReservedRangeId {
        self.id
    }

    pub fn range(&self) -> NumberRange {
        self.range
    }

    pub fn start(&self) -> u32 {
        self.range.start()
    }

    pub fn end(&self) -> u32 {
        self.range.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservedLabel {
    id: ReservedLabelId,
    label: Identifier,
}

impl ReservedLabel {
    pub fn id(&self) -> ReservedLabelId {
        self.id
    }

    pub fn label(&self) -> &Identifier {
        &self.label
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reservation {
    Number(ReservedNumber),
    Range(ReservedRange),
    Label(ReservedLabel),
}

impl Reservation {
    pub(crate) fn slot(&self) -> ReservationSlot {
        match self {
            Reservation::Number(r) => r.id.0,
            Reservation::Range(r) => r.id.0,
            Reservation::Label(r) => r.id.0,
        }
    }

    /// Numbers claimed, if this is a number or range reservation.
    pub fn number(&self) -> Option<FieldNumber> {
        match self {
            Reservation::Number(r) => Some(r.number.into()),
            Reservation::Range(r) => Some(r.range.into()),
            Reservation::Label(_) => None,
        }
    }

    pub fn label(&self) -> Option<&Identifier> {
        match self {
            Reservation::Label(r) => Some(&r.label),
            _ => None,
        }
    }
}

/// Fails if a reservation other than `site` already holds `label`.
pub(crate) fn check_reserved_label(
    reserved: &[Reservation],
    label: &Identifier,
    site: Option<Site>,
) -> Result<(), SchemaError> {
    let taken = reserved
        .iter()
        .filter(|r| site != Some(Site::Reservation(r.slot())))
        .any(|r| r.label() == Some(label));
    if taken {
        return Err(SchemaError::LabelInUse {
            label: label.to_string(),
            by: Declared::Reservation,
        });
    }
    Ok(())
}

/// Fails if a reservation other than `site` intersects `number`.
pub(crate) fn check_reserved_number(
    reserved: &[Reservation],
    number: FieldNumber,
    site: Option<Site>,
) -> Result<(), SchemaError> {
    let taken = reserved
        .iter()
        .filter(|r| site != Some(Site::Reservation(r.slot())))
        .filter_map(Reservation::number)
        .any(|held| held.intersects(&number));
    if taken {
        return Err(SchemaError::NumberInUse {
            number,
            by: Declared::Reservation,
        });
    }
    Ok(())
}

impl Document {
    fn reservations(&self, owner: Definition) -> &[Reservation] {
        match owner {
            Definition::Message(id) => &self.message(id).reserved,
            Definition::Enum(id) => &self.enumeration(id).reserved,
        }
    }

    fn reservations_mut(&mut self, owner: Definition) -> &mut Vec<Reservation> {
        match owner {
            Definition::Message(id) => &mut self.messages[id.0].reserved,
            Definition::Enum(id) => &mut self.enums[id.0].reserved,
        }
    }

    fn reservation_entry(&mut self, slot: ReservationSlot) -> &mut Reservation {
        &mut self.reservations_mut(slot.owner)[slot.index]
    }

    fn push_reservation(&mut self, reservation: Reservation) {
        let owner = reservation.slot().owner;
        self.reservations_mut(owner).push(reservation);
    }

    pub fn reserved_number(&self, id: ReservedNumberId) -> &ReservedNumber {
        match &self.reservations(id.owner())[id.0.index] {
            Reservation::Number(r) => r,
            _ => unreachable!("reserved number handle points at another reservation kind"),
        }
    }

    pub fn reserved_range(&self, id: ReservedRangeId) -> &ReservedRange {
        match &self.reservations(id.owner())[id.0.index] {
            Reservation::Range(r) => r,
            _ => unreachable!("reserved range handle points at another reservation kind"),
        }
    }

    pub fn reserved_label(&self, id: ReservedLabelId) -> &ReservedLabel {
        match &self.reservations(id.owner())[id.0.index] {
            Reservation::Label(r) => r,
            _ => unreachable!("reserved label handle points at another reservation kind"),
        }
    }

    pub fn reserved_number_mut(&mut self, id: ReservedNumberId) -> ReservedNumberMut<'_> {
        self.reserved_number(id);
        ReservedNumberMut { doc: self, id }
    }

    pub fn reserved_range_mut(&mut self, id: ReservedRangeId) -> ReservedRangeMut<'_> {
        self.reserved_range(id);
        ReservedRangeMut { doc: self, id }
    }

    pub fn reserved_label_mut(&mut self, id: ReservedLabelId) -> ReservedLabelMut<'_> {
        self.reserved_label(id);
        ReservedLabelMut { doc: self, id }
    }

    fn next_reservation_slot(&self, owner: Definition) -> ReservationSlot {
        ReservationSlot {
            owner,
            index: self.reservations(owner).len(),
        }
    }
}

/// Tentative reservation of a single number.
#[derive(Debug, Clone)]
pub struct NewReservedNumber {
    owner: Definition,
    number: Option<u32>,
}

impl NewReservedNumber {
    pub(crate) fn new(owner: Definition) -> Self {
        Self { owner, number: None }
    }

    pub fn owner(&self) -> Definition {
        self.owner
    }

    pub fn get(&self) -> Option<u32> {
        self.number
    }

    pub fn set(&mut self, doc: &Document, value: u32) -> Result<(), SchemaError> {
        replace_validated(self, |r| &mut r.number, Some(value), |r| {
            r.check_number(doc).map(drop)
        })
        .map(drop)
    }

    pub fn insert_into_parent(self, doc: &mut Document) -> Result<ReservedNumberId, Rejected<Self>> {
        let id = ReservedNumberId(doc.next_reservation_slot(self.owner));
        let reserved = finalize(self, "reserved number", |r| {
            Ok(ReservedNumber {
                id,
                number: r.check_number(doc)?,
            })
        })?;
        debug!(owner = %id.owner(), number = reserved.number, "reserved number committed");
        doc.push_reservation(Reservation::Number(reserved));
        Ok(id)
    }

    fn check_number(&self, doc: &Document) -> Result<u32, SchemaError> {
        let number = self.number.ok_or(SchemaError::Unset(Attribute::Number))?;
        doc.definition_scope(self.owner)
            .validate_number(doc, number.into(), Claimant::Reservation, None)?;
        Ok(number)
    }
}

/// Tentative reservation of an inclusive number range.
///
/// While only one endpoint is set, that endpoint is checked on its own.
#[derive(Debug, Clone)]
pub struct NewReservedRange {
    owner: Definition,
    start: Option<u32>,
    end: Option<u32>,
}

impl NewReservedRange {
    pub(crate) fn new(owner: Definition) -> Self {
        Self {
            owner,
            start: None,
            end: None,
        }
    }

    pub fn owner(&self) -> Definition {
        self.owner
    }

    pub fn start(&self) -> Option<u32> {
        self.start
    }

    pub fn end(&self) -> Option<u32> {
        self.end
    }

    pub fn set_start(&mut self, doc: &Document, value: u32) -> Result<(), SchemaError> {
        replace_validated(self, |r| &mut r.start, Some(value), |r| r.check_partial(doc)).map(drop)
    }

    pub fn set_end(&mut self, doc: &Document, value: u32) -> Result<(), SchemaError> {
        replace_validated(self, |r| &mut r.end, Some(value), |r| r.check_partial(doc)).map(drop)
    }

    pub fn insert_into_parent(self, doc: &mut Document) -> Result<ReservedRangeId, Rejected<Self>> {
        let id = ReservedRangeId(doc.next_reservation_slot(self.owner));
        let reserved = finalize(self, "reserved range", |r| r.validated(doc, id))?;
        debug!(
            owner = %id.owner(),
            start = reserved.start(),
            end = reserved.end(),
            "reserved range committed"
        );
        doc.push_reservation(Reservation::Range(reserved));
        Ok(id)
    }

    fn candidate(&self) -> Result<Option<FieldNumber>, SchemaError> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Ok(Some(NumberRange::new(start, end)?.into())),
            (Some(n), None) | (None, Some(n)) => Ok(Some(n.into())),
            (None, None) => Ok(None),
        }
    }

    fn check_partial(&self, doc: &Document) -> Result<(), SchemaError> {
        match self.candidate()? {
            Some(number) => doc.definition_scope(self.owner).validate_number(
                doc,
                number,
                Claimant::Reservation,
                None,
            ),
            None => Ok(()),
        }
    }

    fn validated(&self, doc: &Document, id: ReservedRangeId) -> Result<ReservedRange, SchemaError> {
        let start = self.start.ok_or(SchemaError::Unset(Attribute::RangeStart))?;
        let end = self.end.ok_or(SchemaError::Unset(Attribute::RangeEnd))?;
        let range = NumberRange::new(start, end)?;
        doc.definition_scope(self.owner)
            .validate_number(doc, range.into(), Claimant::Reservation, None)?;
        Ok(ReservedRange { id, range })
    }
}

/// Tentative reservation of a label.
#[derive(Debug, Clone)]
pub struct NewReservedLabel {
    owner: Definition,
    label: Option<Identifier>,
}

impl NewReservedLabel {
    pub(crate) fn new(owner: Definition) -> Self {
        Self { owner, label: None }
    }

    pub fn owner(&self) -> Definition {
        self.owner
    }

    pub fn get(&self) -> Option<&Identifier> {
        self.label.as_ref()
    }

    pub fn set(&mut self, doc: &Document, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        replace_validated(self, |r| &mut r.label, Some(label), |r| r.check_label(doc).map(drop))
            .map(drop)
    }

    pub fn insert_into_parent(self, doc: &mut Document) -> Result<ReservedLabelId, Rejected<Self>> {
        let id = ReservedLabelId(doc.next_reservation_slot(self.owner));
        let reserved = finalize(self, "reserved label", |r| {
            Ok(ReservedLabel {
                id,
                label: r.check_label(doc)?,
            })
        })?;
        debug!(owner = %id.owner(), label = %reserved.label, "reserved label committed");
        doc.push_reservation(Reservation::Label(reserved));
        Ok(id)
    }

    fn check_label(&self, doc: &Document) -> Result<Identifier, SchemaError> {
        let label = self.label.as_ref().ok_or(SchemaError::Unset(Attribute::Label))?;
        doc.definition_scope(self.owner).validate_label(doc, label, None)?;
        Ok(label.clone())
    }
}

pub struct ReservedNumberMut<'a> {
    doc: &'a mut Document,
    id: ReservedNumberId,
}

impl ReservedNumberMut<'_> {
    pub fn set(&mut self, value: u32) -> Result<(), SchemaError> {
        let id = self.id;
        replace_validated(
            self.doc,
            |doc| match doc.reservation_entry(id.0) {
                Reservation::Number(r) => &mut r.number,
                _ => unreachable!("reserved number handle points at another reservation kind"),
            },
            value,
            |doc| {
                doc.definition_scope(id.owner()).validate_number(
                    doc,
                    value.into(),
                    Claimant::Reservation,
                    Some(Site::Reservation(id.0)),
                )
            },
        )
        .map(drop)
    }
}

pub struct ReservedRangeMut<'a> {
    doc: &'a mut Document,
    id: ReservedRangeId,
}

impl ReservedRangeMut<'_> {
    pub fn set_start(&mut self, value: u32) -> Result<(), SchemaError> {
        let end = self.doc.reserved_range(self.id).end();
        self.replace(NumberRange::new(value, end)?)
    }

    pub fn set_end(&mut self, value: u32) -> Result<(), SchemaError> {
        let start = self.doc.reserved_range(self.id).start();
        self.replace(NumberRange::new(start, value)?)
    }

    fn replace(&mut self, range: NumberRange) -> Result<(), SchemaError> {
        let id = self.id;
        replace_validated(
            self.doc,
            |doc| match doc.reservation_entry(id.0) {
                Reservation::Range(r) => &mut r.range,
                _ => unreachable!("reserved range handle points at another reservation kind"),
            },
            range,
            |doc| {
                doc.definition_scope(id.owner()).validate_number(
                    doc,
                    range.into(),
                    Claimant::Reservation,
                    Some(Site::Reservation(id.0)),
                )
            },
        )
        .map(drop)
    }
}

pub struct ReservedLabelMut<'a> {
    doc: &'a mut Document,
    id: ReservedLabelId,
}

impl ReservedLabelMut<'_> {
    pub fn set(&mut self, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        let id = self.id;
        replace_validated(
            self.doc,
            |doc| match doc.reservation_entry(id.0) {
                Reservation::Label(r) => &mut r.label,
                _ => unreachable!("reserved label handle points at another reservation kind"),
            },
            label,
            |doc| {
                doc.definition_scope(id.owner()).validate_label(
                    doc,
                    doc.reserved_label(id).label(),
                    Some(Site::Reservation(id.0)),
                )
            },
        )
        .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ids::MessageId;
    use crate::types::ScalarType;

    fn message(doc: &mut Document) -> MessageId {
        let mut m = doc.new_message();
        m.set_label(doc, "Holder").unwrap();
        m.insert_into_parent(doc).unwrap()
    }

    #[test]
    fn test_range_commit_requires_both_endpoints() {
        let mut doc = Document::new();
        let id = message(&mut doc);

        let mut range = doc.message(id).new_reserved_range();
        range.set_start(&doc, 5).unwrap();
        let rejected = range.insert_into_parent(&mut doc).unwrap_err();
        assert_eq!(rejected.error(), &SchemaError::Unset(Attribute::RangeEnd));

        let mut range = rejected.into_builder();
        assert!(range.set_end(&doc, 5).is_err());
        assert_eq!(range.end(), None);
        range.set_end(&doc, 9).unwrap();
        let rid = range.insert_into_parent(&mut doc).unwrap();
        assert_eq!(doc.reserved_range(rid).range(), NumberRange::new(5, 9).unwrap());
    }

    #[test]
    fn test_single_endpoint_checked_alone() {
        let mut doc = Document::new();
        let id = message(&mut doc);
        let mut number = doc.message(id).new_reserved_number();
        number.set(&doc, 1).unwrap();
        number.insert_into_parent(&mut doc).unwrap();

        let mut range = doc.message(id).new_reserved_range();
        let err = range.set_start(&doc, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Uniqueness);
        assert_eq!(range.start(), None);
    }

    #[test]
    fn test_committed_range_endpoints_stay_ordered() {
        let mut doc = Document::new();
        let id = message(&mut doc);
        let mut range = doc.message(id).new_reserved_range();
        range.set_start(&doc, 10).unwrap();
        range.set_end(&doc, 20).unwrap();
        let rid = range.insert_into_parent(&mut doc).unwrap();

        assert_eq!(
            doc.reserved_range_mut(rid).set_start(20),
            Err(SchemaError::InvalidRange { start: 20, end: 20 })
        );
        doc.reserved_range_mut(rid).set_start(15).unwrap();
        doc.reserved_range_mut(rid).set_end(30).unwrap();
        assert_eq!((doc.reserved_range(rid).start(), doc.reserved_range(rid).end()), (15, 30));
    }

    #[test]
    fn test_reserved_labels_unique() {
        let mut doc = Document::new();
        let id = message(&mut doc);
        let mut first = doc.message(id).new_reserved_label();
        first.set(&doc, "legacy").unwrap();
        let rid = first.insert_into_parent(&mut doc).unwrap();

        let mut second = doc.message(id).new_reserved_label();
        assert_eq!(
            second.set(&doc, "legacy"),
            Err(SchemaError::LabelInUse {
                label: "legacy".into(),
                by: Declared::Reservation,
            })
        );
        // rewriting a label to itself is not a collision
        doc.reserved_label_mut(rid).set("legacy").unwrap();
        assert!(doc.reserved_label_mut(rid).set("not valid").is_err());
        assert_eq!(doc.reserved_label(rid).label(), "legacy");
    }

    #[test]
    fn test_reserved_label_shares_field_namespace() {
        let mut doc = Document::new();
        let id = message(&mut doc);
        let mut reserved = doc.message(id).new_reserved_label();
        reserved.set(&doc, "legacy").unwrap();
        reserved.insert_into_parent(&mut doc).unwrap();

        let mut field = doc.message(id).new_field();
        assert_eq!(
            field.set_label(&doc, "legacy"),
            Err(SchemaError::LabelInUse {
                label: "legacy".into(),
                by: Declared::Reservation,
            })
        );
        assert!(field.label().is_none());

        field.set_label(&doc, "name").unwrap();
        field.set_number(&doc, 1).unwrap();
        field.set_value_type(&doc, ScalarType::String).unwrap();
        field.insert_into_parent(&mut doc).unwrap();

        let mut late = doc.message(id).new_reserved_label();
        assert_eq!(
            late.set(&doc, "name"),
            Err(SchemaError::LabelInUse {
                label: "name".into(),
                by: Declared::Field,
            })
        );
        assert_eq!(late.get(), None);
    }

    #[test]
    fn test_enum_reserved_label_against_variants() {
        let mut doc = Document::new();
        let mut e = doc.new_enum();
        e.set_label(&doc, "Status").unwrap();
        let eid = e.insert_into_parent(&mut doc).unwrap();

        let mut variant = doc.enumeration(eid).new_variant();
        variant.set_label(&doc, "ACTIVE").unwrap();
        variant.set_number(&doc, 0).unwrap();
        variant.insert_into_parent(&mut doc).unwrap();

        let mut reserved = doc.enumeration(eid).new_reserved_label();
        assert_eq!(
            reserved.set(&doc, "ACTIVE"),
            Err(SchemaError::LabelInUse {
                label: "ACTIVE".into(),
                by: Declared::Variant,
            })
        );
        reserved.set(&doc, "RETIRED").unwrap();
        let rid = reserved.insert_into_parent(&mut doc).unwrap();
        assert_eq!(rid.owner(), Definition::Enum(eid));
        assert_eq!(doc.reserved_label(rid).label(), "RETIRED");

        let mut variant = doc.enumeration(eid).new_variant();
        assert_eq!(
            variant.set_label(&doc, "RETIRED"),
            Err(SchemaError::LabelInUse {
                label: "RETIRED".into(),
                by: Declared::Reservation,
            })
        );
        assert_eq!(doc.enumeration(eid).reserved().len(), 1);
    }
}
