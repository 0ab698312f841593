//! Enums - Variants, Reservations and the Aliasing Rule
//!
//! Variant numbers are unique unless `allow_alias` is on, in which case
//! variants may share a number. Reservations never alias, and aliasing
//! cannot be switched off while any two variants share a number.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::document::{finalize, Container, Document};
use crate::error::{Attribute, Declared, Rejected, SchemaError};
use crate::identifier::Identifier;
use crate::ids::{EnumId, VariantId};
use crate::number::FieldNumber;
use crate::reserved::{
    check_reserved_label, check_reserved_number, NewReservedLabel, NewReservedNumber,
    NewReservedRange, Reservation,
};
use crate::scope::{replace_validated, Claimant, FlagKind, FlagScope, LabelScope, NumberScope, Site};

#[derive(Debug, Clone, Serialize)]
pub struct Enum {
    pub(crate) id: EnumId,
    pub(crate) parent: Container,
    pub(crate) label: Identifier,
    pub(crate) allow_alias: bool,
    pub(crate) variants: Vec<Variant>,
    pub(crate) reserved: Vec<Reservation>,
}

impl Enum {
    pub fn id(&self) -> EnumId {
        self.id
    }

    pub fn parent(&self) -> Container {
        self.parent
    }

    pub fn label(&self) -> &Identifier {
        &self.label
    }

    pub fn allow_alias(&self) -> bool {
        self.allow_alias
    }

    /// Variants in commit order.
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn reserved(&self) -> &[Reservation] {
        &self.reserved
    }

    /// Alias groups: every number held by more than one variant.
    pub fn aliases(&self) -> BTreeMap<u32, Vec<VariantId>> {
        let mut groups: BTreeMap<u32, Vec<VariantId>> = BTreeMap::new();
        for variant in &self.variants {
            groups.entry(variant.number).or_default().push(variant.id);
        }
        groups.retain(|_, ids| ids.len() > 1);
        groups
    }

    pub fn new_variant(&self) -> NewVariant {
        NewVariant::new(self.id)
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
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    pub(crate) id: VariantId,
    pub(crate) label: Identifier,
    pub(crate) number: u32,
    pub(crate) deprecated: bool,
}

impl Variant {
    pub fn id(&self) -> VariantId {
        self.id
    }

    pub fn label(&self) -> &Identifier {
        &self.label
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn deprecated(&self) -> bool {
        self.deprecated
    }
}

impl LabelScope for Enum {
    fn validate_label(
        &self,
        _doc: &Document,
        label: &Identifier,
        site: Option<Site>,
    ) -> Result<(), SchemaError> {
        let taken = self
            .variants
            .iter()
            .any(|v| site != Some(Site::Variant(v.id)) && v.label == *label);
        if taken {
            return Err(SchemaError::LabelInUse {
                label: label.to_string(),
                by: Declared::Variant,
            });
        }
        check_reserved_label(&self.reserved, label, site)
    }
}

impl NumberScope for Enum {
    fn validate_number(
        &self,
        doc: &Document,
        number: FieldNumber,
        claimant: Claimant,
        site: Option<Site>,
    ) -> Result<(), SchemaError> {
        let max = doc.config().max_enum_number;
        if number.highest() > max {
            return Err(SchemaError::AboveMaximum { number, max });
        }
        for variant in &self.variants {
            if site == Some(Site::Variant(variant.id)) || !number.intersects(&variant.number.into()) {
                continue;
            }
            match claimant {
                Claimant::Variant if self.allow_alias => {}
                Claimant::Variant => {
                    return Err(SchemaError::AliasingDisabled {
                        number: variant.number,
                    })
                }
                Claimant::Field | Claimant::Reservation => {
                    return Err(SchemaError::NumberInUse {
                        number,
                        by: Declared::Variant,
                    })
                }
            }
        }
        check_reserved_number(&self.reserved, number, site)
    }
}

impl FlagScope for Enum {
    fn validate_flag(&self, flag: FlagKind, value: bool) -> Result<(), SchemaError> {
        if flag != FlagKind::AllowAlias || value {
            return Ok(());
        }
        match self.aliases().into_keys().next() {
            Some(number) => Err(SchemaError::AliasesPresent { number }),
            None => Ok(()),
        }
    }
}

impl Document {
    pub fn enumeration(&self, id: EnumId) -> &Enum {
        self.assert_owned(id.1, id);
        &self.enums[id.0]
    }

    pub fn enumeration_mut(&mut self, id: EnumId) -> EnumMut<'_> {
        self.enumeration(id);
        EnumMut { doc: self, id }
    }

    /// A tentative top-level enum.
    pub fn new_enum(&self) -> NewEnum {
        NewEnum::new(Container::Document)
    }

    pub fn variant(&self, id: VariantId) -> &Variant {
        &self.enumeration(id.enumeration()).variants[id.index]
    }

    pub fn variant_mut(&mut self, id: VariantId) -> VariantMut<'_> {
        self.variant(id);
        VariantMut { doc: self, id }
    }
}

/// Tentative enum.
#[derive(Debug, Clone)]
pub struct NewEnum {
    parent: Container,
    label: Option<Identifier>,
    allow_alias: bool,
}

impl NewEnum {
    pub(crate) fn new(parent: Container) -> Self {
        Self {
            parent,
            label: None,
            allow_alias: false,
        }
    }

    pub fn parent(&self) -> Container {
        self.parent
    }

    pub fn label(&self) -> Option<&Identifier> {
        self.label.as_ref()
    }

    pub fn allow_alias(&self) -> bool {
        self.allow_alias
    }

    pub fn set_label(&mut self, doc: &Document, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        replace_validated(self, |e| &mut e.label, Some(label), |e| e.check_label(doc).map(drop))
            .map(drop)
    }

    /// A tentative enum has no variants yet, so either value is accepted.
    pub fn set_allow_alias(&mut self, value: bool) {
        self.allow_alias = value;
    }

    pub fn insert_into_parent(self, doc: &mut Document) -> Result<EnumId, Rejected<Self>> {
        let id = EnumId(doc.enums.len(), doc.tag);
        let enumeration = finalize(self, "enum", |e| {
            Ok(Enum {
                id,
                parent: e.parent,
                label: e.check_label(doc)?,
                allow_alias: e.allow_alias,
                variants: Vec::new(),
                reserved: Vec::new(),
            })
        })?;
        debug!(%id, label = %enumeration.label, parent = %enumeration.parent, "enum committed");
        let parent = enumeration.parent;
        doc.enums.push(enumeration);
        match parent {
            Container::Document => doc.top_enums.push(id),
            Container::Message(outer) => doc.messages[outer.0].enums.push(id),
        }
        Ok(id)
    }

    fn check_label(&self, doc: &Document) -> Result<Identifier, SchemaError> {
        let label = self.label.as_ref().ok_or(SchemaError::Unset(Attribute::Label))?;
        doc.label_scope(self.parent).validate_label(doc, label, None)?;
        Ok(label.clone())
    }
}

/// Tentative enum variant.
#[derive(Debug, Clone)]
pub struct NewVariant {
    enumeration: EnumId,
    label: Option<Identifier>,
    number: Option<u32>,
    deprecated: bool,
}

impl NewVariant {
    fn new(enumeration: EnumId) -> Self {
        Self {
            enumeration,
            label: None,
            number: None,
            deprecated: false,
        }
    }

    pub fn enumeration(&self) -> EnumId {
        self.enumeration
    }

    pub fn label(&self) -> Option<&Identifier> {
        self.label.as_ref()
    }

    pub fn number(&self) -> Option<u32> {
        self.number
    }

    pub fn deprecated(&self) -> bool {
        self.deprecated
    }

    pub fn set_label(&mut self, doc: &Document, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        replace_validated(self, |v| &mut v.label, Some(label), |v| v.check_label(doc).map(drop))
            .map(drop)
    }

    pub fn set_number(&mut self, doc: &Document, value: u32) -> Result<(), SchemaError> {
        replace_validated(self, |v| &mut v.number, Some(value), |v| v.check_number(doc).map(drop))
            .map(drop)
    }

    pub fn set_deprecated(&mut self, value: bool) {
        self.deprecated = value;
    }

    pub fn insert_into_parent(self, doc: &mut Document) -> Result<VariantId, Rejected<Self>> {
        let id = VariantId {
            enumeration: self.enumeration,
            index: doc.enumeration(self.enumeration).variants.len(),
        };
        let variant = finalize(self, "variant", |v| {
            Ok(Variant {
                id,
                label: v.check_label(doc)?,
                number: v.check_number(doc)?,
                deprecated: v.deprecated,
            })
        })?;
        debug!(
            parent = %id.enumeration(),
            label = %variant.label,
            number = variant.number,
            "variant committed"
        );
        doc.enums[id.enumeration.0].variants.push(variant);
        Ok(id)
    }

    fn check_label(&self, doc: &Document) -> Result<Identifier, SchemaError> {
        let label = self.label.as_ref().ok_or(SchemaError::Unset(Attribute::Label))?;
        doc.enumeration(self.enumeration).validate_label(doc, label, None)?;
        Ok(label.clone())
    }

    fn check_number(&self, doc: &Document) -> Result<u32, SchemaError> {
        let number = self.number.ok_or(SchemaError::Unset(Attribute::Number))?;
        doc.enumeration(self.enumeration)
            .validate_number(doc, number.into(), Claimant::Variant, None)?;
        Ok(number)
    }
}

pub struct EnumMut<'a> {
    doc: &'a mut Document,
    id: EnumId,
}

impl EnumMut<'_> {
    pub fn set_label(&mut self, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        let id = self.id;
        replace_validated(self.doc, |doc| &mut doc.enums[id.0].label, label, |doc| {
            let enumeration = doc.enumeration(id);
            doc.label_scope(enumeration.parent)
                .validate_label(doc, &enumeration.label, Some(Site::Enum(id)))
        })
        .map(drop)
    }

    /// Fails with [`SchemaError::AliasesPresent`] when turning aliasing off
    /// while two variants share a number.
    pub fn set_allow_alias(&mut self, value: bool) -> Result<(), SchemaError> {
        let id = self.id;
        replace_validated(self.doc, |doc| &mut doc.enums[id.0].allow_alias, value, |doc| {
            doc.enumeration(id).validate_flag(FlagKind::AllowAlias, value)
        })
        .map(drop)
    }
}

pub struct VariantMut<'a> {
    doc: &'a mut Document,
    id: VariantId,
}

impl VariantMut<'_> {
    fn entry(doc: &mut Document, id: VariantId) -> &mut Variant {
        &mut doc.enums[id.enumeration.0].variants[id.index]
    }

    pub fn set_label(&mut self, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        let id = self.id;
        replace_validated(self.doc, |doc| &mut Self::entry(doc, id).label, label, |doc| {
            doc.enumeration(id.enumeration())
                .validate_label(doc, &doc.variant(id).label, Some(Site::Variant(id)))
        })
        .map(drop)
    }

    pub fn set_number(&mut self, value: u32) -> Result<(), SchemaError> {
        let id = self.id;
        replace_validated(self.doc, |doc| &mut Self::entry(doc, id).number, value, |doc| {
            doc.enumeration(id.enumeration()).validate_number(
                doc,
                value.into(),
                Claimant::Variant,
                Some(Site::Variant(id)),
            )
        })
        .map(drop)
    }

    pub fn set_deprecated(&mut self, value: bool) -> Result<(), SchemaError> {
        let id = self.id;
        replace_validated(self.doc, |doc| &mut Self::entry(doc, id).deprecated, value, |doc| {
            doc.enumeration(id.enumeration())
                .validate_flag(FlagKind::Deprecated, value)
        })
        .map(drop)
    }
}
