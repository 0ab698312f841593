//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees.

use std::io::Write;

use protoforge_core::{
    canonical_json, Attribute, Declared, Document, EnumId, ErrorKind, FieldNumber, MessageId,
    NumberRange, ScalarType, SchemaConfig, SchemaError, TypeSite,
};

fn create_message(doc: &mut Document, label: &str) -> MessageId {
    let mut message = doc.new_message();
    message.set_label(doc, label).unwrap();
    message.insert_into_parent(doc).unwrap()
}

fn create_enum(doc: &mut Document, label: &str) -> EnumId {
    let mut enumeration = doc.new_enum();
    enumeration.set_label(doc, label).unwrap();
    enumeration.insert_into_parent(doc).unwrap()
}

fn add_field(doc: &mut Document, message: MessageId, label: &str, number: u32) -> Result<(), SchemaError> {
    let mut field = doc.message(message).new_field();
    field.set_label(doc, label)?;
    field.set_number(doc, number)?;
    field.set_value_type(doc, ScalarType::String)?;
    field.insert_into_parent(doc)?;
    Ok(())
}

fn reserve_range(doc: &mut Document, message: MessageId, start: u32, end: u32) -> Result<(), SchemaError> {
    let mut range = doc.message(message).new_reserved_range();
    range.set_start(doc, start)?;
    range.set_end(doc, end)?;
    range.insert_into_parent(doc)?;
    Ok(())
}

#[test]
fn invariant_enum_alias_lifecycle() {
    let mut doc = Document::new();
    let e = create_enum(&mut doc, "E");

    let mut foo = doc.enumeration(e).new_variant();
    foo.set_label(&doc, "foo").unwrap();
    foo.set_number(&doc, 0).unwrap();
    foo.insert_into_parent(&mut doc).unwrap();

    // Duplicate number while aliasing is off
    let mut bar = doc.enumeration(e).new_variant();
    bar.set_label(&doc, "bar").unwrap();
    let err = bar.set_number(&doc, 0).unwrap_err();
    assert_eq!(err, SchemaError::AliasingDisabled { number: 0 });
    assert!(err.to_string().contains("allow_alias = true"));

    doc.enumeration_mut(e).set_allow_alias(true).unwrap();
    bar.set_number(&doc, 0).unwrap();
    bar.insert_into_parent(&mut doc).unwrap();

    let err = doc.enumeration_mut(e).set_allow_alias(false).unwrap_err();
    assert_eq!(err, SchemaError::AliasesPresent { number: 0 });
    assert_eq!(err.kind(), ErrorKind::Policy);
    assert!(doc.enumeration(e).allow_alias());
}

#[test]
fn invariant_alias_check_repeated_at_commit() {
    let mut doc = Document::new();
    let e = create_enum(&mut doc, "E");
    doc.enumeration_mut(e).set_allow_alias(true).unwrap();

    // Number accepted while aliasing was on, aliasing turned off before commit
    let mut bar = doc.enumeration(e).new_variant();
    bar.set_label(&doc, "bar").unwrap();
    bar.set_number(&doc, 0).unwrap();
    let mut foo = doc.enumeration(e).new_variant();
    foo.set_label(&doc, "foo").unwrap();
    foo.set_number(&doc, 0).unwrap();
    foo.insert_into_parent(&mut doc).unwrap();

    doc.enumeration_mut(e).set_allow_alias(false).unwrap();
    let rejected = bar.insert_into_parent(&mut doc).unwrap_err();
    assert_eq!(rejected.error(), &SchemaError::AliasingDisabled { number: 0 });
    assert_eq!(doc.enumeration(e).variants().len(), 1);
}

#[test]
fn invariant_message_reservation_scenario() {
    let mut doc = Document::new();
    let m = create_message(&mut doc, "M");
    add_field(&mut doc, m, "foo", 1).unwrap();

    // [1,10] collides with foo
    let err = reserve_range(&mut doc, m, 1, 10).unwrap_err();
    assert_eq!(err, SchemaError::NumberInUse { number: FieldNumber::Single(1), by: Declared::Field });

    reserve_range(&mut doc, m, 11, 20).unwrap();

    // 15 falls inside [11,20]
    let err = add_field(&mut doc, m, "bar", 15).unwrap_err();
    assert_eq!(err, SchemaError::NumberInUse { number: FieldNumber::Single(15), by: Declared::Reservation });
    assert_eq!(doc.message(m).fields().len(), 1);
    assert_eq!(doc.message(m).reserved().len(), 1);
}

#[test]
fn invariant_overlapping_reservations_rejected() {
    let mut doc = Document::new();
    let m = create_message(&mut doc, "M");
    reserve_range(&mut doc, m, 2, 10).unwrap();

    let mut overlapping = doc.message(m).new_reserved_range();
    overlapping.set_end(&doc, 20).unwrap();
    assert!(overlapping.set_start(&doc, 10).is_err());
    assert_eq!(overlapping.start(), None);
    overlapping.set_start(&doc, 11).unwrap();
    overlapping.insert_into_parent(&mut doc).unwrap();

    // Containment without shared endpoints
    assert!(reserve_range(&mut doc, m, 1, 30).is_err());
}

#[test]
fn invariant_committed_reservation_stays_live() {
    let mut doc = Document::new();
    let m = create_message(&mut doc, "M");
    let mut number = doc.message(m).new_reserved_number();
    number.set(&doc, 5).unwrap();
    let id = number.insert_into_parent(&mut doc).unwrap();

    doc.reserved_number_mut(id).set(21).unwrap();
    assert_eq!(doc.reserved_number(id).number(), 21);
    assert!(add_field(&mut doc, m, "late", 21).is_err());
    add_field(&mut doc, m, "early", 5).unwrap();
    assert!(doc.reserved_number_mut(id).set(5).is_err());
    assert_eq!(doc.reserved_number(id).number(), 21);
}

#[test]
fn invariant_top_level_namespace_shared() {
    let mut doc = Document::new();
    create_message(&mut doc, "Foo");

    let mut e = doc.new_enum();
    let err = e.set_label(&doc, "Foo").unwrap_err();
    assert_eq!(err, SchemaError::LabelInUse { label: "Foo".into(), by: Declared::Message });
    assert_eq!(e.label(), None);

    let rejected = e.insert_into_parent(&mut doc).unwrap_err();
    assert_eq!(rejected.error(), &SchemaError::Unset(Attribute::Label));
    assert_eq!(doc.enums().count(), 0);
}

#[test]
fn invariant_rejected_commit_returns_builder() {
    let mut doc = Document::new();
    let m = create_message(&mut doc, "M");

    let mut field = doc.message(m).new_field();
    field.set_label(&doc, "name").unwrap();
    field.set_number(&doc, 1).unwrap();
    field.set_value_type(&doc, ScalarType::String).unwrap();

    // A sibling claims the number after the builder checked it
    add_field(&mut doc, m, "other", 1).unwrap();
    let rejected = field.insert_into_parent(&mut doc).unwrap_err();
    assert_eq!(rejected.error().kind(), ErrorKind::Uniqueness);

    let mut field = rejected.into_builder();
    assert_eq!(field.label().unwrap(), "name");
    field.set_number(&doc, 2).unwrap();
    field.insert_into_parent(&mut doc).unwrap();
    assert_eq!(doc.message(m).fields().len(), 2);
}

#[test]
fn invariant_syntax_checked_first() {
    let mut doc = Document::new();
    let m = create_message(&mut doc, "M");
    for bad in ["", "1st", "has space", "dash-ed", "_lead"] {
        let err = doc.message_mut(m).set_label(bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax, "{bad:?}");
    }
    assert_eq!(doc.message(m).label(), "M");
}

#[test]
fn invariant_references_follow_rebinding() {
    let mut doc = Document::new();
    let holder = create_message(&mut doc, "Holder");
    let target = create_message(&mut doc, "Target");
    let status = create_enum(&mut doc, "Status");

    let mut field = doc.message(holder).new_field();
    field.set_label(&doc, "item").unwrap();
    field.set_number(&doc, 1).unwrap();
    field.set_value_type(&doc, target).unwrap();
    let item = field.insert_into_parent(&mut doc).unwrap();

    let mut map = doc.message(holder).new_map();
    map.set_label(&doc, "states").unwrap();
    map.set_number(&doc, 2).unwrap();
    map.set_key_type(protoforge_core::KeyType::String);
    map.set_value_type(&doc, status).unwrap();
    let states = map.insert_into_parent(&mut doc).unwrap();

    assert_eq!(doc.references(target.into()).collect::<Vec<_>>(), [TypeSite::Field(item)]);
    assert_eq!(doc.references(status.into()).collect::<Vec<_>>(), [TypeSite::MapValue(states)]);

    doc.field_mut(item).set_value_type(status).unwrap();
    assert_eq!(doc.references(target.into()).count(), 0);
    assert_eq!(doc.references(status.into()).count(), 2);

    doc.map_mut(states).set_value_type(ScalarType::Int32).unwrap();
    assert_eq!(doc.references(status.into()).collect::<Vec<_>>(), [TypeSite::Field(item)]);
}

#[test]
fn invariant_handles_bound_to_their_document() {
    let mut a = Document::new();
    let foreign = create_message(&mut a, "OnlyInA");
    let mut b = Document::new();
    let holder = create_message(&mut b, "Holder");

    let mut field = b.message(holder).new_field();
    field.set_label(&b, "item").unwrap();
    field.set_number(&b, 1).unwrap();
    assert_eq!(
        field.set_value_type(&b, foreign),
        Err(SchemaError::UnknownDefinition(foreign.into()))
    );
    let rejected = field.insert_into_parent(&mut b).unwrap_err();
    assert_eq!(rejected.error(), &SchemaError::Unset(Attribute::Type));
    assert_eq!(b.references(holder.into()).count(), 0);
    assert!(b.message(holder).fields().is_empty());
}

#[test]
fn invariant_fingerprint_deterministic() {
    fn build() -> Document {
        let mut doc = Document::new();
        doc.set_package("acme.v1").unwrap();
        let m = create_message(&mut doc, "M");
        add_field(&mut doc, m, "id", 1).unwrap();
        reserve_range(&mut doc, m, 5, 9).unwrap();
        create_enum(&mut doc, "Kind");
        doc
    }

    let a = build();
    let b = build();
    assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    assert_eq!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());

    let mut c = build();
    let m = c.messages().next().unwrap().id();
    add_field(&mut c, m, "extra", 2).unwrap();
    assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
}

#[test]
fn invariant_config_loaded_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"maxMessageNumber": 1000, "implementationReserved": {{"start": 900, "end": 999}}}}"#
    )
    .unwrap();

    let config = SchemaConfig::load(file.path()).unwrap();
    assert_eq!(config.implementation_reserved, Some(NumberRange::new(900, 999).unwrap()));

    let mut doc = Document::with_config(config);
    let m = create_message(&mut doc, "M");
    assert!(matches!(
        add_field(&mut doc, m, "internal", 950),
        Err(SchemaError::ImplementationReserved { start: 900, end: 999, .. })
    ));
    assert!(matches!(
        add_field(&mut doc, m, "far", 1001),
        Err(SchemaError::AboveMaximum { max: 1000, .. })
    ));
    add_field(&mut doc, m, "ok", 899).unwrap();
}

#[cfg(feature = "test-hooks")]
#[test]
fn invariant_every_commit_validates() {
    use protoforge_core::document::{get_commit_validation_count, reset_commit_validation_count};

    reset_commit_validation_count();
    let mut doc = Document::new();
    let m = create_message(&mut doc, "M");
    add_field(&mut doc, m, "a", 1).unwrap();
    let _ = doc.new_enum().insert_into_parent(&mut doc);

    // message, field, rejected enum
    assert_eq!(get_commit_validation_count(), 3);
}
