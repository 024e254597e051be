use binpak_core::format::archive::{Archive, ArchiveKind};
use binpak_core::typed::{Schema, Value, ValueTable};
use binpak_core::{Endian, Error};

const WEAPON: &str = r#"
name: Weapon
fields:
  - name: attack
    type: u16
    default: 10
    min: 0
    max: 999
  - name: weight
    type: f32
    default: 1.5
  - name: rarity
    type: u8
  - name: sort
    type: s8
    default: -1
"#;

const ARMOR: &str = r#"
name: Armor
fields:
  - name: defense
    type: s32
  - name: slot
    type: u8
"#;

fn schemas() -> Vec<Schema> {
    vec![
        Schema::from_yaml(WEAPON).unwrap(),
        Schema::from_yaml(ARMOR).unwrap(),
    ]
}

#[test]
fn archive_entries_pick_their_schema_by_width() {
    let schemas = schemas();
    let weapon = ValueTable::with_defaults(&schemas[0], Endian::Big).unwrap();
    let mut armor = ValueTable::with_defaults(&schemas[1], Endian::Big).unwrap();
    armor.set_by_name("defense", -40).unwrap();
    armor.set_by_name("slot", 3u8).unwrap();

    let kind = ArchiveKind::new("param", *b"PARM", *b"0000", Endian::Big);
    let mut archive = Archive::new(&kind, 4);
    archive.push(0, weapon.to_bytes());
    archive.push(1, armor.to_bytes());
    let bytes = archive.write().unwrap();

    let read = Archive::read(&bytes, Endian::Big).unwrap();
    let mut picked = Vec::new();
    for entry in read.entries() {
        let mut table = ValueTable::from_bytes(&entry.data, Endian::Big);
        picked.push(table.apply_first(&schemas).unwrap());
        if entry.id == 1 {
            assert_eq!(table.field("defense").unwrap().value(), Value::S32(-40));
            assert_eq!(table.field("slot").unwrap().value(), Value::U8(3));
        } else {
            assert_eq!(table.field("attack").unwrap().value(), Value::U16(10));
            assert_eq!(table.field("sort").unwrap().value(), Value::S8(-1));
        }
    }
    assert_eq!(picked, vec![Some(0), Some(1)]);
}

#[test]
fn failed_application_keeps_previous_binding() {
    let schemas = schemas();
    let mut table = ValueTable::from_bytes(&[0, 0, 0, 5, 9], Endian::Big);
    table.apply_schema(&schemas[1]).unwrap();
    let before = table.to_bytes();

    let err = table.apply_schema(&schemas[0]).unwrap_err();
    assert!(err.is_recoverable());
    assert!(matches!(err, Error::SchemaMismatch { expected: 8, actual: 5, .. }));
    assert_eq!(table.schema().map(|s| s.name.as_str()), Some("Armor"));
    assert_eq!(table.to_bytes(), before);
}

#[test]
fn edited_values_serialize_in_declared_order() {
    let schemas = schemas();
    let mut table = ValueTable::with_defaults(&schemas[0], Endian::Little).unwrap();
    table.set(0, 0x0102).unwrap();
    table.set(1, 2.0f32).unwrap();
    table.set(2, "255").unwrap();
    assert!(table.set(2, 256).is_err());
    assert!(!table.get(0).unwrap().descriptor().check_editor_range(&Value::U16(1000)));

    assert_eq!(hex::encode(table.to_bytes()), "020100000040ffff");
}

#[test]
fn u8_extreme_survives_write_and_reread() {
    let schema = Schema::from_yaml("name: Byte\nfields:\n  - name: level\n    type: u8\n").unwrap();
    let mut table = ValueTable::with_defaults(&schema, Endian::Little).unwrap();
    assert!(table.set(0, 300).is_err());
    table.set(0, 255).unwrap();

    let bytes = table.to_bytes();
    let mut reread = ValueTable::from_bytes(&bytes, Endian::Little);
    reread.apply_schema(&schema).unwrap();
    assert_eq!(reread.get(0).unwrap().value(), Value::U8(255));
    assert_eq!(reread.to_bytes(), bytes);
}

#[test]
fn off_by_one_widths_leave_bound_fields_alone() {
    let schemas = schemas();
    let armor = &schemas[1];
    let short = Schema::from_yaml(
        "name: Short\nfields:\n  - name: defense\n    type: s32\n",
    )
    .unwrap();
    let long = Schema::from_yaml(
        "name: Long\nfields:\n  - name: defense\n    type: s32\n  - name: slot\n    type: u16\n",
    )
    .unwrap();
    assert_eq!(short.width() + 1, armor.width());
    assert_eq!(long.width(), armor.width() + 1);

    let mut table = ValueTable::from_bytes(&[0xFF, 0xFF, 0xFF, 0xD8, 7], Endian::Big);
    table.apply_schema(armor).unwrap();
    let before: Vec<Value> = table.fields().iter().map(|f| f.value()).collect();

    for candidate in [&short, &long] {
        assert!(matches!(
            table.apply_schema(candidate),
            Err(Error::SchemaMismatch { actual: 5, .. })
        ));
        let after: Vec<Value> = table.fields().iter().map(|f| f.value()).collect();
        assert_eq!(after, before);
        assert_eq!(table.schema().map(|s| s.name.as_str()), Some("Armor"));
    }
    assert_eq!(before, vec![Value::S32(-40), Value::U8(7)]);
}
