//! Coercion property tests
//!
//! - Passthrough: a value already of the target kind comes back unchanged
//! - Idempotence: coercing a coerced value changes nothing
//! - Boolean folding accepts exactly "true"/"false" in any case
//! - Construction output always carries exactly the serializable field set

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use schema_factory::schema::{Coercer, Field, FieldKind, FieldValue, Schema};
use std::collections::BTreeMap;

fn timestamp() -> impl Strategy<Value = NaiveDateTime> {
    (1970i32..2100, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60).prop_map(
        |(y, mo, d, h, mi, s)| {
            NaiveDate::from_ymd_opt(y, mo, d)
                .and_then(|date| date.and_hms_opt(h, mi, s))
                .expect("generated components are in range")
        },
    )
}

fn scalar_input() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        any::<i64>().prop_map(FieldValue::Integer),
        any::<f64>().prop_map(FieldValue::Float),
        any::<bool>().prop_map(FieldValue::Boolean),
        ".{0,12}".prop_map(FieldValue::String),
        "-?[0-9]{1,12}".prop_map(FieldValue::String),
        "-?[0-9]{1,6}\\.[0-9]{1,6}".prop_map(FieldValue::String),
        "(?i)(true|false)".prop_map(FieldValue::String),
        timestamp().prop_map(FieldValue::Timestamp),
    ]
}

fn primitive_kinds() -> Vec<FieldKind> {
    vec![
        FieldKind::Integer,
        FieldKind::Float,
        FieldKind::String,
        FieldKind::Boolean,
        FieldKind::Timestamp,
        FieldKind::Mapping,
    ]
}

/// Float comparison that treats NaN as equal to itself.
fn same(a: &FieldValue, b: &FieldValue) -> bool {
    match (a, b) {
        (FieldValue::Float(x), FieldValue::Float(y)) => x == y || (x.is_nan() && y.is_nan()),
        _ => a == b,
    }
}

proptest! {
    #[test]
    fn integer_passthrough(x in any::<i64>()) {
        let coerced = Coercer::new(FieldKind::Integer).coerce(&FieldValue::Integer(x)).unwrap();
        prop_assert_eq!(coerced, FieldValue::Integer(x));
    }

    #[test]
    fn float_passthrough(x in any::<f64>()) {
        let coerced = Coercer::new(FieldKind::Float).coerce(&FieldValue::Float(x)).unwrap();
        prop_assert!(same(&coerced, &FieldValue::Float(x)));
    }

    #[test]
    fn string_passthrough(s in ".*") {
        let value = FieldValue::String(s);
        prop_assert_eq!(Coercer::new(FieldKind::String).coerce(&value).unwrap(), value);
    }

    #[test]
    fn timestamp_passthrough(ts in timestamp()) {
        let value = FieldValue::Timestamp(ts);
        prop_assert_eq!(Coercer::new(FieldKind::Timestamp).coerce(&value).unwrap(), value);
    }

    #[test]
    fn coercion_is_idempotent(value in scalar_input()) {
        for kind in primitive_kinds() {
            let coercer = Coercer::new(kind);
            if let Ok(once) = coercer.coerce(&value) {
                let twice = coercer.coerce(&once).unwrap();
                prop_assert!(same(&once, &twice));
            }
        }
    }

    #[test]
    fn boolean_folding(flag in any::<bool>(), mask in prop::collection::vec(any::<bool>(), 5)) {
        let text: String = flag
            .to_string()
            .chars()
            .zip(mask.iter().cycle())
            .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c })
            .collect();

        let coerced = Coercer::new(FieldKind::Boolean).coerce(&FieldValue::String(text)).unwrap();
        prop_assert_eq!(coerced, FieldValue::Boolean(flag));
    }

    #[test]
    fn boolean_rejects_other_text(s in "[a-z0-9]{0,6}") {
        prop_assume!(s != "true" && s != "false");
        prop_assert!(Coercer::new(FieldKind::Boolean).coerce(&FieldValue::String(s)).is_err());
    }

    #[test]
    fn to_dict_has_exact_key_set(
        lat in -90.0f64..90.0,
        lng in -180.0f64..180.0,
        with_label in any::<bool>(),
    ) {
        let schema = Schema::builder("place")
            .field("lat", Field::float().required())
            .field("lng", Field::float().required())
            .field("label", Field::string().with_default("unnamed"))
            .computed("srid", |_| FieldValue::Integer(4326))
            .build()
            .unwrap();

        let mut input = BTreeMap::new();
        input.insert("lat".to_string(), FieldValue::Float(lat));
        input.insert("lng".to_string(), FieldValue::String(lng.to_string()));
        if with_label {
            input.insert("label".to_string(), FieldValue::from("home"));
        }

        let dict = schema.construct(input).unwrap().to_dict();
        let keys: Vec<&str> = dict.keys().map(String::as_str).collect();
        prop_assert_eq!(keys, vec!["label", "lat", "lng", "srid"]);
        prop_assert_eq!(&dict["lng"], &FieldValue::Float(lng));
    }
}
