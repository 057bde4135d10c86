// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use shapecheck::*;

#[test]
fn json_round_trip() -> Result<()> {
    let value = Value::from_json_str(r#"{"name": "ada", "age": 36, "tags": ["a", "b"]}"#)?;
    assert_eq!(value["name"], Value::from("ada"));
    assert_eq!(value["age"], Value::from(36i64));
    assert_eq!(value["tags"][1], Value::from("b"));
    // Absent lookups are undefined, not errors.
    assert_eq!(value["nope"], Value::Undefined);
    assert_eq!(value["tags"][9], Value::Undefined);

    let json = serde_json::to_string(&value).map_err(anyhow::Error::from)?;
    assert_eq!(json, r#"{"age":36,"name":"ada","tags":["a","b"]}"#);
    Ok(())
}

#[test]
fn integral_floats_serialize_without_fraction() -> Result<()> {
    assert_eq!(serde_json::to_string(&Value::from(1.0)).unwrap(), "1");
    assert_eq!(serde_json::to_string(&Value::from(-1.0)).unwrap(), "-1");
    assert_eq!(serde_json::to_string(&Value::from(1.5)).unwrap(), "1.5");
    Ok(())
}

#[test]
fn undefined_displays_as_a_special_string() {
    assert_eq!(
        serde_json::to_string(&Value::Undefined).unwrap(),
        r#""<undefined>""#
    );
}

#[test]
fn integral_float_equals_integer() {
    assert_eq!(Value::from(1.0), Value::from(1i64));
    assert_eq!(Value::from(0.0), Value::from(0u64));
    assert_ne!(Value::from(1.5), Value::from(1i64));
}

#[test]
fn nan_is_self_equal() {
    // Required so a NaN argument can be consumed by the call auditor.
    assert_eq!(Value::from(f64::NAN), Value::from(f64::NAN));
    assert_ne!(Value::from(f64::NAN), Value::from(0i64));
}

#[test]
fn opaque_values_compare_by_identity() {
    let a = Value::opaque(String::from("payload"));
    let b = Value::opaque(String::from("payload"));
    assert_eq!(a, a.clone());
    assert_ne!(a, b);

    if let Value::Opaque(o) = &a {
        assert_eq!(o.downcast_ref::<String>().map(String::as_str), Some("payload"));
        assert_eq!(o.downcast_ref::<u64>(), None);
    } else {
        panic!("not opaque");
    }
}

#[test]
fn building_values_mutably() -> Result<()> {
    let mut obj = Value::new_object();
    obj.as_object_mut()?.insert("a".into(), Value::from(1i64));
    let mut arr = Value::new_array();
    arr.as_array_mut()?.push(Value::from(true));
    obj.as_object_mut()?.insert("b".into(), arr);

    assert_eq!(obj.to_json_str()?.replace(char::is_whitespace, ""), r#"{"a":1,"b":[true]}"#);
    Ok(())
}
