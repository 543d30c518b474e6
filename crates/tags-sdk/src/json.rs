//! Conversion between JSON documents and tree values.
//!
//! JSON objects become mappings, arrays become sequences. Numbers map to
//! `Int` when they fit an `i64` and to `Float` otherwise; integers above
//! `i64::MAX` have no exact representation and are rejected.

use serde_json::{Map, Number, Value as Json};
use tags_codec::CodecError;
use tags_graph::Value;
use tags_types::Scalar;

use crate::error::{SdkError, SdkResult};

pub fn from_json(json: &Json) -> SdkResult<Value> {
    Ok(match json {
        Json::Null => Value::Scalar(Scalar::Null),
        Json::Bool(b) => Value::Scalar(Scalar::Bool(*b)),
        Json::Number(n) => Value::Scalar(number(n)?),
        Json::String(s) => Value::Scalar(Scalar::Text(s.clone())),
        Json::Array(items) => Value::List(items.iter().map(from_json).collect::<SdkResult<_>>()?),
        Json::Object(entries) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| -> SdkResult<(String, Value)> { Ok((k.clone(), from_json(v)?)) })
                .collect::<SdkResult<_>>()?,
        ),
    })
}

fn number(n: &Number) -> SdkResult<Scalar> {
    if let Some(i) = n.as_i64() {
        return Ok(Scalar::Int(i));
    }
    if n.is_u64() {
        return Err(CodecError::UnsupportedValueKind(format!("integer {n} exceeds i64")).into());
    }
    n.as_f64()
        .map(Scalar::Float)
        .ok_or_else(|| CodecError::UnsupportedValueKind(format!("number {n}")).into())
}

pub fn to_json(value: &Value) -> SdkResult<Json> {
    Ok(match value {
        Value::Scalar(s) => scalar_to_json(s)?,
        Value::List(items) => Json::Array(items.iter().map(to_json).collect::<SdkResult<_>>()?),
        Value::Map(entries) => {
            let mut map = Map::new();
            for (k, v) in entries {
                map.insert(k.clone(), to_json(v)?);
            }
            Json::Object(map)
        }
    })
}

fn scalar_to_json(s: &Scalar) -> SdkResult<Json> {
    Ok(match s {
        Scalar::Null => Json::Null,
        Scalar::Bool(b) => Json::Bool(*b),
        Scalar::Int(i) => Json::from(*i),
        Scalar::Float(f) => Number::from_f64(*f)
            .map(Json::Number)
            .ok_or_else(|| SdkError::NotJson(format!("non-finite float {f}")))?,
        Scalar::Text(t) => Json::String(t.clone()),
        Scalar::Bytes(b) => return Err(SdkError::NotJson(format!("{} byte blob", b.len()))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_roundtrip() {
        let doc = json!({
            "name": "ada",
            "age": 36,
            "ratio": 0.25,
            "admin": false,
            "manager": null,
            "langs": ["en", "fr"],
            "meta": {}
        });
        let value = from_json(&doc).unwrap();
        assert_eq!(to_json(&value).unwrap(), doc);
    }

    #[test]
    fn integers_and_floats() {
        assert_eq!(from_json(&json!(-7)).unwrap(), Value::from(-7i64));
        assert_eq!(from_json(&json!(1.5)).unwrap(), Value::from(1.5));
        assert_eq!(
            from_json(&json!(i64::MAX)).unwrap(),
            Value::from(i64::MAX)
        );
    }

    #[test]
    fn large_unsigned_rejected() {
        let err = from_json(&json!(u64::MAX)).unwrap_err();
        assert!(matches!(
            err,
            SdkError::Codec(CodecError::UnsupportedValueKind(_))
        ));
    }

    #[test]
    fn bytes_and_infinities_are_not_json() {
        assert!(matches!(
            to_json(&Value::from(Scalar::Bytes(vec![1, 2]))),
            Err(SdkError::NotJson(_))
        ));
        assert!(matches!(
            to_json(&Value::from(f64::INFINITY)),
            Err(SdkError::NotJson(_))
        ));
    }
}
