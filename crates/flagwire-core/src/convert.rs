// ── Domain-to-wire value conversions ──
//
// Bridges the generic `Value` model and `google.protobuf.Value`. Both
// directions are total: anything the converter does not recognize maps to
// null instead of failing, so new server-side kinds never break the client.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use prost_types::value::Kind;
use prost_types::{ListValue, Struct};

use crate::model::{EvaluationContext, Value};

/// Wire field carrying the context's targeting key.
pub const TARGETING_KEY_FIELD: &str = "targetingKey";

// ── Domain → wire ────────────────────────────────────────────────────

pub fn to_wire(value: &Value) -> prost_types::Value {
    let kind = match value {
        Value::Null => Kind::NullValue(0),
        Value::Bool(b) => Kind::BoolValue(*b),
        Value::Number(n) => Kind::NumberValue(*n),
        Value::String(s) => Kind::StringValue(s.clone()),
        Value::List(items) => Kind::ListValue(ListValue {
            values: items.iter().map(to_wire).collect(),
        }),
        Value::Structure(fields) => Kind::StructValue(structure_to_wire(fields)),
    };

    prost_types::Value { kind: Some(kind) }
}

pub fn structure_to_wire(fields: &IndexMap<String, Value>) -> Struct {
    Struct {
        fields: fields
            .iter()
            .map(|(k, v)| (k.clone(), to_wire(v)))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// Convert an evaluation context into the struct sent with every RPC.
/// The targeting key, when set, wins over an attribute of the same name.
pub fn context_to_wire(context: &EvaluationContext) -> Struct {
    let mut wire = structure_to_wire(&context.attributes);
    if let Some(ref key) = context.targeting_key {
        wire.fields.insert(
            TARGETING_KEY_FIELD.to_owned(),
            to_wire(&Value::String(key.clone())),
        );
    }
    wire
}

// ── Wire → domain ────────────────────────────────────────────────────

pub fn from_wire(value: &prost_types::Value) -> Value {
    match &value.kind {
        Some(Kind::BoolValue(b)) => Value::Bool(*b),
        Some(Kind::NumberValue(n)) => Value::Number(*n),
        Some(Kind::StringValue(s)) => Value::String(s.clone()),
        Some(Kind::ListValue(list)) => Value::List(list.values.iter().map(from_wire).collect()),
        Some(Kind::StructValue(s)) => Value::Structure(structure_from_wire(s)),
        Some(Kind::NullValue(_)) | None => Value::Null,
    }
}

pub fn structure_from_wire(wire: &Struct) -> IndexMap<String, Value> {
    wire.fields
        .iter()
        .map(|(k, v)| (k.clone(), from_wire(v)))
        .collect()
}

/// Flag metadata arrives as an optional struct; absent means empty.
pub fn metadata_from_wire(wire: Option<&Struct>) -> IndexMap<String, Value> {
    wire.map(structure_from_wire).unwrap_or_default()
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn nested() -> Value {
        Value::from(serde_json::json!({
            "name": "checkout",
            "weight": 0.25,
            "enabled": true,
            "tags": ["a", "b", ["c"]],
            "limits": { "daily": 100, "burst": { "max": 5 } },
            "owner": null
        }))
    }

    #[test]
    fn nested_value_round_trips() {
        let value = nested();
        assert_eq!(from_wire(&to_wire(&value)), value);
    }

    #[test]
    fn list_order_is_preserved() {
        let value = Value::List(vec![Value::from(3), Value::from("x"), Value::Null]);
        let Some(Kind::ListValue(list)) = to_wire(&value).kind else {
            panic!("expected a list");
        };
        assert_eq!(list.values.len(), 3);
        assert_eq!(list.values[1].kind, Some(Kind::StringValue("x".into())));
    }

    #[test]
    fn unset_kind_becomes_null() {
        assert_eq!(from_wire(&prost_types::Value { kind: None }), Value::Null);
        assert_eq!(
            from_wire(&prost_types::Value {
                kind: Some(Kind::NullValue(0))
            }),
            Value::Null
        );
    }

    #[test]
    fn integers_collapse_to_numbers() {
        let wire = to_wire(&Value::from(42_i64));
        assert_eq!(wire.kind, Some(Kind::NumberValue(42.0)));
        assert_eq!(from_wire(&wire), Value::Number(42.0));
    }

    #[test]
    fn context_carries_targeting_key() {
        let context = EvaluationContext::new()
            .with_attribute("targetingKey", "shadowed")
            .with_attribute("country", "NZ")
            .with_targeting_key("user-1");

        let wire = context_to_wire(&context);
        assert_eq!(
            wire.fields.get(TARGETING_KEY_FIELD).map(from_wire),
            Some(Value::from("user-1"))
        );
        assert_eq!(wire.fields.get("country").map(from_wire), Some(Value::from("NZ")));
        assert_eq!(wire.fields.len(), 2);
    }

    #[test]
    fn empty_context_is_empty_struct() {
        assert!(context_to_wire(&EvaluationContext::new()).fields.is_empty());
    }

    #[test]
    fn missing_metadata_is_empty() {
        assert!(metadata_from_wire(None).is_empty());
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            // NaN never compares equal, so it cannot take part in an
            // equality-based round trip.
            (-1.0e12_f64..1.0e12).prop_map(Value::Number),
            "[a-z0-9 ]{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::List),
                prop::collection::vec(("[a-z]{1,8}", inner), 0..6)
                    .prop_map(|entries| Value::Structure(entries.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn round_trip_is_structural_identity(value in arb_value()) {
            prop_assert_eq!(from_wire(&to_wire(&value)), value);
        }
    }
}
