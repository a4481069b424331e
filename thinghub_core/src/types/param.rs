//! ParamType, StateType shared scalar machinery, and the Value variant
//! type used everywhere a plugin-supplied value crosses into the core.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::HashMap;

use super::ids::ParamTypeId;

/// The semantic type a ParamType/StateType is declared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SemanticType {
    Bool,
    Int,
    UInt,
    Double,
    String,
    Uuid,
    Variant,
}

/// An input-widget hint for UIs; the core never interprets this, it only
/// carries it through from plugin metadata to transport servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputType {
    None,
    TextLine,
    TextArea,
    Password,
    Search,
    Mail,
    IPv4Address,
    IPv6Address,
    Url,
}

/// A value flowing through the param/state system. `Variant` carries
/// arbitrary JSON for param types declared with semantic type `Variant`;
/// every other semantic type is represented by its natural Rust type so
/// that range and equality comparisons stay numeric where they should.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    String(String),
    Uuid(uuid::Uuid),
    Variant(JsonValue),
}

impl Value {
    /// Attempt to coerce `self` into the given semantic type, the way a
    /// JSON-RPC/REST payload value is coerced before it's trusted.
    pub fn coerce(&self, target: SemanticType) -> Option<Value> {
        match (target, self) {
            (SemanticType::Bool, Value::Bool(b)) => Some(Value::Bool(*b)),
            (SemanticType::Bool, Value::Variant(JsonValue::Bool(b))) => Some(Value::Bool(*b)),

            (SemanticType::Int, Value::Int(i)) => Some(Value::Int(*i)),
            (SemanticType::Int, Value::UInt(u)) if *u <= i64::MAX as u64 => {
                Some(Value::Int(*u as i64))
            }
            (SemanticType::Int, Value::Double(d)) if d.fract() == 0.0 => {
                Some(Value::Int(*d as i64))
            }
            (SemanticType::Int, Value::Variant(JsonValue::Number(n))) => {
                n.as_i64().map(Value::Int)
            }

            (SemanticType::UInt, Value::UInt(u)) => Some(Value::UInt(*u)),
            (SemanticType::UInt, Value::Int(i)) if *i >= 0 => Some(Value::UInt(*i as u64)),
            (SemanticType::UInt, Value::Double(d)) if d.fract() == 0.0 && *d >= 0.0 => {
                Some(Value::UInt(*d as u64))
            }
            (SemanticType::UInt, Value::Variant(JsonValue::Number(n))) => {
                n.as_u64().map(Value::UInt)
            }

            (SemanticType::Double, Value::Double(d)) => Some(Value::Double(*d)),
            (SemanticType::Double, Value::Int(i)) => Some(Value::Double(*i as f64)),
            (SemanticType::Double, Value::UInt(u)) => Some(Value::Double(*u as f64)),
            (SemanticType::Double, Value::Variant(JsonValue::Number(n))) => n.as_f64().map(Value::Double),

            (SemanticType::String, Value::String(s)) => Some(Value::String(s.clone())),
            (SemanticType::String, Value::Variant(JsonValue::String(s))) => {
                Some(Value::String(s.clone()))
            }

            (SemanticType::Uuid, Value::Uuid(u)) => Some(Value::Uuid(*u)),
            (SemanticType::Uuid, Value::String(s)) => s.parse().ok().map(Value::Uuid),
            (SemanticType::Uuid, Value::Variant(JsonValue::String(s))) => {
                s.parse().ok().map(Value::Uuid)
            }

            (SemanticType::Variant, other) => Some(Value::Variant(other.to_json())),

            _ => None,
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::UInt(u) => JsonValue::from(*u),
            Value::Double(d) => JsonValue::from(*d),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Uuid(u) => JsonValue::String(u.to_string()),
            Value::Variant(v) => v.clone(),
        }
    }

    /// Numeric/lexical ordering used for min/max range checks. Returns
    /// `None` when the two values aren't comparable (e.g. comparing a
    /// string to a number), in which case the caller should treat the
    /// comparison as false rather than erroring.
    pub fn partial_compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::UInt(a), Value::UInt(b)) => a.partial_cmp(b),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::UInt(b)) => (*a as f64).partial_cmp(&(*b as f64)),
            (Value::UInt(a), Value::Int(b)) => (*a as f64).partial_cmp(&(*b as f64)),
            (Value::Int(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
            (Value::Double(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::UInt(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
            (Value::Double(a), Value::UInt(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            (Value::Uuid(a), Value::Uuid(b)) => a.partial_cmp(b),
            // Variant ordering falls back to natural JSON string ordering,
            // which is the only thing that's well-defined across payload
            // shapes the plugin author chose not to type strictly.
            (Value::Variant(a), Value::Variant(b)) => {
                a.to_string().partial_cmp(&b.to_string())
            }
            _ => None,
        }
    }
}

/// Describes one parameter slot: its semantic type, default, valid
/// range/allowed-values, and whether user-initiated calls may set it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamType {
    pub id: ParamTypeId,
    pub name: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
    pub default_value: Option<Value>,
    pub min_value: Option<Value>,
    pub max_value: Option<Value>,
    #[serde(default)]
    pub allowed_values: Vec<Value>,
    pub unit: Option<String>,
    #[serde(default)]
    pub input_type: InputType,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub index: i32,
}

impl Default for InputType {
    fn default() -> Self {
        InputType::None
    }
}

/// A params map keyed by ParamTypeId, as exchanged with plugins and
/// persisted per-thing.
pub type ParamMap = HashMap<ParamTypeId, Value>;
