//! Dynamic values for messages whose shape is described by compiled
//! descriptor tables rather than generated structs.

use std::collections::BTreeMap;

/// A dynamic Protobuf value.
///
/// Integers are stored at their widest width and range-checked against the
/// declared scalar type when a message is encoded, so an `int32` field
/// holding `2^31` is an encode-time error rather than a silent truncation.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    /// An enumeration symbol, resolved through the enumeration's table at
    /// encode time.
    Enum(String),
    Message(StructValue),
    List(Vec<Value>),
    Map(BTreeMap<MapKey, Value>),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_enum_symbol(&self) -> Option<&str> {
        match self {
            Value::Enum(symbol) => Some(symbol),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&StructValue> {
        match self {
            Value::Message(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<MapKey, Value>> {
        match self {
            Value::Map(values) => Some(values),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Value {
        Value::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Value {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Value {
        Value::UInt(u64::from(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Value {
        Value::UInt(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Value {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Value {
        Value::Bytes(value)
    }
}

impl From<StructValue> for Value {
    fn from(value: StructValue) -> Value {
        Value::Message(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Value {
        Value::List(values)
    }
}

/// A dynamic map key. Protobuf restricts map keys to integral types, `bool`,
/// and `string`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    UInt(u64),
    String(String),
}

impl MapKey {
    pub(crate) fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(value) => Value::Bool(*value),
            MapKey::Int(value) => Value::Int(*value),
            MapKey::UInt(value) => Value::UInt(*value),
            MapKey::String(value) => Value::String(value.clone()),
        }
    }
}

/// A dynamic message value: named fields, the active branch of each oneof
/// group, and a proto2 extension side-table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StructValue {
    fields: BTreeMap<String, Value>,
    oneofs: BTreeMap<String, (String, Value)>,
    extensions: BTreeMap<(String, String), Value>,
}

impl StructValue {
    pub fn new() -> StructValue {
        StructValue::default()
    }

    /// Sets a field, builder style.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> StructValue {
        self.set(name, value);
        self
    }

    /// Sets the active branch of a oneof group, builder style.
    pub fn oneof(
        mut self,
        group: impl Into<String>,
        branch: impl Into<String>,
        value: impl Into<Value>,
    ) -> StructValue {
        self.set_oneof(group, branch, value);
        self
    }

    /// Sets a proto2 extension value, builder style.
    pub fn extension(
        mut self,
        module: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> StructValue {
        self.set_extension(module, key, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn set_oneof(
        &mut self,
        group: impl Into<String>,
        branch: impl Into<String>,
        value: impl Into<Value>,
    ) {
        self.oneofs
            .insert(group.into(), (branch.into(), value.into()));
    }

    pub fn set_extension(
        &mut self,
        module: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) {
        self.extensions
            .insert((module.into(), key.into()), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The active `(branch, value)` pair of a oneof group, if the group is
    /// set.
    pub fn get_oneof(&self, group: &str) -> Option<(&str, &Value)> {
        self.oneofs
            .get(group)
            .map(|(branch, value)| (branch.as_str(), value))
    }

    pub fn get_extension(&self, module: &str, key: &str) -> Option<&Value> {
        self.extensions
            .get(&(module.to_owned(), key.to_owned()))
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn extensions(&self) -> impl Iterator<Item = (&str, &str, &Value)> {
        self.extensions
            .iter()
            .map(|((module, key), value)| (module.as_str(), key.as_str(), value))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.oneofs.is_empty() && self.extensions.is_empty()
    }

    /// The list stored under `name`, inserting an empty one if absent.
    /// Replaces a non-list value.
    pub(crate) fn list_mut(&mut self, name: &str) -> &mut Vec<Value> {
        let entry = self
            .fields
            .entry(name.to_owned())
            .or_insert_with(|| Value::List(Vec::new()));
        if !matches!(entry, Value::List(_)) {
            *entry = Value::List(Vec::new());
        }
        match entry {
            Value::List(values) => values,
            _ => unreachable!(),
        }
    }

    /// The map stored under `name`, inserting an empty one if absent.
    /// Replaces a non-map value.
    pub(crate) fn map_mut(&mut self, name: &str) -> &mut BTreeMap<MapKey, Value> {
        let entry = self
            .fields
            .entry(name.to_owned())
            .or_insert_with(|| Value::Map(BTreeMap::new()));
        if !matches!(entry, Value::Map(_)) {
            *entry = Value::Map(BTreeMap::new());
        }
        match entry {
            Value::Map(values) => values,
            _ => unreachable!(),
        }
    }
}
