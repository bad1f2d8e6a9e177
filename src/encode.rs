//! The message encoder: a one-shot traversal over a dynamic value and its
//! compiled properties, producing declaration-order wire bytes.

use std::collections::HashMap;

use bytes::BufMut;

use crate::encoding;
use crate::error::{EncodeError, TypeEncodeError};
use crate::props::{FieldKind, FieldProps, FieldType, MessageProps, Syntax, TypeRegistry};
use crate::value::{StructValue, Value};

/// Encodes `value` according to `props`, resolving referenced message and
/// enumeration types through `registry`.
///
/// Fields are emitted in declaration order; proto2 extensions stored on the
/// value are appended after the declared fields. On error no bytes are
/// returned: the partial buffer is discarded.
pub fn encode(
    value: &StructValue,
    props: &MessageProps,
    registry: &TypeRegistry,
) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    encode_raw(value, props, registry, &mut buf)?;
    Ok(buf)
}

fn encode_raw(
    value: &StructValue,
    props: &MessageProps,
    registry: &TypeRegistry,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    // Resolve the active branch of each declared oneof group up front, and
    // verify the branch actually belongs to the group it was stored under.
    let mut groups: HashMap<&str, &Value> = HashMap::new();
    for (index, group) in props.oneofs().iter().enumerate() {
        let Some((branch, payload)) = value.get_oneof(group) else {
            continue;
        };
        let member = props
            .field_by_name(branch)
            .filter(|field| field.oneof == Some(index));
        if member.is_none() {
            return Err(EncodeError::oneof_mismatch(branch, group)
                .context(&props.full_name, branch));
        }
        groups.insert(branch, payload);
    }

    for field in props.fields() {
        let active = if field.oneof.is_some() {
            groups.get(field.name.as_str()).copied()
        } else {
            value.get(&field.name)
        };
        let Some(active) = active else {
            if field.oneof.is_none() && field.is_required() {
                return Err(
                    EncodeError::missing_required().context(&props.full_name, &field.name)
                );
            }
            continue;
        };
        if should_skip(props.syntax, field, active, field.oneof.is_some(), registry) {
            continue;
        }
        emit_field(field, active, registry, buf)
            .map_err(|error| error.context(&props.full_name, &field.name))?;
    }

    if props.syntax == Syntax::Proto2 {
        for (module, key, active) in value.extensions() {
            let Some(ext) = registry.extension(module, key) else {
                return Err(EncodeError::unknown_extension(module, key)
                    .context(&props.full_name, key));
            };
            if should_skip(props.syntax, &ext.field, active, false, registry) {
                continue;
            }
            emit_field(&ext.field, active, registry, buf)
                .map_err(|error| error.context(&props.full_name, &ext.field.name))?;
        }
    }

    Ok(())
}

/// The emptiness policy: whether a present value produces no bytes.
///
/// Absent values are handled by the caller; oneof members bypass default
/// suppression so a set branch is visible on the wire even at its default.
fn should_skip(
    syntax: Syntax,
    field: &FieldProps,
    value: &Value,
    in_oneof: bool,
    registry: &TypeRegistry,
) -> bool {
    match value {
        Value::List(items) if items.is_empty() => return true,
        Value::Map(entries) if entries.is_empty() => return true,
        _ => {}
    }
    if in_oneof {
        return false;
    }
    if let FieldType::Enum(name) = &field.ty {
        if !field.is_required() && !field.is_repeated() {
            let number = match value {
                Value::Enum(symbol) => registry
                    .enumeration(name)
                    .and_then(|props| props.number(symbol)),
                Value::Int(number) => i32::try_from(*number).ok(),
                _ => None,
            };
            return number == Some(0);
        }
    }
    syntax == Syntax::Proto3 && is_scalar_default(value)
}

fn is_scalar_default(value: &Value) -> bool {
    match value {
        Value::Int(0) | Value::UInt(0) | Value::Bool(false) => true,
        Value::Float(value) => *value == 0.0,
        Value::Double(value) => *value == 0.0,
        Value::String(value) => value.is_empty(),
        Value::Bytes(value) => value.is_empty(),
        _ => false,
    }
}

fn emit_field(
    field: &FieldProps,
    value: &Value,
    registry: &TypeRegistry,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match field.kind() {
        FieldKind::Embedded => emit_embedded(field, value, registry, buf),
        FieldKind::Packed => {
            let items = value
                .as_list()
                .ok_or_else(|| EncodeError::unexpected("a repeated value", value))?;
            let mut payload = Vec::new();
            for item in items {
                encode_value(&field.ty, item, registry, &mut payload)?;
            }
            buf.put_slice(field.encoded_tag());
            encoding::encode_varint(payload.len() as u64, buf);
            buf.put_slice(&payload);
            Ok(())
        }
        FieldKind::Normal if field.is_repeated() => {
            let items = value
                .as_list()
                .ok_or_else(|| EncodeError::unexpected("a repeated value", value))?;
            for item in items {
                buf.put_slice(field.encoded_tag());
                encode_value(&field.ty, item, registry, buf)?;
            }
            Ok(())
        }
        FieldKind::Normal => {
            buf.put_slice(field.encoded_tag());
            encode_value(&field.ty, value, registry, buf)
        }
    }
}

fn emit_embedded(
    field: &FieldProps,
    value: &Value,
    registry: &TypeRegistry,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let FieldType::Message(type_name) = &field.ty else {
        return Err(EncodeError::unexpected("an embedded message field", &field.ty));
    };
    let target: &MessageProps = registry
        .message(type_name)
        .ok_or_else(|| EncodeError::unknown_type(type_name))?;

    if field.map {
        let entries = value
            .as_map()
            .ok_or_else(|| EncodeError::unexpected("a map value", value))?;
        for (key, item) in entries {
            let entry = StructValue::new()
                .field("key", key.to_value())
                .field("value", item.clone());
            emit_message(field, &entry, target, registry, buf)?;
        }
        Ok(())
    } else if field.is_repeated() {
        let items = value
            .as_list()
            .ok_or_else(|| EncodeError::unexpected("a repeated value", value))?;
        for item in items {
            emit_embedded_value(field, item, target, registry, buf)?;
        }
        Ok(())
    } else {
        emit_embedded_value(field, value, target, registry, buf)
    }
}

fn emit_embedded_value(
    field: &FieldProps,
    value: &Value,
    target: &MessageProps,
    registry: &TypeRegistry,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match value {
        Value::Message(inner) => emit_message(field, inner, target, registry, buf),
        // A raw payload on a wrapper-typed field is boxed transparently.
        other if target.wrapper => {
            let wrapped = StructValue::new().field("value", other.clone());
            emit_message(field, &wrapped, target, registry, buf)
        }
        other => Err(EncodeError::unexpected("a message value", other)),
    }
}

fn emit_message(
    field: &FieldProps,
    value: &StructValue,
    target: &MessageProps,
    registry: &TypeRegistry,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let mut inner = Vec::new();
    encode_raw(value, target, registry, &mut inner)?;
    buf.put_slice(field.encoded_tag());
    encoding::encode_varint(inner.len() as u64, buf);
    buf.put_slice(&inner);
    Ok(())
}

/// Encodes a single scalar (or enumeration) payload, without a field header.
fn encode_value(
    ty: &FieldType,
    value: &Value,
    registry: &TypeRegistry,
    buf: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    match ty {
        FieldType::Int32 => {
            let n = int_value(ty, value, i64::from(i32::MIN), i64::from(i32::MAX))?;
            encoding::encode_varint(n as u64, buf);
        }
        FieldType::Int64 => {
            let n = int_value(ty, value, i64::MIN, i64::MAX)?;
            encoding::encode_varint(n as u64, buf);
        }
        FieldType::Uint32 => {
            let n = uint_value(ty, value, u64::from(u32::MAX))?;
            encoding::encode_varint(n, buf);
        }
        FieldType::Uint64 => {
            let n = uint_value(ty, value, u64::MAX)?;
            encoding::encode_varint(n, buf);
        }
        FieldType::Sint32 => {
            let n = int_value(ty, value, i64::from(i32::MIN), i64::from(i32::MAX))?;
            encoding::encode_varint(encoding::encode_zigzag(n), buf);
        }
        FieldType::Sint64 => {
            let n = int_value(ty, value, i64::MIN, i64::MAX)?;
            encoding::encode_varint(encoding::encode_zigzag(n), buf);
        }
        FieldType::Fixed32 => {
            let n = uint_value(ty, value, u64::from(u32::MAX))?;
            buf.put_u32_le(n as u32);
        }
        FieldType::Fixed64 => {
            let n = uint_value(ty, value, u64::MAX)?;
            buf.put_u64_le(n);
        }
        FieldType::Sfixed32 => {
            let n = int_value(ty, value, i64::from(i32::MIN), i64::from(i32::MAX))?;
            buf.put_i32_le(n as i32);
        }
        FieldType::Sfixed64 => {
            let n = int_value(ty, value, i64::MIN, i64::MAX)?;
            buf.put_i64_le(n);
        }
        FieldType::Bool => match value {
            Value::Bool(value) => encoding::encode_varint(u64::from(*value), buf),
            other => return Err(kind_error(ty, other, "a bool").into()),
        },
        FieldType::Float => match value {
            // Any NaN input normalizes to the canonical quiet-NaN pattern.
            Value::Float(value) if value.is_nan() => buf.put_u32_le(0x7FC0_0000),
            Value::Float(value) => buf.put_f32_le(*value),
            other => return Err(kind_error(ty, other, "a float").into()),
        },
        FieldType::Double => match value {
            Value::Double(value) if value.is_nan() => buf.put_u64_le(0x7FF8_0000_0000_0001),
            Value::Double(value) => buf.put_f64_le(*value),
            other => return Err(kind_error(ty, other, "a double").into()),
        },
        FieldType::String => match value {
            Value::String(value) => {
                encoding::encode_varint(value.len() as u64, buf);
                buf.put_slice(value.as_bytes());
            }
            other => return Err(kind_error(ty, other, "a string").into()),
        },
        FieldType::Bytes => match value {
            Value::Bytes(value) => {
                encoding::encode_varint(value.len() as u64, buf);
                buf.put_slice(value);
            }
            other => return Err(kind_error(ty, other, "bytes").into()),
        },
        FieldType::Enum(name) => {
            let props = registry
                .enumeration(name)
                .ok_or_else(|| EncodeError::unknown_type(name))?;
            let number = match value {
                Value::Enum(symbol) => props.number(symbol).ok_or_else(|| {
                    TypeEncodeError::new(name.as_str(), value, "symbol has no associated number")
                })?,
                Value::Int(number) => i32::try_from(*number)
                    .map_err(|_| range_error(ty, value))?,
                other => return Err(kind_error(ty, other, "an enumeration value").into()),
            };
            encoding::encode_varint(i64::from(number) as u64, buf);
        }
        FieldType::Message(_) => {
            // Embedded framing is handled by the field classifier.
            return Err(EncodeError::unexpected("a scalar type", ty));
        }
    }
    Ok(())
}

fn int_value(
    ty: &FieldType,
    value: &Value,
    min: i64,
    max: i64,
) -> Result<i64, TypeEncodeError> {
    let n = match value {
        Value::Int(n) => *n,
        Value::UInt(n) => i64::try_from(*n).map_err(|_| range_error(ty, value))?,
        other => return Err(kind_error(ty, other, "an integer")),
    };
    if n < min || n > max {
        return Err(range_error(ty, value));
    }
    Ok(n)
}

fn uint_value(ty: &FieldType, value: &Value, max: u64) -> Result<u64, TypeEncodeError> {
    let n = match value {
        Value::UInt(n) => *n,
        Value::Int(n) => u64::try_from(*n).map_err(|_| range_error(ty, value))?,
        other => return Err(kind_error(ty, other, "an unsigned integer")),
    };
    if n > max {
        return Err(range_error(ty, value));
    }
    Ok(n)
}

fn range_error(ty: &FieldType, value: &Value) -> TypeEncodeError {
    TypeEncodeError::new(ty.proto_name(), value, "out of range")
}

fn kind_error(ty: &FieldType, value: &Value, expected: &'static str) -> TypeEncodeError {
    TypeEncodeError::new(ty.proto_name(), value, format!("expected {}", expected))
}
