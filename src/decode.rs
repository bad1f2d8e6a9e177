//! The message decoder: reconstructs a dynamic value from wire bytes and the
//! compiled properties of its message type.

use bytes::Buf;

use crate::encoding::{self, WireType};
use crate::error::DecodeError;
use crate::props::{FieldProps, FieldType, MessageProps, TypeRegistry};
use crate::value::{MapKey, StructValue, Value};

/// Decodes a message from `buf` according to `props`.
///
/// Fields may arrive in any order; repeated packable fields are accepted in
/// both packed and unpacked framing. Unknown tags are skipped and not
/// preserved. Registered proto2 extensions of the message are routed into
/// the value's extension table.
pub fn decode(
    buf: &[u8],
    props: &MessageProps,
    registry: &TypeRegistry,
) -> Result<StructValue, DecodeError> {
    let mut value = StructValue::new();
    let mut buf = buf;
    merge(&mut value, props, registry, &mut buf)?;
    Ok(value)
}

fn merge(
    value: &mut StructValue,
    props: &MessageProps,
    registry: &TypeRegistry,
    buf: &mut &[u8],
) -> Result<(), DecodeError> {
    while buf.has_remaining() {
        let (tag, wire_type) = encoding::decode_key(buf)?;
        if let Some(field) = props.field_by_tag(tag) {
            merge_field(value, field, props, wire_type, registry, buf)?;
        } else if let Some(ext) = registry.extension_by_tag(&props.full_name, tag) {
            let decoded = decode_single(&ext.field, wire_type, registry, buf)?;
            value.set_extension(ext.module.clone(), ext.field.name.clone(), decoded);
        } else {
            encoding::skip_field(wire_type, buf)?;
        }
    }
    Ok(())
}

fn merge_field(
    value: &mut StructValue,
    field: &FieldProps,
    props: &MessageProps,
    wire_type: WireType,
    registry: &TypeRegistry,
    buf: &mut &[u8],
) -> Result<(), DecodeError> {
    if field.map {
        encoding::check_wire_type(WireType::LengthDelimited, wire_type)?;
        let (key, entry_value) = decode_map_entry(field, registry, buf)?;
        value.map_mut(&field.name).insert(key, entry_value);
        return Ok(());
    }

    if field.is_repeated() {
        let element_wire_type = field.ty.wire_type();
        if field.ty.is_packable() && wire_type == WireType::LengthDelimited {
            // Packed framing; also what a packed-declared field looks like.
            let mut chunk = take_length_delimited(buf)?;
            let items = value.list_mut(&field.name);
            while chunk.has_remaining() {
                items.push(decode_scalar(&field.ty, element_wire_type, registry, &mut chunk)?);
            }
        } else {
            let item = decode_single(field, wire_type, registry, buf)?;
            value.list_mut(&field.name).push(item);
        }
        return Ok(());
    }

    let decoded = decode_single(field, wire_type, registry, buf)?;
    match field.oneof {
        Some(index) => {
            let group = props
                .oneofs()
                .get(index)
                .ok_or_else(|| DecodeError::new("oneof group out of range"))?;
            value.set_oneof(group.clone(), field.name.clone(), decoded);
        }
        None => value.set(field.name.clone(), decoded),
    }
    Ok(())
}

/// Decodes one value of the field, embedded or scalar.
fn decode_single(
    field: &FieldProps,
    wire_type: WireType,
    registry: &TypeRegistry,
    buf: &mut &[u8],
) -> Result<Value, DecodeError> {
    if let FieldType::Message(type_name) = &field.ty {
        encoding::check_wire_type(WireType::LengthDelimited, wire_type)?;
        let target = registry
            .message(type_name)
            .ok_or_else(|| DecodeError::new(format!("unknown message type: {}", type_name)))?;
        let mut chunk = take_length_delimited(buf)?;
        let mut inner = StructValue::new();
        merge(&mut inner, target, registry, &mut chunk)?;
        Ok(Value::Message(inner))
    } else {
        decode_scalar(&field.ty, wire_type, registry, buf)
    }
}

fn decode_scalar(
    ty: &FieldType,
    wire_type: WireType,
    registry: &TypeRegistry,
    buf: &mut &[u8],
) -> Result<Value, DecodeError> {
    match ty {
        FieldType::Int32 => {
            encoding::check_wire_type(WireType::Varint, wire_type)?;
            let n = encoding::decode_varint(buf)?;
            Ok(Value::Int(i64::from(n as i32)))
        }
        FieldType::Int64 => {
            encoding::check_wire_type(WireType::Varint, wire_type)?;
            Ok(Value::Int(encoding::decode_varint(buf)? as i64))
        }
        FieldType::Uint32 => {
            encoding::check_wire_type(WireType::Varint, wire_type)?;
            Ok(Value::UInt(u64::from(encoding::decode_varint(buf)? as u32)))
        }
        FieldType::Uint64 => {
            encoding::check_wire_type(WireType::Varint, wire_type)?;
            Ok(Value::UInt(encoding::decode_varint(buf)?))
        }
        FieldType::Sint32 | FieldType::Sint64 => {
            encoding::check_wire_type(WireType::Varint, wire_type)?;
            let n = encoding::decode_varint(buf)?;
            Ok(Value::Int(encoding::decode_zigzag(n)))
        }
        FieldType::Fixed32 => {
            encoding::check_wire_type(WireType::ThirtyTwoBit, wire_type)?;
            ensure(buf, 4)?;
            Ok(Value::UInt(u64::from(buf.get_u32_le())))
        }
        FieldType::Fixed64 => {
            encoding::check_wire_type(WireType::SixtyFourBit, wire_type)?;
            ensure(buf, 8)?;
            Ok(Value::UInt(buf.get_u64_le()))
        }
        FieldType::Sfixed32 => {
            encoding::check_wire_type(WireType::ThirtyTwoBit, wire_type)?;
            ensure(buf, 4)?;
            Ok(Value::Int(i64::from(buf.get_i32_le())))
        }
        FieldType::Sfixed64 => {
            encoding::check_wire_type(WireType::SixtyFourBit, wire_type)?;
            ensure(buf, 8)?;
            Ok(Value::Int(buf.get_i64_le()))
        }
        FieldType::Float => {
            encoding::check_wire_type(WireType::ThirtyTwoBit, wire_type)?;
            ensure(buf, 4)?;
            Ok(Value::Float(buf.get_f32_le()))
        }
        FieldType::Double => {
            encoding::check_wire_type(WireType::SixtyFourBit, wire_type)?;
            ensure(buf, 8)?;
            Ok(Value::Double(buf.get_f64_le()))
        }
        FieldType::Bool => {
            encoding::check_wire_type(WireType::Varint, wire_type)?;
            Ok(Value::Bool(encoding::decode_varint(buf)? != 0))
        }
        FieldType::String => {
            encoding::check_wire_type(WireType::LengthDelimited, wire_type)?;
            let chunk = take_length_delimited(buf)?;
            let text = std::str::from_utf8(chunk)
                .map_err(|_| DecodeError::new("string field is not valid UTF-8"))?;
            Ok(Value::String(text.to_owned()))
        }
        FieldType::Bytes => {
            encoding::check_wire_type(WireType::LengthDelimited, wire_type)?;
            let chunk = take_length_delimited(buf)?;
            Ok(Value::Bytes(chunk.to_vec()))
        }
        FieldType::Enum(name) => {
            encoding::check_wire_type(WireType::Varint, wire_type)?;
            let number = encoding::decode_varint(buf)? as i32;
            let props = registry
                .enumeration(name)
                .ok_or_else(|| DecodeError::new(format!("unknown enum type: {}", name)))?;
            // Numbers without a symbol are preserved as plain integers.
            Ok(match props.symbol(number) {
                Some(symbol) => Value::Enum(symbol.to_owned()),
                None => Value::Int(i64::from(number)),
            })
        }
        FieldType::Message(name) => Err(DecodeError::new(format!(
            "message type in scalar position: {}",
            name
        ))),
    }
}

fn decode_map_entry(
    field: &FieldProps,
    registry: &TypeRegistry,
    buf: &mut &[u8],
) -> Result<(MapKey, Value), DecodeError> {
    let FieldType::Message(entry_name) = &field.ty else {
        return Err(DecodeError::new("map field without an entry type"));
    };
    let entry_props = registry
        .message(entry_name)
        .ok_or_else(|| DecodeError::new(format!("unknown map entry type: {}", entry_name)))?;
    let key_field = entry_props
        .field_by_tag(1)
        .ok_or_else(|| DecodeError::new("map entry without a key field"))?;
    let value_field = entry_props
        .field_by_tag(2)
        .ok_or_else(|| DecodeError::new("map entry without a value field"))?;

    let mut chunk = take_length_delimited(buf)?;
    let mut entry = StructValue::new();
    merge(&mut entry, entry_props, registry, &mut chunk)?;

    let key = match entry.get("key") {
        Some(value) => map_key(&key_field.ty, value)?,
        None => default_map_key(&key_field.ty),
    };
    let value = match entry.get("value") {
        Some(value) => value.clone(),
        None => default_value(&value_field.ty, registry),
    };
    Ok((key, value))
}

fn map_key(ty: &FieldType, value: &Value) -> Result<MapKey, DecodeError> {
    match (ty, value) {
        (FieldType::Bool, Value::Bool(key)) => Ok(MapKey::Bool(*key)),
        (
            FieldType::Int32
            | FieldType::Int64
            | FieldType::Sint32
            | FieldType::Sint64
            | FieldType::Sfixed32
            | FieldType::Sfixed64,
            Value::Int(key),
        ) => Ok(MapKey::Int(*key)),
        (
            FieldType::Uint32 | FieldType::Uint64 | FieldType::Fixed32 | FieldType::Fixed64,
            Value::UInt(key),
        ) => Ok(MapKey::UInt(*key)),
        (FieldType::String, Value::String(key)) => Ok(MapKey::String(key.clone())),
        _ => Err(DecodeError::new("invalid map key")),
    }
}

fn default_map_key(ty: &FieldType) -> MapKey {
    match ty {
        FieldType::Bool => MapKey::Bool(false),
        FieldType::Uint32 | FieldType::Uint64 | FieldType::Fixed32 | FieldType::Fixed64 => {
            MapKey::UInt(0)
        }
        FieldType::String => MapKey::String(String::new()),
        _ => MapKey::Int(0),
    }
}

/// The default value of a field type, used for absent map entry fields.
fn default_value(ty: &FieldType, registry: &TypeRegistry) -> Value {
    match ty {
        FieldType::Int32
        | FieldType::Int64
        | FieldType::Sint32
        | FieldType::Sint64
        | FieldType::Sfixed32
        | FieldType::Sfixed64 => Value::Int(0),
        FieldType::Uint32 | FieldType::Uint64 | FieldType::Fixed32 | FieldType::Fixed64 => {
            Value::UInt(0)
        }
        FieldType::Float => Value::Float(0.0),
        FieldType::Double => Value::Double(0.0),
        FieldType::Bool => Value::Bool(false),
        FieldType::String => Value::String(String::new()),
        FieldType::Bytes => Value::Bytes(Vec::new()),
        FieldType::Enum(name) => registry
            .enumeration(name)
            .and_then(|props| props.symbol(0))
            .map(|symbol| Value::Enum(symbol.to_owned()))
            .unwrap_or(Value::Int(0)),
        FieldType::Message(_) => Value::Message(StructValue::new()),
    }
}

fn take_length_delimited<'a>(buf: &mut &'a [u8]) -> Result<&'a [u8], DecodeError> {
    let len = encoding::decode_varint(buf)?;
    let remaining: &'a [u8] = *buf;
    if len > remaining.len() as u64 {
        return Err(DecodeError::new("buffer underflow"));
    }
    let (chunk, rest) = remaining.split_at(len as usize);
    *buf = rest;
    Ok(chunk)
}

fn ensure(buf: &impl Buf, len: usize) -> Result<(), DecodeError> {
    if buf.remaining() < len {
        return Err(DecodeError::new("buffer underflow"));
    }
    Ok(())
}
