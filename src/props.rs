//! Compiled message, field, and enumeration properties.
//!
//! Generated modules (and hand-written tables) compile each message declared
//! in a `.proto` file down to a [`MessageProps`] record. The codec is a pure
//! traversal over these records; they are immutable once built and may be
//! freely shared across threads.

use std::collections::HashMap;
use std::sync::Arc;

use crate::encoding::{self, WireType};

/// The syntax of the `.proto` file a message was declared in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Syntax {
    Proto2,
    Proto3,
}

/// The declared cardinality of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Label {
    Optional,
    Required,
    Repeated,
}

/// The declared type of a field: a scalar, or a reference to a message or
/// enumeration by proto-qualified name, resolved through a [`TypeRegistry`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Enum(String),
    Message(String),
}

impl FieldType {
    /// Reference to a message type by proto-qualified name.
    pub fn message(name: impl Into<String>) -> FieldType {
        FieldType::Message(name.into())
    }

    /// Reference to an enumeration type by proto-qualified name.
    pub fn enumeration(name: impl Into<String>) -> FieldType {
        FieldType::Enum(name.into())
    }

    /// The wire type of a single value of this type.
    pub fn wire_type(&self) -> WireType {
        match self {
            FieldType::Int32
            | FieldType::Int64
            | FieldType::Uint32
            | FieldType::Uint64
            | FieldType::Sint32
            | FieldType::Sint64
            | FieldType::Bool
            | FieldType::Enum(_) => WireType::Varint,
            FieldType::Fixed64 | FieldType::Sfixed64 | FieldType::Double => WireType::SixtyFourBit,
            FieldType::Fixed32 | FieldType::Sfixed32 | FieldType::Float => WireType::ThirtyTwoBit,
            FieldType::String | FieldType::Bytes | FieldType::Message(_) => {
                WireType::LengthDelimited
            }
        }
    }

    /// Whether a repeated field of this type may use packed framing.
    pub fn is_packable(&self) -> bool {
        self.wire_type() != WireType::LengthDelimited
    }

    /// The Protobuf name of the type, e.g. `int32`, or the referenced
    /// proto-qualified name for messages and enumerations.
    pub fn proto_name(&self) -> &str {
        match self {
            FieldType::Double => "double",
            FieldType::Float => "float",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::Uint32 => "uint32",
            FieldType::Uint64 => "uint64",
            FieldType::Sint32 => "sint32",
            FieldType::Sint64 => "sint64",
            FieldType::Fixed32 => "fixed32",
            FieldType::Fixed64 => "fixed64",
            FieldType::Sfixed32 => "sfixed32",
            FieldType::Sfixed64 => "sfixed64",
            FieldType::Bool => "bool",
            FieldType::String => "string",
            FieldType::Bytes => "bytes",
            FieldType::Enum(name) | FieldType::Message(name) => name,
        }
    }
}

/// How a field is framed on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// One tagged record per value.
    Normal,
    /// A single tagged length-delimited record concatenating the unboxed
    /// payloads of a repeated field.
    Packed,
    /// A length-delimited record whose payload is itself an encoded message.
    Embedded,
}

/// Compiled per-field properties.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldProps {
    pub tag: u32,
    /// The target-language field identifier; keys the value lookup.
    pub name: String,
    pub ty: FieldType,
    pub label: Label,
    pub packed: bool,
    pub map: bool,
    /// Index into the containing message's oneof groups, for oneof members.
    pub oneof: Option<usize>,
    encoded_tag: Vec<u8>,
    wire_type: WireType,
}

impl FieldProps {
    /// An optional singular field.
    pub fn new(tag: u32, name: impl Into<String>, ty: FieldType) -> FieldProps {
        let mut props = FieldProps {
            tag,
            name: name.into(),
            ty,
            label: Label::Optional,
            packed: false,
            map: false,
            oneof: None,
            encoded_tag: Vec::new(),
            wire_type: WireType::Varint,
        };
        props.seal();
        props
    }

    /// A map field. `entry` is the proto-qualified name of the synthetic
    /// `…Entry` message holding the `key`/`value` pair.
    pub fn map(tag: u32, name: impl Into<String>, entry: impl Into<String>) -> FieldProps {
        let mut props = FieldProps::new(tag, name, FieldType::Message(entry.into()));
        props.label = Label::Repeated;
        props.map = true;
        props.seal();
        props
    }

    pub fn repeated(mut self) -> FieldProps {
        self.label = Label::Repeated;
        self.seal();
        self
    }

    pub fn required(mut self) -> FieldProps {
        self.label = Label::Required;
        self.seal();
        self
    }

    /// Marks the field packed. Implies `repeated`; only meaningful for
    /// element types whose wire type is not length-delimited.
    pub fn packed(mut self) -> FieldProps {
        debug_assert!(self.ty.is_packable());
        self.label = Label::Repeated;
        self.packed = true;
        self.seal();
        self
    }

    /// Places the field into the oneof group with the given index.
    pub fn in_oneof(mut self, index: usize) -> FieldProps {
        self.oneof = Some(index);
        self
    }

    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }

    pub fn is_required(&self) -> bool {
        self.label == Label::Required
    }

    /// Whether the field's payload is itself an encoded message.
    pub fn is_embedded(&self) -> bool {
        matches!(self.ty, FieldType::Message(_))
    }

    /// Classifies the on-wire framing of the field.
    pub fn kind(&self) -> FieldKind {
        if self.wire_type == WireType::LengthDelimited && self.is_embedded() {
            FieldKind::Embedded
        } else if self.is_repeated() && self.packed {
            FieldKind::Packed
        } else {
            FieldKind::Normal
        }
    }

    /// The precomputed field header: `varint(tag << 3 | wire_type)`.
    pub fn encoded_tag(&self) -> &[u8] {
        &self.encoded_tag
    }

    /// The wire type of the field's tagged records.
    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    fn seal(&mut self) {
        self.wire_type = if self.packed {
            WireType::LengthDelimited
        } else {
            self.ty.wire_type()
        };
        self.encoded_tag.clear();
        encoding::encode_key(self.tag, self.wire_type, &mut self.encoded_tag);
    }
}

/// Compiled per-message properties.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageProps {
    pub full_name: String,
    pub syntax: Syntax,
    /// Whether the message is a single-field value wrapper, collapsed into
    /// its payload type at encode time.
    pub wrapper: bool,
    fields: Vec<FieldProps>,
    by_tag: HashMap<u32, usize>,
    by_name: HashMap<String, usize>,
    oneofs: Vec<String>,
}

impl MessageProps {
    pub fn build(full_name: impl Into<String>, syntax: Syntax) -> MessagePropsBuilder {
        MessagePropsBuilder {
            full_name: full_name.into(),
            syntax,
            wrapper: false,
            fields: Vec::new(),
            oneofs: Vec::new(),
        }
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldProps] {
        &self.fields
    }

    pub fn field_by_tag(&self, tag: u32) -> Option<&FieldProps> {
        self.by_tag.get(&tag).map(|&index| &self.fields[index])
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldProps> {
        self.by_name.get(name).map(|&index| &self.fields[index])
    }

    /// Declared oneof group names, in declaration order.
    pub fn oneofs(&self) -> &[String] {
        &self.oneofs
    }
}

/// Builder for [`MessageProps`]; computes the tag and name indices.
#[derive(Debug)]
pub struct MessagePropsBuilder {
    full_name: String,
    syntax: Syntax,
    wrapper: bool,
    fields: Vec<FieldProps>,
    oneofs: Vec<String>,
}

impl MessagePropsBuilder {
    /// Declares a oneof group. Groups are indexed in declaration order.
    pub fn oneof(mut self, name: impl Into<String>) -> MessagePropsBuilder {
        self.oneofs.push(name.into());
        self
    }

    pub fn field(mut self, field: FieldProps) -> MessagePropsBuilder {
        if let Some(index) = field.oneof {
            debug_assert!(index < self.oneofs.len(), "oneof group not declared");
        }
        self.fields.push(field);
        self
    }

    /// Marks the message as a value wrapper.
    pub fn wrapper(mut self) -> MessagePropsBuilder {
        self.wrapper = true;
        self
    }

    pub fn finish(self) -> MessageProps {
        let mut by_tag = HashMap::with_capacity(self.fields.len());
        let mut by_name = HashMap::with_capacity(self.fields.len());
        for (index, field) in self.fields.iter().enumerate() {
            by_tag.insert(field.tag, index);
            by_name.insert(field.name.clone(), index);
        }
        MessageProps {
            full_name: self.full_name,
            syntax: self.syntax,
            wrapper: self.wrapper,
            fields: self.fields,
            by_tag,
            by_name,
            oneofs: self.oneofs,
        }
    }
}

/// Compiled enumeration properties: the symbol/number tables.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumProps {
    pub full_name: String,
    by_symbol: HashMap<String, i32>,
    by_number: HashMap<i32, String>,
}

impl EnumProps {
    pub fn build(full_name: impl Into<String>) -> EnumPropsBuilder {
        EnumPropsBuilder {
            props: EnumProps {
                full_name: full_name.into(),
                by_symbol: HashMap::new(),
                by_number: HashMap::new(),
            },
        }
    }

    /// The number associated with a symbol.
    pub fn number(&self, symbol: &str) -> Option<i32> {
        self.by_symbol.get(symbol).copied()
    }

    /// The symbol associated with a number. With aliased values the first
    /// declared symbol wins.
    pub fn symbol(&self, number: i32) -> Option<&str> {
        self.by_number.get(&number).map(String::as_str)
    }
}

/// Builder for [`EnumProps`].
#[derive(Debug)]
pub struct EnumPropsBuilder {
    props: EnumProps,
}

impl EnumPropsBuilder {
    pub fn symbol(mut self, symbol: impl Into<String>, number: i32) -> EnumPropsBuilder {
        let symbol = symbol.into();
        self.props
            .by_number
            .entry(number)
            .or_insert_with(|| symbol.clone());
        self.props.by_symbol.insert(symbol, number);
        self
    }

    pub fn finish(self) -> EnumProps {
        self.props
    }
}

/// A proto2 extension field: the declaring module, the extended message, and
/// the field properties.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtensionProps {
    pub module: String,
    pub extendee: String,
    pub field: FieldProps,
}

/// Registered message, enumeration, and extension properties, keyed by
/// proto-qualified name.
///
/// Message and enumeration references in [`FieldType`] resolve through the
/// registry at codec time; the late binding is what permits recursive
/// message types.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    messages: HashMap<String, Arc<MessageProps>>,
    enums: HashMap<String, Arc<EnumProps>>,
    extensions: HashMap<(String, String), Arc<ExtensionProps>>,
    extensions_by_tag: HashMap<(String, u32), Arc<ExtensionProps>>,
}

impl TypeRegistry {
    pub fn new() -> TypeRegistry {
        TypeRegistry::default()
    }

    pub fn add_message(&mut self, props: MessageProps) -> &mut TypeRegistry {
        self.messages.insert(props.full_name.clone(), Arc::new(props));
        self
    }

    pub fn add_enum(&mut self, props: EnumProps) -> &mut TypeRegistry {
        self.enums.insert(props.full_name.clone(), Arc::new(props));
        self
    }

    /// Registers an extension field declared in `module`, extending the
    /// message named `extendee`. The field is addressed by
    /// `(module, field name)` on values and by `(extendee, tag)` on the wire.
    pub fn add_extension(
        &mut self,
        module: impl Into<String>,
        extendee: impl Into<String>,
        field: FieldProps,
    ) -> &mut TypeRegistry {
        let props = Arc::new(ExtensionProps {
            module: module.into(),
            extendee: extendee.into(),
            field,
        });
        self.extensions.insert(
            (props.module.clone(), props.field.name.clone()),
            Arc::clone(&props),
        );
        self.extensions_by_tag
            .insert((props.extendee.clone(), props.field.tag), props);
        self
    }

    pub fn message(&self, name: &str) -> Option<&Arc<MessageProps>> {
        self.messages.get(name)
    }

    pub fn enumeration(&self, name: &str) -> Option<&Arc<EnumProps>> {
        self.enums.get(name)
    }

    pub fn extension(&self, module: &str, key: &str) -> Option<&Arc<ExtensionProps>> {
        self.extensions.get(&(module.to_owned(), key.to_owned()))
    }

    pub fn extension_by_tag(&self, extendee: &str, tag: u32) -> Option<&Arc<ExtensionProps>> {
        self.extensions_by_tag.get(&(extendee.to_owned(), tag))
    }
}
