//! Record definitions for the subset of `descriptor.proto` and
//! `plugin.proto` the generator consumes.
//!
//! The records carry their own wire tables, registered in a process-wide
//! [`TypeRegistry`], so the plugin decodes its `CodeGeneratorRequest` and
//! encodes its `CodeGeneratorResponse` with the `protowire` runtime itself.
//! Each record pairs the table with a projection (`from_value`) into plain
//! typed data, which is what the indexer and renderer traverse.

use once_cell::sync::Lazy;
use protowire::{
    DecodeError, EncodeError, EnumProps, FieldProps, FieldType, MessageProps, StructValue, Syntax,
    TypeRegistry, Value,
};

/// The extension module under which the generator's custom options are
/// registered and looked up on decoded values.
pub const OPTIONS_MODULE: &str = "protowire";

const MODULE_PREFIX_TAG: u32 = 1047;
const TYPESPEC_TAG: u32 = 1048;

static REGISTRY: Lazy<TypeRegistry> = Lazy::new(build_registry);

/// The registry holding the descriptor wire tables.
pub fn registry() -> &'static TypeRegistry {
    &REGISTRY
}

fn props(name: &str) -> &'static MessageProps {
    registry()
        .message(name)
        .expect("descriptor registry is incomplete")
}

fn build_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();

    registry.add_enum(
        EnumProps::build("google.protobuf.FieldDescriptorProto.Type")
            .symbol("TYPE_DOUBLE", 1)
            .symbol("TYPE_FLOAT", 2)
            .symbol("TYPE_INT64", 3)
            .symbol("TYPE_UINT64", 4)
            .symbol("TYPE_INT32", 5)
            .symbol("TYPE_FIXED64", 6)
            .symbol("TYPE_FIXED32", 7)
            .symbol("TYPE_BOOL", 8)
            .symbol("TYPE_STRING", 9)
            .symbol("TYPE_GROUP", 10)
            .symbol("TYPE_MESSAGE", 11)
            .symbol("TYPE_BYTES", 12)
            .symbol("TYPE_UINT32", 13)
            .symbol("TYPE_ENUM", 14)
            .symbol("TYPE_SFIXED32", 15)
            .symbol("TYPE_SFIXED64", 16)
            .symbol("TYPE_SINT32", 17)
            .symbol("TYPE_SINT64", 18)
            .finish(),
    );
    registry.add_enum(
        EnumProps::build("google.protobuf.FieldDescriptorProto.Label")
            .symbol("LABEL_OPTIONAL", 1)
            .symbol("LABEL_REQUIRED", 2)
            .symbol("LABEL_REPEATED", 3)
            .finish(),
    );

    registry.add_message(
        MessageProps::build("google.protobuf.FileDescriptorProto", Syntax::Proto2)
            .field(FieldProps::new(1, "name", FieldType::String))
            .field(FieldProps::new(2, "package", FieldType::String))
            .field(FieldProps::new(3, "dependency", FieldType::String).repeated())
            .field(
                FieldProps::new(
                    4,
                    "message_type",
                    FieldType::message("google.protobuf.DescriptorProto"),
                )
                .repeated(),
            )
            .field(
                FieldProps::new(
                    5,
                    "enum_type",
                    FieldType::message("google.protobuf.EnumDescriptorProto"),
                )
                .repeated(),
            )
            .field(FieldProps::new(
                8,
                "options",
                FieldType::message("google.protobuf.FileOptions"),
            ))
            .field(FieldProps::new(12, "syntax", FieldType::String))
            .finish(),
    );
    registry.add_message(
        MessageProps::build("google.protobuf.DescriptorProto", Syntax::Proto2)
            .field(FieldProps::new(1, "name", FieldType::String))
            .field(
                FieldProps::new(
                    2,
                    "field",
                    FieldType::message("google.protobuf.FieldDescriptorProto"),
                )
                .repeated(),
            )
            .field(
                FieldProps::new(
                    3,
                    "nested_type",
                    FieldType::message("google.protobuf.DescriptorProto"),
                )
                .repeated(),
            )
            .field(
                FieldProps::new(
                    4,
                    "enum_type",
                    FieldType::message("google.protobuf.EnumDescriptorProto"),
                )
                .repeated(),
            )
            .field(FieldProps::new(
                7,
                "options",
                FieldType::message("google.protobuf.MessageOptions"),
            ))
            .field(
                FieldProps::new(
                    8,
                    "oneof_decl",
                    FieldType::message("google.protobuf.OneofDescriptorProto"),
                )
                .repeated(),
            )
            .finish(),
    );
    registry.add_message(
        MessageProps::build("google.protobuf.FieldDescriptorProto", Syntax::Proto2)
            .field(FieldProps::new(1, "name", FieldType::String))
            .field(FieldProps::new(3, "number", FieldType::Int32))
            .field(FieldProps::new(
                4,
                "label",
                FieldType::enumeration("google.protobuf.FieldDescriptorProto.Label"),
            ))
            .field(FieldProps::new(
                5,
                "type",
                FieldType::enumeration("google.protobuf.FieldDescriptorProto.Type"),
            ))
            .field(FieldProps::new(6, "type_name", FieldType::String))
            .field(FieldProps::new(
                8,
                "options",
                FieldType::message("google.protobuf.FieldOptions"),
            ))
            .field(FieldProps::new(9, "oneof_index", FieldType::Int32))
            .finish(),
    );
    registry.add_message(
        MessageProps::build("google.protobuf.OneofDescriptorProto", Syntax::Proto2)
            .field(FieldProps::new(1, "name", FieldType::String))
            .finish(),
    );
    registry.add_message(
        MessageProps::build("google.protobuf.EnumDescriptorProto", Syntax::Proto2)
            .field(FieldProps::new(1, "name", FieldType::String))
            .field(
                FieldProps::new(
                    2,
                    "value",
                    FieldType::message("google.protobuf.EnumValueDescriptorProto"),
                )
                .repeated(),
            )
            .finish(),
    );
    registry.add_message(
        MessageProps::build("google.protobuf.EnumValueDescriptorProto", Syntax::Proto2)
            .field(FieldProps::new(1, "name", FieldType::String))
            .field(FieldProps::new(2, "number", FieldType::Int32))
            .finish(),
    );
    registry.add_message(
        MessageProps::build("google.protobuf.FileOptions", Syntax::Proto2).finish(),
    );
    registry.add_message(
        MessageProps::build("google.protobuf.MessageOptions", Syntax::Proto2)
            .field(FieldProps::new(7, "map_entry", FieldType::Bool))
            .finish(),
    );
    registry.add_message(
        MessageProps::build("google.protobuf.FieldOptions", Syntax::Proto2)
            .field(FieldProps::new(2, "packed", FieldType::Bool))
            .finish(),
    );

    registry.add_message(
        MessageProps::build("google.protobuf.compiler.CodeGeneratorRequest", Syntax::Proto2)
            .field(FieldProps::new(1, "file_to_generate", FieldType::String).repeated())
            .field(FieldProps::new(2, "parameter", FieldType::String))
            .field(
                FieldProps::new(
                    15,
                    "proto_file",
                    FieldType::message("google.protobuf.FileDescriptorProto"),
                )
                .repeated(),
            )
            .finish(),
    );
    registry.add_message(
        MessageProps::build("google.protobuf.compiler.CodeGeneratorResponse", Syntax::Proto2)
            .field(FieldProps::new(1, "error", FieldType::String))
            .field(FieldProps::new(2, "supported_features", FieldType::Uint64))
            .field(
                FieldProps::new(
                    15,
                    "file",
                    FieldType::message("google.protobuf.compiler.CodeGeneratorResponse.File"),
                )
                .repeated(),
            )
            .finish(),
    );
    registry.add_message(
        MessageProps::build(
            "google.protobuf.compiler.CodeGeneratorResponse.File",
            Syntax::Proto2,
        )
        .field(FieldProps::new(1, "name", FieldType::String))
        .field(FieldProps::new(2, "insertion_point", FieldType::String))
        .field(FieldProps::new(15, "content", FieldType::String))
        .finish(),
    );

    registry.add_extension(
        OPTIONS_MODULE,
        "google.protobuf.FileOptions",
        FieldProps::new(MODULE_PREFIX_TAG, "module_prefix", FieldType::String),
    );
    registry.add_extension(
        OPTIONS_MODULE,
        "google.protobuf.MessageOptions",
        FieldProps::new(TYPESPEC_TAG, "typespec", FieldType::String),
    );

    registry
}

fn kind_mismatch(name: &str) -> DecodeError {
    DecodeError::new(format!("field {:?} has an unexpected value kind", name))
}

fn str_field(value: &StructValue, name: &str) -> Result<Option<String>, DecodeError> {
    match value.get(name) {
        None => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(kind_mismatch(name)),
    }
}

fn str_list(value: &StructValue, name: &str) -> Result<Vec<String>, DecodeError> {
    match value.get(name) {
        None => Ok(Vec::new()),
        Some(Value::List(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => Ok(text.clone()),
                _ => Err(kind_mismatch(name)),
            })
            .collect(),
        Some(_) => Err(kind_mismatch(name)),
    }
}

fn int_field(value: &StructValue, name: &str) -> Result<Option<i32>, DecodeError> {
    match value.get(name) {
        None => Ok(None),
        Some(Value::Int(number)) => {
            i32::try_from(*number).map(Some).map_err(|_| kind_mismatch(name))
        }
        Some(_) => Err(kind_mismatch(name)),
    }
}

fn bool_field(value: &StructValue, name: &str) -> Result<Option<bool>, DecodeError> {
    match value.get(name) {
        None => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(_) => Err(kind_mismatch(name)),
    }
}

fn message_field<'a>(
    value: &'a StructValue,
    name: &str,
) -> Result<Option<&'a StructValue>, DecodeError> {
    match value.get(name) {
        None => Ok(None),
        Some(Value::Message(inner)) => Ok(Some(inner)),
        Some(_) => Err(kind_mismatch(name)),
    }
}

fn message_list<'a>(
    value: &'a StructValue,
    name: &str,
) -> Result<Vec<&'a StructValue>, DecodeError> {
    match value.get(name) {
        None => Ok(Vec::new()),
        Some(Value::List(items)) => items
            .iter()
            .map(|item| item.as_message().ok_or_else(|| kind_mismatch(name)))
            .collect(),
        Some(_) => Err(kind_mismatch(name)),
    }
}

/// `FieldDescriptorProto.Type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Type {
    Double,
    Float,
    Int64,
    Uint64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Group,
    Message,
    Bytes,
    Uint32,
    Enum,
    Sfixed32,
    Sfixed64,
    Sint32,
    Sint64,
}

impl Type {
    fn from_symbol(symbol: &str) -> Option<Type> {
        Some(match symbol {
            "TYPE_DOUBLE" => Type::Double,
            "TYPE_FLOAT" => Type::Float,
            "TYPE_INT64" => Type::Int64,
            "TYPE_UINT64" => Type::Uint64,
            "TYPE_INT32" => Type::Int32,
            "TYPE_FIXED64" => Type::Fixed64,
            "TYPE_FIXED32" => Type::Fixed32,
            "TYPE_BOOL" => Type::Bool,
            "TYPE_STRING" => Type::String,
            "TYPE_GROUP" => Type::Group,
            "TYPE_MESSAGE" => Type::Message,
            "TYPE_BYTES" => Type::Bytes,
            "TYPE_UINT32" => Type::Uint32,
            "TYPE_ENUM" => Type::Enum,
            "TYPE_SFIXED32" => Type::Sfixed32,
            "TYPE_SFIXED64" => Type::Sfixed64,
            "TYPE_SINT32" => Type::Sint32,
            "TYPE_SINT64" => Type::Sint64,
            _ => return None,
        })
    }

    pub(crate) fn symbol(self) -> &'static str {
        match self {
            Type::Double => "TYPE_DOUBLE",
            Type::Float => "TYPE_FLOAT",
            Type::Int64 => "TYPE_INT64",
            Type::Uint64 => "TYPE_UINT64",
            Type::Int32 => "TYPE_INT32",
            Type::Fixed64 => "TYPE_FIXED64",
            Type::Fixed32 => "TYPE_FIXED32",
            Type::Bool => "TYPE_BOOL",
            Type::String => "TYPE_STRING",
            Type::Group => "TYPE_GROUP",
            Type::Message => "TYPE_MESSAGE",
            Type::Bytes => "TYPE_BYTES",
            Type::Uint32 => "TYPE_UINT32",
            Type::Enum => "TYPE_ENUM",
            Type::Sfixed32 => "TYPE_SFIXED32",
            Type::Sfixed64 => "TYPE_SFIXED64",
            Type::Sint32 => "TYPE_SINT32",
            Type::Sint64 => "TYPE_SINT64",
        }
    }

    /// The Protobuf tag name of a scalar type, e.g. `int32`. Message, group,
    /// and enum types have none.
    pub fn scalar_name(self) -> Option<&'static str> {
        Some(match self {
            Type::Double => "double",
            Type::Float => "float",
            Type::Int64 => "int64",
            Type::Uint64 => "uint64",
            Type::Int32 => "int32",
            Type::Fixed64 => "fixed64",
            Type::Fixed32 => "fixed32",
            Type::Bool => "bool",
            Type::String => "string",
            Type::Bytes => "bytes",
            Type::Uint32 => "uint32",
            Type::Sfixed32 => "sfixed32",
            Type::Sfixed64 => "sfixed64",
            Type::Sint32 => "sint32",
            Type::Sint64 => "sint64",
            Type::Group | Type::Message | Type::Enum => return None,
        })
    }

    /// The [`FieldType`] variant name of a scalar type, for rendered tables.
    pub(crate) fn field_type_variant(self) -> Option<&'static str> {
        Some(match self {
            Type::Double => "Double",
            Type::Float => "Float",
            Type::Int64 => "Int64",
            Type::Uint64 => "Uint64",
            Type::Int32 => "Int32",
            Type::Fixed64 => "Fixed64",
            Type::Fixed32 => "Fixed32",
            Type::Bool => "Bool",
            Type::String => "String",
            Type::Bytes => "Bytes",
            Type::Uint32 => "Uint32",
            Type::Sfixed32 => "Sfixed32",
            Type::Sfixed64 => "Sfixed64",
            Type::Sint32 => "Sint32",
            Type::Sint64 => "Sint64",
            Type::Group | Type::Message | Type::Enum => return None,
        })
    }

    /// Whether a repeated field of this type defaults to packed framing
    /// under proto3.
    pub(crate) fn is_packable(self) -> bool {
        !matches!(
            self,
            Type::String | Type::Bytes | Type::Group | Type::Message
        )
    }
}

/// `FieldDescriptorProto.Label`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Label {
    Optional,
    Required,
    Repeated,
}

impl Label {
    fn from_symbol(symbol: &str) -> Option<Label> {
        Some(match symbol {
            "LABEL_OPTIONAL" => Label::Optional,
            "LABEL_REQUIRED" => Label::Required,
            "LABEL_REPEATED" => Label::Repeated,
            _ => return None,
        })
    }

    pub(crate) fn symbol(self) -> &'static str {
        match self {
            Label::Optional => "LABEL_OPTIONAL",
            Label::Required => "LABEL_REQUIRED",
            Label::Repeated => "LABEL_REPEATED",
        }
    }
}

fn enum_field<T>(
    value: &StructValue,
    name: &str,
    from_symbol: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, DecodeError> {
    match value.get(name) {
        None => Ok(None),
        Some(Value::Enum(symbol)) => from_symbol(symbol)
            .map(Some)
            .ok_or_else(|| DecodeError::new(format!("unrecognized {} value: {}", name, symbol))),
        Some(Value::Int(number)) => Err(DecodeError::new(format!(
            "unrecognized {} value: {}",
            name, number
        ))),
        Some(_) => Err(kind_mismatch(name)),
    }
}

/// `google.protobuf.compiler.CodeGeneratorRequest`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CodeGeneratorRequest {
    pub file_to_generate: Vec<String>,
    pub parameter: Option<String>,
    pub proto_file: Vec<FileDescriptorProto>,
}

impl CodeGeneratorRequest {
    pub fn decode(buf: &[u8]) -> Result<CodeGeneratorRequest, DecodeError> {
        let value = protowire::decode(
            buf,
            props("google.protobuf.compiler.CodeGeneratorRequest"),
            registry(),
        )?;
        CodeGeneratorRequest::from_value(&value)
    }

    pub fn parameter(&self) -> &str {
        self.parameter.as_deref().unwrap_or("")
    }

    fn from_value(value: &StructValue) -> Result<CodeGeneratorRequest, DecodeError> {
        Ok(CodeGeneratorRequest {
            file_to_generate: str_list(value, "file_to_generate")?,
            parameter: str_field(value, "parameter")?,
            proto_file: message_list(value, "proto_file")?
                .into_iter()
                .map(FileDescriptorProto::from_value)
                .collect::<Result<_, _>>()?,
        })
    }
}

/// `google.protobuf.compiler.CodeGeneratorResponse`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CodeGeneratorResponse {
    pub error: Option<String>,
    pub supported_features: Option<u64>,
    pub file: Vec<ResponseFile>,
}

/// `google.protobuf.compiler.CodeGeneratorResponse.File`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResponseFile {
    pub name: Option<String>,
    pub insertion_point: Option<String>,
    pub content: Option<String>,
}

impl CodeGeneratorResponse {
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        protowire::encode(
            &self.to_value(),
            props("google.protobuf.compiler.CodeGeneratorResponse"),
            registry(),
        )
    }

    fn to_value(&self) -> StructValue {
        let mut value = StructValue::new();
        if let Some(error) = &self.error {
            value.set("error", error.clone());
        }
        if let Some(features) = self.supported_features {
            value.set("supported_features", features);
        }
        if !self.file.is_empty() {
            value.set(
                "file",
                Value::List(self.file.iter().map(ResponseFile::to_value).collect()),
            );
        }
        value
    }
}

impl ResponseFile {
    fn to_value(&self) -> Value {
        let mut value = StructValue::new();
        if let Some(name) = &self.name {
            value.set("name", name.clone());
        }
        if let Some(insertion_point) = &self.insertion_point {
            value.set("insertion_point", insertion_point.clone());
        }
        if let Some(content) = &self.content {
            value.set("content", content.clone());
        }
        Value::Message(value)
    }
}

/// `google.protobuf.FileDescriptorProto`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileDescriptorProto {
    pub name: Option<String>,
    pub package: Option<String>,
    pub dependency: Vec<String>,
    pub message_type: Vec<DescriptorProto>,
    pub enum_type: Vec<EnumDescriptorProto>,
    pub options: Option<FileOptions>,
    pub syntax: Option<String>,
}

impl FileDescriptorProto {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn package(&self) -> &str {
        self.package.as_deref().unwrap_or("")
    }

    pub fn syntax(&self) -> &str {
        self.syntax.as_deref().unwrap_or("proto2")
    }

    /// Serializes the descriptor, e.g. for embedding in a generated module.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        protowire::encode(
            &self.to_value(),
            props("google.protobuf.FileDescriptorProto"),
            registry(),
        )
    }

    pub(crate) fn from_value(value: &StructValue) -> Result<FileDescriptorProto, DecodeError> {
        Ok(FileDescriptorProto {
            name: str_field(value, "name")?,
            package: str_field(value, "package")?,
            dependency: str_list(value, "dependency")?,
            message_type: message_list(value, "message_type")?
                .into_iter()
                .map(DescriptorProto::from_value)
                .collect::<Result<_, _>>()?,
            enum_type: message_list(value, "enum_type")?
                .into_iter()
                .map(EnumDescriptorProto::from_value)
                .collect::<Result<_, _>>()?,
            options: message_field(value, "options")?
                .map(FileOptions::from_value)
                .transpose()?,
            syntax: str_field(value, "syntax")?,
        })
    }

    fn to_value(&self) -> StructValue {
        let mut value = StructValue::new();
        if let Some(name) = &self.name {
            value.set("name", name.clone());
        }
        if let Some(package) = &self.package {
            value.set("package", package.clone());
        }
        if !self.dependency.is_empty() {
            value.set(
                "dependency",
                Value::List(self.dependency.iter().map(|dep| Value::String(dep.clone())).collect()),
            );
        }
        if !self.message_type.is_empty() {
            value.set(
                "message_type",
                Value::List(
                    self.message_type
                        .iter()
                        .map(|message| Value::Message(message.to_value()))
                        .collect(),
                ),
            );
        }
        if !self.enum_type.is_empty() {
            value.set(
                "enum_type",
                Value::List(
                    self.enum_type
                        .iter()
                        .map(|decl| Value::Message(decl.to_value()))
                        .collect(),
                ),
            );
        }
        if let Some(options) = &self.options {
            value.set("options", options.to_value());
        }
        if let Some(syntax) = &self.syntax {
            value.set("syntax", syntax.clone());
        }
        value
    }
}

/// `google.protobuf.DescriptorProto`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DescriptorProto {
    pub name: Option<String>,
    pub field: Vec<FieldDescriptorProto>,
    pub nested_type: Vec<DescriptorProto>,
    pub enum_type: Vec<EnumDescriptorProto>,
    pub oneof_decl: Vec<OneofDescriptorProto>,
    pub options: Option<MessageOptions>,
}

impl DescriptorProto {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn is_map_entry(&self) -> bool {
        self.options
            .as_ref()
            .and_then(|options| options.map_entry)
            .unwrap_or(false)
    }

    fn from_value(value: &StructValue) -> Result<DescriptorProto, DecodeError> {
        Ok(DescriptorProto {
            name: str_field(value, "name")?,
            field: message_list(value, "field")?
                .into_iter()
                .map(FieldDescriptorProto::from_value)
                .collect::<Result<_, _>>()?,
            nested_type: message_list(value, "nested_type")?
                .into_iter()
                .map(DescriptorProto::from_value)
                .collect::<Result<_, _>>()?,
            enum_type: message_list(value, "enum_type")?
                .into_iter()
                .map(EnumDescriptorProto::from_value)
                .collect::<Result<_, _>>()?,
            oneof_decl: message_list(value, "oneof_decl")?
                .into_iter()
                .map(OneofDescriptorProto::from_value)
                .collect::<Result<_, _>>()?,
            options: message_field(value, "options")?
                .map(MessageOptions::from_value)
                .transpose()?,
        })
    }

    fn to_value(&self) -> StructValue {
        let mut value = StructValue::new();
        if let Some(name) = &self.name {
            value.set("name", name.clone());
        }
        if !self.field.is_empty() {
            value.set(
                "field",
                Value::List(
                    self.field
                        .iter()
                        .map(|field| Value::Message(field.to_value()))
                        .collect(),
                ),
            );
        }
        if !self.nested_type.is_empty() {
            value.set(
                "nested_type",
                Value::List(
                    self.nested_type
                        .iter()
                        .map(|nested| Value::Message(nested.to_value()))
                        .collect(),
                ),
            );
        }
        if !self.enum_type.is_empty() {
            value.set(
                "enum_type",
                Value::List(
                    self.enum_type
                        .iter()
                        .map(|decl| Value::Message(decl.to_value()))
                        .collect(),
                ),
            );
        }
        if !self.oneof_decl.is_empty() {
            value.set(
                "oneof_decl",
                Value::List(
                    self.oneof_decl
                        .iter()
                        .map(|decl| Value::Message(decl.to_value()))
                        .collect(),
                ),
            );
        }
        if let Some(options) = &self.options {
            value.set("options", options.to_value());
        }
        value
    }
}

/// `google.protobuf.FieldDescriptorProto`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldDescriptorProto {
    pub name: Option<String>,
    pub number: Option<i32>,
    pub label: Option<Label>,
    pub r#type: Option<Type>,
    pub type_name: Option<String>,
    pub oneof_index: Option<i32>,
    pub options: Option<FieldOptions>,
}

impl FieldDescriptorProto {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn label(&self) -> Label {
        self.label.unwrap_or(Label::Optional)
    }

    /// The fully-qualified name of the referenced message or enum type, with
    /// the leading dot stripped.
    pub fn type_name(&self) -> &str {
        let name = self.type_name.as_deref().unwrap_or("");
        name.strip_prefix('.').unwrap_or(name)
    }

    fn from_value(value: &StructValue) -> Result<FieldDescriptorProto, DecodeError> {
        Ok(FieldDescriptorProto {
            name: str_field(value, "name")?,
            number: int_field(value, "number")?,
            label: enum_field(value, "label", Label::from_symbol)?,
            r#type: enum_field(value, "type", Type::from_symbol)?,
            type_name: str_field(value, "type_name")?,
            oneof_index: int_field(value, "oneof_index")?,
            options: message_field(value, "options")?
                .map(FieldOptions::from_value)
                .transpose()?,
        })
    }

    fn to_value(&self) -> StructValue {
        let mut value = StructValue::new();
        if let Some(name) = &self.name {
            value.set("name", name.clone());
        }
        if let Some(number) = self.number {
            value.set("number", number);
        }
        if let Some(label) = self.label {
            value.set("label", Value::Enum(label.symbol().to_owned()));
        }
        if let Some(ty) = self.r#type {
            value.set("type", Value::Enum(ty.symbol().to_owned()));
        }
        if let Some(type_name) = &self.type_name {
            value.set("type_name", type_name.clone());
        }
        if let Some(oneof_index) = self.oneof_index {
            value.set("oneof_index", oneof_index);
        }
        if let Some(options) = &self.options {
            value.set("options", options.to_value());
        }
        value
    }
}

/// `google.protobuf.OneofDescriptorProto`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OneofDescriptorProto {
    pub name: Option<String>,
}

impl OneofDescriptorProto {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    fn from_value(value: &StructValue) -> Result<OneofDescriptorProto, DecodeError> {
        Ok(OneofDescriptorProto {
            name: str_field(value, "name")?,
        })
    }

    fn to_value(&self) -> StructValue {
        let mut value = StructValue::new();
        if let Some(name) = &self.name {
            value.set("name", name.clone());
        }
        value
    }
}

/// `google.protobuf.EnumDescriptorProto`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnumDescriptorProto {
    pub name: Option<String>,
    pub value: Vec<EnumValueDescriptorProto>,
}

impl EnumDescriptorProto {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    fn from_value(value: &StructValue) -> Result<EnumDescriptorProto, DecodeError> {
        Ok(EnumDescriptorProto {
            name: str_field(value, "name")?,
            value: message_list(value, "value")?
                .into_iter()
                .map(EnumValueDescriptorProto::from_value)
                .collect::<Result<_, _>>()?,
        })
    }

    fn to_value(&self) -> StructValue {
        let mut decl = StructValue::new();
        if let Some(name) = &self.name {
            decl.set("name", name.clone());
        }
        if !self.value.is_empty() {
            decl.set(
                "value",
                Value::List(
                    self.value
                        .iter()
                        .map(|value| Value::Message(value.to_value()))
                        .collect(),
                ),
            );
        }
        decl
    }
}

/// `google.protobuf.EnumValueDescriptorProto`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnumValueDescriptorProto {
    pub name: Option<String>,
    pub number: Option<i32>,
}

impl EnumValueDescriptorProto {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn number(&self) -> i32 {
        self.number.unwrap_or(0)
    }

    fn from_value(value: &StructValue) -> Result<EnumValueDescriptorProto, DecodeError> {
        Ok(EnumValueDescriptorProto {
            name: str_field(value, "name")?,
            number: int_field(value, "number")?,
        })
    }

    fn to_value(&self) -> StructValue {
        let mut value = StructValue::new();
        if let Some(name) = &self.name {
            value.set("name", name.clone());
        }
        if let Some(number) = self.number {
            value.set("number", number);
        }
        value
    }
}

/// `google.protobuf.FileOptions`, reduced to the generator's extension.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileOptions {
    /// The `(protowire.module_prefix)` extension: overrides the package as
    /// the leading component of composed target names.
    pub module_prefix: Option<String>,
}

impl FileOptions {
    fn from_value(value: &StructValue) -> Result<FileOptions, DecodeError> {
        let module_prefix = match value.get_extension(OPTIONS_MODULE, "module_prefix") {
            None => None,
            Some(Value::String(prefix)) => Some(prefix.clone()),
            Some(_) => return Err(kind_mismatch("module_prefix")),
        };
        Ok(FileOptions { module_prefix })
    }

    fn to_value(&self) -> StructValue {
        let mut value = StructValue::new();
        if let Some(prefix) = &self.module_prefix {
            value.set_extension(OPTIONS_MODULE, "module_prefix", prefix.clone());
        }
        value
    }
}

/// `google.protobuf.MessageOptions`, reduced to the map-entry marker and the
/// generator's extension.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessageOptions {
    pub map_entry: Option<bool>,
    /// The `(protowire.typespec)` extension: attached verbatim to the
    /// resulting type metadata.
    pub typespec: Option<String>,
}

impl MessageOptions {
    fn from_value(value: &StructValue) -> Result<MessageOptions, DecodeError> {
        let typespec = match value.get_extension(OPTIONS_MODULE, "typespec") {
            None => None,
            Some(Value::String(typespec)) => Some(typespec.clone()),
            Some(_) => return Err(kind_mismatch("typespec")),
        };
        Ok(MessageOptions {
            map_entry: bool_field(value, "map_entry")?,
            typespec,
        })
    }

    fn to_value(&self) -> StructValue {
        let mut value = StructValue::new();
        if let Some(map_entry) = self.map_entry {
            value.set("map_entry", map_entry);
        }
        if let Some(typespec) = &self.typespec {
            value.set_extension(OPTIONS_MODULE, "typespec", typespec.clone());
        }
        value
    }
}

/// `google.protobuf.FieldOptions`, reduced to the packed flag.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldOptions {
    pub packed: Option<bool>,
}

impl FieldOptions {
    fn from_value(value: &StructValue) -> Result<FieldOptions, DecodeError> {
        Ok(FieldOptions {
            packed: bool_field(value, "packed")?,
        })
    }

    fn to_value(&self) -> StructValue {
        let mut value = StructValue::new();
        if let Some(packed) = self.packed {
            value.set("packed", packed);
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_file() -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("calendar.proto".to_owned()),
            package: Some("pkg".to_owned()),
            syntax: Some("proto3".to_owned()),
            options: Some(FileOptions {
                module_prefix: Some("My.Cal".to_owned()),
            }),
            enum_type: vec![EnumDescriptorProto {
                name: Some("Month".to_owned()),
                value: vec![
                    EnumValueDescriptorProto {
                        name: Some("UNKNOWN".to_owned()),
                        number: Some(0),
                    },
                    EnumValueDescriptorProto {
                        name: Some("JANUARY".to_owned()),
                        number: Some(2),
                    },
                ],
            }],
            message_type: vec![DescriptorProto {
                name: Some("Event".to_owned()),
                field: vec![FieldDescriptorProto {
                    name: Some("month".to_owned()),
                    number: Some(1),
                    label: Some(Label::Optional),
                    r#type: Some(Type::Enum),
                    type_name: Some(".pkg.Month".to_owned()),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn file_descriptor_roundtrip() {
        let file = sample_file();
        let bytes = file.encode().unwrap();
        let value = protowire::decode(
            &bytes,
            props("google.protobuf.FileDescriptorProto"),
            registry(),
        )
        .unwrap();
        let decoded = FileDescriptorProto::from_value(&value).unwrap();
        assert_eq!(decoded, file);
    }

    #[test]
    fn request_roundtrip() {
        let file = sample_file();
        let request_value = StructValue::new()
            .field(
                "file_to_generate",
                Value::List(vec![Value::String("calendar.proto".to_owned())]),
            )
            .field("parameter", "using_value_wrappers=true")
            .field(
                "proto_file",
                Value::List(vec![Value::Message(file.to_value())]),
            );
        let bytes = protowire::encode(
            &request_value,
            props("google.protobuf.compiler.CodeGeneratorRequest"),
            registry(),
        )
        .unwrap();

        let request = CodeGeneratorRequest::decode(&bytes).unwrap();
        assert_eq!(request.file_to_generate, ["calendar.proto"]);
        assert_eq!(request.parameter(), "using_value_wrappers=true");
        assert_eq!(request.proto_file, vec![file]);
    }

    #[test]
    fn response_encodes_files() {
        let response = CodeGeneratorResponse {
            error: None,
            supported_features: None,
            file: vec![ResponseFile {
                name: Some("calendar.pb.rs".to_owned()),
                insertion_point: None,
                content: Some("x".to_owned()),
            }],
        };
        let bytes = response.encode().unwrap();
        // file (tag 15, length-delimited), name (tag 1), content (tag 15).
        assert_eq!(
            bytes,
            [
                0x7A, 0x13, 0x0A, 0x0E, b'c', b'a', b'l', b'e', b'n', b'd', b'a', b'r', b'.',
                b'p', b'b', b'.', b'r', b's', 0x7A, 0x01, b'x'
            ]
        );
    }

    #[test]
    fn malformed_request_is_an_error() {
        CodeGeneratorRequest::decode(&[0x0A]).unwrap_err();
    }
}
