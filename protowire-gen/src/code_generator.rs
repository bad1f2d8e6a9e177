//! Renders one Rust module per generated file: a `register_types` function
//! of literal builder chains for every indexed type, plus the optional
//! embedded file descriptor.

use std::collections::{BTreeSet, HashMap, HashSet};

use log::{debug, warn};

use protowire::{EncodeError, Syntax};

use crate::config::Config;
use crate::descriptor::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto, Label, Type,
};
use crate::ident::{proto_qualified, to_snake};
use crate::index::TypeMetadata;

pub struct CodeGenerator<'a> {
    config: &'a Config,
    file: &'a FileDescriptorProto,
    types: &'a HashMap<String, TypeMetadata>,
    syntax: Syntax,
    package: String,
    type_path: Vec<String>,
    map_entries: HashSet<String>,
    depth: u8,
    buf: String,
}

impl<'a> CodeGenerator<'a> {
    /// Renders the module for `file`, whose types were indexed into `types`.
    pub fn generate(
        config: &'a Config,
        file: &'a FileDescriptorProto,
        types: &'a HashMap<String, TypeMetadata>,
    ) -> Result<String, EncodeError> {
        let syntax = match file.syntax() {
            "proto3" => Syntax::Proto3,
            _ => Syntax::Proto2,
        };

        let mut code_gen = CodeGenerator {
            config,
            file,
            types,
            syntax,
            package: file.package().to_owned(),
            type_path: Vec::new(),
            map_entries: HashSet::new(),
            depth: 0,
            buf: String::new(),
        };
        code_gen.collect_map_entries();

        debug!(
            "generating {} ({} types)",
            file.name(),
            code_gen.types.len()
        );

        code_gen.buf.push_str(&format!(
            "// Generated from {} by protoc-gen-protowire {}. Do not edit.\n\n",
            file.name(),
            env!("CARGO_PKG_VERSION"),
        ));
        code_gen.push_imports();

        code_gen.buf.push_str(&format!(
            "/// Registers every type declared in `{}`.\n",
            file.name()
        ));
        code_gen
            .buf
            .push_str("pub fn register_types(registry: &mut TypeRegistry) {\n");
        code_gen.depth += 1;
        for message in &file.message_type {
            code_gen.push_message(message);
        }
        for decl in &file.enum_type {
            code_gen.push_enum(decl);
        }
        code_gen.depth -= 1;
        code_gen.buf.push_str("}\n");

        if code_gen.config.gen_descriptors {
            code_gen.push_file_descriptor()?;
        }

        Ok(code_gen.buf)
    }

    fn collect_map_entries(&mut self) {
        fn walk(
            package: &str,
            path: &mut Vec<String>,
            messages: &[DescriptorProto],
            entries: &mut HashSet<String>,
        ) {
            for message in messages {
                if message.is_map_entry() {
                    entries.insert(proto_qualified(package, path, message.name()));
                }
                path.push(message.name().to_owned());
                walk(package, path, &message.nested_type, entries);
                path.pop();
            }
        }
        let mut path = Vec::new();
        let mut entries = HashSet::new();
        walk(&self.package, &mut path, &self.file.message_type, &mut entries);
        self.map_entries = entries;
    }

    fn push_imports(&mut self) {
        let mut imports: BTreeSet<&str> = BTreeSet::new();
        imports.insert("TypeRegistry");
        if !self.file.message_type.is_empty() {
            imports.insert("MessageProps");
            imports.insert("Syntax");
        }
        if self.any_field() {
            imports.insert("FieldProps");
            imports.insert("FieldType");
        }
        if self.any_enum() {
            imports.insert("EnumProps");
        }
        self.buf.push_str("use protowire::{");
        let mut first = true;
        for import in imports {
            if !first {
                self.buf.push_str(", ");
            }
            self.buf.push_str(import);
            first = false;
        }
        self.buf.push_str("};\n\n");
    }

    fn any_field(&self) -> bool {
        fn has_field(messages: &[DescriptorProto]) -> bool {
            messages
                .iter()
                .any(|message| !message.field.is_empty() || has_field(&message.nested_type))
        }
        has_field(&self.file.message_type)
    }

    fn any_enum(&self) -> bool {
        fn has_enum(messages: &[DescriptorProto]) -> bool {
            messages
                .iter()
                .any(|message| !message.enum_type.is_empty() || has_enum(&message.nested_type))
        }
        !self.file.enum_type.is_empty() || has_enum(&self.file.message_type)
    }

    fn push_message(&mut self, message: &DescriptorProto) {
        let qualified = proto_qualified(&self.package, &self.type_path, message.name());
        self.push_metadata_comment(&qualified);

        let syntax = match self.syntax {
            Syntax::Proto2 => "Proto2",
            Syntax::Proto3 => "Proto3",
        };
        self.push_line("registry.add_message(");
        self.depth += 1;
        self.push_line(&format!(
            "MessageProps::build({:?}, Syntax::{})",
            qualified, syntax
        ));
        self.depth += 1;
        for decl in &message.oneof_decl {
            self.push_line(&format!(".oneof({:?})", decl.name()));
        }
        if self.types.get(&qualified).is_some_and(|meta| meta.wrapper) {
            self.push_line(".wrapper()");
        }
        for field in &message.field {
            if let Some(expr) = self.field_expr(field) {
                self.push_line(&format!(".field({})", expr));
            }
        }
        self.push_line(".finish(),");
        self.depth -= 2;
        self.push_line(");");

        self.type_path.push(message.name().to_owned());
        for decl in &message.enum_type {
            self.push_enum(decl);
        }
        for nested in &message.nested_type {
            self.push_message(nested);
        }
        self.type_path.pop();
    }

    fn push_enum(&mut self, decl: &EnumDescriptorProto) {
        let qualified = proto_qualified(&self.package, &self.type_path, decl.name());
        self.push_metadata_comment(&qualified);

        self.push_line("registry.add_enum(");
        self.depth += 1;
        self.push_line(&format!("EnumProps::build({:?})", qualified));
        self.depth += 1;
        for value in &decl.value {
            self.push_line(&format!(".symbol({:?}, {})", value.name(), value.number()));
        }
        self.push_line(".finish(),");
        self.depth -= 2;
        self.push_line(");");
    }

    fn push_metadata_comment(&mut self, qualified: &str) {
        let Some(metadata) = self.types.get(qualified) else {
            return;
        };
        let alias = if metadata.wrapper {
            format!("{} (value wrapper for {})", metadata.module_name, metadata.type_name)
        } else {
            metadata.module_name.clone()
        };
        self.push_line(&format!("// {} => {}", qualified, alias));
        if let Some(typespec) = &metadata.typespec {
            self.push_line(&format!("// typespec: {}", typespec));
        }
    }

    /// The `FieldProps` expression for one field, or `None` when the
    /// descriptor is too incomplete to compile.
    fn field_expr(&self, field: &FieldDescriptorProto) -> Option<String> {
        let Some(number) = field.number else {
            warn!("{}: field without a number, skipping", field.name());
            return None;
        };
        let Some(ty) = field.r#type else {
            warn!("{}: field without a type, skipping", field.name());
            return None;
        };
        let name = to_snake(field.name());

        if ty == Type::Message && self.map_entries.contains(field.type_name()) {
            return Some(format!(
                "FieldProps::map({}, {:?}, {:?})",
                number,
                name,
                field.type_name()
            ));
        }

        let ty_expr = match ty {
            Type::Group => {
                warn!("{}: group fields are not supported, skipping", field.name());
                return None;
            }
            Type::Message => {
                format!("FieldType::message({:?})", field.type_name())
            }
            Type::Enum => format!("FieldType::enumeration({:?})", field.type_name()),
            scalar => match scalar.field_type_variant() {
                Some(variant) => format!("FieldType::{}", variant),
                None => return None,
            },
        };

        let mut expr = format!("FieldProps::new({}, {:?}, {})", number, name, ty_expr);
        if self.is_packed(field) {
            expr.push_str(".packed()");
        } else if field.label() == Label::Repeated {
            expr.push_str(".repeated()");
        } else if field.label() == Label::Required {
            expr.push_str(".required()");
        }
        if let Some(index) = field.oneof_index {
            expr.push_str(&format!(".in_oneof({})", index));
        }
        Some(expr)
    }

    fn is_packed(&self, field: &FieldDescriptorProto) -> bool {
        if field.label() != Label::Repeated {
            return false;
        }
        let Some(ty) = field.r#type else {
            return false;
        };
        if !ty.is_packable() {
            return false;
        }
        match field.options.as_ref().and_then(|options| options.packed) {
            Some(explicit) => explicit,
            // proto3 packs packable repeated fields by default.
            None => self.syntax == Syntax::Proto3,
        }
    }

    fn push_file_descriptor(&mut self) -> Result<(), EncodeError> {
        let bytes = self.file.encode()?;
        self.buf.push_str(
            "\n/// The serialized `google.protobuf.FileDescriptorProto` this module was\n\
             /// generated from.\n",
        );
        self.buf.push_str("pub const FILE_DESCRIPTOR: &[u8] = &[\n");
        for chunk in bytes.chunks(12) {
            self.buf.push_str("    ");
            for byte in chunk {
                self.buf.push_str(&format!("{:#04X}, ", byte));
            }
            self.buf.pop();
            self.buf.push('\n');
        }
        self.buf.push_str("];\n");
        Ok(())
    }

    fn push_line(&mut self, line: &str) {
        self.push_indent();
        self.buf.push_str(line);
        self.buf.push('\n');
    }

    fn push_indent(&mut self) {
        for _ in 0..self.depth {
            self.buf.push_str("    ");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldOptions, MessageOptions, OneofDescriptorProto};
    use crate::index::index_file;
    use pretty_assertions::assert_eq;

    fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_owned()),
            number: Some(number),
            label: Some(Label::Optional),
            r#type: Some(ty),
            ..Default::default()
        }
    }

    fn sample_file() -> FileDescriptorProto {
        let mut event = DescriptorProto {
            name: Some("Event".to_owned()),
            ..Default::default()
        };
        event.oneof_decl.push(OneofDescriptorProto {
            name: Some("when".to_owned()),
        });
        event.field.push(field("id", 1, Type::Uint64));
        let mut month = field("month", 2, Type::Enum);
        month.type_name = Some(".pkg.Month".to_owned());
        event.field.push(month);
        let mut day = field("day", 3, Type::Int32);
        day.oneof_index = Some(0);
        event.field.push(day);
        let mut tags = field("tags", 4, Type::Int32);
        tags.label = Some(Label::Repeated);
        event.field.push(tags);

        // Synthetic map entry, the way protoc lowers `map<string, int32>`.
        let mut entry = DescriptorProto {
            name: Some("LabelsEntry".to_owned()),
            options: Some(MessageOptions {
                map_entry: Some(true),
                typespec: None,
            }),
            ..Default::default()
        };
        entry.field.push(field("key", 1, Type::String));
        entry.field.push(field("value", 2, Type::Int32));
        event.nested_type.push(entry);
        let mut labels = field("labels", 5, Type::Message);
        labels.label = Some(Label::Repeated);
        labels.type_name = Some(".pkg.Event.LabelsEntry".to_owned());
        event.field.push(labels);

        FileDescriptorProto {
            name: Some("calendar.proto".to_owned()),
            package: Some("pkg".to_owned()),
            syntax: Some("proto3".to_owned()),
            message_type: vec![event],
            enum_type: vec![EnumDescriptorProto {
                name: Some("Month".to_owned()),
                value: vec![crate::descriptor::EnumValueDescriptorProto {
                    name: Some("UNKNOWN".to_owned()),
                    number: Some(0),
                }],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn renders_registration_module() {
        let config = Config::default();
        let file = sample_file();
        let types = index_file(&config, &file);
        let content = CodeGenerator::generate(&config, &file, &types).unwrap();

        let expected = format!(
            r#"// Generated from calendar.proto by protoc-gen-protowire {}. Do not edit.

use protowire::{{EnumProps, FieldProps, FieldType, MessageProps, Syntax, TypeRegistry}};

/// Registers every type declared in `calendar.proto`.
pub fn register_types(registry: &mut TypeRegistry) {{
    // pkg.Event => Pkg.Event
    registry.add_message(
        MessageProps::build("pkg.Event", Syntax::Proto3)
            .oneof("when")
            .field(FieldProps::new(1, "id", FieldType::Uint64))
            .field(FieldProps::new(2, "month", FieldType::enumeration("pkg.Month")))
            .field(FieldProps::new(3, "day", FieldType::Int32).in_oneof(0))
            .field(FieldProps::new(4, "tags", FieldType::Int32).packed())
            .field(FieldProps::map(5, "labels", "pkg.Event.LabelsEntry"))
            .finish(),
    );
    // pkg.Event.LabelsEntry => Pkg.Event.LabelsEntry
    registry.add_message(
        MessageProps::build("pkg.Event.LabelsEntry", Syntax::Proto3)
            .field(FieldProps::new(1, "key", FieldType::String))
            .field(FieldProps::new(2, "value", FieldType::Int32))
            .finish(),
    );
    // pkg.Month => Pkg.Month
    registry.add_enum(
        EnumProps::build("pkg.Month")
            .symbol("UNKNOWN", 0)
            .finish(),
    );
}}
"#,
            env!("CARGO_PKG_VERSION")
        );
        assert_eq!(content, expected);
    }

    #[test]
    fn proto2_packed_needs_the_option() {
        let mut file = sample_file();
        file.syntax = Some("proto2".to_owned());
        let config = Config::default();
        let types = index_file(&config, &file);
        let content = CodeGenerator::generate(&config, &file, &types).unwrap();

        // Unpacked repeated in proto2.
        assert!(content.contains(r#".field(FieldProps::new(4, "tags", FieldType::Int32).repeated())"#));

        let mut packed = field("tags", 4, Type::Int32);
        packed.label = Some(Label::Repeated);
        packed.options = Some(FieldOptions { packed: Some(true) });
        file.message_type[0].field[3] = packed;
        let types = index_file(&config, &file);
        let content = CodeGenerator::generate(&config, &file, &types).unwrap();
        assert!(content.contains(r#".field(FieldProps::new(4, "tags", FieldType::Int32).packed())"#));
    }

    #[test]
    fn gen_descriptors_embeds_the_file() {
        let config = Config {
            gen_descriptors: true,
            ..Default::default()
        };
        let file = sample_file();
        let types = index_file(&config, &file);
        let content = CodeGenerator::generate(&config, &file, &types).unwrap();
        assert!(content.contains("pub const FILE_DESCRIPTOR: &[u8] = &["));

        let expected = file.encode().unwrap();
        assert!(content.contains(&format!("{:#04X},", expected[0])));
    }

    #[test]
    fn wrapper_flag_is_rendered() {
        let mut wrapper = DescriptorProto {
            name: Some("Int32Value".to_owned()),
            ..Default::default()
        };
        wrapper.field.push(field("value", 1, Type::Int32));
        let file = FileDescriptorProto {
            name: Some("wrappers.proto".to_owned()),
            package: Some("pkg".to_owned()),
            syntax: Some("proto3".to_owned()),
            message_type: vec![wrapper],
            ..Default::default()
        };
        let config = Config {
            using_value_wrappers: true,
            ..Default::default()
        };
        let types = index_file(&config, &file);
        let content = CodeGenerator::generate(&config, &file, &types).unwrap();
        assert!(content.contains(".wrapper()"));
        assert!(content.contains("// pkg.Int32Value => Pkg.Int32Value (value wrapper for int32)"));
    }
}
