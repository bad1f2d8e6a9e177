//! The type indexer: walks a file's message and enum trees, producing the
//! global mapping from proto-qualified names to target type metadata.

use std::collections::HashMap;

use log::debug;

use crate::config::Config;
use crate::descriptor::{DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto, Type};
use crate::ident::{compose, normalize, proto_qualified};

/// Metadata computed once per declared type during indexing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeMetadata {
    /// The canonical target identifier of the generated type.
    pub module_name: String,
    /// The identifier consumers refer to; equal to `module_name` unless
    /// value-wrapper inlining reassigns it to the payload type.
    pub type_name: String,
    pub wrapper: bool,
    /// Whether a wrapper's payload is a scalar.
    pub wrapper_scalar: bool,
    /// The `(protowire.typespec)` message option, verbatim.
    pub typespec: Option<String>,
}

/// Per-file traversal state.
pub struct Context<'a> {
    config: &'a Config,
    package: String,
    namespace: Vec<String>,
    module_prefix: Option<String>,
}

impl<'a> Context<'a> {
    pub fn new(config: &'a Config, file: &FileDescriptorProto) -> Context<'a> {
        let module_prefix = file
            .options
            .as_ref()
            .and_then(|options| options.module_prefix.clone());
        if let Some(prefix) = &module_prefix {
            debug!("{}: module prefix {:?}", file.name(), prefix);
        }
        Context {
            config,
            package: file.package().to_owned(),
            namespace: Vec::new(),
            module_prefix,
        }
    }

    fn leading(&self) -> Option<&str> {
        match &self.module_prefix {
            Some(prefix) => Some(prefix.as_str()),
            None if self.package.is_empty() => None,
            None => Some(self.package.as_str()),
        }
    }

    /// The proto-qualified name of a declaration at the current position.
    pub fn proto_name(&self, name: &str) -> String {
        proto_qualified(&self.package, &self.namespace, name)
    }

    /// The composed target module name of a declaration at the current
    /// position.
    pub fn module_name(&self, name: &str) -> String {
        compose(self.leading(), &self.namespace, name)
    }

    /// The composed target name of a type referenced by fully-qualified
    /// proto name. The module prefix substitutes for the package when the
    /// reference lives in this file's package.
    fn composed_reference(&self, type_name: &str) -> String {
        let qualified = type_name.strip_prefix('.').unwrap_or(type_name);
        if let (Some(prefix), false) = (&self.module_prefix, self.package.is_empty()) {
            if let Some(rest) = qualified.strip_prefix(self.package.as_str()) {
                if let Some(rest) = rest.strip_prefix('.') {
                    return normalize(&format!("{}.{}", prefix, rest));
                }
            }
        }
        normalize(qualified)
    }
}

/// Indexes one file: every message (depth-first, nested types included) and
/// every top-level enum, keyed by proto-qualified name.
pub fn index_file(config: &Config, file: &FileDescriptorProto) -> HashMap<String, TypeMetadata> {
    let mut ctx = Context::new(config, file);
    let mut types = HashMap::new();
    for message in &file.message_type {
        index_message(&mut ctx, &mut types, message);
    }
    for decl in &file.enum_type {
        index_enum(&ctx, &mut types, decl);
    }
    debug!("{}: indexed {} types", file.name(), types.len());
    types
}

fn index_message(
    ctx: &mut Context,
    types: &mut HashMap<String, TypeMetadata>,
    message: &DescriptorProto,
) {
    types.insert(ctx.proto_name(message.name()), message_metadata(ctx, message));

    ctx.namespace.push(message.name().to_owned());
    for decl in &message.enum_type {
        index_enum(ctx, types, decl);
    }
    for nested in &message.nested_type {
        index_message(ctx, types, nested);
    }
    ctx.namespace.pop();
}

fn index_enum(
    ctx: &Context,
    types: &mut HashMap<String, TypeMetadata>,
    decl: &EnumDescriptorProto,
) {
    let module_name = ctx.module_name(decl.name());
    types.insert(
        ctx.proto_name(decl.name()),
        TypeMetadata {
            module_name: module_name.clone(),
            type_name: module_name,
            wrapper: false,
            wrapper_scalar: false,
            typespec: None,
        },
    );
}

fn message_metadata(ctx: &Context, message: &DescriptorProto) -> TypeMetadata {
    let module_name = ctx.module_name(message.name());
    let typespec = message
        .options
        .as_ref()
        .and_then(|options| options.typespec.clone());
    match detect_wrapper(ctx, message) {
        Some(target) => TypeMetadata {
            module_name,
            type_name: target.name,
            wrapper: true,
            wrapper_scalar: target.scalar,
            typespec,
        },
        None => TypeMetadata {
            module_name: module_name.clone(),
            type_name: module_name,
            wrapper: false,
            wrapper_scalar: false,
            typespec,
        },
    }
}

struct WrapperTarget {
    name: String,
    scalar: bool,
}

/// Detects single-field `XxxValue` wrapper messages: exactly one field named
/// `value`, message name ending in `Value`, and the stripped base matching
/// the payload type's simple name case-insensitively.
fn detect_wrapper(ctx: &Context, message: &DescriptorProto) -> Option<WrapperTarget> {
    if !ctx.config.using_value_wrappers {
        return None;
    }
    let [field] = message.field.as_slice() else {
        return None;
    };
    if field.name() != "value" {
        return None;
    }
    let base = message.name().strip_suffix("Value")?;
    if base.is_empty() {
        return None;
    }

    let (simple, target) = wrapper_target(ctx, field)?;
    if !base.eq_ignore_ascii_case(&simple) {
        return None;
    }
    Some(target)
}

fn wrapper_target(ctx: &Context, field: &FieldDescriptorProto) -> Option<(String, WrapperTarget)> {
    match field.r#type {
        Some(Type::Message) | Some(Type::Enum) => {
            let type_name = field.type_name();
            let simple = type_name.rsplit('.').next().unwrap_or(type_name);
            Some((
                simple.to_owned(),
                WrapperTarget {
                    name: ctx.composed_reference(type_name),
                    scalar: false,
                },
            ))
        }
        Some(ty) => {
            let tag = ty.scalar_name()?;
            Some((
                tag.to_owned(),
                WrapperTarget {
                    name: tag.to_owned(),
                    scalar: true,
                },
            ))
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FileOptions, Label, MessageOptions};

    fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_owned()),
            number: Some(number),
            label: Some(Label::Optional),
            r#type: Some(ty),
            ..Default::default()
        }
    }

    fn message(name: &str) -> DescriptorProto {
        DescriptorProto {
            name: Some(name.to_owned()),
            ..Default::default()
        }
    }

    fn file(package: &str) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("test.proto".to_owned()),
            package: Some(package.to_owned()),
            syntax: Some("proto3".to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn nested_types_are_keyed_by_parent() {
        let mut outer = message("Outer");
        let mut middle = message("Middle");
        middle.nested_type.push(message("Inner"));
        middle.enum_type.push(EnumDescriptorProto {
            name: Some("Kind".to_owned()),
            ..Default::default()
        });
        outer.nested_type.push(middle);

        let mut file = file("pkg");
        file.message_type.push(outer);

        let config = Config::default();
        let types = index_file(&config, &file);

        assert_eq!(types.len(), 4);
        assert_eq!(types["pkg.Outer"].module_name, "Pkg.Outer");
        assert_eq!(types["pkg.Outer.Middle"].module_name, "Pkg.Outer.Middle");
        assert_eq!(
            types["pkg.Outer.Middle.Inner"].module_name,
            "Pkg.Outer.Middle.Inner"
        );
        assert_eq!(
            types["pkg.Outer.Middle.Kind"].module_name,
            "Pkg.Outer.Middle.Kind"
        );
    }

    #[test]
    fn module_prefix_replaces_package() {
        let mut file = file("pkg.sub");
        file.options = Some(FileOptions {
            module_prefix: Some("My.Service".to_owned()),
        });
        file.message_type.push(message("Foo"));

        let config = Config::default();
        let types = index_file(&config, &file);

        // The key keeps the proto package; the module name takes the prefix.
        assert_eq!(types["pkg.sub.Foo"].module_name, "My.Service.Foo");
        assert_eq!(types["pkg.sub.Foo"].type_name, "My.Service.Foo");
    }

    #[test]
    fn empty_package_is_dropped() {
        let mut file = file("");
        file.message_type.push(message("Foo"));
        let types = index_file(&Config::default(), &file);
        assert_eq!(types["Foo"].module_name, "Foo");
    }

    #[test]
    fn scalar_wrapper_is_detected() {
        let mut wrapper = message("Int32Value");
        wrapper.field.push(field("value", 1, Type::Int32));

        let mut file = file("pkg");
        file.message_type.push(wrapper);

        let config = Config {
            using_value_wrappers: true,
            ..Default::default()
        };
        let types = index_file(&config, &file);
        let metadata = &types["pkg.Int32Value"];
        assert!(metadata.wrapper);
        assert!(metadata.wrapper_scalar);
        assert_eq!(metadata.module_name, "Pkg.Int32Value");
        assert_eq!(metadata.type_name, "int32");
    }

    #[test]
    fn enum_wrapper_takes_composed_name() {
        let mut wrapper = message("MonthValue");
        let mut value = field("value", 1, Type::Enum);
        value.type_name = Some(".pkg.Month".to_owned());
        wrapper.field.push(value);

        let mut file = file("pkg");
        file.message_type.push(wrapper);
        file.enum_type.push(EnumDescriptorProto {
            name: Some("Month".to_owned()),
            ..Default::default()
        });

        let config = Config {
            using_value_wrappers: true,
            ..Default::default()
        };
        let types = index_file(&config, &file);
        let metadata = &types["pkg.MonthValue"];
        assert!(metadata.wrapper);
        assert!(!metadata.wrapper_scalar);
        assert_eq!(metadata.type_name, "Pkg.Month");
    }

    #[test]
    fn wrapper_conditions_must_all_hold() {
        let config = Config {
            using_value_wrappers: true,
            ..Default::default()
        };

        // Field not named `value`.
        let mut wrapper = message("Int32Value");
        wrapper.field.push(field("payload", 1, Type::Int32));
        let mut f = file("pkg");
        f.message_type.push(wrapper);
        let types = index_file(&config, &f);
        assert!(!types["pkg.Int32Value"].wrapper);
        assert_eq!(types["pkg.Int32Value"].type_name, "Pkg.Int32Value");

        // Base does not match the payload type.
        let mut wrapper = message("MonthValue");
        wrapper.field.push(field("value", 1, Type::String));
        let mut f = file("pkg");
        f.message_type.push(wrapper);
        let types = index_file(&config, &f);
        assert!(!types["pkg.MonthValue"].wrapper);

        // Detection disabled.
        let mut wrapper = message("Int32Value");
        wrapper.field.push(field("value", 1, Type::Int32));
        let mut f = file("pkg");
        f.message_type.push(wrapper);
        let types = index_file(&Config::default(), &f);
        assert!(!types["pkg.Int32Value"].wrapper);
    }

    #[test]
    fn typespec_is_attached() {
        let mut msg = message("Foo");
        msg.options = Some(MessageOptions {
            map_entry: None,
            typespec: Some("t()".to_owned()),
        });
        let mut f = file("pkg");
        f.message_type.push(msg);
        let types = index_file(&Config::default(), &f);
        assert_eq!(types["pkg.Foo"].typespec.as_deref(), Some("t()"));
    }
}
