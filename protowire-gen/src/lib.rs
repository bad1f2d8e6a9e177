#![doc(html_root_url = "https://docs.rs/protowire-gen/0.3.0")]

//! `protowire-gen` turns a `protoc` [`CodeGeneratorRequest`] into Rust
//! modules of `protowire` descriptor tables.
//!
//! The crate ships the `protoc-gen-protowire` plugin binary; the library
//! surface is the pure transformation the binary wraps:
//!
//! ```text
//! protoc --protowire_out=src --protowire_opt=using_value_wrappers=true calendar.proto
//! ```
//!
//! [`CodeGeneratorRequest`]: descriptor::CodeGeneratorRequest

use std::collections::HashMap;

use log::info;

mod code_generator;
mod config;
pub mod descriptor;
pub mod ident;
mod index;

pub use crate::code_generator::CodeGenerator;
pub use crate::config::Config;
pub use crate::index::{index_file, Context, TypeMetadata};

use crate::descriptor::{CodeGeneratorRequest, CodeGeneratorResponse, ResponseFile};

/// The accumulated global type mapping: file name to the file's indexed
/// types.
pub type GlobalTypeMapping = HashMap<String, HashMap<String, TypeMetadata>>;

/// Runs the generator: parses the request's parameter string, indexes every
/// file in the request, and renders one module per element of
/// `file_to_generate`.
///
/// Failures that concern the request content are reported through the
/// response's `error` field, per the plugin protocol.
pub fn generate(request: &CodeGeneratorRequest) -> CodeGeneratorResponse {
    let config = Config::from_parameter(request.parameter());

    let mut mapping = GlobalTypeMapping::new();
    for file in &request.proto_file {
        mapping.insert(file.name().to_owned(), index_file(&config, file));
    }

    let mut response = CodeGeneratorResponse::default();
    for name in &request.file_to_generate {
        let Some(file) = request
            .proto_file
            .iter()
            .find(|file| file.name() == name)
        else {
            response.error = Some(format!("{}: file is not present in the request", name));
            return response;
        };
        let types = &mapping[file.name()];
        match CodeGenerator::generate(&config, file, types) {
            Ok(content) => {
                info!("generated module for {}", name);
                response.file.push(ResponseFile {
                    name: Some(module_file_name(name)),
                    insertion_point: None,
                    content: Some(content),
                });
            }
            Err(error) => {
                response.error = Some(format!("{}: {}", name, error));
                return response;
            }
        }
    }
    response
}

fn module_file_name(proto_name: &str) -> String {
    match proto_name.strip_suffix(".proto") {
        Some(stem) => format!("{}.pb.rs", stem),
        None => format!("{}.pb.rs", proto_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{
        DescriptorProto, FieldDescriptorProto, FileDescriptorProto, Label, Type,
    };

    fn request() -> CodeGeneratorRequest {
        let mut message = DescriptorProto {
            name: Some("Ping".to_owned()),
            ..Default::default()
        };
        message.field.push(FieldDescriptorProto {
            name: Some("seq".to_owned()),
            number: Some(1),
            label: Some(Label::Optional),
            r#type: Some(Type::Uint64),
            ..Default::default()
        });
        CodeGeneratorRequest {
            file_to_generate: vec!["net/ping.proto".to_owned()],
            parameter: None,
            proto_file: vec![FileDescriptorProto {
                name: Some("net/ping.proto".to_owned()),
                package: Some("net".to_owned()),
                syntax: Some("proto3".to_owned()),
                message_type: vec![message],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn generates_one_file_per_request_entry() {
        let response = generate(&request());
        assert_eq!(response.error, None);
        assert_eq!(response.file.len(), 1);

        let file = &response.file[0];
        assert_eq!(file.name.as_deref(), Some("net/ping.pb.rs"));
        let content = file.content.as_deref().unwrap();
        assert!(content.contains(r#"MessageProps::build("net.Ping", Syntax::Proto3)"#));
        assert!(content.contains(r#".field(FieldProps::new(1, "seq", FieldType::Uint64))"#));
    }

    #[test]
    fn missing_file_reports_an_error() {
        let mut request = request();
        request.file_to_generate = vec!["absent.proto".to_owned()];
        let response = generate(&request);
        assert!(response.error.as_deref().unwrap().contains("absent.proto"));
        assert!(response.file.is_empty());
    }

    #[test]
    fn module_file_names() {
        assert_eq!(module_file_name("a/b.proto"), "a/b.pb.rs");
        assert_eq!(module_file_name("weird"), "weird.pb.rs");
    }
}
