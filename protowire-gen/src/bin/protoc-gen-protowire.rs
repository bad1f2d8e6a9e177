use std::env;
use std::io::{self, Error, ErrorKind, Read, Write};
use std::process;

use protowire_gen::descriptor::CodeGeneratorRequest;

const USAGE: &str = "\
protoc-gen-protowire: a protoc plugin emitting protowire descriptor-table modules.

Usage:
    protoc --protowire_out=OUT_DIR [--protowire_opt=OPTIONS] PROTO_FILES

The plugin reads a binary CodeGeneratorRequest on standard input and writes a
binary CodeGeneratorResponse on standard output; protoc invokes it for you.

Options (comma-separated, via --protowire_opt):
    plugins=A+B                 enable plugin passthroughs, e.g. grpc
    gen_descriptors=true        embed the serialized file descriptor
    using_value_wrappers=true   collapse single-field XxxValue wrappers

Flags:
    --version   print the version and exit
    -h, --help  print this text and exit
";

fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("--version") => {
            println!("protoc-gen-protowire {}", env!("CARGO_PKG_VERSION"));
        }
        Some("-h") | Some("--help") => {
            print!("{}", USAGE);
        }
        _ => {
            if let Err(error) = run() {
                eprintln!("{}", error);
                process::exit(1);
            }
        }
    }
}

fn run() -> io::Result<()> {
    let mut buf = Vec::new();
    io::stdin().read_to_end(&mut buf)?;

    let request = CodeGeneratorRequest::decode(&buf).map_err(|error| {
        Error::new(
            ErrorKind::InvalidData,
            format!("invalid CodeGeneratorRequest: {}", error),
        )
    })?;

    let response = protowire_gen::generate(&request);

    let out = response.encode().map_err(|error| {
        Error::new(
            ErrorKind::InvalidData,
            format!("failed to encode CodeGeneratorResponse: {}", error),
        )
    })?;
    io::stdout().write_all(&out)?;

    Ok(())
}
