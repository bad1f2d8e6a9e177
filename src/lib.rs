#![doc(html_root_url = "https://docs.rs/protowire/0.3.0")]

//! `protowire` is a runtime implementation of the Protocol Buffers wire
//! format.
//!
//! Instead of generating one struct per message, messages are described by
//! compiled descriptor tables ([`MessageProps`], [`FieldProps`],
//! [`EnumProps`]) registered in a [`TypeRegistry`], and message values are
//! dynamic [`StructValue`]s. The [`encode`] and [`decode`] entry points
//! traverse a value together with its tables, producing and consuming bytes
//! compatible with upstream Protocol Buffers.
//!
//! The tables are ordinarily emitted by `protoc-gen-protowire` (the
//! `protowire-gen` crate), but can just as well be written by hand:
//!
//! ```
//! use protowire::{FieldProps, FieldType, MessageProps, StructValue, Syntax, TypeRegistry};
//!
//! let props = MessageProps::build("pkg.Scalars", Syntax::Proto3)
//!     .field(FieldProps::new(1, "a", FieldType::Int32))
//!     .field(FieldProps::new(2, "b", FieldType::String))
//!     .finish();
//!
//! let registry = TypeRegistry::new();
//! let value = StructValue::new().field("a", 150).field("b", "");
//!
//! let bytes = protowire::encode(&value, &props, &registry)?;
//! assert_eq!(bytes, [0x08, 0x96, 0x01]);
//!
//! let roundtrip = protowire::decode(&bytes, &props, &registry)?;
//! assert_eq!(roundtrip.get("a"), value.get("a"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod decode;
mod encode;
pub mod encoding;
mod error;
mod props;
mod value;

pub use crate::decode::decode;
pub use crate::encode::encode;
pub use crate::error::{DecodeError, EncodeError, EncodeErrorKind, TypeEncodeError};
pub use crate::props::{
    EnumProps, EnumPropsBuilder, ExtensionProps, FieldKind, FieldProps, FieldType, Label,
    MessageProps, MessagePropsBuilder, Syntax, TypeRegistry,
};
pub use crate::value::{MapKey, StructValue, Value};
