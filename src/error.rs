//! Protobuf encoding and decoding errors.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;

/// A scalar value which cannot be represented by its declared Protobuf type.
///
/// Produced when an integer falls outside the declared range, a value has the
/// wrong kind for the field's type, or an enumeration symbol has no number in
/// the enumeration's table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeEncodeError {
    ty: String,
    value: String,
    reason: Cow<'static, str>,
}

impl TypeEncodeError {
    pub(crate) fn new(
        ty: impl Into<String>,
        value: impl fmt::Debug,
        reason: impl Into<Cow<'static, str>>,
    ) -> TypeEncodeError {
        TypeEncodeError {
            ty: ty.into(),
            value: format!("{:?}", value),
            reason: reason.into(),
        }
    }

    /// The declared Protobuf type of the field, e.g. `int32`.
    pub fn declared_type(&self) -> &str {
        &self.ty
    }

    /// A rendering of the offending value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for TypeEncodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} cannot be encoded as {}: {}",
            self.value, self.ty, self.reason
        )
    }
}

impl Error for TypeEncodeError {}

/// The kinds of failure which can abort encoding a message.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum EncodeErrorKind {
    /// A scalar value violated its declared type.
    Type(TypeEncodeError),
    /// A oneof group carried a branch which does not belong to it.
    OneofMismatch { branch: String, group: String },
    /// A proto2 `required` field had no value.
    MissingRequired,
    /// A referenced message or enumeration is not present in the registry.
    UnknownType { name: String },
    /// An extension value has no registered extension field.
    UnknownExtension { module: String, key: String },
    /// A value had the wrong shape for its field, e.g. a scalar on a
    /// repeated field.
    UnexpectedValue { expected: &'static str, found: String },
}

impl fmt::Display for EncodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EncodeErrorKind::Type(error) => error.fmt(f),
            EncodeErrorKind::OneofMismatch { branch, group } => write!(
                f,
                "branch {:?} does not belong to oneof group {:?}",
                branch, group
            ),
            EncodeErrorKind::MissingRequired => write!(f, "missing required field"),
            EncodeErrorKind::UnknownType { name } => {
                write!(f, "type {:?} is not registered", name)
            }
            EncodeErrorKind::UnknownExtension { module, key } => {
                write!(f, "unknown extension {}.{}", module, key)
            }
            EncodeErrorKind::UnexpectedValue { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
        }
    }
}

/// A message encoding error.
///
/// Carries the failure kind together with the type name of the struct and
/// the identifier of the field being encoded when the failure occurred.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeError {
    kind: EncodeErrorKind,
    type_name: Option<String>,
    field: Option<String>,
}

impl EncodeError {
    pub(crate) fn new(kind: EncodeErrorKind) -> EncodeError {
        EncodeError {
            kind,
            type_name: None,
            field: None,
        }
    }

    pub(crate) fn oneof_mismatch(branch: &str, group: &str) -> EncodeError {
        EncodeError::new(EncodeErrorKind::OneofMismatch {
            branch: branch.to_owned(),
            group: group.to_owned(),
        })
    }

    pub(crate) fn missing_required() -> EncodeError {
        EncodeError::new(EncodeErrorKind::MissingRequired)
    }

    pub(crate) fn unknown_type(name: &str) -> EncodeError {
        EncodeError::new(EncodeErrorKind::UnknownType {
            name: name.to_owned(),
        })
    }

    pub(crate) fn unknown_extension(module: &str, key: &str) -> EncodeError {
        EncodeError::new(EncodeErrorKind::UnknownExtension {
            module: module.to_owned(),
            key: key.to_owned(),
        })
    }

    pub(crate) fn unexpected(expected: &'static str, found: impl fmt::Debug) -> EncodeError {
        EncodeError::new(EncodeErrorKind::UnexpectedValue {
            expected,
            found: format!("{:?}", found),
        })
    }

    /// Attaches the struct type name and field identifier to the error.
    ///
    /// The innermost context wins: once set, further wrapping leaves it
    /// untouched so the error points at the field which actually failed.
    pub(crate) fn context(mut self, type_name: &str, field: &str) -> EncodeError {
        if self.type_name.is_none() {
            self.type_name = Some(type_name.to_owned());
            self.field = Some(field.to_owned());
        }
        self
    }

    /// The failure kind.
    pub fn kind(&self) -> &EncodeErrorKind {
        &self.kind
    }

    /// The proto-qualified type name of the struct being encoded.
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// The identifier of the field being encoded.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (&self.type_name, &self.field) {
            (Some(type_name), Some(field)) => write!(
                f,
                "failed to encode field {}.{}: {}",
                type_name, field, self.kind
            ),
            _ => write!(f, "failed to encode message: {}", self.kind),
        }
    }
}

impl Error for EncodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            EncodeErrorKind::Type(error) => Some(error),
            _ => None,
        }
    }
}

impl From<TypeEncodeError> for EncodeError {
    fn from(error: TypeEncodeError) -> EncodeError {
        EncodeError::new(EncodeErrorKind::Type(error))
    }
}

/// A Protobuf message decoding error.
///
/// Indicates that the input buffer does not contain a valid Protobuf message.
/// The error details should be considered 'best effort': in general it is not
/// possible to exactly pinpoint why data is malformed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeError {
    description: Cow<'static, str>,
}

impl DecodeError {
    /// Creates a new `DecodeError` with a 'best effort' root cause
    /// description.
    pub fn new(description: impl Into<Cow<'static, str>>) -> DecodeError {
        DecodeError {
            description: description.into(),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "failed to decode Protobuf message: {}", self.description)
    }
}

impl Error for DecodeError {}
