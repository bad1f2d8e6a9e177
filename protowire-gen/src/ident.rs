//! Utility functions for composing and normalizing target identifiers.

use heck::{ToSnakeCase, ToUpperCamelCase};
use itertools::Itertools;

/// Converts a `camelCase` or `SCREAMING_SNAKE_CASE` identifier to a
/// `lower_snake` case field identifier.
pub fn to_snake(s: &str) -> String {
    s.to_snake_case()
}

/// Converts a `snake_case` identifier to an `UpperCamel` case type
/// identifier.
pub fn to_upper_camel(s: &str) -> String {
    s.to_upper_camel_case()
}

/// Normalizes a dotted path into idiomatic type-name form: every segment is
/// converted to `UpperCamel` case, empty segments are dropped.
pub fn normalize(path: &str) -> String {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .map(to_upper_camel)
        .join(".")
}

/// Composes a target module name from the leading component (module prefix
/// or package), the namespace path, and the declared name, then normalizes
/// it. Null or empty components are dropped.
pub fn compose(leading: Option<&str>, namespace: &[String], name: &str) -> String {
    let mut components: Vec<String> = Vec::new();
    if let Some(leading) = leading {
        if !leading.is_empty() {
            components.push(leading.to_owned());
        }
    }
    components.extend(
        namespace
            .iter()
            .filter(|segment| !segment.is_empty())
            .cloned(),
    );
    if !name.is_empty() {
        components.push(name.to_owned());
    }
    normalize(&components.join("."))
}

/// Composes the proto-qualified name keying the global type map: package and
/// namespace joined verbatim, without prefix substitution or normalization.
pub fn proto_qualified(package: &str, namespace: &[String], name: &str) -> String {
    let mut components: Vec<&str> = Vec::new();
    if !package.is_empty() {
        components.push(package);
    }
    components.extend(
        namespace
            .iter()
            .filter(|segment| !segment.is_empty())
            .map(String::as_str),
    );
    if !name.is_empty() {
        components.push(name);
    }
    components.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_snake() {
        assert_eq!("foo_bar", &to_snake("FooBar"));
        assert_eq!("foo_bar_baz", &to_snake("FooBarBAZ"));
        assert_eq!("fuzz_buster", &to_snake("FUZZ_BUSTER"));
        assert_eq!("field_name7", &to_snake("fieldName7"));
        assert_eq!("foo_bar_baz", &to_snake("foo_bar_baz"));
    }

    #[test]
    fn test_to_upper_camel() {
        assert_eq!("", &to_upper_camel(""));
        assert_eq!("F", &to_upper_camel("F"));
        assert_eq!("Foo", &to_upper_camel("FOO"));
        assert_eq!("FooBar", &to_upper_camel("FOO_BAR"));
        assert_eq!("FuzzBuster", &to_upper_camel("fuzzBuster"));
        assert_eq!("FuzzBuster", &to_upper_camel("FuzzBuster"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!("MyPkg.Outer.Inner", &normalize("my_pkg.outer.Inner"));
        assert_eq!("Foo.Bar", &normalize("Foo.Bar"));
        assert_eq!("Foo", &normalize("..foo."));
    }

    #[test]
    fn test_compose() {
        assert_eq!("Pkg.Foo", &compose(Some("pkg"), &[], "Foo"));
        assert_eq!(
            "Pkg.Outer.Inner",
            &compose(Some("pkg"), &["Outer".to_owned()], "Inner")
        );
        assert_eq!("Foo", &compose(None, &[], "Foo"));
        assert_eq!("Foo", &compose(Some(""), &[], "Foo"));
        assert_eq!(
            "My.Prefix.Foo",
            &compose(Some("My.Prefix"), &[], "Foo")
        );
    }

    #[test]
    fn test_proto_qualified() {
        assert_eq!("pkg.Foo", &proto_qualified("pkg", &[], "Foo"));
        assert_eq!(
            "pkg.Outer.Inner",
            &proto_qualified("pkg", &["Outer".to_owned()], "Inner")
        );
        assert_eq!("Foo", &proto_qualified("", &[], "Foo"));
    }
}
