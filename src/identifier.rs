//! Identifier Rules - Labels, Package Names, Import Paths
//!
//! Syntax is scope-independent and checked before any owner sees the value.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::SchemaError;

pub const IDENTIFIER_PATTERN: &str = "[A-Za-z][A-Za-z0-9_]*";
pub const PACKAGE_PATTERN: &str = "[A-Za-z][A-Za-z0-9_]*(\\.[A-Za-z][A-Za-z0-9_]*)*";
pub const IMPORT_PATTERN: &str = "[A-Za-z0-9_][A-Za-z0-9_.-]*(/[A-Za-z0-9_][A-Za-z0-9_.-]*)*";

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| anchored(IDENTIFIER_PATTERN));
static PACKAGE: LazyLock<Regex> = LazyLock::new(|| anchored(PACKAGE_PATTERN));
static IMPORT: LazyLock<Regex> = LazyLock::new(|| anchored(IMPORT_PATTERN));

fn anchored(pattern: &str) -> Regex {
    Regex::new(&format!("^{pattern}$")).expect("built-in pattern compiles")
}

fn check(regex: &Regex, pattern: &'static str, value: &str) -> Result<(), SchemaError> {
    if regex.is_match(value) {
        Ok(())
    } else {
        Err(SchemaError::Syntax {
            value: value.to_string(),
            pattern,
        })
    }
}

/// A label of a declaration, field, variant or reservation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(value: &str) -> Result<Self, SchemaError> {
        check(&IDENTIFIER, IDENTIFIER_PATTERN, value)?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Dot-separated identifiers, e.g. `acme.billing.v1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    pub fn new(value: &str) -> Result<Self, SchemaError> {
        check(&PACKAGE, PACKAGE_PATTERN, value)?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }
}

/// Relative path of an imported schema file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ImportPath(String);

impl ImportPath {
    pub fn new(value: &str) -> Result<Self, SchemaError> {
        check(&IMPORT, IMPORT_PATTERN, value)?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_like {
    ($($name:ident),*) => {$(
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    )*};
}

string_like!(Identifier, PackageName, ImportPath);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_syntax() {
        assert!(Identifier::new("message").is_ok());
        assert!(Identifier::new("Foo_bar9").is_ok());
        assert!(Identifier::new("").is_err());
        assert!(Identifier::new("9lives").is_err());
        assert!(Identifier::new("_hidden").is_err());
        assert!(Identifier::new("message!").is_err());
        assert!(Identifier::new("two words").is_err());
    }

    #[test]
    fn test_package_segments() {
        let name = PackageName::new("acme.billing.v1").unwrap();
        assert_eq!(name.segments().collect::<Vec<_>>(), ["acme", "billing", "v1"]);
        assert!(PackageName::new("acme..billing").is_err());
        assert!(PackageName::new(".acme").is_err());
        assert!(PackageName::new("package!").is_err());
    }

    #[test]
    fn test_import_paths() {
        assert!(ImportPath::new("google/protobuf/empty.proto").is_ok());
        assert!(ImportPath::new("local.proto").is_ok());
        assert!(ImportPath::new("/etc/passwd").is_err());
        assert!(ImportPath::new("with space.proto").is_err());
        assert!(ImportPath::new("quote\".proto").is_err());
        assert!(ImportPath::new("").is_err());
    }

    #[test]
    fn test_syntax_error_names_pattern() {
        let err = Identifier::new("bad!").unwrap_err();
        assert!(err.to_string().contains(IDENTIFIER_PATTERN));
    }
}
