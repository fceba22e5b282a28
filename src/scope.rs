//! Variable bindings captured at a fault site.

use core::fmt;

use indexmap::IndexMap;
use serde::{Serialize, Serializer, ser::Error as _};

/// Snapshot of named bindings at a fault site, in capture order.
pub type ScopeVariables = IndexMap<String, ScopeValue>;

/// A captured variable value.
///
/// Only plain data is reproduced. Anything else is recorded as
/// [`ScopeValue::Opaque`] with its type name, and makes the owning record
/// fail full serialization.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum ScopeValue {
    /// No value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Integer(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    String(String),
    /// A value that cannot be reproduced, identified by its type name.
    Opaque(&'static str),
}

impl ScopeValue {
    /// Records a value of type `T` without reproducing it.
    pub fn opaque<T: ?Sized>(_value: &T) -> Self {
        Self::Opaque(core::any::type_name::<T>())
    }

    /// Whether the value can be serialized.
    pub fn is_serializable(&self) -> bool {
        !matches!(self, Self::Opaque(_))
    }
}

impl Serialize for ScopeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::String(value) => serializer.serialize_str(value),
            Self::Opaque(type_name) => Err(S::Error::custom(format_args!(
                "value of type `{type_name}` cannot be serialized"
            ))),
        }
    }
}

impl fmt::Display for ScopeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::Opaque(type_name) => write!(f, "<{type_name}>"),
        }
    }
}

impl From<bool> for ScopeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! from_lossless_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ScopeValue {
                fn from(value: $ty) -> Self {
                    Self::Integer(i64::from(value))
                }
            }
        )*
    };
}

from_lossless_integer!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! from_wide_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ScopeValue {
                fn from(value: $ty) -> Self {
                    match i64::try_from(value) {
                        Ok(value) => Self::Integer(value),
                        Err(_) => Self::String(value.to_string()),
                    }
                }
            }
        )*
    };
}

from_wide_integer!(u64, usize, isize, i128, u128);

impl From<f32> for ScopeValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for ScopeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ScopeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for ScopeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for ScopeValue {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl<T: Into<ScopeValue>> From<Option<T>> for ScopeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(ScopeValue::from(7u8), ScopeValue::Integer(7));
        assert_eq!(ScopeValue::from(-3i32), ScopeValue::Integer(-3));
        assert_eq!(
            ScopeValue::from(u64::MAX),
            ScopeValue::String(u64::MAX.to_string())
        );
        assert_eq!(ScopeValue::from(None::<i32>), ScopeValue::Null);
        assert_eq!(ScopeValue::from(Some("id")), ScopeValue::String("id".into()));
        assert_eq!(ScopeValue::from(1.5f32), ScopeValue::Float(1.5));
    }

    #[test]
    fn test_opaque_values_refuse_serialization() {
        let handle = std::sync::Mutex::new(());
        let value = ScopeValue::opaque(&handle);
        assert!(!value.is_serializable());
        let error = serde_json::to_string(&value).unwrap_err();
        assert!(error.to_string().contains("Mutex"), "{error}");
    }

    #[test]
    fn test_plain_values_serialize() {
        let mut scope = ScopeVariables::new();
        scope.insert("user".into(), "alice".into());
        scope.insert("attempts".into(), 3.into());
        scope.insert("cached".into(), false.into());
        scope.insert("parent".into(), ScopeValue::Null);
        assert_eq!(
            serde_json::to_string(&scope).unwrap(),
            r#"{"user":"alice","attempts":3,"cached":false,"parent":null}"#
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ScopeValue::from("x").to_string(), "\"x\"");
        assert_eq!(ScopeValue::Opaque("std::fs::File").to_string(), "<std::fs::File>");
    }
}
