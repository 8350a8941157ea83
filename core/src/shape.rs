//! Declarative shape validation for JSON values.
//!
//! Every request and response type implements [`Shape`]: it is built from a
//! borrowed [`serde_json::Value`] while tracking the path of the value being
//! read, so a rejection always names the offending field
//! (`data.items[2].openCard.current`) and the constraint it broke.

use std::fmt;

use serde_json::{Map, Value};

use crate::field::Field;

/// Dotted/indexed location of a value inside a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn key(&self, key: &str) -> Self {
        if self.0.is_empty() {
            Self(key.to_string())
        } else {
            Self(format!("{}.{key}", self.0))
        }
    }

    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{index}]", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn violation(&self, constraint: Constraint) -> ValidationError {
        ValidationError {
            path: self.0.clone(),
            constraint,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(display_location(&self.0))
    }
}

fn display_location(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}

/// A value failed its declared shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {constraint}", display_location(.path))]
pub struct ValidationError {
    /// Path of the offending field; empty for the document root.
    pub path: String,
    pub constraint: Constraint,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Constraint {
    #[error("required field is missing")]
    Missing,
    #[error("expected {expected}, received {received}")]
    Type {
        expected: &'static str,
        received: &'static str,
    },
    #[error("expected an integer, received {received}")]
    NotInteger { received: String },
    #[error("integer does not fit in 64 bits, received {received}")]
    IntegerOverflow { received: String },
    #[error("must be between {min} and {max}, received {received}")]
    OutOfRange { min: i64, max: i64, received: i64 },
    #[error("must contain at least {min} item(s), received {received}")]
    TooFewItems { min: usize, received: usize },
    #[error("must contain at most {max} item(s), received {received}")]
    TooManyItems { max: usize, received: usize },
    #[error("must be one of [{}], received {:?}", .allowed.join(", "), .received)]
    NotInEnum {
        allowed: &'static [&'static str],
        received: String,
    },
}

impl Constraint {
    /// Stable machine-readable name of the violated constraint.
    pub fn code(&self) -> &'static str {
        match self {
            Constraint::Missing => "missing_field",
            Constraint::Type { .. } => "invalid_type",
            Constraint::NotInteger { .. } => "not_integer",
            Constraint::IntegerOverflow { .. } => "integer_out_of_range",
            Constraint::OutOfRange { .. } => "out_of_range",
            Constraint::TooFewItems { .. } => "too_few_items",
            Constraint::TooManyItems { .. } => "too_many_items",
            Constraint::NotInEnum { .. } => "not_in_enum",
        }
    }
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_mismatch(path: &FieldPath, expected: &'static str, value: &Value) -> ValidationError {
    path.violation(Constraint::Type {
        expected,
        received: json_type_name(value),
    })
}

/// Inclusive bounds for an integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
}

impl IntRange {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn check(&self, value: i64, path: &FieldPath) -> Result<(), ValidationError> {
        if value < self.min || value > self.max {
            return Err(path.violation(Constraint::OutOfRange {
                min: self.min,
                max: self.max,
                received: value,
            }));
        }
        Ok(())
    }
}

/// Bounds on the length of an array field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemCount {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl ItemCount {
    pub const fn at_most(max: usize) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub const fn between(min: usize, max: usize) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn check(&self, len: usize, path: &FieldPath) -> Result<(), ValidationError> {
        if let Some(min) = self.min
            && len < min
        {
            return Err(path.violation(Constraint::TooFewItems { min, received: len }));
        }
        if let Some(max) = self.max
            && len > max
        {
            return Err(path.violation(Constraint::TooManyItems { max, received: len }));
        }
        Ok(())
    }
}

/// A type that can be validated out of a JSON value.
pub trait Shape: Sized {
    fn from_json(value: &Value, path: &FieldPath) -> Result<Self, ValidationError>;

    fn validate(value: &Value) -> Result<Self, ValidationError> {
        Self::from_json(value, &FieldPath::root())
    }
}

impl Shape for String {
    fn from_json(value: &Value, path: &FieldPath) -> Result<Self, ValidationError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| type_mismatch(path, "string", value))
    }
}

impl Shape for bool {
    fn from_json(value: &Value, path: &FieldPath) -> Result<Self, ValidationError> {
        value
            .as_bool()
            .ok_or_else(|| type_mismatch(path, "boolean", value))
    }
}

impl Shape for f64 {
    fn from_json(value: &Value, path: &FieldPath) -> Result<Self, ValidationError> {
        value
            .as_f64()
            .ok_or_else(|| type_mismatch(path, "number", value))
    }
}

impl Shape for i64 {
    fn from_json(value: &Value, path: &FieldPath) -> Result<Self, ValidationError> {
        let Value::Number(number) = value else {
            return Err(type_mismatch(path, "integer", value));
        };
        if let Some(int) = number.as_i64() {
            return Ok(int);
        }
        if number.is_u64() {
            return Err(path.violation(Constraint::IntegerOverflow {
                received: number.to_string(),
            }));
        }
        // Integral floats (`5.0`) are integers on the wire.
        match number.as_f64() {
            Some(float) if float.fract() == 0.0 => {
                if float >= i64::MIN as f64 && float < i64::MAX as f64 {
                    Ok(float as i64)
                } else {
                    Err(path.violation(Constraint::IntegerOverflow {
                        received: number.to_string(),
                    }))
                }
            }
            _ => Err(path.violation(Constraint::NotInteger {
                received: number.to_string(),
            })),
        }
    }
}

impl Shape for Value {
    fn from_json(value: &Value, _path: &FieldPath) -> Result<Self, ValidationError> {
        Ok(value.clone())
    }
}

impl<T: Shape> Shape for Vec<T> {
    fn from_json(value: &Value, path: &FieldPath) -> Result<Self, ValidationError> {
        let items = value
            .as_array()
            .ok_or_else(|| type_mismatch(path, "array", value))?;
        items
            .iter()
            .enumerate()
            .map(|(index, item)| T::from_json(item, &path.index(index)))
            .collect()
    }
}

/// Field-by-field reader over a JSON object.
pub struct ObjectReader<'a> {
    map: &'a Map<String, Value>,
    path: &'a FieldPath,
}

impl<'a> ObjectReader<'a> {
    pub fn new(value: &'a Value, path: &'a FieldPath) -> Result<Self, ValidationError> {
        let map = value
            .as_object()
            .ok_or_else(|| type_mismatch(path, "object", value))?;
        Ok(Self { map, path })
    }

    pub fn path(&self, key: &str) -> FieldPath {
        self.path.key(key)
    }

    pub fn required<T: Shape>(&self, key: &str) -> Result<T, ValidationError> {
        let path = self.path(key);
        match self.map.get(key) {
            Some(value) => T::from_json(value, &path),
            None => Err(path.violation(Constraint::Missing)),
        }
    }

    pub fn optional<T: Shape>(&self, key: &str) -> Result<Field<T>, ValidationError> {
        match self.map.get(key) {
            None => Ok(Field::Absent),
            Some(Value::Null) => Ok(Field::Null),
            Some(value) => T::from_json(value, &self.path(key)).map(Field::Present),
        }
    }

    /// Entries whose keys are not listed in `known`, in document order.
    pub fn rest(&self, known: &[&str]) -> Map<String, Value> {
        self.map
            .iter()
            .filter(|(key, _)| !known.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Declares a closed set of wire strings as a Rust enum implementing
/// [`Shape`], `Serialize` and `Display`.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];
            pub const WIRE_NAMES: &'static [&'static str] = &[$($wire),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl $crate::shape::Shape for $name {
            fn from_json(
                value: &::serde_json::Value,
                path: &$crate::shape::FieldPath,
            ) -> Result<Self, $crate::shape::ValidationError> {
                let raw = <String as $crate::shape::Shape>::from_json(value, path)?;
                match raw.as_str() {
                    $($wire => Ok(Self::$variant),)+
                    _ => Err(path.violation($crate::shape::Constraint::NotInEnum {
                        allowed: Self::WIRE_NAMES,
                        received: raw,
                    })),
                }
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Implements `Deserialize` for shapes by validating a buffered JSON value.
macro_rules! deserialize_via_shape {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl<'de> ::serde::Deserialize<'de> for $ty {
                fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    let value = <::serde_json::Value as ::serde::Deserialize>::deserialize(deserializer)?;
                    <$ty as $crate::shape::Shape>::validate(&value).map_err(::serde::de::Error::custom)
                }
            }
        )+
    };
}

pub(crate) use deserialize_via_shape;
pub(crate) use string_enum;
