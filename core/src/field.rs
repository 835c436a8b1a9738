//! Tri-state record fields.
//!
//! # Design
//! A JSON payload cannot tell "leave this alone" from "clear this", and a
//! partial PATCH needs both. `Field<T>` keeps the two apart:
//!
//! - `Unset`: not loaded, not sent. Absent keys decode to this.
//! - `Required`: placeholder set by constructors for fields the caller still
//!   has to supply. `Record::fields` refuses to serialize a record holding it.
//! - `Null`: sent as JSON `null`, which is how a relation is cleared.
//! - `Value(T)`: sent as-is.
//!
//! Structs holding `Field`s must use `#[serde(default)]` at container level
//! and `skip_serializing_if = "Field::is_absent"` per field.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    Unset,
    Required,
    Null,
    Value(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Unset
    }
}

impl<T> Field<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Field::Unset)
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Field::Required)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    /// Unset or still-required: either way nothing goes on the wire.
    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Unset | Field::Required)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn value_mut(&mut self) -> Option<&mut T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn set(&mut self, value: impl Into<T>) {
        *self = Field::Value(value.into());
    }

    /// Mark the field for clearing on the next push.
    pub fn clear(&mut self) {
        *self = Field::Null;
    }

    /// Stop sending the field.
    pub fn unset(&mut self) {
        *self = Field::Unset;
    }
}

impl<T: Clone> Field<T> {
    pub fn cloned(&self) -> Option<T> {
        self.value().cloned()
    }
}

impl Field<String> {
    pub fn as_deref(&self) -> Option<&str> {
        self.value().map(String::as_str)
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Field::Value(value)
    }
}

impl From<&str> for Field<String> {
    fn from(value: &str) -> Self {
        Field::Value(value.to_string())
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Field::Null, Field::Value)
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Value(v) => v.serialize(serializer),
            // Unset and Required are filtered out by `skip_serializing_if`;
            // this arm only runs when a Field is serialized on its own.
            Field::Null | Field::Unset | Field::Required => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Field::from)
    }
}
