//! Tri-state field updates.
//!
//! A partial update has to tell apart three intents for a nullable field:
//! leave it alone, clear it, or set it. [`Patch`] encodes them as distinct
//! variants instead of overloading `None`.
//!
//! On the wire, `Keep` is an absent field, `Clear` is `null`, and `Set` is
//! the value. Fields of this type must be declared with
//! `#[serde(default, skip_serializing_if = "Patch::is_keep")]`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Update instruction for a nullable field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    /// Field not provided; the current value is kept.
    #[default]
    Keep,
    /// Field explicitly cleared.
    Clear,
    /// Field set to a new value.
    Set(T),
}

impl<T> Patch<T> {
    /// Returns `true` if the field was not provided.
    #[must_use]
    pub const fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }

    /// Applies the instruction to `target`.
    pub fn apply_to(&self, target: &mut Option<T>)
    where
        T: Clone,
    {
        match self {
            Self::Keep => {}
            Self::Clear => *target = None,
            Self::Set(value) => *target = Some(value.clone()),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Clear, Self::Set)
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Keep | Self::Clear => serializer.serialize_none(),
            Self::Set(value) => serializer.serialize_some(value),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Only called for present fields; absent ones fall back to `Keep`.
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}
