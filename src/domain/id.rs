//! Entity identifiers.
//!
//! An entity is addressed by exactly one identifier scheme at a time:
//! a [`TempId`] generated on the client between optimistic creation and
//! server confirmation, or a [`ServerId`] assigned by the remote store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Prefix marking a temporary identifier in its string form.
pub const TEMP_ID_PREFIX: &str = "temp-";

// =============================================================================
// ServerId
// =============================================================================

/// Identifier assigned by the remote store once an entity is persisted.
///
/// The value is opaque to the client (the service uses document ids).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(String);

impl ServerId {
    /// Creates a `ServerId` from the raw value returned by the service.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for ServerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// =============================================================================
// TempId
// =============================================================================

/// Client-generated placeholder identifier.
///
/// Backed by a time-ordered UUID (v7), so ids generated later in a session
/// sort after earlier ones and never collide within the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TempId(Uuid);

impl TempId {
    /// Generates a fresh temporary identifier.
    ///
    /// **Note**: reads the system clock and the random source.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{TEMP_ID_PREFIX}{}", self.0)
    }
}

// =============================================================================
// EntityId
// =============================================================================

/// The identifier an entity is currently known by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EntityId {
    /// Not yet confirmed by the remote store.
    Temporary(TempId),
    /// Persisted by the remote store.
    Server(ServerId),
}

impl EntityId {
    /// Returns `true` for a client-generated placeholder.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }

    /// Returns the server identifier, if the entity has been confirmed.
    #[must_use]
    pub const fn as_server(&self) -> Option<&ServerId> {
        match self {
            Self::Server(id) => Some(id),
            Self::Temporary(_) => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temporary(id) => id.fmt(formatter),
            Self::Server(id) => id.fmt(formatter),
        }
    }
}

impl From<ServerId> for EntityId {
    fn from(value: ServerId) -> Self {
        Self::Server(value)
    }
}

impl From<TempId> for EntityId {
    fn from(value: TempId) -> Self {
        Self::Temporary(value)
    }
}

impl From<EntityId> for String {
    fn from(value: EntityId) -> Self {
        value.to_string()
    }
}

/// Error returned when an identifier string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    /// The string was empty.
    #[error("identifier must not be empty")]
    Empty,

    /// The string carried the temporary prefix but no valid UUID.
    #[error("invalid temporary identifier '{0}'")]
    InvalidTemporary(String),
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err(IdParseError::Empty);
        }
        match value.strip_prefix(TEMP_ID_PREFIX) {
            Some(raw) => Uuid::parse_str(raw)
                .map(|uuid| Self::Temporary(TempId::from_uuid(uuid)))
                .map_err(|_| IdParseError::InvalidTemporary(value.to_string())),
            None => Ok(Self::Server(ServerId::new(value))),
        }
    }
}

impl TryFrom<String> for EntityId {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_temp_ids_are_unique_and_ordered() {
        let first = TempId::generate();
        let second = TempId::generate();
        assert_ne!(first, second);
        assert!(first < second);
    }

    #[rstest]
    #[case("abc", false)]
    #[case("65f1c2d3e4b5a6978899aabb", false)]
    fn test_parse_server_id(#[case] raw: &str, #[case] temporary: bool) {
        let id: EntityId = raw.parse().unwrap();
        assert_eq!(id.is_temporary(), temporary);
        assert_eq!(id.to_string(), raw);
    }

    #[rstest]
    fn test_temporary_id_round_trips_through_string() {
        let id = EntityId::from(TempId::generate());
        let text = id.to_string();
        assert!(text.starts_with(TEMP_ID_PREFIX));
        assert_eq!(text.parse::<EntityId>().unwrap(), id);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn test_parse_empty_id_fails(#[case] raw: &str) {
        assert_eq!(raw.parse::<EntityId>(), Err(IdParseError::Empty));
    }

    #[rstest]
    fn test_parse_malformed_temporary_id_fails() {
        let result = "temp-not-a-uuid".parse::<EntityId>();
        assert!(matches!(result, Err(IdParseError::InvalidTemporary(_))));
    }

    #[rstest]
    fn test_entity_id_serializes_as_plain_string() {
        let id = EntityId::Server(ServerId::new("abc"));
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        let parsed: EntityId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(parsed, id);
    }
}
