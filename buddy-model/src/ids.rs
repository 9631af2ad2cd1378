//! Strongly typed identifiers.
//!
//! Catalog servers hand out opaque string keys (Plex rating keys, section
//! keys, playlist keys) that stay stable across refreshes, so every id here
//! wraps the server's string rather than minting local ids.

use crate::error::ModelError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(pub String);

        impl $name {
            /// Validate a raw key received from a collaborator.
            pub fn parse(raw: impl Into<String>) -> Result<Self, ModelError> {
                let raw = raw.into();
                if raw.trim().is_empty() {
                    return Err(ModelError::EmptyId($label));
                }
                Ok($name(raw))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Identity of a show, season or episode in the remote catalog.
    NodeId,
    "node"
);
string_id!(
    /// Identity of a library section on the remote server.
    LibraryId,
    "library"
);
string_id!(
    /// Identity of a curated collection of shows or seasons.
    CollectionId,
    "collection"
);
string_id!(
    /// Identity of a playlist on the remote server.
    PlaylistId,
    "playlist"
);

/// Numeric account id used by the watch-history provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct UserId(pub u64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
