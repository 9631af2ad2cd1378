use std::fmt::{self, Display};

/// Errors produced by model constructors and validation routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    EmptyId(&'static str),
    UnknownVariant { kind: &'static str, value: String },
    SmartPlaylistEdit(String),
    MissingRule(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::EmptyId(kind) => write!(f, "{kind} id cannot be empty"),
            ModelError::UnknownVariant { kind, value } => {
                write!(f, "unknown {kind}: {value}")
            }
            ModelError::SmartPlaylistEdit(name) => write!(
                f,
                "playlist '{name}' is a smart playlist; its items come from its rule"
            ),
            ModelError::MissingRule(name) => {
                write!(f, "playlist '{name}' has no smart rule to resolve")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
