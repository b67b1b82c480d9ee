use thiserror::Error;

use moot_election::ElectionError;
use moot_types::ValidationError;

/// Failure reported by a platform collaborator (roster, messenger,
/// presence, cue player).
///
/// Collaborators are adapters over an external chat platform; their failures
/// carry whatever message the adapter produced. The engine treats most of
/// them as non-fatal and logs instead of propagating.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct CollabError(String);

impl CollabError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// The request was understood but the rules reject it.
    #[error(transparent)]
    Rejected(#[from] ValidationError),

    /// A poll machine was driven against the window it is actually in.
    #[error("poll error: {0}")]
    Poll(#[from] ElectionError),

    /// A collaborator failed on an operation the engine cannot paper over.
    #[error("collaborator error: {0}")]
    Collab(#[from] CollabError),

    #[error("config error: {0}")]
    Config(String),
}

impl EngineError {
    /// The validation rejection inside, if that is what this error is.
    pub fn rejection(&self) -> Option<&ValidationError> {
        match self {
            EngineError::Rejected(v) => Some(v),
            _ => None,
        }
    }
}
