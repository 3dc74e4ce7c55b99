//! Error types for the Jingle vocabulary crate

use thiserror::Error;

/// Result type for jingle-core operations
pub type JingleResult<T> = Result<T, JingleError>;

/// Errors raised while building or interpreting Jingle elements
#[derive(Debug, Clone, Error)]
pub enum JingleError {
    /// A JID string did not have a usable localpart/domain shape
    #[error("Invalid JID: {value}")]
    InvalidJid { value: String },

    /// A required attribute or child element was absent
    #[error("Missing required element: {element}")]
    MissingElement { element: String },

    /// An attribute carried a value outside its defined vocabulary
    #[error("Invalid value for {attribute}: {value}")]
    InvalidValue { attribute: String, value: String },
}

impl JingleError {
    pub fn invalid_jid(value: impl Into<String>) -> Self {
        Self::InvalidJid { value: value.into() }
    }

    pub fn missing_element(element: impl Into<String>) -> Self {
        Self::MissingElement { element: element.into() }
    }

    pub fn invalid_value(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue { attribute: attribute.into(), value: value.into() }
    }
}
