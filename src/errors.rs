/*!
 * Error types for the locflow library.
 *
 * This module contains custom error types for different parts of the pipeline,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when talking to the translation service
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error reported inside the streamed response, or a stream that never
    /// produced a usable result
    #[error("Stream error: {0}")]
    StreamError(String),
}

/// Errors that can occur while reading or writing interchange documents
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Malformed XML
    #[error("XML error: {0}")]
    Xml(String),

    /// Well-formed XML that does not have the expected shape
    #[error("Unexpected document structure: {0}")]
    Structure(String),

    /// Error reading or writing a document file
    #[error("Document I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while flattening documents into entities
#[derive(Error, Debug)]
pub enum EntityError {
    /// Two distinct key paths hashed to the same short key
    #[error("Key collision on {key}: {existing} and {incoming}")]
    KeyCollision {
        /// The colliding key
        key: String,
        /// Key path already in the dictionary
        existing: String,
        /// Key path that collided with it
        incoming: String,
    },

    /// Error from the document layer
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
}

/// Errors raised while planning translation batches
#[derive(Error, Debug)]
pub enum PlanningError {
    /// A single entity does not fit the token budget even for one language
    #[error("{key} is too long to be translated: {preview}...")]
    TooLong {
        /// Entity key
        key: String,
        /// First characters of the source text
        preview: String,
    },
}

/// Errors that abort a translation run
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the batch planner
    #[error("Planning error: {0}")]
    Planning(#[from] PlanningError),

    /// Invalid translator configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The reviewer could not produce a decision
    #[error("Review error: {0}")]
    Review(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from document handling
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Error from entity extraction
    #[error("Entity error: {0}")]
    Entity(#[from] EntityError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<quick_xml::Error> for DocumentError {
    fn from(error: quick_xml::Error) -> Self {
        Self::Xml(error.to_string())
    }
}
