//! Custom error types for the live-serve development server
//!
//! This module defines custom error types and implements the necessary traits
//! to properly handle errors throughout the application.

use std::fmt;

/// Main error type for the live-serve application
#[derive(Debug)]
pub enum LiveServeError {
    /// Error occurred while parsing the listen address
    AddressParse(std::net::AddrParseError),

    /// Error occurred while binding, serving, or reading from disk
    Io(std::io::Error),

    /// Error occurred while parsing the configuration file
    ConfigParse(json5::Error),

    /// Error occurred while creating or driving the filesystem watcher
    Watch(notify::Error),

    /// Error occurred on a reload socket
    Socket(axum::Error),

    /// Generic error with a message
    Generic(String),
}

impl fmt::Display for LiveServeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiveServeError::AddressParse(e) => {
                write!(f, "Failed to parse network address: {e}")
            }
            LiveServeError::Io(e) => {
                write!(f, "I/O error: {e}")
            }
            LiveServeError::ConfigParse(e) => {
                write!(f, "Failed to parse configuration: {e}")
            }
            LiveServeError::Watch(e) => {
                write!(f, "File watcher error: {e}")
            }
            LiveServeError::Socket(e) => {
                write!(f, "Reload socket error: {e}")
            }
            LiveServeError::Generic(msg) => {
                write!(f, "Error: {msg}")
            }
        }
    }
}

impl std::error::Error for LiveServeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LiveServeError::AddressParse(e) => Some(e),
            LiveServeError::Io(e) => Some(e),
            LiveServeError::ConfigParse(e) => Some(e),
            LiveServeError::Watch(e) => Some(e),
            LiveServeError::Socket(e) => Some(e),
            LiveServeError::Generic(_) => None,
        }
    }
}

impl From<std::net::AddrParseError> for LiveServeError {
    fn from(error: std::net::AddrParseError) -> Self {
        LiveServeError::AddressParse(error)
    }
}

impl From<std::io::Error> for LiveServeError {
    fn from(error: std::io::Error) -> Self {
        LiveServeError::Io(error)
    }
}

impl From<json5::Error> for LiveServeError {
    fn from(error: json5::Error) -> Self {
        LiveServeError::ConfigParse(error)
    }
}

impl From<notify::Error> for LiveServeError {
    fn from(error: notify::Error) -> Self {
        LiveServeError::Watch(error)
    }
}

impl From<axum::Error> for LiveServeError {
    fn from(error: axum::Error) -> Self {
        LiveServeError::Socket(error)
    }
}

impl From<&str> for LiveServeError {
    fn from(msg: &str) -> Self {
        LiveServeError::Generic(msg.to_string())
    }
}

impl From<String> for LiveServeError {
    fn from(msg: String) -> Self {
        LiveServeError::Generic(msg)
    }
}

/// Result type alias using our custom error type
pub type Result<T> = std::result::Result<T, LiveServeError>;
