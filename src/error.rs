//! # Error Types
//!
//! Error handling for the relay protocol.
//!
//! This module defines all error variants that can occur during relay
//! operations, from low-level I/O errors to wire-format violations.
//!
//! ## Error Categories
//! - **I/O Errors**: Network failures on the underlying stream
//! - **Framing Errors**: Bad length prefixes, truncated headers, oversized frames
//! - **Body Errors**: Message bodies that run past their own bounds
//! - **Configuration Errors**: Invalid or unreadable configuration
//!
//! All errors implement `std::error::Error` for interoperability.
//!
//! Framing errors are fatal to the connection that produced them; body errors
//! are not: the message is dropped and the connection keeps reading.

use std::io;
use thiserror::Error;

// ProtocolError is the primary error type for all relay operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed length prefix: need 4 bytes, got {0}")]
    MalformedLength(usize),

    #[error("Invalid frame length: {0}")]
    InvalidLength(i32),

    #[error("Frame too large: {0} bytes")]
    OversizedFrame(usize),

    #[error("Malformed header: need 12 bytes, got {0}")]
    MalformedHeader(usize),

    #[error("Body too large to encode: {0} bytes")]
    BodyTooLarge(usize),

    #[error("Malformed body: {0}")]
    MalformedBody(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
