//! # Core Wire Format
//!
//! Low-level frame handling, header codec, and body parsing.
//!
//! This module provides the foundation for the relay protocol, handling frame
//! framing, encoding/decoding, and wire format.
//!
//! ## Components
//! - **Message**: Header + body payload with length-prefixed encoding
//! - **Codec**: Tokio codec for framing over byte streams
//! - **Cursor**: Bounds-checked reader for message bodies
//!
//! ## Wire Format
//! ```text
//! [Length(4)] [MsgId(4)] [SenderId(4)] [TargetId(4)] [Body(N)]
//! ```
//! All integers are signed 32-bit little-endian. `Length` counts everything
//! after itself: the 12-byte header plus the body.
//!
//! ## Safety
//! - Maximum frame size: 2MB (prevents memory exhaustion)
//! - Length validation before allocation
//! - Body reads are bounds-checked; overruns are decode errors, not panics

pub mod codec;
pub mod cursor;
pub mod message;
