//! Reader Module
//!
//! Turns tokenizer output into pull-parser events:
//! - SliceReader: zero-copy reader over a UTF-8 byte slice
//! - Events: event types carrying parsed attributes

pub mod events;
pub mod slice;
