//! Core parsing primitives
//!
//! This module contains the fundamental building blocks for parsing:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Tokenizer: State machine for XML/HTML token extraction
//! - Entities: entity decoding with Cow (zero-copy when possible)
//! - Attributes: Attribute parsing and extraction
//! - Encoding: detection and conversion to UTF-8

pub mod attributes;
pub mod encoding;
pub mod entities;
pub mod scanner;
pub mod tokenizer;
