//! I/O utilities for archive inspection.
//!
//! This module provides the stream abstraction walkers operate on and the
//! bounded buffering used before recursing into an entry body.

pub mod bounded;

pub use bounded::check_declared_size;
pub use bounded::read_bounded;

use std::io::Read;
use std::io::Seek;

/// A readable, seekable byte stream.
///
/// Implemented for every `Read + Seek` type so walkers can be used as trait
/// objects.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}
