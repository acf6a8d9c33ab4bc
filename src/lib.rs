#![deny(missing_docs)]

//! Generic containers with explicit allocation: an ordered map [`collections::TreeMap`]
//! built on a red-black tree, and a growable array [`vec::Vec`].

//!# Features
//!
//! This crate supports the following cargo features:
//! - `unsafe-optim` : Enable unsafe optimisations in release mode.
//! - `cap` : tests count allocated memory with the `cap` allocator instead of using mimalloc.

/// Memory allocation.
pub mod alloc;

/// Containers.
pub mod collections;

/// Error type shared by the containers.
pub mod error;

/// Interface expected by stack and queue adapters.
pub mod sequence;

/// [`vec::Vec`] similar to [`std::vec::Vec`], with checked and fallible operations.
pub mod vec;

pub use error::{ContainerError, Result};
pub use sequence::Sequence;
