//! Foundation types for Catena, a versioned storage engine for structured
//! data catalogs.
//!
//! This crate provides the types shared by every other Catena crate:
//!
//! - [`ObjId`] — content-addressed identifier (BLAKE3 hash)
//! - [`StoreKey`] — structured, orderable key for catalog content entries
//! - [`CommitHeaders`] — commit metadata (author, message, timestamp,
//!   caller-defined pairs)
//! - [`ContentHasher`] — domain-separated content hasher

pub mod error;
pub mod hasher;
pub mod headers;
pub mod key;
pub mod object;

pub use error::TypeError;
pub use hasher::ContentHasher;
pub use headers::CommitHeaders;
pub use key::StoreKey;
pub use object::ObjId;
