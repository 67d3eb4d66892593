//! Search service client trait abstraction.
//!
//! This crate defines the `SearchClient` trait that the verifier uses to talk
//! to a document-search deployment, together with the plain document types
//! that cross that boundary.
//!
//! Response shapes differ between service versions (where the mapping lives,
//! whether multi-get reports `exists` or `found`, how a scroll is opened).
//! Those differences are captured by the `ServiceProfile` trait, with one
//! implementation per supported version profile. The profile is selected once
//! at configuration time via `profile_for`, and call sites never branch on
//! the version themselves.

mod error;
mod profile;
mod traits;
mod types;
mod version;

pub use error::TransportError;
pub use profile::{
    profile_for, single_index_entry, Legacy090Profile, ScrollStrategy, ServiceProfile, V1Profile,
    V5Profile, V7Profile,
};
pub use traits::SearchClient;
pub use types::{IndexStats, MultiGetEntry, RandomPage, ScrollPage, SourceDocument};
pub use version::{ParseVersionError, ServiceVersion};
