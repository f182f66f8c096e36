//! # vigil-policy
//!
//! Policy pack support for the evidence stage:
//!
//! - [`types`]: the pack schema (policies, matchers, vital predicates)
//! - [`loader`]: load from a file or the embedded default, validate at
//!   startup, canonicalize, and hash
//! - [`matcher`]: pack-order matcher evaluation against a structured intake
//!
//! The pack is loaded once and exposed as an immutable snapshot; request-time
//! evaluation never fails.

#![deny(unsafe_code)]

pub mod loader;
pub mod matcher;
pub mod types;

pub use loader::{load_embedded, load_from_path, PolicyPackError, PolicySnapshot};
pub use matcher::select_policies;
pub use types::{Matchers, Policy, PolicyPack, VitalOp, VitalPredicate};
