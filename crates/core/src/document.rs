//! Versioned document primitives.
//!
//! Every persisted entity is a single document carrying a monotonically
//! increasing version counter. Cross-document coordination is built from
//! per-document compare-and-swap (see the stores in `tradepost-infra`),
//! never from in-process locks shared across requests.

/// A persisted document: typed identity plus an optimistic version counter.
///
/// The version is owned by the storage layer: 0 for a not-yet-persisted
/// document, assigned 1 on first insert and bumped by one on every successful
/// save. Domain code reads it to build conditioned writes but never sets it.
pub trait Document {
    /// Strongly-typed document identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> Self::Id;

    /// Version of the state this in-memory copy was loaded from.
    fn version(&self) -> u64;

    /// Record the version assigned by the storage layer after a commit.
    fn set_version(&mut self, version: u64);
}

/// Optimistic concurrency expectation for a conditioned write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (last-writer-wins; use deliberately).
    Any,
    /// Require the document to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}
