//! Point to timezone lookups against administrative timezone boundaries.
mod bundled;
pub mod error;
mod index;

pub use bundled::BundledFinder;
pub use index::{Boundary, BoundaryIndex};

/// Answers "which IANA zone contains this point".
///
/// Implementations are read-only after construction and are shared between
/// concurrent resolutions without locking.
pub trait ZoneLookup: Send + Sync {
    /// Returns the zone ID containing the point, or `None` when no boundary covers it
    /// (open ocean, dataset gaps).
    fn lookup(&self, latitude: f64, longitude: f64) -> Option<&str>;
}
