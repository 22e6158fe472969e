//! Turning an asset's capture instant and location into a zone and local time.
mod convert;
pub mod error;
mod interpolation;

pub use convert::{LocalTime, convert};
pub use interpolation::{InterpolationMethod, interpolate};
