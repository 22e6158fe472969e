//! Parsing timestamps coming from the asset library and from search filters.
mod parsing;

pub use parsing::{FilterBound, parse_capture_instant, parse_filter_bound};
