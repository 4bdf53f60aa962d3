//! Utility functions for the location tree
//!
//! - [`location`] - handle / location-code derivation and parsing
//! - [`mpath`] - materialized path arithmetic

pub mod location;
pub mod mpath;

pub use location::{
    generate_handle, generate_location_code, has_position, parse_location_code, slugify,
    ParsedLocationCode, DEFAULT_HANDLE,
};
