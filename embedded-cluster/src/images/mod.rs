//! Image references for the distribution's built-in components.
//!
//! - `metadata`: the embedded manifest and its read-only resolver
//! - `enumerate`: filtering of the distribution's image list

pub mod enumerate;
pub mod metadata;

pub use enumerate::{EXCLUDED_COMPONENTS, list_images};
pub use metadata::{Arch, ImageMetadata, ImageRef, load, metadata};
