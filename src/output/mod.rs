//! Collision report renderers.
//!
//! - [`text`]: human-readable report with optional colour
//! - [`json`]: machine-readable report for scripting

pub mod json;
pub mod text;

pub use json::{JsonOutput, JsonOutputError};
pub use text::TextOutput;
