//! Data models for the draft service and form sessions.
//!
//! Wire names are camelCase to match the frontend interfaces.

mod draft;
mod form;

pub use draft::*;
pub use form::*;
