//! Loader tests
//!
//! Tests for the multi-fragment model repository:
//! - Fragment discovery and classification
//! - Navigation and reference lookup
//! - Link creation and resolution
//! - Identifier reservation and index maintenance
//! - Viewpoints and model info
//! - Saving, partial failures and temporary project directories

mod tests_identifiers;
mod tests_links;
mod tests_loading;
mod tests_viewpoints;
