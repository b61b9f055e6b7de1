//! Shared fixtures and handlers for the integration tests.

#![allow(dead_code)]

pub mod fixtures;
