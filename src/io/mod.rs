//! File input for the production store.

pub mod import;
