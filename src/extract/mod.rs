// src/extract/mod.rs
// =============================================================================
// This module pulls contact information out of fetched pages.
//
// Submodules:
// - email: plain, obfuscated and mailto: email detection
//
// The extractor is pure: it takes page text and returns a set of addresses.
// It never touches the network and never fails.
// =============================================================================

mod email;

pub use email::{extract, EmailSet};
