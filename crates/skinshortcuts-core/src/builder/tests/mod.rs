//! Tests for the template builder
//!
//! Organized by stage: include generation and gating, context
//! resolution, structural markers, variable output, and schema
//! validation.

use super::*;

// Test helper functions
mod helpers;

// Include generation, merging and gating
mod build_basic;




// Schema validation and degraded lookups
mod errors;
