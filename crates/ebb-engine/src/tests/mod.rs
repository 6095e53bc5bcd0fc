//! Tests for the ebb-engine crate.

mod helpers;
