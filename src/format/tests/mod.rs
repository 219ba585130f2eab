//! Unit tests for annotation format implementations.
//!
//! These tests verify task parsing, instance reconstruction, and round-trip
//! conversions against the Label Studio format.

mod label_studio_tests;
