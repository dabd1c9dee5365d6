//! Integration test suite for the quorum engine.
//!
//! These tests exercise the full pipeline from task creation to
//! aggregated result, including allocation, dependency ordering, and
//! failure handling. They verify that all components work together
//! correctly.
//!
//! # Test Categories
//!
//! - `collective_e2e`: Full task execution tests
//! - `dependency_ordering`: Graph ordering correctness
//! - `failure_paths`: Error surfacing and reputation effects
//! - `blackboard_coordination`: Messaging and knowledge guarantees
//!
//! # CI Compatibility
//!
//! All work executors are in-process stubs; the suite performs no I/O
//! beyond the optional debug log, making it safe to run in CI.

mod fixtures;

mod blackboard_coordination;
mod failure_paths;
