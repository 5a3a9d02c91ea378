//! Tests for the executor
//!
//! Organized by feature area

mod helpers;

mod basic_tests;
mod call_tests;
mod select_tests;
mod stage_tests;
