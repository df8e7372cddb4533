//! Unit tests for the Copilot SDK

pub mod error_tests;
pub mod github_mock_tests;
