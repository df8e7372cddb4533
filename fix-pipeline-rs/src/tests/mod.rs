//! Test suites for the troubleshooting pipeline

mod support;

mod backend_tests;
mod pipeline_tests;
