//! Test suites for the dispatch pipeline.

mod support;
