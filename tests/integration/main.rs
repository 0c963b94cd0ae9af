//! Integration tests for cc-ticker

mod e2e_test;
mod snapshot_test;
mod stream_test;
