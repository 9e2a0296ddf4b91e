//! Test Helper Utilities
//!
//! Shared utilities for testing stylo-classify

#![allow(dead_code)]

pub mod classifiers;
pub mod log_capture;
pub mod mock_server;

pub use classifiers::{
    book_text, wrap, ConcurrencyGauge, DeterministicClassifier, FailingClassifier, HangingClassifier,
};
pub use log_capture::{capture_logs, LogCapture};
pub use mock_server::spawn_mock_server;
