//! Core library for the `media-e2e` CLI.
//!
//! Builds authenticated requests against the media library API on behalf of
//! named clients, signs transformation URLs, runs behavioral suites one at a
//! time, and prints a line per exchange. The primary user-facing interface
//! is the interactive `media-e2e` runner; library APIs may evolve with it.
pub mod args;
pub mod config;
pub mod error;
pub mod harness;
pub mod http;
pub mod report;
pub mod retry;
pub mod suites;
