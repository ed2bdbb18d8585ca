//! cardsort - Library for card-sort co-occurrence analysis
//!
//! This library provides functionality to:
//! - Load co-occurrence matrices from delimited text
//! - Compute summary statistics and ranked card relationships
//! - Build matrices from raw card-sort study data
//! - Report results as text or JSON

pub mod cli;
pub mod config;
pub mod export;
pub mod loader;
pub mod models;
pub mod participants;
pub mod report;
pub mod session;
pub mod study;
pub mod summary;
pub mod telemetry;
pub mod watch;
