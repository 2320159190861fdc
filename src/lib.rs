//! Collects a workstation user's activity traces (logins, recently used files and shares,
//! running and installed applications) and summarizes them in a PDF report.
//!
//! Collection goes through [activity_api], which hides the platform specifics, then through
//! [collection] into sorted [record::Record] sequences. [pipeline] filters them and hands them to
//! [report].

pub mod activity_api;
pub mod cli;
pub mod collection;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod platform;
pub mod record;
pub mod report;
pub mod utils;
