//! Output module for reporting index state
//!
//! This module handles:
//! - Collecting per-site and index-wide statistics
//! - Rendering statistics for the command line

pub mod stats;

pub use stats::{
    collect_statistics, print_statistics, SiteStatistics, Statistics, TotalStatistics,
    NOT_INDEXED,
};
