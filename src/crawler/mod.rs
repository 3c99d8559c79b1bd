//! Crawler module for web page fetching and discovery
//!
//! This module contains the crawling logic, including:
//! - Rate-limited HTTP fetching
//! - HTML parsing, link extraction and visible text extraction
//! - Global fetch concurrency limiting
//! - Depth-bounded concurrent site discovery

mod fetcher;
mod parser;
mod scheduler;
mod site_crawler;

pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher};
pub use parser::{extract_links, extract_title, page_text};
pub use scheduler::FetchScheduler;
pub use site_crawler::SiteCrawler;
