//! State module for tracking indexing progress
//!
//! # Components
//!
//! - `SiteStatus`: lifecycle of a site's index (indexing, indexed, failed)

mod site_status;

// Re-export main types
pub use site_status::SiteStatus;
