//! Site list persistence.
//!
//! The site list is a JSON array of `{"url": ..., "rss": ...}` objects that is
//! read once, updated in memory by the discovery engine and written back to
//! the same file.

mod sites;

pub use sites::{load_sites, render_sites, save_sites, Site, StoreError, NO_FEED_SENTINEL};
