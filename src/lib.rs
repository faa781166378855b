//! Feed discovery for website lists.
//!
//! Probes conventional RSS/Atom locations under each site's base URL with
//! bounded concurrency and records the first feed found.

pub mod config;
pub mod feed;
pub mod storage;
pub mod util;
