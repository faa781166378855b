//! Feed discovery engine.
//!
//! Given a site's base URL, the engine probes a fixed set of conventional
//! feed locations and keeps the first response that looks like RSS/Atom.
//!
//! # Architecture
//!
//! - [`candidates`] - the 960 relative paths worth probing
//! - [`probe`] - one bounded GET plus a content sniff
//! - [`resolver`] - all candidates of one site, first hit wins
//! - [`batch`] - all sites of a list, results written in place
//! - [`pool`] - the counting permit pool bounding both fan-out levels
//! - [`client`] - the shared HTTP client and its redirect policy
//!
//! # Example
//!
//! ```no_run
//! use feedprobe::config::Config;
//! use feedprobe::feed::{build_client, BatchCoordinator, SiteResolver};
//! use feedprobe::storage::Site;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::default();
//! let client = build_client(&config)?;
//! let resolver = SiteResolver::from_config(client, &config);
//!
//! let mut sites = vec![Site::new("https://example.com")];
//! let report = BatchCoordinator::new(resolver, config.site_concurrency)
//!     .run(&mut sites)
//!     .await;
//! println!("found {} feeds", report.found);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod candidates;
pub mod client;
pub mod pool;
pub mod probe;
pub mod resolver;

pub use batch::{BatchCoordinator, BatchReport};
pub use candidates::{candidate_paths, CANDIDATE_COUNT};
pub use client::build_client;
pub use pool::{WorkerPermit, WorkerPool};
pub use probe::{looks_like_feed, probe, probe_url, ProbeOutcome, ProbeSettings};
pub use resolver::SiteResolver;
