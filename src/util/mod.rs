//! Utility functions shared by the discovery engine and the record store.
//!
//! - **URL validation**: base URL checks with an optional SSRF guard

mod url_validator;

pub use url_validator::{validate_site_url, UrlValidationError};
