//! Utility functions shared by the feed and server layers.
//!
//! - **URL validation**: policy checks before the proxy fetches a URL
//! - **Text processing**: slugs and character-safe truncation for episode ids
//!
//! # Examples
//!
//! ```
//! use podcast_site::util::{slugify, truncate_chars, validate_upstream_url};
//!
//! let url = validate_upstream_url("https://cdn.example.com/ep.mp3", false).unwrap();
//! let slug = slugify("Episode 1: Hello!"); // "episode-1-hello"
//! let id = truncate_chars(&slug, 100);
//! ```

mod text;
mod url_validator;

pub use text::{slugify, truncate_chars};
pub use url_validator::{validate_upstream_url, UrlValidationError};
