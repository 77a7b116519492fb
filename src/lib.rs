//! Backend for a single-show podcast site.
//!
//! Fetches one RSS feed, normalizes it into episodes, caches the result for a
//! fixed TTL and serves it at `/api/episodes`. `/api/audio/...` proxies the
//! episode audio with Range support.

pub mod cache;
pub mod config;
pub mod feed;
pub mod server;
pub mod util;
