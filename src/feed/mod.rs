//! Feed ingestion: fetch the upstream RSS document and turn it into
//! [`PodcastData`].
//!
//! - **Fetching**: single-attempt HTTP retrieval with timeout and size limit
//! - **Parsing**: `quick-xml` element tree, channel lookup, item collection
//! - **Normalizing**: per-episode ids, redirector unwrapping, defaults, ordering
//!
//! # Architecture
//!
//! - [`xml`] - Element tree that keeps attributes apart from element text
//! - [`fields`] - Mapping table of every feed field, its accessor and default
//! - [`parser`] - Channel lookup and raw item collection
//! - [`normalize`] - Raw item to [`PodcastEpisode`], newest-first sort
//! - [`fetcher`] - HTTP download, tying the pieces together
//!
//! # Example
//!
//! ```ignore
//! use podcast_site::feed::FeedFetcher;
//!
//! let fetcher = FeedFetcher::new(client, "https://example.com/feed", timeout, max_bytes);
//! let data = fetcher.load().await?;
//! ```

pub mod fields;
mod fetcher;
pub mod normalize;
mod parser;
mod types;
pub mod xml;

pub use fetcher::{FeedError, FeedFetcher};
pub use parser::{parse_feed, parse_podcast, ParseError, ParsedFeed};
pub use types::{EpisodeType, PodcastChannel, PodcastData, PodcastEpisode};
