use std::num::NonZeroUsize;
use std::sync::Arc;

use super::audio::AudioProxy;
use super::episodes::EpisodeService;
use crate::cache::{Clock, SystemClock, TtlCache};
use crate::config::Config;
use crate::feed::FeedFetcher;
use crate::util::validate_upstream_url;

/// Redirect hops followed by the audio client.
const MAX_AUDIO_REDIRECTS: usize = 10;

/// Shared handler state. Cloned per request; everything inside is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub episodes: Arc<EpisodeService>,
    pub audio: Arc<AudioProxy>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Builds the state with an explicit clock driving cache expiry.
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, reqwest::Error> {
        let feed_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;

        // Redirects are checked against the same host policy as the
        // original target.
        let allow_private = config.audio_allow_private_hosts;
        let redirect_policy = reqwest::redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_AUDIO_REDIRECTS {
                return attempt.error("too many redirects");
            }
            match validate_upstream_url(attempt.url().as_str(), allow_private) {
                Ok(_) => attempt.follow(),
                Err(e) => attempt.error(e),
            }
        });
        let audio_client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(redirect_policy)
            .build()?;

        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        let cache = Arc::new(TtlCache::new(capacity, clock));

        let fetcher = FeedFetcher::new(
            feed_client,
            config.feed_url.clone(),
            config.fetch_timeout(),
            config.max_feed_bytes,
        );

        Ok(Self {
            episodes: Arc::new(EpisodeService::new(fetcher, cache, config.cache_ttl())),
            audio: Arc::new(AudioProxy::new(
                audio_client,
                config.audio_upstream_scheme.clone(),
                config.audio_allow_private_hosts,
                config.audio_timeout(),
            )),
        })
    }
}
