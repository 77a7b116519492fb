use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

use super::error::error_response;
use super::state::AppState;
use crate::cache::{SingleFlight, TtlCache};
use crate::feed::{FeedError, FeedFetcher, PodcastData};

/// Cache key of the parsed feed.
pub const CACHE_KEY: &str = "podcast-data";

/// Outcome shared between coalesced callers.
pub type EpisodesResult = Result<Arc<PodcastData>, Arc<FeedError>>;

/// Serves the parsed feed, refreshing it from upstream when the cached copy
/// has expired.
///
/// Concurrent misses share one upstream fetch. A failed refresh is not
/// cached, so the next request tries again.
pub struct EpisodeService {
    fetcher: FeedFetcher,
    cache: Arc<TtlCache<Arc<PodcastData>>>,
    flights: SingleFlight<EpisodesResult>,
    ttl: Duration,
}

impl EpisodeService {
    pub fn new(fetcher: FeedFetcher, cache: Arc<TtlCache<Arc<PodcastData>>>, ttl: Duration) -> Self {
        Self {
            fetcher,
            cache,
            flights: SingleFlight::new(),
            ttl,
        }
    }

    pub async fn episodes(&self) -> EpisodesResult {
        if let Some(data) = self.cache.get(CACHE_KEY) {
            tracing::debug!(key = CACHE_KEY, "Cache hit - returning cached RSS data");
            return Ok(data);
        }

        let fetcher = self.fetcher.clone();
        let cache = Arc::clone(&self.cache);
        let ttl = self.ttl;

        self.flights
            .run(CACHE_KEY, move || async move {
                // A flight that finished just before this one started may
                // already have filled the cache.
                if let Some(data) = cache.get(CACHE_KEY) {
                    return Ok(data);
                }

                tracing::info!(key = CACHE_KEY, "Cache miss - fetching fresh RSS data");
                let data = match fetcher.load().await {
                    Ok(data) => Arc::new(data),
                    Err(e) => return Err(Arc::new(e)),
                };
                cache.insert(CACHE_KEY, Arc::clone(&data), ttl);
                EpisodesResult::Ok(data)
            })
            .await
    }
}

/// `GET /api/episodes`
///
/// Returns `{channel, episodes}` with a strong ETag, `304` when the client's
/// `If-None-Match` already matches, or `500 {"error": ...}` on any feed
/// failure.
pub async fn get_episodes(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let data = match state.episodes.episodes().await {
        Ok(data) => data,
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch episodes");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch episodes");
        }
    };

    let body = match serde_json::to_vec(&*data) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize episodes");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch episodes");
        }
    };

    let etag = format!("\"{:x}\"", Sha256::digest(&body));
    let Ok(etag_value) = HeaderValue::from_str(&etag) else {
        // Hex digest in quotes is always a valid header value.
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch episodes");
    };

    if if_none_match(&headers, &etag) {
        return (StatusCode::NOT_MODIFIED, [(header::ETAG, etag_value)]).into_response();
    }

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (header::ETAG, etag_value),
        ],
        Body::from(body),
    )
        .into_response()
}

/// True when `If-None-Match` lists `etag` (weak or strong form) or `*`.
fn if_none_match(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .any(|candidate| {
            candidate == "*" || candidate == etag || candidate.strip_prefix("W/") == Some(etag)
        })
}
