//! Per-item episode normalization and publish-date ordering.

use std::cmp::Reverse;

use chrono::{DateTime, NaiveDate, Utc};

use super::fields::item;
use super::types::{EpisodeType, PodcastEpisode};
use super::xml::Element;
use crate::util::{slugify, truncate_chars};

/// Tracking redirector that wraps the real audio location.
pub const REDIRECTOR_PREFIX: &str = "https://r.zen.ai/r/";

/// Maximum length of a derived (GUID-less) episode id, in characters.
pub const MAX_DERIVED_ID_LEN: usize = 100;

/// Id used when neither a date nor a usable title is available.
const FALLBACK_ID: &str = "untitled-episode";

/// Converts one raw `<item>` into a [`PodcastEpisode`].
pub fn normalize_item(raw: &Element) -> PodcastEpisode {
    let guid = item::GUID.resolve(raw);
    let audio_url = resolve_audio_url(&item::ENCLOSURE_URL.resolve(raw));
    let pub_date = item::PUB_DATE.resolve(raw);

    let id = if guid.is_empty() {
        // Slug from the raw title, not the "Untitled Episode" default.
        derive_episode_id(item::TITLE.lookup(raw).unwrap_or_default(), &pub_date)
    } else {
        guid
    };

    let type_tag = item::EPISODE_TYPE.resolve(raw);
    let episode_type = EpisodeType::from_tag(&type_tag).unwrap_or_else(|| {
        tracing::debug!(episode = %id, value = %type_tag, "Unknown episode type, using full");
        EpisodeType::Full
    });

    PodcastEpisode {
        title: item::TITLE.resolve(raw),
        description: item::DESCRIPTION.resolve(raw),
        duration: item::DURATION.resolve(raw),
        audio_url,
        image: item::IMAGE.optional(raw),
        episode_number: item::EPISODE.integer(raw),
        season: item::SEASON.integer(raw),
        episode_type,
        subtitle: item::SUBTITLE.optional(raw),
        summary: item::SUMMARY.optional(raw),
        show_notes: item::SHOW_NOTES.optional(raw),
        id,
        pub_date,
    }
}

/// Strips the tracking redirector from an enclosure URL.
///
/// `https://r.zen.ai/r/cdn.example.com/a.mp3` becomes
/// `https://cdn.example.com/a.mp3`; anything else is returned unchanged.
pub fn resolve_audio_url(url: &str) -> String {
    match url.strip_prefix(REDIRECTOR_PREFIX) {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

/// Builds a stable id for an item without a GUID.
///
/// `<UTC ISO date>-<title slug>`, truncated to [`MAX_DERIVED_ID_LEN`]
/// characters. An unparsable date drops the prefix. Two items sharing date
/// and slug prefix get the same id.
pub fn derive_episode_id(title: &str, pub_date: &str) -> String {
    let date = parse_pub_date(pub_date).map(|d| d.format("%Y-%m-%d").to_string());
    let slug = slugify(title);

    let id = match (date, slug.is_empty()) {
        (Some(date), false) => format!("{date}-{slug}"),
        (Some(date), true) => date,
        (None, false) => slug,
        (None, true) => return FALLBACK_ID.to_string(),
    };

    truncate_chars(&id, MAX_DERIVED_ID_LEN).into_owned()
}

/// Parses a feed publish date.
///
/// Accepts RFC 2822 (the RSS format), RFC 3339, and bare `YYYY-MM-DD`
/// (midnight UTC).
pub fn parse_pub_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

/// Orders episodes newest first.
///
/// Episodes whose date does not parse go after all dated episodes and keep
/// their feed order.
pub fn sort_newest_first(episodes: Vec<PodcastEpisode>) -> Vec<PodcastEpisode> {
    let mut keyed: Vec<_> = episodes
        .into_iter()
        .map(|e| (parse_pub_date(&e.pub_date), e))
        .collect();

    keyed.sort_by_key(|(date, _)| (date.is_none(), Reverse(*date)));

    keyed.into_iter().map(|(_, e)| e).collect()
}
