use thiserror::Error;

use super::fields::channel;
use super::normalize::{normalize_item, sort_newest_first};
use super::types::{PodcastChannel, PodcastData};
use super::xml::{parse_document, Element, XmlError};

/// The feed could not be turned into a channel.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Xml(#[from] XmlError),

    #[error("Invalid RSS feed: no channel found")]
    NoChannel,
}

/// Channel metadata plus the raw `<item>` elements, before normalization.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub channel: PodcastChannel,
    pub items: Vec<Element>,
}

/// Parses raw feed XML into channel metadata and raw items.
///
/// The channel is looked up as `<rss><channel>` or as a bare root
/// `<channel>`. Missing channel metadata never fails the parse; see
/// [`super::fields::channel`] for the defaults. Zero, one, or many `<item>`
/// elements all come back as a plain `Vec`.
pub fn parse_feed(xml: &str) -> Result<ParsedFeed, ParseError> {
    let root = parse_document(xml)?;

    let channel_el = match root.name() {
        "channel" => &root,
        _ => root.child("channel").ok_or(ParseError::NoChannel)?,
    };

    let channel = PodcastChannel {
        title: channel::TITLE.resolve(channel_el),
        description: channel::DESCRIPTION.resolve(channel_el),
        image: channel::IMAGE.resolve(channel_el),
        language: channel::LANGUAGE.resolve(channel_el),
        link: channel::LINK.resolve(channel_el),
        last_build_date: channel::LAST_BUILD_DATE.resolve(channel_el),
        copyright: channel::COPYRIGHT.resolve(channel_el),
        author: channel::AUTHOR.resolve(channel_el),
    };

    let items = channel_el.children_named("item").cloned().collect();

    Ok(ParsedFeed { channel, items })
}

/// Parses, normalizes, and orders a feed into the payload served to clients.
pub fn parse_podcast(xml: &str) -> Result<PodcastData, ParseError> {
    let ParsedFeed { channel, items } = parse_feed(xml)?;

    let episodes = sort_newest_first(items.iter().map(normalize_item).collect());

    tracing::debug!(
        title = %channel.title,
        episodes = episodes.len(),
        "Parsed podcast feed"
    );

    Ok(PodcastData { channel, episodes })
}
