//! Feed field mapping table.
//!
//! Every value pulled out of a feed goes through one [`FieldSpec`]: where it
//! lives in the document, how it is read (element text or attribute), and
//! what it falls back to. Keeping these in one place makes each default and
//! fallback chain auditable without reading the parser.

use super::xml::Element;

/// Where a field value is read from, relative to the channel or item element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Trimmed text of the element at a `/`-separated child path.
    Text(&'static str),
    /// Attribute value on the element at the given path.
    Attr(&'static str, &'static str),
}

impl Source {
    fn read(self, node: &Element) -> Option<&str> {
        let value = match self {
            Source::Text(path) => node.find(path)?.text(),
            Source::Attr(path, attr) => node.find(path)?.attr(attr)?.trim(),
        };
        // An empty value counts as missing so the next source gets a chance.
        (!value.is_empty()).then_some(value)
    }
}

/// One row of the mapping table.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Name of the field in the domain model, for logs and tests.
    pub key: &'static str,
    /// Tried in order; the first non-empty value wins.
    pub sources: &'static [Source],
    /// Used when every source is missing. `None` means the field is optional.
    pub default: Option<&'static str>,
}

impl FieldSpec {
    const fn new(key: &'static str, sources: &'static [Source], default: Option<&'static str>) -> Self {
        Self {
            key,
            sources,
            default,
        }
    }

    /// First non-empty source value, ignoring the default.
    pub fn lookup<'a>(&self, node: &'a Element) -> Option<&'a str> {
        self.sources.iter().find_map(|source| source.read(node))
    }

    /// Source value, then the default, then the empty string.
    pub fn resolve(&self, node: &Element) -> String {
        self.lookup(node)
            .or(self.default)
            .unwrap_or_default()
            .to_string()
    }

    /// Source value as an owned string, `None` when missing.
    pub fn optional(&self, node: &Element) -> Option<String> {
        self.lookup(node).map(str::to_string)
    }

    /// Leading integer of the source value (`"3.0"` reads as 3). Values with
    /// no leading digits are treated as missing.
    pub fn integer(&self, node: &Element) -> Option<i64> {
        let raw = self.lookup(node)?;
        match leading_integer(raw) {
            Some(n) => Some(n),
            None => {
                tracing::debug!(field = self.key, value = %raw, "Ignoring non-numeric value");
                None
            }
        }
    }
}

/// Optional sign followed by ASCII digits at the start of `s`.
fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let sign_len = usize::from(s.starts_with(['-', '+']));
    let digits = s[sign_len..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    s[..sign_len + digits].parse().ok()
}

/// Fields read from the `<channel>` element.
pub mod channel {
    use super::{FieldSpec, Source};

    pub const TITLE: FieldSpec =
        FieldSpec::new("title", &[Source::Text("title")], Some("Unknown Podcast"));
    pub const DESCRIPTION: FieldSpec =
        FieldSpec::new("description", &[Source::Text("description")], Some(""));
    pub const IMAGE: FieldSpec = FieldSpec::new(
        "image",
        &[Source::Attr("itunes:image", "href"), Source::Text("image/url")],
        Some(""),
    );
    pub const LANGUAGE: FieldSpec =
        FieldSpec::new("language", &[Source::Text("language")], Some("en"));
    pub const LINK: FieldSpec = FieldSpec::new("link", &[Source::Text("link")], Some(""));
    pub const LAST_BUILD_DATE: FieldSpec =
        FieldSpec::new("lastBuildDate", &[Source::Text("lastBuildDate")], Some(""));
    pub const COPYRIGHT: FieldSpec =
        FieldSpec::new("copyright", &[Source::Text("copyright")], Some(""));
    pub const AUTHOR: FieldSpec = FieldSpec::new(
        "author",
        &[Source::Text("itunes:author"), Source::Text("managingEditor")],
        Some(""),
    );

    pub const ALL: &[FieldSpec] = &[
        TITLE,
        DESCRIPTION,
        IMAGE,
        LANGUAGE,
        LINK,
        LAST_BUILD_DATE,
        COPYRIGHT,
        AUTHOR,
    ];
}

/// Fields read from each `<item>` element.
pub mod item {
    use super::{FieldSpec, Source};

    /// `<guid>` text; attributes such as `isPermaLink` are ignored.
    pub const GUID: FieldSpec = FieldSpec::new("guid", &[Source::Text("guid")], Some(""));
    pub const TITLE: FieldSpec =
        FieldSpec::new("title", &[Source::Text("title")], Some("Untitled Episode"));
    pub const DESCRIPTION: FieldSpec =
        FieldSpec::new("description", &[Source::Text("description")], Some(""));
    pub const PUB_DATE: FieldSpec = FieldSpec::new("pubDate", &[Source::Text("pubDate")], Some(""));
    pub const DURATION: FieldSpec = FieldSpec::new(
        "duration",
        &[Source::Text("itunes:duration")],
        Some("00:00:00"),
    );
    pub const ENCLOSURE_URL: FieldSpec =
        FieldSpec::new("audioUrl", &[Source::Attr("enclosure", "url")], Some(""));
    pub const IMAGE: FieldSpec =
        FieldSpec::new("image", &[Source::Attr("itunes:image", "href")], None);
    pub const EPISODE: FieldSpec =
        FieldSpec::new("episodeNumber", &[Source::Text("itunes:episode")], None);
    pub const SEASON: FieldSpec = FieldSpec::new("season", &[Source::Text("itunes:season")], None);
    pub const EPISODE_TYPE: FieldSpec = FieldSpec::new(
        "episodeType",
        &[Source::Text("itunes:episodeType")],
        Some("full"),
    );
    pub const SUBTITLE: FieldSpec =
        FieldSpec::new("subtitle", &[Source::Text("itunes:subtitle")], None);
    pub const SUMMARY: FieldSpec =
        FieldSpec::new("summary", &[Source::Text("itunes:summary")], None);
    pub const SHOW_NOTES: FieldSpec = FieldSpec::new(
        "showNotes",
        &[Source::Text("content:encoded"), Source::Text("description")],
        None,
    );

    pub const ALL: &[FieldSpec] = &[
        GUID,
        TITLE,
        DESCRIPTION,
        PUB_DATE,
        DURATION,
        ENCLOSURE_URL,
        IMAGE,
        EPISODE,
        SEASON,
        EPISODE_TYPE,
        SUBTITLE,
        SUMMARY,
        SHOW_NOTES,
    ];
}
