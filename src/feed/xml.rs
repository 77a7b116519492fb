//! Minimal XML element tree on top of `quick-xml`.
//!
//! Podcast feeds mix plain element text (`<title>`) with namespaced
//! attributes (`<itunes:image href="..."/>`), so the tree keeps the two
//! apart. Qualified names are stored exactly as written in the document.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Maximum element nesting depth accepted from a feed.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML syntax error: {0}")]
    Syntax(String),

    #[error("XML nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),

    #[error("Document has no root element")]
    Empty,

    #[error("Document ended with unclosed element <{0}>")]
    Unclosed(String),
}

/// An element with its attributes, concatenated text (including CDATA), and
/// child elements in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trimmed element text. Text of child elements is not included.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First child with the given qualified name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Follows a `/`-separated path of child names, taking the first match
    /// at each step (`"image/url"`).
    pub fn find(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .try_fold(self, |node, segment| node.child(segment))
    }
}

/// Parses a whole document into its root element.
pub fn parse_document(xml: &str) -> Result<Element, XmlError> {
    // quick-xml (0.37) never expands <!ENTITY> declarations, so
    // external entities in a hostile feed are not resolved.
    let mut reader = Reader::from_str(xml);
    // Text is kept raw so spacing around CDATA survives; `text()` trims.

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(XmlError::MaxDepthExceeded(MAX_DEPTH));
                }
                stack.push(start_element(&e, &reader));
            }
            Ok(Event::Empty(e)) => {
                let element = start_element(&e, &reader);
                attach(&mut stack, &mut root, element);
            }
            Ok(Event::End(_)) => {
                // End names are checked by the reader, so the top is the match.
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(current) = stack.last_mut() {
                    match e.unescape() {
                        Ok(text) => current.text.push_str(&text),
                        Err(err) => {
                            tracing::debug!(error = %err, "Keeping undecodable entity verbatim");
                            current.text.push_str(&String::from_utf8_lossy(&e));
                        }
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XmlError::Syntax(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.name));
    }

    root.ok_or(XmlError::Empty)
}

fn start_element(e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Element {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();

    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(err) => {
                tracing::debug!(element = %name, error = %err, "Skipping malformed attribute");
                continue;
            }
        };
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        match attr.decode_and_unescape_value(reader.decoder()) {
            Ok(value) => attributes.push((key, value.into_owned())),
            Err(err) => {
                tracing::debug!(element = %name, attribute = %key, error = %err, "Skipping undecodable attribute");
            }
        }
    }

    Element {
        name,
        attributes,
        ..Element::default()
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            // Only the first top-level element is the document root.
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}
