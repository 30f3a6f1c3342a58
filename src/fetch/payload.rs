//! Decoded response bodies

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use scraper::{Html, Selector};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::{FetchError, FetchResult};
use super::request::OutputMode;

/// A successfully decoded response
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(Value),
    Xml(XmlElement),
    Html(HtmlDocument),
}

impl Payload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_xml(&self) -> Option<&XmlElement> {
        match self {
            Payload::Xml(root) => Some(root),
            _ => None,
        }
    }

    pub fn as_html(&self) -> Option<&HtmlDocument> {
        match self {
            Payload::Html(doc) => Some(doc),
            _ => None,
        }
    }
}

/// Decode a response body per the requested mode
pub(crate) fn decode(mode: OutputMode, body: String) -> FetchResult {
    match mode {
        OutputMode::Json => {
            debug!("Response returning as JSON");
            serde_json::from_str(&body)
                .map(Payload::Json)
                .map_err(|e| FetchError::Json(e.to_string()))
        }
        OutputMode::Xml => {
            debug!("Response returning as XML");
            XmlElement::parse(&body).map(Payload::Xml)
        }
        OutputMode::Html => {
            debug!("Response returning as HTML");
            Ok(Payload::Html(HtmlDocument::new(body)))
        }
        OutputMode::Text => {
            debug!("Response returning as text");
            Ok(Payload::Text(body))
        }
    }
}

/// Owned XML element tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct XmlElement {
    /// Qualified tag name, prefix included (`crunchyroll:episodeNumber`)
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Unescaped character data directly inside this element
    ///
    /// Runs are concatenated as written, so spacing around child elements
    /// survives. Only the outer ends are trimmed, and whitespace-only
    /// content becomes empty.
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Parse a document and return its root element
    pub fn parse(source: &str) -> FetchResult<Self> {
        let mut reader = Reader::from_str(source);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => stack.push(Self::open(&e)?),
                Ok(Event::Empty(e)) => {
                    let element = Self::open(&e)?;
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::End(_)) => {
                    let mut element = stack
                        .pop()
                        .ok_or_else(|| FetchError::Xml("unexpected closing tag".to_string()))?;
                    element.text = element.text.trim().to_string();
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|e| FetchError::Xml(e.to_string()))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                Ok(Event::CData(e)) => {
                    let data = e.into_inner();
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(FetchError::Xml(e.to_string())),
            }
        }

        if let Some(open) = stack.last() {
            return Err(FetchError::Xml(format!("unclosed element <{}>", open.name)));
        }

        root.ok_or_else(|| {
            FetchError::Xml("document has no root element".to_string())
        })
    }

    fn open(start: &BytesStart<'_>) -> FetchResult<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| FetchError::Xml(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| FetchError::Xml(e.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            ..Default::default()
        })
    }

    fn attach(
        stack: &mut [XmlElement],
        root: &mut Option<XmlElement>,
        element: XmlElement,
    ) -> FetchResult<()> {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(element);
        } else if root.is_none() {
            *root = Some(element);
        } else {
            return Err(FetchError::Xml("multiple root elements".to_string()));
        }
        Ok(())
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first child with this name
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.trim())
    }

    /// Depth-first search below this element
    pub fn descendants_named(&self, name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        let mut pending: Vec<&XmlElement> = self.children.iter().rev().collect();

        while let Some(element) = pending.pop() {
            if element.name == name {
                found.push(element);
            }
            pending.extend(element.children.iter().rev());
        }

        found
    }
}

/// An HTML response, parsed into a navigable tree on demand
///
/// `scraper::Html` is neither `Send` nor `Sync`, so the cache holds the
/// source and each caller gets its own tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlDocument {
    source: Arc<str>,
}

impl HtmlDocument {
    pub fn new(source: impl Into<Arc<str>>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn parse(&self) -> Html {
        Html::parse_document(&self.source)
    }

    /// Trimmed text content of every element matching `css`
    pub fn select_text(&self, css: &str) -> Vec<String> {
        let Some(selector) = parse_selector(css) else {
            return Vec::new();
        };

        self.parse()
            .select(&selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .collect()
    }

    /// Values of `attr` on every element matching `css` that carries it
    pub fn select_attr(&self, css: &str, attr: &str) -> Vec<String> {
        let Some(selector) = parse_selector(css) else {
            return Vec::new();
        };

        self.parse()
            .select(&selector)
            .filter_map(|el| el.value().attr(attr).map(str::to_string))
            .collect()
    }
}

fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!(selector = css, error = %e, "Invalid CSS selector");
            None
        }
    }
}
