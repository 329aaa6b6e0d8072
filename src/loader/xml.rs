//! Minimal element tree built from quick-xml events.
//!
//! TMX is attribute-driven with shallow nesting, so a small owned tree is
//! simpler to walk than a streaming state machine.

use crate::error::{MapError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::str::FromStr;

#[derive(Debug, Clone, Default)]
pub(crate) struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Parses an optional attribute; a present but malformed value is an error.
    pub fn parse_attr<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.attr(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
                MapError::parse(
                    format!("<{}>", self.name),
                    format!("invalid value '{raw}' for attribute '{key}'"),
                )
            }),
        }
    }

    pub fn parse_attr_or<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.parse_attr(key)?.unwrap_or(default))
    }

    /// TMX booleans are written as `0` / `1`.
    pub fn bool_attr(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.parse_attr::<i64>(key)?.map(|v| v != 0))
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

fn open_element(e: &BytesStart<'_>) -> Result<Element> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| MapError::parse(format!("<{name}>"), err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| MapError::parse(format!("<{name}>"), err.to_string()))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
        text: String::new(),
    })
}

/// Parses `src` and returns its root element.
pub(crate) fn parse_document(src: &str, context: &str) -> Result<Element> {
    // Text is kept verbatim; `<text>` objects and multi-line properties own
    // their whitespace. Callers trim where the format allows it.
    let mut reader = Reader::from_str(src);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|err| {
            MapError::parse(
                context,
                format!("XML error at byte {}: {err}", reader.buffer_position()),
            )
        })?;
        match event {
            Event::Start(e) => stack.push(open_element(&e)?),
            Event::Empty(e) => {
                let el = open_element(&e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(el),
                    None => root = Some(el),
                }
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map_err(|err| MapError::parse(context, err.to_string()))?;
                    top.text.push_str(&text);
                }
            }
            Event::CData(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| MapError::parse(context, "unbalanced closing tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(el),
                    None => root = Some(el),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(MapError::parse(context, "unexpected end of document"));
    }
    root.ok_or_else(|| MapError::parse(context, "document has no root element"))
}
