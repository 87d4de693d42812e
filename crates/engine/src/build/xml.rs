use std::io::BufRead;

use compact_str::CompactString;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{BuildEvent, Builder, Parser, TextKind};
use crate::consts::{XML_URI, XMLNS_URI};
use crate::error::{Error, ErrorCode, Result};

/// Streams an XML document (or fragment) from any buffered reader into a
/// [`Builder`].
///
/// Namespace prefixes are resolved against the declarations in scope;
/// whitespace-only text is dropped when the builder's options ask for it.
pub struct XmlParser<R> {
    reader: Reader<R>,
    name: CompactString,
    // (prefix, uri) bindings in scope, innermost last
    bindings: Vec<(CompactString, CompactString)>,
    marks: Vec<usize>,
    text: String,
}

impl<'a> XmlParser<&'a [u8]> {
    pub fn from_str(xml: &'a str) -> Self {
        Self::new(xml.as_bytes())
    }
}

impl<R: BufRead> XmlParser<R> {
    pub fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().expand_empty_elements = false;
        Self {
            reader,
            name: CompactString::default(),
            bindings: Vec::new(),
            marks: Vec::new(),
            text: String::new(),
        }
    }

    /// Value of the document node.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = CompactString::from(name);
        self
    }

    fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_URI);
        }
        self.bindings.iter().rev().find(|(p, _)| p == prefix).map(|(_, u)| u.as_str()).filter(|u| !u.is_empty())
    }

    fn flush_text(&mut self, builder: &mut Builder) -> Result<()> {
        if self.text.is_empty() {
            return Ok(());
        }
        let value = core::mem::take(&mut self.text);
        if builder.options().chop_whitespace && value.trim().is_empty() {
            return Ok(());
        }
        builder.event(BuildEvent::Text { value, kind: TextKind::Text })
    }

    fn start(&mut self, builder: &mut Builder, start: &BytesStart<'_>) -> Result<()> {
        let strip = builder.options().strip_namespaces;
        let mut decls: Vec<(CompactString, CompactString)> = Vec::new();
        let mut attrs: Vec<(CompactString, String)> = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::from_code(ErrorCode::FODC0006, e.to_string()))?;
            let key = utf8(attr.key.as_ref())?;
            let value = unescape(utf8(&attr.value)?)?;
            if key == "xmlns" || key.starts_with("xmlns:") {
                if !strip {
                    let prefix = key.strip_prefix("xmlns").unwrap_or_default().trim_start_matches(':');
                    decls.push((CompactString::from(prefix), CompactString::from(value)));
                }
                continue;
            }
            attrs.push((CompactString::from(key), value));
        }

        self.marks.push(self.bindings.len());
        self.bindings.extend(decls.iter().cloned());

        let qname = utf8(start.name().as_ref())?.to_string();
        let (name, uri) = self.qualify(&qname, true, strip)?;
        let has_ns = !decls.is_empty();
        for (prefix, uri) in &decls {
            let prefix = builder.intern_prefix(prefix);
            let uri = builder.intern_uri(uri);
            builder.event(BuildEvent::Namespace { prefix, uri })?;
        }
        let name = builder.intern_name(&name);
        let uri = builder.intern_uri(&uri);
        builder.event(BuildEvent::ElementOpen { name, uri, attrs: attrs.len(), has_ns })?;
        for (key, value) in attrs {
            let (name, uri) = self.qualify(&key, false, strip)?;
            let name = builder.intern_name(&name);
            let uri = builder.intern_uri(&uri);
            builder.event(BuildEvent::Attribute { name, value, uri })?;
        }
        Ok(())
    }

    fn end(&mut self, builder: &mut Builder) -> Result<()> {
        if let Some(mark) = self.marks.pop() {
            self.bindings.truncate(mark);
        }
        builder.event(BuildEvent::ElementClose)
    }

    /// Splits a qualified name and resolves its namespace. Unprefixed
    /// attributes are in no namespace.
    fn qualify(&self, qname: &str, element: bool, strip: bool) -> Result<(String, String)> {
        let (prefix, local) = qname.split_once(':').unwrap_or(("", qname));
        if strip {
            return Ok((local.to_string(), String::new()));
        }
        if prefix.is_empty() && !element {
            return Ok((qname.to_string(), String::new()));
        }
        match self.resolve(prefix) {
            Some(uri) if uri == XMLNS_URI => {
                Err(Error::from_code(ErrorCode::FODC0006, format!("reserved namespace on {qname}")))
            }
            Some(uri) => Ok((qname.to_string(), uri.to_string())),
            None if prefix.is_empty() => Ok((qname.to_string(), String::new())),
            None => Err(Error::from_code(ErrorCode::FODC0006, format!("unbound prefix {prefix}:"))),
        }
    }
}

impl<R: BufRead> Parser for XmlParser<R> {
    fn parse(&mut self, builder: &mut Builder) -> Result<()> {
        if !builder.is_fragment() {
            builder.event(BuildEvent::Doc { value: self.name.to_string() })?;
        }
        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    self.flush_text(builder)?;
                    self.start(builder, &e)?;
                }
                Event::Empty(e) => {
                    self.flush_text(builder)?;
                    self.start(builder, &e)?;
                    self.end(builder)?;
                }
                Event::End(_) => {
                    self.flush_text(builder)?;
                    self.end(builder)?;
                }
                Event::Text(e) => {
                    let raw = utf8(&e)?;
                    self.text.push_str(&unescape(raw)?);
                }
                Event::CData(e) => self.text.push_str(utf8(&e)?),
                Event::GeneralRef(e) => {
                    let name = utf8(&e)?;
                    self.text.push_str(&entity(name)?);
                }
                Event::Comment(e) => {
                    self.flush_text(builder)?;
                    let value = utf8(&e)?.to_string();
                    builder.event(BuildEvent::Text { value, kind: TextKind::Comment })?;
                }
                Event::PI(e) => {
                    self.flush_text(builder)?;
                    let raw = utf8(&e)?;
                    let (target, data) = raw.split_once(char::is_whitespace).unwrap_or((raw, ""));
                    let name = builder.intern_name(target);
                    builder.event(BuildEvent::Pi { name, value: data.trim_start().to_string() })?;
                }
                Event::Decl(_) | Event::DocType(_) => {}
                Event::Eof => break,
            }
            buf.clear();
        }
        self.flush_text(builder)?;
        if !self.marks.is_empty() {
            return Err(Error::from_code(ErrorCode::FODC0006, "unexpected end of input"));
        }
        Ok(())
    }
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::from_code(ErrorCode::FODC0006, e.to_string()))
}

fn unescape(raw: &str) -> Result<String> {
    quick_xml::escape::unescape(raw)
        .map(|v| v.into_owned())
        .map_err(|e| Error::from_code(ErrorCode::FODC0006, e.to_string()))
}

/// Resolves a general entity reference (`&name;`) occurring in text.
fn entity(name: &str) -> Result<String> {
    let resolved = match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => name
            .strip_prefix("#x")
            .map(|hex| u32::from_str_radix(hex, 16))
            .or_else(|| name.strip_prefix('#').map(str::parse::<u32>))
            .and_then(|code| code.ok())
            .and_then(char::from_u32),
    };
    resolved
        .map(String::from)
        .ok_or_else(|| Error::from_code(ErrorCode::FODC0006, format!("unknown entity &{name};")))
}
