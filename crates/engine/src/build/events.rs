use smallvec::SmallVec;

use super::{Builder, Parser};
use crate::data::{NamePool, NodeTable};
use crate::error::Result;
use crate::model::NodeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Text,
    Comment,
}

/// One step of the builder's input protocol.
///
/// Name, prefix and uri fields are ids. Events fed to [`Builder::event`]
/// directly must use the builder's own pools; an [`EventParser`] carries its
/// own pools and remaps ids when replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    Doc { value: String },
    /// Declaration attached to the next element opened with `has_ns`.
    Namespace { prefix: u32, uri: u32 },
    ElementOpen { name: u32, uri: u32, attrs: usize, has_ns: bool },
    Attribute { name: u32, value: String, uri: u32 },
    Text { value: String, kind: TextKind },
    Pi { name: u32, value: String },
    ElementClose,
}

/// Recorded event stream together with the name pools its ids refer to.
#[derive(Debug, Clone, Default)]
pub struct EventParser {
    names: NamePool,
    uris: NamePool,
    events: Vec<BuildEvent>,
    last_open: Option<usize>,
}

impl EventParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[BuildEvent] {
        &self.events
    }

    pub fn names(&self) -> &NamePool {
        &self.names
    }

    pub fn uris(&self) -> &NamePool {
        &self.uris
    }

    pub fn into_events(self) -> Vec<BuildEvent> {
        self.events
    }

    pub fn doc(mut self, value: &str) -> Self {
        self.events.push(BuildEvent::Doc { value: value.to_string() });
        self
    }

    /// Declares `prefix` on the next opened element.
    pub fn namespace(mut self, prefix: &str, uri: &str) -> Self {
        let prefix = if prefix.is_empty() { 0 } else { self.names.intern(prefix) };
        let uri = self.uris.intern(uri);
        self.events.push(BuildEvent::Namespace { prefix, uri });
        self
    }

    pub fn open(self, name: &str) -> Self {
        self.open_ns(name, "")
    }

    pub fn open_ns(mut self, name: &str, uri: &str) -> Self {
        let has_ns = matches!(self.events.last(), Some(BuildEvent::Namespace { .. }));
        let name = self.names.intern(name);
        let uri = if uri.is_empty() { 0 } else { self.uris.intern(uri) };
        self.last_open = Some(self.events.len());
        self.events.push(BuildEvent::ElementOpen { name, uri, attrs: 0, has_ns });
        self
    }

    /// Adds an attribute to the element opened last; the element's announced
    /// attribute count follows.
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        if let Some(BuildEvent::ElementOpen { attrs, .. }) = self.last_open.and_then(|i| self.events.get_mut(i)) {
            *attrs += 1;
        }
        let name = self.names.intern(name);
        self.events.push(BuildEvent::Attribute { name, value: value.to_string(), uri: 0 });
        self
    }

    pub fn text(mut self, value: &str) -> Self {
        self.last_open = None;
        self.events.push(BuildEvent::Text { value: value.to_string(), kind: TextKind::Text });
        self
    }

    pub fn comment(mut self, value: &str) -> Self {
        self.last_open = None;
        self.events.push(BuildEvent::Text { value: value.to_string(), kind: TextKind::Comment });
        self
    }

    pub fn pi(mut self, name: &str, value: &str) -> Self {
        self.last_open = None;
        let name = self.names.intern(name);
        self.events.push(BuildEvent::Pi { name, value: value.to_string() });
        self
    }

    pub fn close(mut self) -> Self {
        self.last_open = None;
        self.events.push(BuildEvent::ElementClose);
        self
    }

    /// Appends a raw event whose ids refer to this parser's pools.
    pub fn push(&mut self, event: BuildEvent) {
        self.events.push(event);
    }

    /// Serializes the shape and content of `table` back into events.
    pub fn from_table(table: &NodeTable) -> Self {
        let mut out = Self { names: table.names().clone(), uris: table.uris().clone(), ..Self::default() };
        let mut open: SmallVec<[usize; 32]> = SmallVec::new();
        for pre in 0..table.len() {
            while open.last().is_some_and(|&end| pre >= end) {
                open.pop();
                out.events.push(BuildEvent::ElementClose);
            }
            let event = match table.kind(pre) {
                NodeKind::Document => BuildEvent::Doc { value: table.text(pre).to_string() },
                NodeKind::Element => {
                    let decls = table.namespaces_of(pre);
                    for d in decls {
                        out.events.push(BuildEvent::Namespace { prefix: d.prefix, uri: d.uri });
                    }
                    open.push(pre + table.size(pre));
                    BuildEvent::ElementOpen {
                        name: table.name_id(pre),
                        uri: table.uri_id(pre),
                        attrs: table.attr_size(pre) - 1,
                        has_ns: !decls.is_empty(),
                    }
                }
                NodeKind::Attribute => BuildEvent::Attribute {
                    name: table.name_id(pre),
                    value: table.text(pre).to_string(),
                    uri: table.uri_id(pre),
                },
                NodeKind::Text => BuildEvent::Text { value: table.text(pre).to_string(), kind: TextKind::Text },
                NodeKind::Comment => BuildEvent::Text { value: table.text(pre).to_string(), kind: TextKind::Comment },
                NodeKind::ProcessingInstruction => {
                    BuildEvent::Pi { name: table.name_id(pre), value: table.text(pre).to_string() }
                }
            };
            out.events.push(event);
        }
        while open.pop().is_some() {
            out.events.push(BuildEvent::ElementClose);
        }
        out
    }

    fn name(&self, builder: &mut Builder, id: u32) -> u32 {
        self.names.get(id).map_or(0, |n| builder.intern_name(n))
    }

    fn uri(&self, builder: &mut Builder, id: u32) -> u32 {
        self.uris.get(id).map_or(0, |u| builder.intern_uri(u))
    }
}

impl Parser for EventParser {
    fn parse(&mut self, builder: &mut Builder) -> Result<()> {
        for event in &self.events {
            let event = match event {
                BuildEvent::Namespace { prefix, uri } => BuildEvent::Namespace {
                    prefix: self.name(builder, *prefix),
                    uri: self.uri(builder, *uri),
                },
                BuildEvent::ElementOpen { name, uri, attrs, has_ns } => BuildEvent::ElementOpen {
                    name: self.name(builder, *name),
                    uri: self.uri(builder, *uri),
                    attrs: *attrs,
                    has_ns: *has_ns,
                },
                BuildEvent::Attribute { name, value, uri } => BuildEvent::Attribute {
                    name: self.name(builder, *name),
                    value: value.clone(),
                    uri: self.uri(builder, *uri),
                },
                BuildEvent::Pi { name, value } => BuildEvent::Pi { name: self.name(builder, *name), value: value.clone() },
                other => other.clone(),
            };
            builder.event(event)?;
        }
        Ok(())
    }
}

impl NodeTable {
    /// Event stream that rebuilds a table of the same shape.
    pub fn events(&self) -> EventParser {
        EventParser::from_table(self)
    }
}
