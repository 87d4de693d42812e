//! Single-pass table construction.
//!
//! A [`Builder`] consumes [`BuildEvent`]s (from an [`EventParser`], an
//! [`XmlParser`] or direct calls) and appends records to a fresh
//! [`NodeTable`]. Elements are appended with a provisional size of 1 and
//! patched when their scope closes, so the builder only keeps one small
//! accumulator per open scope.

mod events;
mod xml;

pub use events::{BuildEvent, EventParser, TextKind};
pub use xml::XmlParser;

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::data::{Content, NodeRecord, NodeTable, NsDecl, NsDecls};
use crate::error::{Error, Result};
use crate::model::NodeKind;
use crate::options::Options;

/// Source of build events.
pub trait Parser {
    fn parse(&mut self, builder: &mut Builder) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
struct Scope {
    pre: usize,
    attrs_expected: usize,
    attrs_seen: usize,
}

#[derive(Debug)]
pub struct Builder {
    table: NodeTable,
    scopes: SmallVec<[Scope; 32]>,
    pending_ns: NsDecls,
    // attributes are only accepted directly after an element open
    in_attrs: bool,
    fragment: bool,
}

impl Builder {
    pub fn new(options: Options) -> Self {
        Self {
            table: NodeTable::new(options),
            scopes: SmallVec::new(),
            pending_ns: NsDecls::new(),
            in_attrs: false,
            fragment: false,
        }
    }

    /// Builder for a fragment: no document node, top-level nodes are roots.
    pub fn fragment(options: Options) -> Self {
        Self { fragment: true, ..Self::new(options) }
    }

    pub fn with_doc_name(mut self, name: &str) -> Self {
        self.table = self.table.with_doc_name(name);
        self
    }

    /// Builds a document table from `parser`. A failing parser discards the
    /// partially built table.
    pub fn build(options: Options, parser: &mut impl Parser) -> Result<NodeTable> {
        let mut builder = Self::new(options);
        parser.parse(&mut builder)?;
        builder.finish()
    }

    pub fn build_fragment(options: Options, parser: &mut impl Parser) -> Result<NodeTable> {
        let mut builder = Self::fragment(options);
        parser.parse(&mut builder)?;
        builder.finish()
    }

    pub fn is_fragment(&self) -> bool {
        self.fragment
    }

    pub fn options(&self) -> &Options {
        self.table.options()
    }

    /// Number of records appended so far.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Nesting depth of open scopes (the document counts as one).
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn intern_name(&mut self, name: &str) -> u32 {
        self.table.intern_name(name)
    }

    pub fn intern_uri(&mut self, uri: &str) -> u32 {
        self.table.intern_uri(uri)
    }

    /// Prefixes share the name pool; the empty (default) prefix is id `0`.
    pub fn intern_prefix(&mut self, prefix: &str) -> u32 {
        if prefix.is_empty() { 0 } else { self.table.intern_name(prefix) }
    }

    // ---- low-level record appends ----

    pub fn add_doc(&mut self, value: &str) -> Result<usize> {
        if self.fragment || !self.table.is_empty() {
            return Err(Error::malformed_events("document node must be the first record of a document table"));
        }
        let content = self.table.make_content(value);
        self.table.push(NodeRecord::new(NodeKind::Document, 0, 0, 0, content))
    }

    /// Appends an element with a provisional size of 1. Pending namespace
    /// declarations are attached when `has_ns` is set.
    pub fn add_elem(&mut self, dist: usize, name: u32, attrs: usize, uri: u32, has_ns: bool) -> Result<usize> {
        let mut rec = NodeRecord::new(NodeKind::Element, dist as u32, name, uri, Content::None);
        rec.attr_size = attrs as u32 + 1;
        if has_ns && !self.pending_ns.is_empty() {
            rec.ns = Some(Box::new(core::mem::take(&mut self.pending_ns)));
        } else {
            self.pending_ns.clear();
        }
        self.table.push(rec)
    }

    pub fn add_attr(&mut self, dist: usize, name: u32, uri: u32, value: &str) -> Result<usize> {
        let content = self.table.make_content(value);
        self.table.push(NodeRecord::new(NodeKind::Attribute, dist as u32, name, uri, content))
    }

    pub fn add_text(&mut self, dist: usize, value: &str, kind: TextKind) -> Result<usize> {
        let kind = match kind {
            TextKind::Text => NodeKind::Text,
            TextKind::Comment => NodeKind::Comment,
        };
        let content = self.table.make_content(value);
        self.table.push(NodeRecord::new(kind, dist as u32, 0, 0, content))
    }

    pub fn add_pi(&mut self, dist: usize, name: u32, value: &str) -> Result<usize> {
        let content = self.table.make_content(value);
        self.table.push(NodeRecord::new(NodeKind::ProcessingInstruction, dist as u32, name, 0, content))
    }

    pub fn set_size(&mut self, pre: usize, kind: NodeKind, size: usize) -> Result<()> {
        self.table.set_size(pre, kind, size)
    }

    // ---- event interface ----

    pub fn event(&mut self, event: BuildEvent) -> Result<()> {
        if !matches!(event, BuildEvent::Attribute { .. }) {
            self.end_attributes();
        }
        match event {
            BuildEvent::Doc { value } => {
                let pre = self.add_doc(&value)?;
                self.scopes.push(Scope { pre, attrs_expected: 0, attrs_seen: 0 });
            }
            BuildEvent::Namespace { prefix, uri } => {
                self.pending_ns.push(NsDecl { prefix, uri });
            }
            BuildEvent::ElementOpen { name, uri, attrs, has_ns } => {
                self.open_elem(name, uri, attrs, has_ns)?;
            }
            BuildEvent::Attribute { name, value, uri } => {
                let scope = match self.scopes.last_mut() {
                    Some(scope) if self.in_attrs => scope,
                    _ => return Err(Error::malformed_events("attribute outside of an element start")),
                };
                scope.attrs_seen += 1;
                let pre = scope.pre;
                let dist = self.table.len() - pre;
                self.add_attr(dist, name, uri, &value)?;
            }
            BuildEvent::Text { value, kind } => {
                let dist = self.dist()?;
                self.add_text(dist, &value, kind)?;
            }
            BuildEvent::Pi { name, value } => {
                let dist = self.dist()?;
                self.add_pi(dist, name, &value)?;
            }
            BuildEvent::ElementClose => self.close_elem()?,
        }
        Ok(())
    }

    pub fn open_elem(&mut self, name: u32, uri: u32, attrs: usize, has_ns: bool) -> Result<usize> {
        self.end_attributes();
        let dist = self.dist()?;
        let pre = self.add_elem(dist, name, attrs, uri, has_ns)?;
        self.scopes.push(Scope { pre, attrs_expected: attrs, attrs_seen: 0 });
        self.in_attrs = true;
        Ok(pre)
    }

    pub fn close_elem(&mut self) -> Result<()> {
        self.end_attributes();
        let scope = match self.scopes.last() {
            Some(s) if self.table.kind(s.pre) == NodeKind::Element => *s,
            _ => return Err(Error::malformed_events("element close without matching open")),
        };
        self.scopes.pop();
        let size = self.table.len() - scope.pre;
        self.table.set_size(scope.pre, NodeKind::Element, size)
    }

    /// Closes the document scope and returns the finished table.
    pub fn finish(mut self) -> Result<NodeTable> {
        self.end_attributes();
        if let Some(open) = self.scopes.iter().find(|s| self.table.kind(s.pre) == NodeKind::Element) {
            return Err(Error::malformed_events(format!("element at {} was never closed", open.pre)));
        }
        if !self.fragment {
            if self.table.is_empty() {
                return Err(Error::malformed_events("document table without document node"));
            }
            let len = self.table.len();
            self.table.set_size(0, NodeKind::Document, len)?;
        }
        debug!(nodes = self.table.len(), fragment = self.fragment, doc = self.table.doc_name(), "build finished");
        Ok(self.table)
    }

    fn dist(&self) -> Result<usize> {
        match self.scopes.last() {
            Some(scope) => Ok(self.table.len() - scope.pre),
            None if self.fragment => Ok(0),
            None => Err(Error::malformed_events("node outside of the document node")),
        }
    }

    // Leaves the attribute phase of the innermost element and patches its
    // attribute count if the announced count was wrong.
    fn end_attributes(&mut self) {
        if !self.in_attrs {
            return;
        }
        self.in_attrs = false;
        if let Some(scope) = self.scopes.last()
            && scope.attrs_seen != scope.attrs_expected
        {
            warn!(
                pre = scope.pre,
                expected = scope.attrs_expected,
                seen = scope.attrs_seen,
                "attribute count mismatch, patching element"
            );
            self.table.set_attr_size(scope.pre, scope.attrs_seen + 1);
        }
    }
}
