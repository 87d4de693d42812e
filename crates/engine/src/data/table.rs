//! Flat node table.
//!
//! Every node of a document occupies one record, addressed by its pre-order
//! position (`pre`). The parent is derived from the stored distance (`dist`),
//! and the subtree of a node occupies the contiguous range
//! `[pre, pre + size)`. Attributes directly follow their element and are
//! counted by `attr_size` (attributes + 1).
//!
//! Cost model: the table is a growable array. Navigation is O(1); every
//! structural operation (`insert`, `delete`, `replace`) is O(table size)
//! because all later records move and the parent distances of the nodes
//! following the touched range are rewritten.

use core::ops::Range;

use compact_str::CompactString;
use tracing::trace;

use crate::data::names::NamePool;
use crate::data::namespaces::{NamespacePool, NsDecl, NsDecls};
use crate::data::texts::TextStore;
use crate::error::{Error, ErrorCode, Result};
use crate::model::NodeKind;
use crate::options::Options;

/// Node content: short values live inside the record, longer ones in the
/// table's text store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    None,
    Inline(CompactString),
    Stored { offset: u32, len: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub(crate) kind: NodeKind,
    pub(crate) dist: u32,
    pub(crate) size: u32,
    pub(crate) attr_size: u32,
    pub(crate) name: u32,
    pub(crate) uri: u32,
    pub(crate) content: Content,
    pub(crate) ns: Option<Box<NsDecls>>,
}

impl NodeRecord {
    pub(crate) fn new(kind: NodeKind, dist: u32, name: u32, uri: u32, content: Content) -> Self {
        Self { kind, dist, size: 1, attr_size: 1, name, uri, content, ns: None }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }
    pub fn dist(&self) -> usize {
        self.dist as usize
    }
    pub fn size(&self) -> usize {
        self.size as usize
    }
    pub fn attr_size(&self) -> usize {
        self.attr_size as usize
    }
    pub fn name_id(&self) -> u32 {
        self.name
    }
    pub fn uri_id(&self) -> u32 {
        self.uri
    }
    pub fn content(&self) -> &Content {
        &self.content
    }
    pub fn namespaces(&self) -> &[NsDecl] {
        self.ns.as_deref().map(|d| d.as_slice()).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct NodeTable {
    records: Vec<NodeRecord>,
    names: NamePool,
    uris: NamePool,
    namespaces: NamespacePool,
    texts: TextStore,
    options: Options,
    doc_name: CompactString,
}

impl Default for NodeTable {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl NodeTable {
    pub fn new(options: Options) -> Self {
        Self {
            records: Vec::new(),
            names: NamePool::new(),
            uris: NamePool::new(),
            namespaces: NamespacePool::new(),
            texts: TextStore::new(),
            options,
            doc_name: CompactString::default(),
        }
    }

    pub fn with_doc_name(mut self, name: &str) -> Self {
        self.doc_name = CompactString::from(name);
        self
    }

    /// Name under which the table is known to its collaborators.
    pub fn doc_name(&self) -> &str {
        &self.doc_name
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A table without a leading document node holds a fragment: a forest of
    /// root nodes, as used for update payloads.
    pub fn is_fragment(&self) -> bool {
        self.records.first().is_none_or(|r| r.kind != NodeKind::Document)
    }

    pub fn record(&self, pre: usize) -> Option<&NodeRecord> {
        self.records.get(pre)
    }

    pub fn records(&self) -> &[NodeRecord] {
        &self.records
    }

    // Accessors below index directly and panic on out-of-range positions,
    // like slice indexing. Use `record()` for checked access.

    #[inline]
    pub fn kind(&self, pre: usize) -> NodeKind {
        self.records[pre].kind
    }

    #[inline]
    pub fn dist(&self, pre: usize) -> usize {
        self.records[pre].dist as usize
    }

    #[inline]
    pub fn size(&self, pre: usize) -> usize {
        self.records[pre].size as usize
    }

    #[inline]
    pub fn attr_size(&self, pre: usize) -> usize {
        self.records[pre].attr_size as usize
    }

    #[inline]
    pub fn name_id(&self, pre: usize) -> u32 {
        self.records[pre].name
    }

    #[inline]
    pub fn uri_id(&self, pre: usize) -> u32 {
        self.records[pre].uri
    }

    #[inline]
    pub fn parent(&self, pre: usize) -> Option<usize> {
        match self.records[pre].dist {
            0 => None,
            d => Some(pre - d as usize),
        }
    }

    pub fn node_name(&self, pre: usize) -> Option<&str> {
        self.names.get(self.records[pre].name)
    }

    /// Local part of the node name (prefix stripped).
    pub fn local_name(&self, pre: usize) -> Option<&str> {
        self.node_name(pre).map(|n| n.split_once(':').map_or(n, |(_, local)| local))
    }

    pub fn uri(&self, pre: usize) -> Option<&str> {
        self.uris.get(self.records[pre].uri)
    }

    pub fn namespaces_of(&self, pre: usize) -> &[NsDecl] {
        self.records[pre].namespaces()
    }

    /// Content of a leaf node (text, attribute value, comment, PI data) or the
    /// document's base value.
    pub fn text(&self, pre: usize) -> &str {
        match &self.records[pre].content {
            Content::None => "",
            Content::Inline(s) => s.as_str(),
            Content::Stored { offset, len } => self.texts.get(*offset, *len),
        }
    }

    /// XDM string value: concatenated descendant text for documents and
    /// elements, the content otherwise.
    pub fn string_value(&self, pre: usize) -> String {
        match self.kind(pre) {
            NodeKind::Document | NodeKind::Element => {
                let end = pre + self.size(pre);
                let mut out = String::new();
                for p in pre + 1..end {
                    if self.records[p].kind == NodeKind::Text {
                        out.push_str(self.text(p));
                    }
                }
                out
            }
            _ => self.text(pre).to_string(),
        }
    }

    pub fn children(&self, pre: usize) -> Children<'_> {
        let rec = &self.records[pre];
        Children { table: self, next: pre + rec.attr_size as usize, end: pre + rec.size as usize }
    }

    pub fn attributes(&self, pre: usize) -> Range<usize> {
        pre + 1..pre + self.attr_size(pre)
    }

    /// Top-level nodes: the document node, or every root of a fragment.
    pub fn roots(&self) -> Children<'_> {
        Children { table: self, next: 0, end: self.len() }
    }

    pub fn names(&self) -> &NamePool {
        &self.names
    }

    pub fn uris(&self) -> &NamePool {
        &self.uris
    }

    pub fn namespace_pool(&self) -> &NamespacePool {
        &self.namespaces
    }

    pub fn text_store(&self) -> &TextStore {
        &self.texts
    }

    pub fn intern_name(&mut self, name: &str) -> u32 {
        self.names.intern(name)
    }

    pub fn intern_uri(&mut self, uri: &str) -> u32 {
        if uri.is_empty() { 0 } else { self.uris.intern(uri) }
    }

    /// True if any element of the table declares a namespace.
    pub fn has_namespaces(&self) -> bool {
        !self.namespaces.is_empty()
    }

    // ---- population (used by the builder) ----

    pub(crate) fn make_content(&mut self, value: &str) -> Content {
        if value.is_empty() {
            Content::None
        } else if value.len() <= self.options.inline_text {
            Content::Inline(CompactString::from(value))
        } else {
            let (offset, len) = self.texts.store(value);
            Content::Stored { offset, len }
        }
    }

    fn ensure_capacity(&self, extra: usize) -> Result<()> {
        let max = self.options.max_nodes.min(u32::MAX as usize);
        let requested = self.records.len().saturating_add(extra);
        if requested > max {
            return Err(Error::capacity_exceeded(requested, max));
        }
        Ok(())
    }

    /// Appends a record at the end of the table.
    pub(crate) fn push(&mut self, rec: NodeRecord) -> Result<usize> {
        self.ensure_capacity(1)?;
        if let Some(decls) = rec.ns.as_deref() {
            self.namespaces.register_all(decls.iter());
        }
        self.records.push(rec);
        Ok(self.records.len() - 1)
    }

    /// Patches the size of a container once its subtree is complete.
    pub fn set_size(&mut self, pre: usize, kind: NodeKind, size: usize) -> Result<()> {
        let len = self.len();
        let rec = self.records.get_mut(pre).ok_or_else(|| Error::invalid_position(pre, len))?;
        if rec.kind != kind || kind.is_leaf() {
            return Err(Error::type_error(format!("cannot set size of {} node at {pre}", rec.kind)));
        }
        if size == 0 || pre + size > len {
            return Err(Error::invalid_position(pre + size, len));
        }
        rec.size = size as u32;
        Ok(())
    }

    pub(crate) fn set_attr_size(&mut self, pre: usize, attr_size: usize) {
        self.records[pre].attr_size = attr_size as u32;
    }

    // ---- structural updates ----

    /// Splices a single node (leaf or empty element) in front of `pre`, as a
    /// child (or attribute) of `parent`. Name and uri ids refer to this
    /// table's pools.
    pub fn insert_node(
        &mut self,
        pre: usize,
        parent: Option<usize>,
        kind: NodeKind,
        name_id: u32,
        uri_id: u32,
        value: &str,
    ) -> Result<()> {
        if kind == NodeKind::Document {
            return Err(Error::from_code(ErrorCode::XUTY0008, "document nodes cannot be inserted"));
        }
        if name_id as usize > self.names.len() || uri_id as usize > self.uris.len() {
            return Err(Error::type_error(format!("unknown name reference {name_id}/{uri_id}")));
        }
        let attr = kind == NodeKind::Attribute;
        self.check_insert_target(pre, parent, attr)?;
        self.ensure_capacity(1)?;
        let dist = parent.map_or(0, |p| (pre - p) as u32);
        let content = if kind == NodeKind::Element { Content::None } else { self.make_content(value) };
        let rec = NodeRecord::new(kind, dist, name_id, uri_id, content);
        self.splice(pre, 0, parent, vec![rec]);
        if attr && let Some(p) = parent {
            self.records[p].attr_size += 1;
        }
        Ok(())
    }

    /// Inserts all nodes of `fragment` in front of `pre` as children of
    /// `parent`. Returns the number of inserted records.
    pub fn insert(&mut self, pre: usize, parent: Option<usize>, fragment: &NodeTable) -> Result<usize> {
        self.check_insert_target(pre, parent, false)?;
        if fragment.roots().any(|r| fragment.kind(r) == NodeKind::Attribute) {
            return Err(Error::from_code(ErrorCode::XUTY0008, "attributes must be inserted with insert_attr"));
        }
        self.ensure_capacity(fragment.len())?;
        let new = self.import(fragment, pre, parent)?;
        let n = new.len();
        self.splice(pre, 0, parent, new);
        trace!(pre, inserted = n, "inserted fragment");
        Ok(n)
    }

    /// Attribute-aware insertion: keeps attributes directly behind their
    /// element and maintains its attribute count.
    pub fn insert_attr(&mut self, pre: usize, parent: usize, fragment: &NodeTable) -> Result<usize> {
        self.check_insert_target(pre, Some(parent), true)?;
        if fragment.records.iter().any(|r| r.kind != NodeKind::Attribute) {
            return Err(Error::from_code(ErrorCode::XUTY0008, "attribute fragment contains non-attribute nodes"));
        }
        self.ensure_capacity(fragment.len())?;
        let new = self.import(fragment, pre, Some(parent))?;
        let n = new.len();
        self.splice(pre, 0, Some(parent), new);
        self.records[parent].attr_size += n as u32;
        trace!(pre, parent, inserted = n, "inserted attributes");
        Ok(n)
    }

    /// Removes the subtree rooted at `pre`. Returns the number of removed
    /// records.
    pub fn delete(&mut self, pre: usize) -> Result<usize> {
        let len = self.len();
        let rec = self.records.get(pre).ok_or_else(|| Error::invalid_position(pre, len))?;
        if rec.kind == NodeKind::Document {
            return Err(Error::from_code(ErrorCode::XUTY0008, "the document node cannot be deleted"));
        }
        let n = rec.size as usize;
        let kind = rec.kind;
        let parent = self.parent(pre);
        if kind == NodeKind::Attribute && let Some(p) = parent {
            self.records[p].attr_size -= 1;
        }
        self.splice(pre, n, parent, Vec::new());
        trace!(pre, removed = n, "deleted subtree");
        Ok(n)
    }

    /// Replaces the subtree at `pre` with the nodes of `fragment` in a single
    /// splice. Returns the size delta (`new - old`).
    ///
    /// The payload is copied record by record; namespace declarations are
    /// carried over verbatim, so callers that need the namespace-safe path
    /// delete and re-insert explicitly.
    pub fn replace(&mut self, pre: usize, fragment: &NodeTable) -> Result<isize> {
        let len = self.len();
        let rec = self.records.get(pre).ok_or_else(|| Error::invalid_position(pre, len))?;
        if rec.kind == NodeKind::Document {
            return Err(Error::from_code(ErrorCode::XUTY0008, "the document node cannot be replaced"));
        }
        let kind = rec.kind;
        let removed = rec.size as usize;
        let parent = self.parent(pre);
        let attrs = fragment.records.iter().all(|r| r.kind == NodeKind::Attribute);
        let any_attr = fragment.roots().any(|r| fragment.kind(r) == NodeKind::Attribute);
        if kind == NodeKind::Attribute && !attrs || kind != NodeKind::Attribute && any_attr {
            return Err(Error::from_code(
                ErrorCode::XUTY0008,
                format!("{kind} node cannot be replaced by this fragment"),
            ));
        }
        self.ensure_capacity(fragment.len().saturating_sub(removed))?;
        let new = self.import(fragment, pre, parent)?;
        let added = new.len();
        self.splice(pre, removed, parent, new);
        if kind == NodeKind::Attribute && let Some(p) = parent {
            let rec = &mut self.records[p];
            rec.attr_size = rec.attr_size + added as u32 - 1;
        }
        trace!(pre, removed, added, "replaced subtree");
        Ok(added as isize - removed as isize)
    }

    /// Overwrites the content of a text, attribute, comment or PI node.
    pub fn update_text(&mut self, pre: usize, value: &str) -> Result<()> {
        let len = self.len();
        let rec = self.records.get(pre).ok_or_else(|| Error::invalid_position(pre, len))?;
        if !rec.kind.is_leaf() {
            return Err(Error::from_code(ErrorCode::XUTY0008, format!("cannot update value of {} node", rec.kind)));
        }
        if let Content::Stored { len, .. } = rec.content {
            self.texts.release(len);
        }
        let content = self.make_content(value);
        self.records[pre].content = content;
        Ok(())
    }

    /// Renames an element, attribute or processing instruction.
    pub fn rename(&mut self, pre: usize, name: &str, uri: Option<&str>) -> Result<()> {
        let len = self.len();
        let rec = self.records.get(pre).ok_or_else(|| Error::invalid_position(pre, len))?;
        if !rec.kind.is_named() {
            return Err(Error::from_code(ErrorCode::XUTY0008, format!("cannot rename {} node", rec.kind)));
        }
        let name = self.names.intern(name);
        let uri = uri.map_or(0, |u| self.intern_uri(u));
        let rec = &mut self.records[pre];
        rec.name = name;
        rec.uri = uri;
        Ok(())
    }

    /// Merges two adjacent sibling text nodes into the first one. Returns
    /// `false` (and leaves the table untouched) if `a` and `b` are not both
    /// text nodes below the same parent.
    pub fn merge_texts(&mut self, a: usize, b: usize) -> Result<bool> {
        let len = self.len();
        if a >= len || b >= len || a == b {
            return Ok(false);
        }
        if self.kind(a) != NodeKind::Text || self.kind(b) != NodeKind::Text || self.parent(a) != self.parent(b) {
            return Ok(false);
        }
        let merged = format!("{}{}", self.text(a), self.text(b));
        self.update_text(a, &merged)?;
        self.delete(b)?;
        trace!(a, b, "merged adjacent texts");
        Ok(true)
    }

    /// True if the subtree at `pre` carries namespace declarations.
    pub fn subtree_has_namespaces(&self, pre: usize) -> bool {
        let end = pre + self.size(pre);
        self.records[pre..end].iter().any(|r| r.ns.is_some())
    }

    // ---- fragments ----

    /// Copies the subtrees rooted at `pres` into a new fragment table; the
    /// copied roots become fragment roots.
    pub fn extract(&self, pres: &[usize]) -> Result<NodeTable> {
        let mut out = NodeTable::new(self.options.clone());
        let len = self.len();
        for &pre in pres {
            let rec = self.records.get(pre).ok_or_else(|| Error::invalid_position(pre, len))?;
            if rec.kind == NodeKind::Document {
                return Err(Error::from_code(ErrorCode::XUTY0008, "document nodes cannot be copied into a fragment"));
            }
            let end = pre + rec.size as usize;
            out.ensure_capacity(end - pre)?;
            for p in pre..end {
                let dist = if p == pre { 0 } else { self.records[p].dist };
                let copy = out.copy_record(self, p, dist);
                out.push(copy)?;
            }
        }
        Ok(out)
    }

    /// Appends all roots of `fragment` as further roots of this fragment.
    pub fn append(&mut self, fragment: &NodeTable) -> Result<usize> {
        if !self.is_fragment() || !fragment.is_fragment() {
            return Err(Error::type_error("only fragments can be appended"));
        }
        self.ensure_capacity(fragment.len())?;
        for p in 0..fragment.len() {
            let copy = self.copy_record(fragment, p, fragment.records[p].dist);
            self.push(copy)?;
        }
        Ok(fragment.len())
    }

    /// Appends a text root to a fragment.
    pub fn append_text(&mut self, value: &str) -> Result<usize> {
        if !self.is_fragment() {
            return Err(Error::type_error("text roots can only be added to fragments"));
        }
        let content = self.make_content(value);
        self.push(NodeRecord::new(NodeKind::Text, 0, 0, 0, content))
    }

    /// Splits a fragment into its attribute roots and all other roots.
    pub fn split_attributes(&self) -> Result<(NodeTable, NodeTable)> {
        let (attrs, others): (Vec<usize>, Vec<usize>) =
            self.roots().partition(|&r| self.kind(r) == NodeKind::Attribute);
        Ok((self.extract(&attrs)?, self.extract(&others)?))
    }

    fn check_insert_target(&self, pre: usize, parent: Option<usize>, attr: bool) -> Result<()> {
        let len = self.len();
        if pre > len {
            return Err(Error::invalid_position(pre, len));
        }
        match parent {
            Some(p) => {
                let rec = self.records.get(p).ok_or_else(|| Error::invalid_position(p, len))?;
                if rec.kind.is_leaf() {
                    return Err(Error::from_code(ErrorCode::XUTY0008, format!("{} node cannot have children", rec.kind)));
                }
                let first_child = p + rec.attr_size as usize;
                let end = p + rec.size as usize;
                let ok = if attr {
                    rec.kind == NodeKind::Element && p < pre && pre <= first_child
                } else {
                    first_child <= pre && pre <= end && (pre == end || self.parent(pre) == Some(p))
                };
                if !ok {
                    return Err(Error::invalid_position(pre, len));
                }
            }
            None => {
                if attr || pre < len && self.records[pre].dist != 0 {
                    return Err(Error::invalid_position(pre, len));
                }
            }
        }
        Ok(())
    }

    /// Copies the records of `fragment` into this table's pools, computing
    /// parent distances for the fragment roots placed at `at`.
    fn import(&mut self, fragment: &NodeTable, at: usize, parent: Option<usize>) -> Result<Vec<NodeRecord>> {
        let mut out = Vec::with_capacity(fragment.len());
        for (i, rec) in fragment.records.iter().enumerate() {
            if rec.kind == NodeKind::Document {
                return Err(Error::from_code(ErrorCode::XUTY0008, "document nodes cannot be inserted"));
            }
            let dist = if rec.dist == 0 { parent.map_or(0, |p| (at + i - p) as u32) } else { rec.dist };
            out.push(self.copy_record(fragment, i, dist));
        }
        Ok(out)
    }

    /// Copies record `pre` of `source`, re-interning its names, uris and
    /// namespace bindings into this table's pools.
    fn copy_record(&mut self, source: &NodeTable, pre: usize, dist: u32) -> NodeRecord {
        let rec = &source.records[pre];
        let name = source.names.get(rec.name).map_or(0, |n| self.names.intern(n));
        let uri = source.uris.get(rec.uri).map_or(0, |u| self.uris.intern(u));
        let content = match &rec.content {
            Content::None => Content::None,
            Content::Inline(s) if s.len() <= self.options.inline_text => Content::Inline(s.clone()),
            _ => self.make_content(source.text(pre)),
        };
        let ns = rec.ns.as_deref().map(|decls| {
            let mapped: NsDecls = decls
                .iter()
                .map(|d| NsDecl {
                    prefix: source.names.get(d.prefix).map_or(0, |p| self.names.intern(p)),
                    uri: source.uris.get(d.uri).map_or(0, |u| self.uris.intern(u)),
                })
                .collect();
            Box::new(mapped)
        });
        NodeRecord { kind: rec.kind, dist, size: rec.size, attr_size: rec.attr_size, name, uri, content, ns }
    }

    /// Replaces `removed` records at `pre` with `new`, then rewrites the
    /// distances of the following nodes and the sizes of all ancestors.
    fn splice(&mut self, pre: usize, removed: usize, parent: Option<usize>, new: Vec<NodeRecord>) {
        let added = new.len();
        for rec in &self.records[pre..pre + removed] {
            if let Some(decls) = rec.ns.as_deref() {
                for d in decls {
                    self.namespaces.release(*d);
                }
            }
            if let Content::Stored { len, .. } = rec.content {
                self.texts.release(len);
            }
        }
        for rec in &new {
            if let Some(decls) = rec.ns.as_deref() {
                self.namespaces.register_all(decls.iter());
            }
        }
        self.records.splice(pre..pre + removed, new);
        self.shift_distances(pre, removed, added);
        self.resize_ancestors(parent, added as isize - removed as isize);
    }

    fn shift_distances(&mut self, pre: usize, removed: usize, added: usize) {
        if removed == added {
            return;
        }
        for j in pre + added..self.records.len() {
            let old = j + removed - added;
            let rec = &mut self.records[j];
            if rec.dist == 0 {
                continue;
            }
            if old - (rec.dist as usize) < pre {
                rec.dist = (rec.dist as usize + added - removed) as u32;
            }
        }
    }

    fn resize_ancestors(&mut self, mut parent: Option<usize>, delta: isize) {
        if delta == 0 {
            return;
        }
        while let Some(p) = parent {
            let rec = &mut self.records[p];
            rec.size = (rec.size as isize + delta) as u32;
            parent = match rec.dist {
                0 => None,
                d => Some(p - d as usize),
            };
        }
    }

    fn checked_parent(&self, pre: usize) -> Option<usize> {
        match self.records[pre].dist {
            0 => None,
            d => pre.checked_sub(d as usize),
        }
    }

    /// Verifies every structural invariant of the table and reports the first
    /// violation.
    pub fn check(&self) -> Result<()> {
        let len = self.len();
        let fail = |pre: usize, what: &str| Err(Error::from_code(ErrorCode::XDB0001, format!("node {pre}: {what}")));
        let mut root = 0;
        while root < len {
            if self.records[root].dist != 0 {
                return fail(root, "top-level node has a parent distance");
            }
            if root > 0 && self.records[0].kind == NodeKind::Document {
                return fail(root, "document table has a second root");
            }
            root += (self.records[root].size as usize).max(1);
        }
        for pre in 0..len {
            let rec = &self.records[pre];
            let size = rec.size as usize;
            if size == 0 || pre + size > len {
                return fail(pre, "subtree exceeds the table");
            }
            if rec.kind.is_leaf() {
                if size != 1 {
                    return fail(pre, "leaf node owns descendants");
                }
            } else if rec.kind == NodeKind::Document && pre != 0 {
                return fail(pre, "document node below the root");
            }
            if let Some(p) = self.checked_parent(pre) {
                let par = &self.records[p];
                if par.kind.is_leaf() || p + par.size as usize <= pre {
                    return fail(pre, "parent does not contain node");
                }
                if rec.kind == NodeKind::Attribute && pre >= p + par.attr_size as usize {
                    return fail(pre, "attribute outside the attribute range of its element");
                }
            } else if rec.dist != 0 {
                return fail(pre, "parent distance points before the table");
            }
            if rec.kind.is_leaf() {
                continue;
            }
            let asize = rec.attr_size as usize;
            if asize == 0 || asize > size {
                return fail(pre, "invalid attribute count");
            }
            for a in pre + 1..pre + asize {
                if self.records[a].kind != NodeKind::Attribute || self.checked_parent(a) != Some(pre) {
                    return fail(a, "expected an attribute of the preceding element");
                }
            }
            let mut child = pre + asize;
            while child < pre + size {
                let c = &self.records[child];
                if c.kind == NodeKind::Attribute || self.checked_parent(child) != Some(pre) {
                    return fail(child, "child does not point to its parent");
                }
                child += (c.size as usize).max(1);
            }
            if child != pre + size {
                return fail(pre, "size differs from the sum of its children");
            }
        }
        Ok(())
    }
}

/// Iterator over the children (or roots) of a node, in document order.
pub struct Children<'a> {
    table: &'a NodeTable,
    next: usize,
    end: usize,
}

impl Iterator for Children<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next >= self.end {
            return None;
        }
        let pre = self.next;
        self.next += self.table.size(pre).max(1);
        Some(pre)
    }
}
