use core::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a node stored in a [`NodeTable`](crate::data::NodeTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    Attribute,
    Comment,
    ProcessingInstruction,
}

impl NodeKind {
    /// Leaf kinds never own descendants.
    #[inline]
    pub fn is_leaf(self) -> bool {
        !matches!(self, NodeKind::Document | NodeKind::Element)
    }

    /// Kinds that carry a name reference.
    #[inline]
    pub fn is_named(self) -> bool {
        matches!(
            self,
            NodeKind::Element | NodeKind::Attribute | NodeKind::ProcessingInstruction
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Document => "document-node",
            NodeKind::Element => "element",
            NodeKind::Text => "text",
            NodeKind::Attribute => "attribute",
            NodeKind::Comment => "comment",
            NodeKind::ProcessingInstruction => "processing-instruction",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
