//! In-memory storage: the node table and the pools it references.

pub mod names;
pub mod namespaces;
pub mod table;
pub mod texts;

pub use names::NamePool;
pub use namespaces::{NamespacePool, NsDecl, NsDecls};
pub use table::{Children, Content, NodeRecord, NodeTable};
pub use texts::TextStore;
