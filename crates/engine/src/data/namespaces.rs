//! Namespace declarations and the reference-counted pool shared by a table.

use std::collections::HashMap;

use smallvec::SmallVec;

/// One `xmlns[:prefix]="uri"` declaration; ids point into the owning table's
/// name pool (prefix) and uri pool (uri). The empty prefix is id `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NsDecl {
    pub prefix: u32,
    pub uri: u32,
}

pub type NsDecls = SmallVec<[NsDecl; 2]>;

/// Counts how many element records currently declare each binding.
///
/// Inserted subtrees register their declarations, deleted subtrees release
/// them. A binding that drops to zero references disappears from the pool;
/// the interned uri itself stays valid, so no record ever refers to a
/// vanished id.
#[derive(Debug, Clone, Default)]
pub struct NamespacePool {
    refs: HashMap<NsDecl, usize>,
}

impl NamespacePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, decl: NsDecl) {
        *self.refs.entry(decl).or_insert(0) += 1;
    }

    pub fn register_all<'a>(&mut self, decls: impl IntoIterator<Item = &'a NsDecl>) {
        for d in decls {
            self.register(*d);
        }
    }

    /// Releases one reference; returns `false` if the binding was not known.
    pub fn release(&mut self, decl: NsDecl) -> bool {
        match self.refs.get_mut(&decl) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.refs.remove(&decl);
                true
            }
            None => false,
        }
    }

    pub fn references(&self, decl: NsDecl) -> usize {
        self.refs.get(&decl).copied().unwrap_or(0)
    }

    /// Number of distinct live bindings.
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_drops_binding_at_zero() {
        let mut pool = NamespacePool::new();
        let d = NsDecl { prefix: 1, uri: 2 };
        pool.register(d);
        pool.register(d);
        assert_eq!(pool.references(d), 2);
        assert!(pool.release(d));
        assert!(pool.release(d));
        assert!(pool.is_empty());
        assert!(!pool.release(d));
    }
}
