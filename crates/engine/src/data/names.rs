use std::collections::HashMap;

use string_cache::DefaultAtom;

/// Interning table mapping names (or namespace URIs) to dense ids.
///
/// Id `0` is reserved for "no name"; interned strings start at `1`. The atoms
/// themselves come from the global `string_cache` interner, so equal names in
/// different tables share storage and compare in O(1).
#[derive(Debug, Clone)]
pub struct NamePool {
    atoms: Vec<DefaultAtom>,
    index: HashMap<DefaultAtom, u32>,
}

impl Default for NamePool {
    fn default() -> Self {
        Self { atoms: vec![DefaultAtom::from("")], index: HashMap::new() }
    }
}

impl NamePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `name`, interning it on first use.
    pub fn intern(&mut self, name: &str) -> u32 {
        let atom = DefaultAtom::from(name);
        if let Some(&id) = self.index.get(&atom) {
            return id;
        }
        let id = self.atoms.len() as u32;
        self.atoms.push(atom.clone());
        self.index.insert(atom, id);
        id
    }

    pub fn id(&self, name: &str) -> Option<u32> {
        self.index.get(&DefaultAtom::from(name)).copied()
    }

    pub fn get(&self, id: u32) -> Option<&str> {
        if id == 0 {
            return None;
        }
        self.atoms.get(id as usize).map(|a| a.as_ref())
    }

    pub fn atom(&self, id: u32) -> Option<&DefaultAtom> {
        if id == 0 { None } else { self.atoms.get(id as usize) }
    }

    /// Number of interned names (the reserved id is not counted).
    pub fn len(&self) -> usize {
        self.atoms.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_returns_same_id() {
        let mut pool = NamePool::new();
        let a1 = pool.intern("div");
        let a2 = pool.intern("div");
        assert_eq!(a1, a2);
        assert_eq!(pool.get(a1), Some("div"));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn reserved_id_has_no_name() {
        let mut pool = NamePool::new();
        pool.intern("a");
        assert_eq!(pool.get(0), None);
        assert_eq!(pool.id("b"), None);
        assert_eq!(pool.id("a"), Some(1));
    }
}
