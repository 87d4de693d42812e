use smallvec::SmallVec;
use string_cache::DefaultAtom;

use crate::xdm::Sequence;

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: DefaultAtom,
    pub value: Sequence,
}

/// Ordered stack of variable bindings of one running query.
///
/// Iterators capture a [`mark`](VarStack::mark) before binding and
/// [`restore`](VarStack::restore) it when they reset; restored bindings are
/// removed, not hidden. Looking up a slot above the current size after a
/// restore is a caller error.
#[derive(Debug, Clone, Default)]
pub struct VarStack {
    slots: SmallVec<[Binding; 16]>,
}

impl VarStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` and returns its slot.
    pub fn push(&mut self, name: DefaultAtom, value: Sequence) -> usize {
        self.slots.push(Binding { name, value });
        self.slots.len() - 1
    }

    pub fn mark(&self) -> usize {
        self.slots.len()
    }

    pub fn restore(&mut self, mark: usize) {
        self.slots.truncate(mark);
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Overwrites the value of an existing slot.
    pub fn set(&mut self, slot: usize, value: Sequence) {
        self.slots[slot].value = value;
    }

    pub fn get(&self, slot: usize) -> &Sequence {
        &self.slots[slot].value
    }

    /// Innermost binding of `name`.
    pub fn lookup(&self, name: &DefaultAtom) -> Option<&Sequence> {
        self.slots.iter().rev().find(|b| &b.name == name).map(|b| &b.value)
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.slots
    }

    /// Moves every binding above `mark` into `parked`. An iterator that pulls
    /// from a nested source parks the source's bindings after each pull so
    /// they stay invisible to its own scope.
    pub fn park(&mut self, mark: usize, parked: &mut Parked) {
        if mark < self.slots.len() {
            parked.extend(self.slots.drain(mark..));
        }
    }

    /// Puts parked bindings back on top of the stack, at the slots they were
    /// taken from.
    pub fn unpark(&mut self, parked: &mut Parked) {
        self.slots.extend(parked.drain(..));
    }
}

/// Bindings of a suspended nested iterator.
pub type Parked = SmallVec<[Binding; 4]>;
