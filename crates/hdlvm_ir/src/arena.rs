//! Dense, id-indexed storage.
//!
//! Signals and processes are allocated once while a design is built and are
//! never removed during a run, so an append-only vector keyed by a `u32`
//! newtype gives stable ids and O(1) lookup.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Trait for opaque ID types used as arena keys.
pub trait ArenaId: Copy {
    /// Creates an ID from a raw `u32` index.
    fn from_raw(index: u32) -> Self;

    /// Returns the raw `u32` index.
    fn as_raw(self) -> u32;
}

/// An append-only container addressed by `I`.
#[derive(Debug, Clone)]
pub struct Arena<I: ArenaId, T> {
    items: Vec<T>,
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Appends an item and returns its ID.
    pub fn alloc(&mut self, item: T) -> I {
        let id = I::from_raw(self.items.len() as u32);
        self.items.push(item);
        id
    }

    /// Returns the item with the given ID, if it was allocated here.
    pub fn get(&self, id: I) -> Option<&T> {
        self.items.get(id.as_raw() as usize)
    }

    /// Returns the item with the given ID mutably, if it was allocated here.
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.items.get_mut(id.as_raw() as usize)
    }

    /// Returns the number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over all allocated IDs in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = I> {
        (0..self.items.len() as u32).map(I::from_raw)
    }

    /// Iterates over `(ID, &T)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (I::from_raw(i as u32), item))
    }

    /// Returns the first ID whose item satisfies `pred`.
    pub fn position(&self, mut pred: impl FnMut(&T) -> bool) -> Option<I> {
        self.items
            .iter()
            .position(|item| pred(item))
            .map(|i| I::from_raw(i as u32))
    }
}

/// # Panics
///
/// Panics if the ID was not allocated by this arena.
impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        &self.items[id.as_raw() as usize]
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        &mut self.items[id.as_raw() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SignalId;

    #[test]
    fn alloc_and_index() {
        let mut arena: Arena<SignalId, &str> = Arena::new();
        let clk = arena.alloc("clk");
        let q = arena.alloc("q");
        assert_eq!(arena[clk], "clk");
        assert_eq!(arena[q], "q");
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn get_out_of_range_is_none() {
        let arena: Arena<SignalId, u32> = Arena::new();
        assert!(arena.is_empty());
        assert!(arena.get(SignalId::from_raw(0)).is_none());
    }

    #[test]
    fn index_mut_modifies() {
        let mut arena: Arena<SignalId, u32> = Arena::new();
        let id = arena.alloc(1);
        arena[id] += 1;
        assert_eq!(arena.get(id), Some(&2));
    }

    #[test]
    fn ids_are_sequential() {
        let mut arena: Arena<SignalId, char> = Arena::new();
        arena.alloc('a');
        arena.alloc('b');
        let ids: Vec<u32> = arena.ids().map(|id| id.as_raw()).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn position_finds_first_match() {
        let mut arena: Arena<SignalId, &str> = Arena::new();
        arena.alloc("a");
        let b = arena.alloc("b");
        assert_eq!(arena.position(|s| *s == "b"), Some(b));
        assert_eq!(arena.position(|s| *s == "z"), None);
    }
}
