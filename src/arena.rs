//! Slot arena backing the index-based engines.
//!
//! Nodes live in a growable vector and refer to each other by `usize` id, so
//! child and parent edges are plain indices instead of owning pointers.
//! Removed slots are recycled through an intrusive free list. Accessing a
//! vacant slot is a logic fault in the caller and panics.

use std::ops::{Index, IndexMut};

enum Slot<T> {
    Occupied(T),
    Vacant { next: Option<usize> },
}

pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<usize>,
    live: usize,
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            live: 0,
        }
    }

    /// Store a value and return its id, reusing a vacant slot if one exists.
    pub(crate) fn insert(&mut self, value: T) -> usize {
        self.live += 1;
        match self.free_head {
            Some(id) => {
                let next = match &self.slots[id] {
                    Slot::Vacant { next } => *next,
                    Slot::Occupied(_) => panic!("free list points at an occupied slot"),
                };
                self.free_head = next;
                self.slots[id] = Slot::Occupied(value);
                id
            }
            None => {
                self.slots.push(Slot::Occupied(value));
                self.slots.len() - 1
            }
        }
    }

    /// Take the value out of a slot and put the slot on the free list.
    pub(crate) fn remove(&mut self, id: usize) -> T {
        let slot = std::mem::replace(
            &mut self.slots[id],
            Slot::Vacant {
                next: self.free_head,
            },
        );
        match slot {
            Slot::Occupied(value) => {
                self.free_head = Some(id);
                self.live -= 1;
                value
            }
            Slot::Vacant { .. } => panic!("removed a vacant arena slot"),
        }
    }

    /// Number of live (occupied) slots.
    pub(crate) fn len(&self) -> usize {
        self.live
    }
}

impl<T> Index<usize> for Arena<T> {
    type Output = T;

    fn index(&self, id: usize) -> &T {
        match &self.slots[id] {
            Slot::Occupied(value) => value,
            Slot::Vacant { .. } => panic!("accessed a vacant arena slot"),
        }
    }
}

impl<T> IndexMut<usize> for Arena<T> {
    fn index_mut(&mut self, id: usize) -> &mut T {
        match &mut self.slots[id] {
            Slot::Occupied(value) => value,
            Slot::Vacant { .. } => panic!("accessed a vacant arena slot"),
        }
    }
}
