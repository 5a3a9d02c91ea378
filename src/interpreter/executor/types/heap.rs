//! Managed heap
//!
//! Objects live in an arena and are reachable only through slots. Handles carry
//! the generation of the entry they were issued for, so a handle that outlives
//! a collection is detected instead of aliasing a reused entry.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::values::Slot;

/// Generation-tagged object handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjRef {
    index: u32,
    generation: u32,
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// A type tag plus a fixed-length sequence of fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub ty: String,
    pub fields: Vec<Slot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    generation: u32,
    object: Option<Object>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Heap {
    entries: Vec<Entry>,
    free: Vec<u32>,
    allocated_since_collect: usize,
}

impl Heap {
    pub fn alloc(&mut self, object: Object) -> ObjRef {
        self.allocated_since_collect += 1;

        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.object = Some(object);
            return ObjRef {
                index,
                generation: entry.generation,
            };
        }

        let index = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 0,
            object: Some(object),
        });
        ObjRef {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, r: ObjRef) -> Option<&Object> {
        self.entries
            .get(r.index as usize)
            .filter(|e| e.generation == r.generation)
            .and_then(|e| e.object.as_ref())
    }

    pub fn get_mut(&mut self, r: ObjRef) -> Option<&mut Object> {
        self.entries
            .get_mut(r.index as usize)
            .filter(|e| e.generation == r.generation)
            .and_then(|e| e.object.as_mut())
    }

    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|e| e.object.is_some()).count()
    }

    pub fn allocated_since_collect(&self) -> usize {
        self.allocated_since_collect
    }

    /// Mark everything reachable from `roots`, free the rest
    ///
    /// Returns the number of objects freed.
    pub fn collect<'a>(&mut self, roots: impl IntoIterator<Item = &'a Slot>) -> usize {
        let mut marked = vec![false; self.entries.len()];
        let mut work: Vec<ObjRef> = roots.into_iter().filter_map(Slot::as_object).collect();

        while let Some(r) = work.pop() {
            let index = r.index as usize;
            if marked.get(index).copied().unwrap_or(true) {
                continue;
            }
            if let Some(object) = self.get(r) {
                marked[index] = true;
                work.extend(object.fields.iter().filter_map(Slot::as_object));
            }
        }

        let mut freed = 0;
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if entry.object.is_some() && !marked[index] {
                entry.object = None;
                entry.generation = entry.generation.wrapping_add(1);
                self.free.push(index as u32);
                freed += 1;
            }
        }

        self.allocated_since_collect = 0;
        freed
    }
}
