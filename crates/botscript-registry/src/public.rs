//! The public function registry.
//!
//! Functions declared `public` are callable from every program loaded into
//! an engine. The registry only *refers* to them: the compiled program that
//! declared a function owns it, and unloading the program removes its
//! entries. Lookups never keep a function alive.

use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use botscript_core::FunctionId;

/// Non-owning directory of public functions, newest first.
#[derive(Debug)]
pub struct PublicRegistry<F> {
    /// Insertion sequence -> entry. Iterated in reverse, so the most recent
    /// insertion comes first.
    entries: BTreeMap<u64, (FunctionId, Weak<F>)>,
    /// Identity -> insertion sequence.
    index: FxHashMap<FunctionId, u64>,
    next_seq: u64,
}

impl<F> Default for PublicRegistry<F> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            index: FxHashMap::default(),
            next_seq: 0,
        }
    }
}

impl<F> PublicRegistry<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a function at the head of the registry.
    ///
    /// Re-inserting an identity moves it to the head.
    pub fn insert(&mut self, id: FunctionId, function: &Rc<F>) {
        self.remove(id);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(seq, (id, Rc::downgrade(function)));
        self.index.insert(id, seq);
    }

    /// Unlink a function, wherever it sits. Returns whether it was present.
    pub fn remove(&mut self, id: FunctionId) -> bool {
        match self.index.remove(&id) {
            Some(seq) => {
                self.entries.remove(&seq);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: FunctionId) -> bool {
        self.index.contains_key(&id)
    }

    /// Look a function up by identity.
    pub fn get(&self, id: FunctionId) -> Option<Rc<F>> {
        let seq = self.index.get(&id)?;
        self.entries.get(seq)?.1.upgrade()
    }

    /// Live functions, newest first.
    pub fn iter(&self) -> impl Iterator<Item = Rc<F>> + '_ {
        self.entries.values().rev().filter_map(|(_, f)| f.upgrade())
    }

    /// Registered identities, newest first.
    pub fn ids(&self) -> impl Iterator<Item = FunctionId> + '_ {
        self.entries.values().rev().map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
