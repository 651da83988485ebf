//! Generational arena for class instances.
//!
//! The heap is part of the persisted state of a suspended script: it
//! serializes with the execution stacks that hold handles into it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Variable;

/// Handle to a heap-allocated instance.
///
/// The generational index detects handles that outlived their object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectHandle {
    /// Index into ObjectHeap.slots
    pub index: u32,
    /// Generation for use-after-free detection
    pub generation: u32,
}

impl ObjectHandle {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// An instance of a script class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    class: String,
    /// Member variables, inherited members first.
    fields: Vec<Variable>,
}

impl Instance {
    pub fn new(class: impl Into<String>, fields: Vec<Variable>) -> Self {
        Self {
            class: class.into(),
            fields,
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn fields(&self) -> &[Variable] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Variable> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.fields.iter_mut().find(|f| f.name() == name)
    }
}

/// Heap storage for instances with generational indices.
///
/// When an instance is freed its slot is reused with the generation
/// incremented, so stale handles are rejected instead of aliasing.
#[derive(Default, Clone, Serialize, Deserialize)]
pub struct ObjectHeap {
    slots: Vec<HeapSlot>,
    free_list: Vec<u32>,
}

#[derive(Clone, Serialize, Deserialize)]
struct HeapSlot {
    generation: u32,
    value: Option<Instance>,
}

impl ObjectHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new instance on the heap.
    pub fn allocate(&mut self, instance: Instance) -> ObjectHandle {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(instance);
            ObjectHandle::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(HeapSlot {
                generation: 0,
                value: Some(instance),
            });
            ObjectHandle::new(index, 0)
        }
    }

    /// Returns None if the handle is stale.
    pub fn get(&self, handle: ObjectHandle) -> Option<&Instance> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Returns None if the handle is stale.
    pub fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut Instance> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Free an instance immediately.
    ///
    /// Returns false when the handle was already stale.
    pub fn free(&mut self, handle: ObjectHandle) -> bool {
        if let Some(slot) = self.slots.get_mut(handle.index as usize)
            && slot.generation == handle.generation
            && slot.value.is_some()
        {
            slot.value = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free_list.push(handle.index);
            return true;
        }
        false
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ObjectHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHeap")
            .field("slot_count", &self.slots.len())
            .field("free_count", &self.free_list.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DataType;

    fn robot() -> Instance {
        Instance::new("Robot", vec![Variable::new("energy", DataType::int())])
    }

    #[test]
    fn allocate_and_get() {
        let mut heap = ObjectHeap::new();
        let handle = heap.allocate(robot());
        assert_eq!(heap.get(handle).map(Instance::class), Some("Robot"));
        assert!(heap.get(handle).and_then(|i| i.field("energy")).is_some());
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn freed_handle_is_stale() {
        let mut heap = ObjectHeap::new();
        let old = heap.allocate(robot());
        assert!(heap.free(old));
        assert!(!heap.free(old));

        let new = heap.allocate(robot());
        assert_eq!(new.index, old.index);
        assert_ne!(new.generation, old.generation);
        assert!(heap.get(old).is_none());
        assert!(heap.get(new).is_some());
    }

    #[test]
    fn heap_survives_serialization() {
        let mut heap = ObjectHeap::new();
        let handle = heap.allocate(robot());
        let json = serde_json::to_string(&heap).unwrap();
        let back: ObjectHeap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(handle), heap.get(handle));
    }
}
