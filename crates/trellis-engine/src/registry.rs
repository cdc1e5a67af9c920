//! Handle Registry
//!
//! Generational slot map that owns every engine object. Callers only ever
//! see [`Handle`]s; each destroy bumps the slot generation so stale handles
//! stop resolving, and a slot whose generation is exhausted is retired
//! instead of recycled.

use crate::{EngineError, EngineResult, Handle, ObjectKind};

/// Objects stored in a [`Registry`] report their kind for type-checked lookup
pub trait Kinded {
    fn kind(&self) -> ObjectKind;
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Generational registry
#[derive(Debug)]
pub struct Registry<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    live: usize,
    capacity: usize,
}

impl<T: Kinded> Registry<T> {
    /// Registry holding at most `capacity` live objects
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
            capacity: capacity.min(Handle::MAX_SLOTS as usize),
        }
    }

    /// Insert an object and issue its handle
    pub fn register(&mut self, value: T) -> EngineResult<Handle> {
        if self.live >= self.capacity {
            return Err(EngineError::RegistryFull { capacity: self.capacity });
        }

        let kind = value.kind();
        let handle = if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            Handle::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            if index >= Handle::MAX_SLOTS {
                return Err(EngineError::RegistryFull { capacity: self.capacity });
            }
            self.slots.push(Slot { generation: 0, value: Some(value) });
            Handle::new(index, 0)
        };

        self.live += 1;
        tracing::debug!("registered {} {:?}", kind, handle);
        Ok(handle)
    }

    /// Look up a live object of any kind
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.slot() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_ref())
    }

    fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.slot() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_mut())
    }

    /// Look up a live object and check its kind
    pub fn resolve(&self, handle: Handle, expected: ObjectKind) -> EngineResult<&T> {
        self.get(handle)
            .filter(|value| value.kind() == expected)
            .ok_or(EngineError::invalid(handle.raw(), Some(expected)))
    }

    /// Mutable variant of [`Registry::resolve`]
    pub fn resolve_mut(&mut self, handle: Handle, expected: ObjectKind) -> EngineResult<&mut T> {
        self.get_mut(handle)
            .filter(|value| value.kind() == expected)
            .ok_or(EngineError::invalid(handle.raw(), Some(expected)))
    }

    /// Kind of the live object behind `handle`
    pub fn kind_of(&self, handle: Handle) -> Option<ObjectKind> {
        self.get(handle).map(Kinded::kind)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Remove the binding and hand the object back
    pub fn destroy(&mut self, handle: Handle) -> EngineResult<T> {
        let slot = self
            .slots
            .get_mut(handle.slot() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .ok_or(EngineError::invalid(handle.raw(), None))?;
        let value = slot.value.take().ok_or(EngineError::invalid(handle.raw(), None))?;

        if slot.generation < Handle::MAX_GENERATION {
            slot.generation += 1;
            self.free_list.push(handle.slot());
        } else {
            tracing::debug!("retiring slot {}", handle.slot());
        }

        self.live -= 1;
        tracing::debug!("destroyed {} {:?}", value.kind(), handle);
        Ok(value)
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Maximum number of live objects
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Live objects in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (Handle::new(index as u32, slot.generation), value))
        })
    }
}
