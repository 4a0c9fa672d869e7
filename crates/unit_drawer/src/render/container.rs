//! Model render containers
//!
//! Draw-ready set of units for one model type and one pass family (opaque or
//! alpha). Units are grouped by texture type so a pass binds each texture set
//! once and then draws every unit that uses it.

use std::collections::BTreeMap;

use crate::scene::UnitId;

/// Units of one model type, batched by texture type
#[derive(Debug, Clone, Default)]
pub struct ModelRenderContainer {
    /// Texture type to units using it, in stable texture order
    batches: BTreeMap<u32, Vec<UnitId>>,
    /// Total unit count
    len: usize,
}

impl ModelRenderContainer {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit under `texture_type`; returns false if it was already present
    pub fn add(&mut self, unit: UnitId, texture_type: u32) -> bool {
        let batch = self.batches.entry(texture_type).or_default();
        if batch.contains(&unit) {
            return false;
        }
        batch.push(unit);
        self.len += 1;
        true
    }

    /// Remove a unit; returns false if it was not present
    pub fn remove(&mut self, unit: UnitId, texture_type: u32) -> bool {
        let Some(batch) = self.batches.get_mut(&texture_type) else {
            return false;
        };
        let Some(index) = batch.iter().position(|u| *u == unit) else {
            return false;
        };
        batch.swap_remove(index);
        if batch.is_empty() {
            self.batches.remove(&texture_type);
        }
        self.len -= 1;
        true
    }

    /// True if `unit` is in the container
    pub fn contains(&self, unit: UnitId) -> bool {
        self.batches.values().any(|batch| batch.contains(&unit))
    }

    /// Number of units
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Batches in texture order
    pub fn batches(&self) -> impl Iterator<Item = (u32, &[UnitId])> {
        self.batches.iter().map(|(texture, units)| (*texture, units.as_slice()))
    }

    /// All units, batch by batch
    pub fn units(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.batches.values().flatten().copied()
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.batches.clear();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_batch_by_texture() {
        let mut container = ModelRenderContainer::new();
        container.add(UnitId(1), 7);
        container.add(UnitId(2), 3);
        container.add(UnitId(3), 7);

        let batches: Vec<_> = container.batches().map(|(t, u)| (t, u.len())).collect();
        assert_eq!(batches, vec![(3, 1), (7, 2)]);
        assert_eq!(container.len(), 3);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut container = ModelRenderContainer::new();
        assert!(container.add(UnitId(1), 0));
        assert!(!container.add(UnitId(1), 0));
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_remove_drops_empty_batches() {
        let mut container = ModelRenderContainer::new();
        container.add(UnitId(1), 4);
        assert!(container.remove(UnitId(1), 4));
        assert!(!container.remove(UnitId(1), 4));
        assert!(container.is_empty());
        assert_eq!(container.batches().count(), 0);
        assert!(!container.contains(UnitId(1)));
    }
}
