//! # Entities
//!
//! World objects that are not terrain. They live on the tick worker; other threads
//! mutate them only by sending [`EntityCommand`]s, which the tick worker applies at the
//! start of a tick. The render thread sees them as an [`EntityBatchList`].
//!
//! ## Key Components
//! - `EntityManager`: entity storage and batch meshing
//! - `TickRegistry`: named callbacks run once per world tick
//! - `recording`: recorded games and their playback tick

use std::sync::Arc;

use cgmath::Point3;

use super::{
    rendering::{mesher, vertex::Vertex},
    voxels::block::block_type::BlockType,
};

pub mod recording;
pub mod tick_registry;

pub use tick_registry::{TickFunction, TickInfo, TickRegistry};

/// Edge length of the cube drawn for an entity.
pub const ENTITY_SIZE: f32 = 0.8;

pub type EntityId = usize;

/// Ordered vertex batches of every active entity.
pub type EntityBatchList = Vec<Arc<[Vertex]>>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Entity {
    pub position: Point3<f32>,
    pub block_type: BlockType,
}

/// Requests sent to the tick worker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EntityCommand {
    Spawn {
        position: Point3<f32>,
        block_type: BlockType,
    },
    Move {
        id: EntityId,
        position: Point3<f32>,
    },
    Remove(EntityId),
    Clear,
}

/// Storage for every entity of the running level.
#[derive(Default)]
pub struct EntityManager {
    slots: Vec<Option<Entity>>,
    free: Vec<EntityId>,
    changed: bool,
}

impl EntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity and returns its id. Ids of removed entities are reused.
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        self.changed = true;
        match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(entity);
                id
            }
            None => {
                self.slots.push(Some(entity));
                self.slots.len() - 1
            }
        }
    }

    /// Places `entity` under a fixed id, replacing whatever was there.
    pub fn insert(&mut self, id: EntityId, entity: Entity) {
        if id >= self.slots.len() {
            let old_len = self.slots.len();
            self.slots.resize(id + 1, None);
            self.free.extend(old_len..id);
        }
        self.free.retain(|free| *free != id);
        self.slots[id] = Some(entity);
        self.changed = true;
    }

    pub fn move_to(&mut self, id: EntityId, position: Point3<f32>) -> bool {
        match self.slots.get_mut(id).and_then(Option::as_mut) {
            Some(entity) => {
                entity.position = position;
                self.changed = true;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let removed = self.slots.get_mut(id).and_then(Option::take);
        if removed.is_some() {
            self.free.push(id);
            self.changed = true;
        }
        removed
    }

    pub fn clear(&mut self) {
        if !self.is_empty() {
            self.changed = true;
        }
        self.slots.clear();
        self.free.clear();
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    /// Number of active entities.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn apply(&mut self, command: EntityCommand) {
        match command {
            EntityCommand::Spawn {
                position,
                block_type,
            } => {
                self.spawn(Entity {
                    position,
                    block_type,
                });
            }
            EntityCommand::Move { id, position } => {
                self.move_to(id, position);
            }
            EntityCommand::Remove(id) => {
                self.remove(id);
            }
            EntityCommand::Clear => self.clear(),
        }
    }

    /// Whether anything changed since the last call, resetting the flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    /// Meshes the active entities in id order, `per_batch` entities per batch.
    pub fn batches(&self, per_batch: usize) -> EntityBatchList {
        let active: Vec<&Entity> = self.slots.iter().flatten().collect();
        active
            .chunks(per_batch.max(1))
            .map(|group| {
                let vertices: Vec<Vertex> = group
                    .iter()
                    .flat_map(|entity| mesher::cube(entity.position, ENTITY_SIZE, entity.block_type))
                    .collect();
                let batch: Arc<[Vertex]> = Arc::from(vertices);
                batch
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(x: f32) -> Entity {
        Entity {
            position: Point3::new(x, 0.0, 0.0),
            block_type: BlockType::WHITE,
        }
    }

    #[test]
    fn test_removed_ids_are_reused() {
        let mut entities = EntityManager::new();
        let a = entities.spawn(entity(0.0));
        let b = entities.spawn(entity(1.0));
        assert_eq!(entities.remove(a), Some(entity(0.0)));
        assert_eq!(entities.spawn(entity(2.0)), a);
        assert_eq!(entities.get(b), Some(&entity(1.0)));
        assert_eq!(entities.len(), 2);
    }

    #[test]
    fn test_batches_split_by_size() {
        let mut entities = EntityManager::new();
        for i in 0..5 {
            entities.spawn(entity(i as f32));
        }
        let batches = entities.batches(2);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 2 * 36);
        assert_eq!(batches[2].len(), 36);
    }

    #[test]
    fn test_change_flag_tracks_mutations() {
        let mut entities = EntityManager::new();
        assert!(!entities.take_changed());
        entities.apply(EntityCommand::Spawn {
            position: Point3::new(0.0, 0.0, 0.0),
            block_type: BlockType::DIRT,
        });
        assert!(entities.take_changed());
        assert!(!entities.take_changed());
        assert!(!entities.move_to(42, Point3::new(1.0, 1.0, 1.0)));
        assert!(!entities.take_changed());
    }

    #[test]
    fn test_insert_under_fixed_id() {
        let mut entities = EntityManager::new();
        entities.insert(3, entity(3.0));
        assert_eq!(entities.len(), 1);
        assert!(entities.spawn(entity(9.0)) < 3);
    }
}
