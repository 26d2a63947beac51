use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// A thread-safe, reference-counted resource container with read-write locking.
///
/// `MtResource` provides synchronized access to a value of type `T` that can be shared
/// across threads. It uses an `Arc<RwLock<T>>` internally to manage concurrent access.
/// The engine uses it for small pieces of state that the render thread writes and the
/// workers read, such as the player pose.
///
/// # Type Parameters
/// - `T`: The type of the contained resource, must be `Send + Sync`
///
/// # Examples
///
/// ```
/// use voxel_frame_engine::core::MtResource;
///
/// let counter = MtResource::new(0);
/// *counter.get_mut() += 1;
/// assert_eq!(*counter.get(), 1);
///
/// // The render thread never blocks: it skips the update when a reader holds the lock.
/// if let Some(mut value) = counter.try_get_mut() {
///     *value += 1;
/// };
/// assert_eq!(*counter.get(), 2);
/// ```
///
/// # Performance Considerations
/// - Read operations (`get()`) can occur concurrently
/// - Write operations (`get_mut()`) are exclusive and will block other operations
/// - `try_get()` / `try_get_mut()` never block and are the only accessors used on the render thread
pub struct MtResource<T: Send + Sync> {
    pub resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync + 'static> MtResource<T> {
    /// Creates a new `MtResource` containing the given value.
    ///
    /// # Arguments
    /// * `resource` - The value to be stored in the resource
    ///
    /// # Returns
    /// A new `MtResource` containing the provided value
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read-only guard that allows reading the contained value.
    ///
    /// Blocks while a writer holds the lock.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read()
    }

    /// Returns a mutable guard that allows modifying the contained value.
    ///
    /// Blocks until every other guard is released.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write()
    }

    /// Attempts to take a read guard without blocking.
    ///
    /// # Returns
    /// `None` if a writer currently holds the lock
    pub fn try_get(&self) -> Option<RwLockReadGuard<'_, T>> {
        self.resource.try_read()
    }

    /// Attempts to take a write guard without blocking.
    ///
    /// # Returns
    /// `None` if any other guard is currently held
    pub fn try_get_mut(&self) -> Option<RwLockWriteGuard<'_, T>> {
        self.resource.try_write()
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
