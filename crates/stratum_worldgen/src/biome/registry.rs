//! # Biome Registry
//!
//! A fixed table of [`MAX_BIOMES`] slots, one per [`BiomeId`].
//!
//! Registration takes `&mut self` and happens while the registry is still
//! owned by the loader. Once shared behind an `Arc`, the only mutation left
//! is filling an empty slot with an "Unknown" fallback the first time
//! someone asks for it, which is an atomic `OnceLock::get_or_init`.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

use super::{builtin, Biome, BiomeDefinition, BiomeId};

/// Number of biome slots. Every `u8` id has one.
pub const MAX_BIOMES: usize = 256;

/// Biomes indexed by id.
pub struct BiomeRegistry {
    slots: Box<[OnceLock<Arc<Biome>>; MAX_BIOMES]>,
}

impl BiomeRegistry {
    /// Creates a registry with every slot empty.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Box::new(std::array::from_fn(|_| OnceLock::new())),
        }
    }

    /// Creates a registry holding the built-in biome set.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Binds `definition` to `id` and stores it, replacing whatever the slot held.
    ///
    /// Biomes handed out before an overwrite stay valid and keep their id.
    pub fn register(&mut self, id: BiomeId, definition: BiomeDefinition) -> Arc<Biome> {
        let biome = Arc::new(Biome::new(id, definition));

        for issue in biome.diagnostics() {
            warn!(%id, name = biome.name(), %issue, "biome breaks a convention");
        }

        let slot = &mut self.slots[id.index()];
        if let Some(previous) = slot.take() {
            debug!(%id, previous = previous.name(), name = biome.name(), "overwriting biome");
        } else {
            debug!(%id, name = biome.name(), "registered biome");
        }
        // The slot was just emptied through `&mut self`
        let _ = slot.set(Arc::clone(&biome));
        biome
    }

    /// Returns the biome for `id`.
    ///
    /// Never fails: an unregistered id gets its own "Unknown" biome, created
    /// on first access and returned on every later one.
    #[must_use]
    pub fn get(&self, id: BiomeId) -> Arc<Biome> {
        Arc::clone(self.slots[id.index()].get_or_init(|| {
            debug!(%id, "no biome registered, using fallback");
            Arc::new(Biome::unknown(id))
        }))
    }

    /// Returns the biome for `id` without creating a fallback.
    #[must_use]
    pub fn try_get(&self, id: BiomeId) -> Option<Arc<Biome>> {
        self.slots[id.index()].get().cloned()
    }

    /// Whether the slot for `id` holds a fallback.
    #[must_use]
    pub fn is_fallback(&self, id: BiomeId) -> bool {
        self.slots[id.index()]
            .get()
            .is_some_and(|biome| biome.is_fallback())
    }

    /// Non-empty slots, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Biome>> + '_ {
        self.slots.iter().filter_map(OnceLock::get)
    }
}

impl Default for BiomeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BiomeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|biome| (biome.id().value(), biome.name())))
            .finish()
    }
}
