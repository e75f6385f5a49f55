//! Generator lookup by name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{FlatGenerator, Generator, GeneratorContext, NormalGenerator};
use crate::error::{WorldGenError, WorldGenResult};

/// Builds a generator from its context, validating the options.
pub type GeneratorFactory =
    Arc<dyn Fn(GeneratorContext) -> WorldGenResult<Arc<dyn Generator>> + Send + Sync>;

/// Wraps a generator constructor as a [`GeneratorFactory`].
pub fn factory<G, F>(build: F) -> GeneratorFactory
where
    G: Generator + 'static,
    F: Fn(GeneratorContext) -> WorldGenResult<G> + Send + Sync + 'static,
{
    Arc::new(
        move |context: GeneratorContext| -> WorldGenResult<Arc<dyn Generator>> {
            Ok(Arc::new(build(context)?))
        },
    )
}

/// Name to factory table. Names are case-insensitive.
#[derive(Clone, Default)]
pub struct GeneratorManager {
    factories: HashMap<String, GeneratorFactory>,
}

impl GeneratorManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager with `flat`, `normal` and its alias `default`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let normal = factory(NormalGenerator::new);

        let mut manager = Self::new();
        manager.insert(FlatGenerator::NAME, factory(FlatGenerator::new));
        manager.insert(NormalGenerator::NAME, Arc::clone(&normal));
        manager.insert("default", normal);
        manager
    }

    fn insert(&mut self, name: &str, factory: GeneratorFactory) {
        self.factories.insert(name.to_lowercase(), factory);
    }

    /// Registers a factory under `name`.
    ///
    /// # Errors
    ///
    /// `GeneratorAlreadyRegistered` if the name is taken and `overwrite` is false.
    pub fn register(
        &mut self,
        name: &str,
        factory: GeneratorFactory,
        overwrite: bool,
    ) -> WorldGenResult<()> {
        let key = name.to_lowercase();
        if !overwrite && self.factories.contains_key(&key) {
            return Err(WorldGenError::GeneratorAlreadyRegistered(key));
        }
        debug!(generator = %key, overwrite, "registered generator");
        self.factories.insert(key, factory);
        Ok(())
    }

    /// Whether a generator is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_lowercase())
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Builds the generator registered under `name`.
    ///
    /// # Errors
    ///
    /// `UnknownGenerator` if nothing is registered under `name`, or whatever
    /// the factory reports (usually `InvalidGeneratorOptions`).
    pub fn create(
        &self,
        name: &str,
        context: GeneratorContext,
    ) -> WorldGenResult<Arc<dyn Generator>> {
        let factory = self
            .factories
            .get(&name.to_lowercase())
            .ok_or_else(|| WorldGenError::UnknownGenerator(name.to_owned()))?;
        factory(context)
    }
}

impl fmt::Debug for GeneratorManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorManager")
            .field("generators", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeRegistry;
    use crate::generator::GeneratorOptions;
    use crate::seed::WorldSeed;

    fn context() -> GeneratorContext {
        GeneratorContext::new(
            WorldSeed::new(5),
            GeneratorOptions::new(),
            Arc::new(BiomeRegistry::with_builtin()),
        )
    }

    #[test]
    fn test_defaults() {
        let manager = GeneratorManager::with_defaults();
        assert_eq!(manager.names(), ["default", "flat", "normal"]);

        assert_eq!(manager.create("flat", context()).unwrap().name(), "flat");
        assert_eq!(manager.create("NORMAL", context()).unwrap().name(), "normal");
        assert_eq!(manager.create("Default", context()).unwrap().name(), "normal");
    }

    #[test]
    fn test_unknown_generator() {
        let manager = GeneratorManager::with_defaults();
        assert!(matches!(
            manager.create("amplified", context()),
            Err(WorldGenError::UnknownGenerator(name)) if name == "amplified"
        ));
    }

    #[test]
    fn test_register_respects_overwrite() {
        let mut manager = GeneratorManager::with_defaults();
        let flat = factory(FlatGenerator::new);

        assert_eq!(
            manager.register("Normal", Arc::clone(&flat), false),
            Err(WorldGenError::GeneratorAlreadyRegistered("normal".to_owned()))
        );
        manager.register("normal", Arc::clone(&flat), true).unwrap();
        assert_eq!(manager.create("normal", context()).unwrap().name(), "flat");

        manager.register("void", flat, false).unwrap();
        assert!(manager.contains("VOID"));
    }

    #[test]
    fn test_invalid_options_surface_from_create() {
        let manager = GeneratorManager::with_defaults();
        let mut context = context();
        context.options = GeneratorOptions::new().with("preset", "2;;1;");

        assert!(matches!(
            manager.create("flat", context),
            Err(WorldGenError::InvalidGeneratorOptions(_))
        ));
    }
}
