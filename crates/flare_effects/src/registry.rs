//! Effect registry.
//!
//! Maps registered names to factories. Several names may share one
//! factory (`line_clear` and `tetris` build the same recipe).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use flare_core::{EffectId, FlareError, FlareResult, SharedRng};

use crate::config::{EffectParams, EffectSettings};
use crate::effect::VisualEffect;

/// Everything a factory needs to build one effect instance.
#[derive(Debug, Clone)]
pub struct EffectSpawn {
    /// Fresh instance id.
    pub id: EffectId,
    /// Name the effect was played under.
    pub name: String,
    /// Resolved settings.
    pub settings: EffectSettings,
    /// Game parameters.
    pub params: EffectParams,
    /// Seeded generator for template samplers.
    pub rng: SharedRng,
}

/// Builds an effect from a spawn request.
pub type EffectFactory = Arc<dyn Fn(EffectSpawn) -> FlareResult<Box<dyn VisualEffect>> + Send + Sync>;

/// Wraps an infallible constructor as a factory.
pub fn factory<E, F>(build: F) -> EffectFactory
where
    E: VisualEffect + 'static,
    F: Fn(EffectSpawn) -> E + Send + Sync + 'static,
{
    Arc::new(move |spawn: EffectSpawn| Ok(Box::new(build(spawn)) as Box<dyn VisualEffect>))
}

/// Name -> factory table.
#[derive(Default)]
pub struct EffectRegistry {
    factories: HashMap<String, EffectFactory>,
}

impl EffectRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in recipes.
    ///
    /// # Errors
    ///
    /// Never in practice; built-in names are non-empty.
    pub fn with_builtin() -> FlareResult<Self> {
        let mut registry = Self::new();
        crate::recipes::register_builtin(&mut registry)?;
        Ok(registry)
    }

    /// Registers (or replaces) a factory.
    ///
    /// # Errors
    ///
    /// Returns [`FlareError::EmptyEffectName`] for an empty name.
    pub fn register(&mut self, name: &str, factory: EffectFactory) -> FlareResult<()> {
        if name.is_empty() {
            return Err(FlareError::EmptyEffectName);
        }
        if self.factories.insert(name.to_owned(), factory).is_some() {
            tracing::debug!("Effect '{}' re-registered", name);
        } else {
            tracing::info!("Registered effect '{}'", name);
        }
        Ok(())
    }

    /// Removes a name. Returns true if it was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.factories.remove(name).is_some()
    }

    /// Is `name` registered?
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Builds an effect.
    ///
    /// # Errors
    ///
    /// Returns [`FlareError::UnknownEffect`] for an unregistered name, or
    /// whatever the factory returns.
    pub fn create(&self, spawn: EffectSpawn) -> FlareResult<Box<dyn VisualEffect>> {
        let factory = self
            .factories
            .get(&spawn.name)
            .ok_or_else(|| FlareError::UnknownEffect(spawn.name.clone()))?;
        factory(spawn)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::BurstEffect;

    fn spawn(name: &str) -> EffectSpawn {
        EffectSpawn {
            id: EffectId(7),
            name: name.to_owned(),
            settings: EffectSettings::default(),
            params: EffectParams::default(),
            rng: SharedRng::seeded(1),
        }
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = EffectRegistry::new();
        let err = registry.register("", factory(BurstEffect::new)).unwrap_err();
        assert_eq!(err, FlareError::EmptyEffectName);
    }

    #[test]
    fn test_unknown_effect() {
        let registry = EffectRegistry::new();
        let err = registry.create(spawn("nope")).err().unwrap();
        assert_eq!(err, FlareError::UnknownEffect("nope".into()));
    }

    #[test]
    fn test_many_names_one_factory() {
        let registry = EffectRegistry::with_builtin().unwrap();
        assert!(registry.contains("line_clear"));
        assert!(registry.contains("tetris"));

        let effect = registry.create(spawn("tetris")).unwrap();
        assert_eq!(effect.name(), "tetris");
        assert_eq!(effect.id(), EffectId(7));
    }

    #[test]
    fn test_reregister_replaces() {
        let mut registry = EffectRegistry::new();
        registry.register("fx", factory(BurstEffect::new)).unwrap();
        registry.register("fx", factory(BurstEffect::new)).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.unregister("fx"));
        assert!(registry.is_empty());
    }
}
