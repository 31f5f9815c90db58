use std::collections::HashMap;

use crate::engine::{ClipEngine, FilterGraphEngine, MediaEngine};

/// Name of the backend used when none is requested
pub const DEFAULT_ENGINE: &str = "filtergraph";

/// Registry for managing available render backends
///
/// Backends are registered by name and instantiated on request.
pub struct EngineRegistry {
    engines: HashMap<String, Box<dyn Fn() -> Box<dyn MediaEngine>>>,
}

impl EngineRegistry {
    /// Create a new registry with all built-in backends
    pub fn new() -> Self {
        let mut registry = Self {
            engines: HashMap::new(),
        };

        registry.register_builtin_engines();
        registry
    }

    fn register_builtin_engines(&mut self) {
        self.engines.insert(
            "filtergraph".to_string(),
            Box::new(|| Box::new(FilterGraphEngine::new())),
        );

        self.engines.insert(
            "clips".to_string(),
            Box::new(|| Box::new(ClipEngine::new())),
        );
    }

    /// Register a custom backend
    pub fn register<F>(&mut self, name: String, factory: F)
    where
        F: Fn() -> Box<dyn MediaEngine> + 'static,
    {
        self.engines.insert(name, Box::new(factory));
    }

    /// Get a new instance of a backend by name
    pub fn get_engine(&self, name: &str) -> Option<Box<dyn MediaEngine>> {
        self.engines.get(name).map(|factory| factory())
    }

    /// All registered backend names, sorted
    pub fn available_engines(&self) -> Vec<String> {
        let mut names: Vec<String> = self.engines.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_engine(&self, name: &str) -> bool {
        self.engines.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}
