//! Named surface materials and the per-engine registry.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Id of the material used when a body names none.
pub const DEFAULT_MATERIAL: &str = "default";

// ---------------------------------------------------------------------------
// PhysicsMaterial
// ---------------------------------------------------------------------------

/// Friction, restitution and density preset. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsMaterial {
    pub id: String,
    pub name: String,
    pub friction: f32,
    pub restitution: f32,
    pub density: f32,
    #[serde(default)]
    pub air_friction: Option<f32>,
    #[serde(default)]
    pub static_friction: Option<f32>,
    #[serde(default)]
    pub linear_damping: Option<f32>,
    #[serde(default)]
    pub angular_damping: Option<f32>,
}

impl PhysicsMaterial {
    /// Material whose display name equals its id.
    #[must_use]
    pub fn new(id: impl Into<String>, friction: f32, restitution: f32, density: f32) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            friction,
            restitution,
            density,
            air_friction: None,
            static_friction: None,
            linear_damping: None,
            angular_damping: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_air_friction(mut self, air_friction: f32) -> Self {
        self.air_friction = Some(air_friction);
        self
    }

    #[must_use]
    pub fn with_static_friction(mut self, static_friction: f32) -> Self {
        self.static_friction = Some(static_friction);
        self
    }

    #[must_use]
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = Some(linear);
        self.angular_damping = Some(angular);
        self
    }

    /// Built-in presets: default, ice, rubber, metal, wood, bouncy.
    #[must_use]
    pub fn presets() -> Vec<Self> {
        vec![
            Self::new(DEFAULT_MATERIAL, 0.5, 0.1, 1.0).with_name("Default"),
            Self::new("ice", 0.02, 0.05, 0.92)
                .with_name("Ice")
                .with_static_friction(0.05),
            Self::new("rubber", 0.9, 0.8, 1.1)
                .with_name("Rubber")
                .with_static_friction(1.0),
            Self::new("metal", 0.4, 0.1, 7.8).with_name("Metal"),
            Self::new("wood", 0.6, 0.2, 0.7).with_name("Wood"),
            Self::new("bouncy", 0.3, 0.95, 0.5)
                .with_name("Bouncy")
                .with_air_friction(0.01),
        ]
    }
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self::new(DEFAULT_MATERIAL, 0.5, 0.1, 1.0).with_name("Default")
    }
}

// ---------------------------------------------------------------------------
// MaterialRegistry
// ---------------------------------------------------------------------------

/// Materials keyed by id. Bodies hold their own `Arc`, so replacing or
/// removing an entry never changes a live body.
#[derive(Debug, Clone, Default)]
pub struct MaterialRegistry {
    materials: HashMap<String, Arc<PhysicsMaterial>>,
}

impl MaterialRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with [`PhysicsMaterial::presets`].
    #[must_use]
    pub fn with_presets() -> Self {
        let mut registry = Self::new();
        for material in PhysicsMaterial::presets() {
            registry.register(material);
        }
        registry
    }

    /// Insert or replace a material, returning the shared handle.
    pub fn register(&mut self, material: PhysicsMaterial) -> Arc<PhysicsMaterial> {
        let material = Arc::new(material);
        self.materials
            .insert(material.id.clone(), Arc::clone(&material));
        material
    }

    pub fn get(&self, id: &str) -> Option<Arc<PhysicsMaterial>> {
        self.materials.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.materials.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Arc<PhysicsMaterial>> {
        self.materials.remove(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.materials.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// The default material, falling back to a fresh one if it was removed.
    pub fn default_material(&self) -> Arc<PhysicsMaterial> {
        self.get(DEFAULT_MATERIAL)
            .unwrap_or_else(|| Arc::new(PhysicsMaterial::default()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_registered() {
        let registry = MaterialRegistry::with_presets();
        assert_eq!(
            registry.ids(),
            vec!["bouncy", "default", "ice", "metal", "rubber", "wood"]
        );
        let ice = registry.get("ice").unwrap();
        assert!(ice.friction < 0.1);
    }

    #[test]
    fn replacing_keeps_old_handle_alive() {
        let mut registry = MaterialRegistry::with_presets();
        let old = registry.get("wood").unwrap();
        let new = registry.register(PhysicsMaterial::new("wood", 0.1, 0.0, 0.5));
        assert!((old.friction - 0.6).abs() < f32::EPSILON);
        assert!((new.friction - 0.1).abs() < f32::EPSILON);
        assert!(Arc::ptr_eq(&new, &registry.get("wood").unwrap()));
    }

    #[test]
    fn remove_and_contains() {
        let mut registry = MaterialRegistry::with_presets();
        assert!(registry.contains("metal"));
        assert!(registry.remove("metal").is_some());
        assert!(!registry.contains("metal"));
        assert!(registry.remove("metal").is_none());
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn default_material_survives_removal() {
        let mut registry = MaterialRegistry::with_presets();
        registry.remove(DEFAULT_MATERIAL);
        assert_eq!(registry.default_material().id, DEFAULT_MATERIAL);
    }

    #[test]
    fn builder_sets_optionals() {
        let m = PhysicsMaterial::new("custom", 0.3, 0.4, 2.0)
            .with_name("Custom")
            .with_damping(0.1, 0.2);
        assert_eq!(m.name, "Custom");
        assert_eq!(m.linear_damping, Some(0.1));
        assert_eq!(m.angular_damping, Some(0.2));
        assert_eq!(m.air_friction, None);
    }
}
