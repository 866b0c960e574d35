use thiserror::Error;

use crate::types::{BodyId, ConstraintId, WorldId};
use crate::vector::Dimension;

/// Top-level error type for duophys.
#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Initialization error: {0}")]
    Init(#[from] InitError),
}

/// Configuration errors. Always fatal to the call that raised them.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid body config: {0}")]
    InvalidBodyConfig(String),

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: Dimension, got: Dimension },

    #[error("Engine '{engine}' does not support {dimension}")]
    UnsupportedEngine { engine: String, dimension: Dimension },

    #[error("Physics not initialized")]
    NotInitialized,

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// A referenced resource is missing or no longer usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("Body {body} is not registered in world {world}")]
    MissingBody { body: BodyId, world: WorldId },

    #[error("World {0} does not exist")]
    MissingWorld(WorldId),

    #[error("Constraint {constraint} is not registered in world {world}")]
    MissingConstraint {
        constraint: ConstraintId,
        world: WorldId,
    },

    #[error("Material '{0}' is not registered")]
    MissingMaterial(String),

    #[error("World {0} has been destroyed")]
    WorldDestroyed(WorldId),
}

/// Backend initialization failures.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("Backend '{engine}' is unavailable in this build")]
    BackendUnavailable { engine: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl From<InitError> for ConfigError {
    /// Operations after a failed initialization report `NotInitialized`,
    /// except when the failure itself was a configuration problem.
    fn from(err: InitError) -> Self {
        match err {
            InitError::InvalidConfig(inner) => inner,
            InitError::BackendUnavailable { .. } => Self::NotInitialized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physics_error_from_config_error() {
        let err = ConfigError::InvalidBodyConfig("no shapes".into());
        let physics_err: PhysicsError = err.into();
        assert!(matches!(physics_err, PhysicsError::Config(_)));
        assert!(physics_err.to_string().contains("no shapes"));
    }

    #[test]
    fn physics_error_from_resource_error() {
        let err = ResourceError::MissingBody {
            body: BodyId(7),
            world: WorldId(2),
        };
        let physics_err: PhysicsError = err.into();
        assert!(matches!(physics_err, PhysicsError::Resource(_)));
        let msg = physics_err.to_string();
        assert!(msg.contains("body#7"));
        assert!(msg.contains("world#2"));
    }

    #[test]
    fn physics_error_from_init_error() {
        let err = InitError::BackendUnavailable {
            engine: "rapier2d".into(),
        };
        let physics_err: PhysicsError = err.into();
        assert!(matches!(physics_err, PhysicsError::Init(_)));
        assert!(physics_err.to_string().contains("rapier2d"));
    }

    #[test]
    fn config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let config_err: ConfigError = io_err.into();
        assert!(matches!(config_err, ConfigError::Io(_)));
    }

    #[test]
    fn dimension_mismatch_display() {
        let err = ConfigError::DimensionMismatch {
            expected: Dimension::Two,
            got: Dimension::Three,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 2d, got 3d");
    }

    #[test]
    fn failed_backend_reads_as_not_initialized() {
        let err: ConfigError = InitError::BackendUnavailable {
            engine: "rapier3d".into(),
        }
        .into();
        assert!(matches!(err, ConfigError::NotInitialized));
    }

    #[test]
    fn resource_error_is_clone_eq() {
        let err = ResourceError::MissingWorld(WorldId(1));
        assert_eq!(err.clone(), err);
    }
}
