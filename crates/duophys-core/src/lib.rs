// duophys-core: Vectors, descriptors, materials, events, config and errors shared by both backends.

pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod material;
pub mod metrics;
pub mod pool;
pub mod quality;
pub mod types;
pub mod vector;

pub mod prelude {
    pub use crate::config::PhysicsConfig;
    pub use crate::device::DeviceInfo;
    pub use crate::error::{ConfigError, InitError, PhysicsError, ResourceError};
    pub use crate::events::{
        BodyEvent, CollisionEvent, CollisionKind, EventBus, Mailbox, ManagerEvent, Topic,
    };
    pub use crate::material::{MaterialRegistry, PhysicsMaterial};
    pub use crate::metrics::PerformanceMetrics;
    pub use crate::quality::{DeviceTier, QualityLevel};
    pub use crate::types::{
        BodyDesc, BodyId, BodyKind, CollisionFilter, ConstraintDesc, ConstraintId,
        ConstraintKind, Degradation, EngineType, Motor, RaycastHit, ShapeDesc, ShapeId,
        ShapeKind, SimpleBodyConfig, SimpleShape, SleepState, SleepThresholds, WorldConfig,
        WorldId,
    };
    pub use crate::vector::{Aabb, AngularVec, Dimension, PhysVec, Rotation};
}
