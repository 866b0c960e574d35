//! Kernels backed by `rapier2d` and `rapier3d`.
//!
//! Both dimensions share one implementation in `kernel_impl.rs`, compiled
//! once per dimension module against that dimension's rapier crate. Each
//! dimension module supplies the handful of conversions that genuinely
//! differ (vectors, rotations, angular quantities, shapes and hinge axes).
//! Vectors cross the boundary component-wise.

#[cfg(feature = "dim2")]
pub mod dim2;
#[cfg(feature = "dim3")]
pub mod dim3;

#[cfg(feature = "dim2")]
pub use dim2::Rapier2d;
#[cfg(feature = "dim3")]
pub use dim3::Rapier3d;
