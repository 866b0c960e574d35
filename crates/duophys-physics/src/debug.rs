//! Debug-draw primitives for an external renderer.

use duophys_core::prelude::*;

/// One thing to draw, in the world's dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum DebugPrimitive {
    /// Bounds of a body.
    Bounds {
        body: BodyId,
        aabb: Aabb,
        sleeping: bool,
    },
    /// Segment between the two bodies of a constraint.
    Joint {
        constraint: ConstraintId,
        from: PhysVec,
        to: PhysVec,
    },
    /// Contact point with its normal.
    Contact { point: PhysVec, normal: PhysVec },
}

impl DebugPrimitive {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Bounds { .. } => "bounds",
            Self::Joint { .. } => "joint",
            Self::Contact { .. } => "contact",
        }
    }
}
