//! Unified constraint records and their mapping onto native joint models.

use duophys_core::prelude::*;
use duophys_core::types::AngularLimits;

/// Damping factor handed to velocity motors.
pub const MOTOR_FACTOR: f32 = 1.0;

// ---------------------------------------------------------------------------
// Native joint models
// ---------------------------------------------------------------------------

/// Joint primitives every kernel understands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JointModel {
    /// Rigid separation.
    Distance { length: f32 },
    /// Maximum separation only.
    Rope { max_length: f32 },
    Spring {
        rest_length: f32,
        stiffness: f32,
        damping: f32,
    },
    /// Hinge about `axis` (3-D only; 2-D hinges always turn in the plane).
    Revolute {
        axis: Option<PhysVec>,
        limits: Option<AngularLimits>,
        motor: Option<Motor>,
    },
    Fixed,
    /// Slider along `axis`, +X when absent.
    Prismatic {
        axis: Option<PhysVec>,
        motor: Option<Motor>,
    },
}

/// A joint model with local anchors, expressed in the kernel's dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointSpec {
    pub model: JointModel,
    pub anchor_a: PhysVec,
    pub anchor_b: PhysVec,
}

/// Kind realized in place of one no backend supports.
#[must_use]
pub const fn fallback_for(kind: ConstraintKind) -> Option<ConstraintKind> {
    match kind {
        ConstraintKind::Gear | ConstraintKind::Pulley | ConstraintKind::Mouse => {
            Some(ConstraintKind::Distance)
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// PhysicsConstraint
// ---------------------------------------------------------------------------

/// A constraint as the world records it.
///
/// Motor and limit settings are kept here even when the realized joint cannot
/// use them, so they survive a later [`set_motor`](crate::contract::PhysicsWorld::set_motor).
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsConstraint {
    pub id: ConstraintId,
    /// What was requested.
    pub kind: ConstraintKind,
    /// What was realized when a fallback applied.
    pub degraded_to: Option<ConstraintKind>,
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Resolved at creation for length-based kinds.
    pub length: Option<f32>,
    pub stiffness: f32,
    pub damping: f32,
    pub anchor_a: PhysVec,
    pub anchor_b: PhysVec,
    pub axis: Option<PhysVec>,
    pub motor: Option<Motor>,
    pub limits: Option<AngularLimits>,
}

impl PhysicsConstraint {
    /// Build the record for `desc` in `dimension`.
    ///
    /// `separation` is the distance between the two bodies at creation and
    /// only used when the realized kind needs a length and none was given.
    #[must_use]
    pub fn new(
        id: ConstraintId,
        desc: &ConstraintDesc,
        dimension: Dimension,
        separation: f32,
    ) -> Self {
        let degraded_to = fallback_for(desc.kind);
        let realized = degraded_to.unwrap_or(desc.kind);
        let length = realized
            .uses_length()
            .then(|| desc.length.unwrap_or(separation));
        let anchor = |a: Option<PhysVec>| {
            a.map_or_else(|| PhysVec::zero(dimension), |a| a.into_dimension(dimension))
        };
        Self {
            id,
            kind: desc.kind,
            degraded_to,
            body_a: desc.body_a,
            body_b: desc.body_b,
            length,
            stiffness: desc.stiffness,
            damping: desc.damping,
            anchor_a: anchor(desc.anchor_a),
            anchor_b: anchor(desc.anchor_b),
            axis: desc.axis.map(|a| a.into_dimension(dimension)),
            motor: desc.motor,
            limits: desc.limits,
        }
    }

    /// The kind the native joint implements.
    #[must_use]
    pub fn realized_kind(&self) -> ConstraintKind {
        self.degraded_to.unwrap_or(self.kind)
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.degraded_to.is_some()
    }

    #[must_use]
    pub fn connects(&self, body: BodyId) -> bool {
        self.body_a == body || self.body_b == body
    }

    /// Native joint for the realized kind.
    #[must_use]
    pub fn joint_spec(&self) -> JointSpec {
        let length = self.length.unwrap_or(0.0);
        let model = match self.realized_kind() {
            ConstraintKind::Rope => JointModel::Rope { max_length: length },
            ConstraintKind::Spring => JointModel::Spring {
                rest_length: length,
                stiffness: self.stiffness,
                damping: self.damping,
            },
            ConstraintKind::Revolute => JointModel::Revolute {
                axis: self.axis,
                limits: self.limits,
                motor: self.motor,
            },
            ConstraintKind::Motorized => JointModel::Revolute {
                axis: self.axis,
                limits: self.limits,
                motor: Some(self.motor.unwrap_or(Motor::new(0.0, 0.0))),
            },
            ConstraintKind::Fixed => JointModel::Fixed,
            ConstraintKind::Prismatic => JointModel::Prismatic {
                axis: self.axis,
                motor: self.motor,
            },
            ConstraintKind::Distance
            | ConstraintKind::Gear
            | ConstraintKind::Pulley
            | ConstraintKind::Mouse => JointModel::Distance { length },
        };
        JointSpec {
            model,
            anchor_a: self.anchor_a,
            anchor_b: self.anchor_b,
        }
    }

    /// Degradation record for a fallback, if one applied.
    #[must_use]
    pub fn degradation(&self) -> Option<Degradation> {
        let realized = self.degraded_to?;
        Some(Degradation::new(
            format!("constraint:{}", self.kind),
            format!("constraint:{realized}"),
            format!(
                "{} between {} and {} has no native joint",
                self.id, self.body_a, self.body_b
            ),
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
