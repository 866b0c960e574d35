//! Sensor volumes that report who entered, stayed and left.

use std::collections::BTreeSet;

use duophys_core::prelude::*;
use duophys_physics::contract::PhysicsWorld;
use tracing::debug;

/// Phase of a body's presence in a [`TriggerZone`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerEventKind {
    Enter,
    Stay,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub kind: TriggerEventKind,
    pub body: BodyId,
}

/// A sensor body with an authoritative set of the bodies inside it.
///
/// `Enter` fires only when a body joins the set and `Exit` only when it
/// leaves; members that were already inside get one `Stay` per update.
pub struct TriggerZone {
    body: BodyId,
    contacts: Mailbox<CollisionEvent>,
    inside: BTreeSet<BodyId>,
    mask: Option<u32>,
}

impl TriggerZone {
    /// Create a static sensor body with `shape` at `position`.
    pub fn spawn<W: PhysicsWorld + ?Sized>(
        world: &mut W,
        position: impl Into<PhysVec>,
        shape: ShapeDesc,
    ) -> Result<Self, PhysicsError> {
        let body = world.create_body(BodyDesc::fixed(position).with_shape(shape).sensor())?;
        Ok(Self::watch(world, body))
    }

    /// Turn an existing body into a trigger.
    pub fn attach<W: PhysicsWorld + ?Sized>(
        world: &mut W,
        body: BodyId,
    ) -> Result<Self, ResourceError> {
        world.set_sensor(body, true)?;
        Ok(Self::watch(world, body))
    }

    fn watch<W: PhysicsWorld + ?Sized>(world: &mut W, body: BodyId) -> Self {
        Self {
            body,
            contacts: world.collision_mailbox(Topic::Body(body)),
            inside: BTreeSet::new(),
            mask: None,
        }
    }

    /// Only report bodies whose group intersects `mask`.
    #[must_use]
    pub const fn with_mask(mut self, mask: u32) -> Self {
        self.mask = Some(mask);
        self
    }

    #[must_use]
    pub const fn body(&self) -> BodyId {
        self.body
    }

    #[must_use]
    pub const fn inside(&self) -> &BTreeSet<BodyId> {
        &self.inside
    }

    #[must_use]
    pub fn contains(&self, body: BodyId) -> bool {
        self.inside.contains(&body)
    }

    /// Fold the contacts of the steps since the last update into the set.
    pub fn update<W: PhysicsWorld + ?Sized>(&mut self, world: &W) -> Vec<TriggerEvent> {
        let mut events = Vec::new();
        let mut entered = BTreeSet::new();

        for contact in self.contacts.drain() {
            let Some(other) = contact.other(self.body) else {
                continue;
            };
            match contact.kind {
                CollisionKind::Start => {
                    if !self.accepts(world, other) {
                        continue;
                    }
                    if self.inside.insert(other) {
                        entered.insert(other);
                        events.push(TriggerEvent {
                            kind: TriggerEventKind::Enter,
                            body: other,
                        });
                    }
                }
                CollisionKind::End => {
                    if self.inside.remove(&other) {
                        entered.remove(&other);
                        events.push(TriggerEvent {
                            kind: TriggerEventKind::Exit,
                            body: other,
                        });
                    }
                }
                CollisionKind::Active => {}
            }
        }

        events.extend(
            self.inside
                .iter()
                .filter(|body| !entered.contains(*body))
                .map(|&body| TriggerEvent {
                    kind: TriggerEventKind::Stay,
                    body,
                }),
        );
        events
    }

    fn accepts<W: PhysicsWorld + ?Sized>(&self, world: &W, other: BodyId) -> bool {
        let Some(mask) = self.mask else {
            return true;
        };
        match world.collision_filter(other) {
            Ok(filter) => filter.matches_mask(mask),
            Err(e) => {
                debug!("duophys: trigger {} ignored {other}: {e}", self.body);
                false
            }
        }
    }

    /// Stop listening. The sensor body stays in the world.
    pub fn detach<W: PhysicsWorld + ?Sized>(self, world: &mut W) {
        world.unsubscribe_collisions(self.contacts.id());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use duophys_physics::prelude::*;
    use duophys_test_utils::weightless_world;

    fn count(events: &[TriggerEvent], kind: TriggerEventKind) -> usize {
        events.iter().filter(|e| e.kind == kind).count()
    }

    fn visitor(position: impl Into<PhysVec>) -> BodyDesc {
        BodyDesc::dynamic(position).with_shape(ShapeDesc::ball(0.25))
    }

    fn five_steps_inside_then_leave<K: Kernel>() {
        let (mut engine, id) = weightless_world::<K>();
        let world = engine.world_mut(id).unwrap();
        let mut zone =
            TriggerZone::spawn(world, [0.0, 0.0, 0.0], ShapeDesc::cuboid([2.0, 2.0, 2.0]))
                .unwrap();
        let guest = world.create_body(visitor([0.0, 0.0, 0.0])).unwrap();

        let mut all = Vec::new();
        for _ in 0..5 {
            world.step(1.0 / 60.0).unwrap();
            all.extend(zone.update(world));
        }
        assert!(zone.contains(guest));

        world.set_position(guest, [10.0, 10.0, 0.0].into()).unwrap();
        world.step(1.0 / 60.0).unwrap();
        all.extend(zone.update(world));

        assert_eq!(count(&all, TriggerEventKind::Enter), 1);
        assert_eq!(count(&all, TriggerEventKind::Stay), 4);
        assert_eq!(count(&all, TriggerEventKind::Exit), 1);
        assert_eq!(all.first().map(|e| e.kind), Some(TriggerEventKind::Enter));
        assert_eq!(all.last().map(|e| e.kind), Some(TriggerEventKind::Exit));
        assert!(zone.inside().is_empty());
    }

    #[test]
    fn enter_stay_exit_in_2d() {
        five_steps_inside_then_leave::<Rapier2d>();
    }

    #[test]
    fn enter_stay_exit_in_3d() {
        five_steps_inside_then_leave::<Rapier3d>();
    }

    #[test]
    fn mask_filters_visitors() {
        let (mut engine, id) = weightless_world::<Rapier3d>();
        let world = engine.world_mut(id).unwrap();
        let mut zone =
            TriggerZone::spawn(world, [0.0, 0.0, 0.0], ShapeDesc::ball(2.0))
                .unwrap()
                .with_mask(0b01);
        let ignored = world
            .create_body(visitor([0.5, 0.0, 0.0]).with_filter(CollisionFilter::new(0b10, u32::MAX)))
            .unwrap();
        let player = world
            .create_body(visitor([-0.5, 0.0, 0.0]).with_filter(CollisionFilter::new(0b01, u32::MAX)))
            .unwrap();

        world.step(1.0 / 60.0).unwrap();
        let events = zone.update(world);
        assert_eq!(
            events,
            vec![TriggerEvent {
                kind: TriggerEventKind::Enter,
                body: player
            }]
        );
        assert!(!zone.contains(ignored));
    }

    #[test]
    fn removed_body_exits() {
        let (mut engine, id) = weightless_world::<Rapier2d>();
        let world = engine.world_mut(id).unwrap();
        let mut zone = TriggerZone::spawn(world, [0.0, 0.0], ShapeDesc::ball(2.0)).unwrap();
        let guest = world.create_body(visitor([0.0, 0.0])).unwrap();
        world.step(1.0 / 60.0).unwrap();
        zone.update(world);

        world.remove_body(guest).unwrap();
        let events = zone.update(world);
        assert_eq!(
            events,
            vec![TriggerEvent {
                kind: TriggerEventKind::Exit,
                body: guest
            }]
        );
    }

    #[test]
    fn attach_makes_the_body_a_sensor() {
        let (mut engine, id) = weightless_world::<Rapier3d>();
        let world = engine.world_mut(id).unwrap();
        let body = world
            .create_body(BodyDesc::fixed([0.0, 0.0, 0.0]).with_shape(ShapeDesc::ball(1.0)))
            .unwrap();
        let zone = TriggerZone::attach(world, body).unwrap();
        assert!(world.is_sensor(body).unwrap());
        zone.detach(world);
    }
}
