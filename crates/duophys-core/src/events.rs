//! Topic-based event fan-out.
//!
//! A world owns one [`EventBus`] per event family. Publishers pick a
//! [`Topic`]; subscribers register a closure or take a drainable
//! [`Mailbox`]. Delivery is synchronous, so every listener has seen the
//! events of a step before that step returns.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::types::{BodyId, BodyKind, ShapeId, SleepState, WorldId};
use crate::vector::{AngularVec, Dimension, PhysVec, Rotation};

/// Undrained mailboxes drop their oldest event beyond this many.
pub const MAILBOX_CAPACITY: usize = 4096;

// ---------------------------------------------------------------------------
// Event payloads
// ---------------------------------------------------------------------------

/// Where an event is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Every event of the world.
    World,
    /// Events involving one body.
    Body(BodyId),
}

/// Phase of a contact between two bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionKind {
    /// First step the pair touches.
    Start,
    /// Pair stopped touching (or one body was removed).
    End,
    /// Pair still touching after a step.
    Active,
}

/// Normalized contact notification, identical for both backends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub kind: CollisionKind,
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub contact_point: Option<PhysVec>,
    pub contact_normal: Option<PhysVec>,
    /// Simulated world time in seconds.
    pub timestamp: f64,
}

impl CollisionEvent {
    /// Whether `body` is one of the pair.
    #[must_use]
    pub fn involves(&self, body: BodyId) -> bool {
        self.body_a == body || self.body_b == body
    }

    /// The partner of `body`, if `body` is part of the pair.
    #[must_use]
    pub fn other(&self, body: BodyId) -> Option<BodyId> {
        if self.body_a == body {
            Some(self.body_b)
        } else if self.body_b == body {
            Some(self.body_a)
        } else {
            None
        }
    }
}

/// Change notification emitted by every body mutator.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyEvent {
    Created { body: BodyId },
    Removed { body: BodyId },
    PositionChanged { body: BodyId, position: PhysVec },
    RotationChanged { body: BodyId, rotation: Rotation },
    VelocityChanged { body: BodyId, velocity: PhysVec },
    AngularVelocityChanged { body: BodyId, angular_velocity: AngularVec },
    MassChanged { body: BodyId, mass: f32 },
    MaterialChanged { body: BodyId, material: String },
    GravityScaleChanged { body: BodyId, scale: f32 },
    DampingChanged { body: BodyId, linear: f32, angular: f32 },
    FilterChanged { body: BodyId, group: u32, mask: u32 },
    UserDataChanged { body: BodyId, user_data: u64 },
    ForceApplied { body: BodyId, force: PhysVec, point: Option<PhysVec> },
    ImpulseApplied { body: BodyId, impulse: PhysVec, point: Option<PhysVec> },
    TorqueApplied { body: BodyId, torque: AngularVec },
    KindChanged { body: BodyId, kind: BodyKind },
    SensorChanged { body: BodyId, sensor: bool },
    ActiveChanged { body: BodyId, active: bool },
    SleepChanged { body: BodyId, state: SleepState },
    ShapeAdded { body: BodyId, shape: ShapeId },
    ShapeRemoved { body: BodyId, shape: ShapeId },
}

impl BodyEvent {
    /// The body the event is about.
    #[must_use]
    pub const fn body(&self) -> BodyId {
        match self {
            Self::Created { body }
            | Self::Removed { body }
            | Self::PositionChanged { body, .. }
            | Self::RotationChanged { body, .. }
            | Self::VelocityChanged { body, .. }
            | Self::AngularVelocityChanged { body, .. }
            | Self::MassChanged { body, .. }
            | Self::MaterialChanged { body, .. }
            | Self::GravityScaleChanged { body, .. }
            | Self::DampingChanged { body, .. }
            | Self::FilterChanged { body, .. }
            | Self::UserDataChanged { body, .. }
            | Self::ForceApplied { body, .. }
            | Self::ImpulseApplied { body, .. }
            | Self::TorqueApplied { body, .. }
            | Self::KindChanged { body, .. }
            | Self::SensorChanged { body, .. }
            | Self::ActiveChanged { body, .. }
            | Self::SleepChanged { body, .. }
            | Self::ShapeAdded { body, .. }
            | Self::ShapeRemoved { body, .. } => *body,
        }
    }
}

/// Lifecycle notifications of the physics manager.
#[derive(Debug, Clone, PartialEq)]
pub enum ManagerEvent {
    Initialized {
        dimension: Dimension,
        engine: String,
    },
    WorldCreated {
        world: WorldId,
    },
    QualityChanged {
        from: crate::quality::QualityLevel,
        to: crate::quality::QualityLevel,
    },
    Error {
        message: String,
    },
    Destroyed,
}

// ---------------------------------------------------------------------------
// Mailbox
// ---------------------------------------------------------------------------

/// Drainable queue fed by an [`EventBus`] subscription.
pub struct Mailbox<E> {
    id: SubscriptionId,
    queue: Rc<RefCell<VecDeque<E>>>,
}

impl<E> Clone for Mailbox<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            queue: Rc::clone(&self.queue),
        }
    }
}

impl<E> Mailbox<E> {
    /// The subscription feeding this mailbox.
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Take every queued event, oldest first.
    pub fn drain(&self) -> Vec<E> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.queue.borrow_mut().clear();
    }
}

impl<E> fmt::Debug for Mailbox<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("id", &self.id)
            .field("len", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

enum Sink<E> {
    Callback(Box<dyn FnMut(&E)>),
    Mailbox(Rc<RefCell<VecDeque<E>>>),
}

struct Subscriber<E> {
    id: SubscriptionId,
    topic: Topic,
    sink: Sink<E>,
}

/// Synchronous multi-subscriber publisher.
pub struct EventBus<E> {
    next_id: u64,
    subscribers: Vec<Subscriber<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            subscribers: Vec::new(),
        }
    }
}

impl<E: Clone> EventBus<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Call `callback` for every event published on `topic`.
    pub fn subscribe(&mut self, topic: Topic, callback: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.subscribers.push(Subscriber {
            id,
            topic,
            sink: Sink::Callback(Box::new(callback)),
        });
        id
    }

    /// Queue every event published on `topic` into a new mailbox.
    pub fn mailbox(&mut self, topic: Topic) -> Mailbox<E> {
        let id = self.next_id();
        let queue = Rc::new(RefCell::new(VecDeque::new()));
        self.subscribers.push(Subscriber {
            id,
            topic,
            sink: Sink::Mailbox(Rc::clone(&queue)),
        });
        Mailbox { id, queue }
    }

    /// Returns whether a subscription was removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Drop every subscription on `topic`.
    pub fn clear_topic(&mut self, topic: Topic) {
        self.subscribers.retain(|s| s.topic != topic);
    }

    /// Deliver `event` to the subscribers of `topic`.
    pub fn publish(&mut self, topic: Topic, event: &E) {
        for subscriber in self.subscribers.iter_mut().filter(|s| s.topic == topic) {
            match &mut subscriber.sink {
                Sink::Callback(callback) => callback(event),
                Sink::Mailbox(queue) => {
                    let mut queue = queue.borrow_mut();
                    if queue.len() >= MAILBOX_CAPACITY {
                        queue.pop_front();
                    }
                    queue.push_back(event.clone());
                }
            }
        }
    }

    /// Deliver `event` to several topics, once each.
    pub fn publish_all(&mut self, topics: &[Topic], event: &E) {
        for topic in topics {
            self.publish(*topic, event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn start(a: u64, b: u64) -> CollisionEvent {
        CollisionEvent {
            kind: CollisionKind::Start,
            body_a: BodyId(a),
            body_b: BodyId(b),
            contact_point: None,
            contact_normal: None,
            timestamp: 0.0,
        }
    }

    #[test]
    fn fan_out_reaches_each_topic_once() {
        let mut bus = EventBus::new();
        let world = bus.mailbox(Topic::World);
        let a = bus.mailbox(Topic::Body(BodyId(1)));
        let b = bus.mailbox(Topic::Body(BodyId(2)));
        let other = bus.mailbox(Topic::Body(BodyId(3)));

        let event = start(1, 2);
        bus.publish_all(
            &[Topic::World, Topic::Body(BodyId(1)), Topic::Body(BodyId(2))],
            &event,
        );

        assert_eq!(world.drain(), vec![event]);
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert!(other.is_empty());
    }

    #[test]
    fn callbacks_run_synchronously() {
        let count = Rc::new(Cell::new(0));
        let mut bus = EventBus::new();
        let seen = Rc::clone(&count);
        bus.subscribe(Topic::World, move |_e: &CollisionEvent| seen.set(seen.get() + 1));
        bus.publish(Topic::World, &start(1, 2));
        bus.publish(Topic::World, &start(2, 3));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let mailbox = bus.mailbox(Topic::World);
        assert!(bus.unsubscribe(mailbox.id()));
        assert!(!bus.unsubscribe(mailbox.id()));
        bus.publish(Topic::World, &start(1, 2));
        assert!(mailbox.is_empty());
    }

    #[test]
    fn mailbox_drops_oldest_when_full() {
        let mut bus = EventBus::new();
        let mailbox = bus.mailbox(Topic::World);
        for i in 0..(MAILBOX_CAPACITY as u64 + 5) {
            bus.publish(Topic::World, &start(i, i + 1));
        }
        let events = mailbox.drain();
        assert_eq!(events.len(), MAILBOX_CAPACITY);
        assert_eq!(events[0].body_a, BodyId(5));
    }

    #[test]
    fn collision_event_partner() {
        let e = start(4, 9);
        assert_eq!(e.other(BodyId(4)), Some(BodyId(9)));
        assert_eq!(e.other(BodyId(9)), Some(BodyId(4)));
        assert_eq!(e.other(BodyId(1)), None);
        assert!(e.involves(BodyId(9)));
    }

    #[test]
    fn body_event_reports_its_body() {
        let e = BodyEvent::MassChanged {
            body: BodyId(12),
            mass: 3.0,
        };
        assert_eq!(e.body(), BodyId(12));
    }

    #[test]
    fn clear_topic_removes_body_subscribers() {
        let mut bus: EventBus<BodyEvent> = EventBus::new();
        let _m = bus.mailbox(Topic::Body(BodyId(1)));
        let _w = bus.mailbox(Topic::World);
        bus.clear_topic(Topic::Body(BodyId(1)));
        assert_eq!(bus.subscriber_count(), 1);
    }
}
