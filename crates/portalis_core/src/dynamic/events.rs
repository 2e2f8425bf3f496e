//! # Simulation Events
//!
//! A bounded queue of events raised during simulation steps and the consumers
//! subscribed to each event class.
//!
//! ## Design Philosophy
//!
//! - **Bounded**: the queue never grows; on overflow the oldest event is
//!   dropped and a warning is logged
//! - **Ordered consumers**: consumers of a class run in subscription order
//!   until one of them reports the event as handled
//! - **No hidden state**: the queue lives on the [`World`](crate::ecs::World)

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, warn};

use crate::ecs::Entity;

/// Identifies an event class. IDs start at 1.
pub type EventClassId = u16;

/// Classes every world registers, in registration order.
pub mod class {
    use super::EventClassId;

    /// A body entered a sector. Payload: body, sector.
    pub const BODY_ENTERED_SECTOR: EventClassId = 1;
    /// A body left a sector. Payload: body, sector.
    pub const BODY_EXITED_SECTOR: EventClassId = 2;
    /// A body was removed by a collision response. Payload: body.
    pub const BODY_REMOVED: EventClassId = 3;
    /// A body went through a teleporting portal. Payload: body, destination sector.
    pub const BODY_TELEPORTED: EventClassId = 4;
    /// A world finished loading. Payload: none.
    pub const WORLD_LOADED: EventClassId = 5;

    pub(crate) const BUILT_IN: [&str; 5] = [
        "BodyEnteredSector",
        "BodyExitedSector",
        "BodyRemoved",
        "BodyTeleported",
        "WorldLoaded",
    ];
}

/// Event payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventPayload {
    /// No data.
    None,
    /// One entity.
    Entity(Entity),
    /// A pair of entities, subject first.
    Pair(Entity, Entity),
    /// Free-form text.
    Text(String),
}

/// A queued event.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Event class.
    pub class: EventClassId,
    /// Host wall time of the emitting frame, in milliseconds.
    pub timestamp_ms: f64,
    /// Simulation time of the emitting step, in milliseconds.
    pub sim_timestamp_ms: f64,
    /// Event data.
    pub payload: EventPayload,
}

/// Callback invoked for each event of its class. Returns `true` when the
/// event is handled and later consumers must not see it.
pub type EventConsumer = Box<dyn Fn(&Event) -> bool + Send + Sync>;

struct EventClass {
    name: String,
    consumers: Vec<EventConsumer>,
}

/// Bounded event queue with per-class consumers.
pub struct EventQueue {
    sender: Sender<Event>,
    receiver: Receiver<Event>,
    classes: Vec<EventClass>,
    dropped: u64,
}

impl EventQueue {
    /// Creates a queue holding at most `capacity` events, with the built-in
    /// classes registered.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        let mut queue = Self {
            sender,
            receiver,
            classes: Vec::new(),
            dropped: 0,
        };
        for name in class::BUILT_IN {
            queue.register_class(name);
        }
        queue
    }

    /// Registers an event class, returning its ID. Registering an existing
    /// name returns the existing ID.
    pub fn register_class(&mut self, name: &str) -> EventClassId {
        if let Some(id) = self.class_id(name) {
            return id;
        }
        self.classes.push(EventClass {
            name: name.to_string(),
            consumers: Vec::new(),
        });
        self.classes.len() as EventClassId
    }

    /// Looks a class up by name.
    #[must_use]
    pub fn class_id(&self, name: &str) -> Option<EventClassId> {
        self.classes
            .iter()
            .position(|c| c.name == name)
            .map(|i| (i + 1) as EventClassId)
    }

    /// Name of a class.
    #[must_use]
    pub fn class_name(&self, id: EventClassId) -> Option<&str> {
        self.class(id).map(|c| c.name.as_str())
    }

    fn class(&self, id: EventClassId) -> Option<&EventClass> {
        (id as usize).checked_sub(1).and_then(|i| self.classes.get(i))
    }

    /// Appends a consumer to a class.
    pub fn subscribe(&mut self, id: EventClassId, consumer: EventConsumer) {
        match (id as usize).checked_sub(1).and_then(|i| self.classes.get_mut(i)) {
            Some(class) => class.consumers.push(consumer),
            None => warn!(class = id, "Subscribing to unregistered event class"),
        }
    }

    /// Queues an event. When the queue is full the oldest event is dropped.
    pub fn push(&mut self, event: Event) {
        let mut event = event;
        loop {
            match self.sender.try_send(event) {
                Ok(()) => return,
                Err(TrySendError::Full(returned)) => {
                    if let Ok(oldest) = self.receiver.try_recv() {
                        self.dropped += 1;
                        warn!(class = oldest.class, "Event queue full, dropping oldest event");
                    }
                    event = returned;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }

    /// Pops and dispatches a single event. Returns `false` when empty.
    pub fn consume_one(&mut self) -> bool {
        let Ok(event) = self.receiver.try_recv() else {
            return false;
        };
        match self.class(event.class) {
            Some(class) => {
                for consumer in &class.consumers {
                    if consumer(&event) {
                        break;
                    }
                }
            }
            None => debug!(class = event.class, "Dropping event of unknown class"),
        }
        true
    }

    /// Dispatches every queued event. Returns how many were consumed.
    pub fn consume_all(&mut self) -> usize {
        let mut count = 0;
        while self.consume_one() {
            count += 1;
        }
        count
    }

    /// Removes every queued event without dispatching.
    pub fn drain(&mut self) -> Vec<Event> {
        self.receiver.try_iter().collect()
    }

    /// Number of queued events.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Events dropped to overflow since creation.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(portalis_shared::constants::MAX_EVENTS)
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("pending", &self.pending())
            .field("classes", &self.classes.len())
            .field("dropped", &self.dropped)
            .finish()
    }
}
