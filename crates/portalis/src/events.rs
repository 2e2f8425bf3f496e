//! # Engine Event Bus
//!
//! Forwards simulation events from the world queue to host threads.
//!
//! ```text
//! ┌─────────────┐  consume_all  ┌─────────────┐  try_recv  ┌─────────────┐
//! │ World queue │──────────────>│  EventBus   │───────────>│ Host / UI   │
//! │ (per step)  │   consumer    │ (crossbeam) │            │ (any thread)│
//! └─────────────┘               └─────────────┘            └─────────────┘
//! ```
//!
//! The bridge subscribes as an ordinary consumer that never marks an event
//! handled, so consumers registered after it still run.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

use portalis_core::dynamic::{event_class, Event, EventClassId, EventPayload};
use portalis_core::{Entity, World};

/// Simulation events as seen by the host.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    // =========================================================================
    // Body Events
    // =========================================================================
    /// A body entered a sector.
    BodyEnteredSector {
        /// The body.
        body: Entity,
        /// The sector entered.
        sector: Entity,
    },

    /// A body left a sector.
    BodyExitedSector {
        /// The body.
        body: Entity,
        /// The sector left.
        sector: Entity,
    },

    /// A body was removed by a collision response.
    BodyRemoved {
        /// The removed body. Its handle no longer resolves.
        body: Entity,
    },

    /// A body went through a teleporting portal.
    BodyTeleported {
        /// The body.
        body: Entity,
        /// Destination sector.
        sector: Entity,
    },

    // =========================================================================
    // World Events
    // =========================================================================
    /// A world file finished loading.
    WorldLoaded {
        /// Path of the root file.
        path: String,
    },

    /// An event of a class registered by the host.
    Custom {
        /// Class ID.
        class: EventClassId,
        /// Simulation time of the emitting step.
        sim_timestamp_ms: f64,
        /// Raw payload.
        payload: EventPayload,
    },
}

impl EngineEvent {
    /// Converts a queued world event.
    #[must_use]
    pub fn from_event(event: &Event) -> Self {
        let pair = match event.payload {
            EventPayload::Pair(a, b) => (a, b),
            EventPayload::Entity(a) => (a, Entity::NULL),
            _ => (Entity::NULL, Entity::NULL),
        };
        match event.class {
            event_class::BODY_ENTERED_SECTOR => Self::BodyEnteredSector {
                body: pair.0,
                sector: pair.1,
            },
            event_class::BODY_EXITED_SECTOR => Self::BodyExitedSector {
                body: pair.0,
                sector: pair.1,
            },
            event_class::BODY_REMOVED => Self::BodyRemoved { body: pair.0 },
            event_class::BODY_TELEPORTED => Self::BodyTeleported {
                body: pair.0,
                sector: pair.1,
            },
            event_class::WORLD_LOADED => Self::WorldLoaded {
                path: match &event.payload {
                    EventPayload::Text(path) => path.clone(),
                    _ => String::new(),
                },
            },
            class => Self::Custom {
                class,
                sim_timestamp_ms: event.sim_timestamp_ms,
                payload: event.payload.clone(),
            },
        }
    }
}

/// A bounded multi-consumer channel of engine events.
pub struct EventBus {
    sender: Sender<EngineEvent>,
    receiver: Receiver<EngineEvent>,
}

impl EventBus {
    /// Creates a bus holding at most `capacity` undelivered events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self { sender, receiver }
    }

    /// Returns a sender handle.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Returns a receiver handle.
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }

    /// Subscribes the bus to every event class registered in `world`,
    /// including host classes registered before this call.
    pub fn bridge(&self, world: &mut World) {
        let mut class: EventClassId = 1;
        while world.events.class_name(class).is_some() {
            let sender = self.sender();
            world.events.subscribe(
                class,
                Box::new(move |event| {
                    sender.send(EngineEvent::from_event(event));
                    false
                }),
            );
            class += 1;
        }
    }
}

/// Handle for sending events.
#[derive(Clone)]
pub struct EventSender {
    sender: Sender<EngineEvent>,
}

impl EventSender {
    /// Sends an event without blocking. Returns `false` if it was dropped.
    #[inline]
    pub fn send(&self, event: EngineEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(?event, "Event bus full, dropping event");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Handle for receiving events.
#[derive(Clone)]
pub struct EventReceiver {
    receiver: Receiver<EngineEvent>,
}

impl EventReceiver {
    /// Receives all pending events without blocking.
    #[inline]
    pub fn drain(&self) -> Vec<EngineEvent> {
        self.receiver.try_iter().collect()
    }

    /// Receives one event without blocking.
    #[inline]
    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.receiver.try_recv().ok()
    }

    /// Number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Whether any event is pending.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}
