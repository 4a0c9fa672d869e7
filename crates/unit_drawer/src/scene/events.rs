//! Render events
//!
//! Visibility and lifecycle notifications from the simulation. The drawer
//! consumes them; it never decides visibility itself.
//!
//! Events raised while a frame is being drawn (a script callback destroying a
//! unit, say) go through an [`EventSink`] and are applied at the start of the
//! next update, so containers never change under a running pass.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::unit::{AllyTeamId, UnitId};

/// Notification consumed by the unit drawer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEvent {
    /// A unit started existing for rendering purposes
    UnitCreated {
        /// The new unit
        unit: UnitId,
        /// Unit is cloaked at creation
        cloaked: bool,
    },
    /// A unit was removed from the simulation
    UnitDestroyed {
        /// The removed unit
        unit: UnitId,
    },
    /// A unit entered line of sight of an ally team
    UnitEnteredLos {
        /// The unit
        unit: UnitId,
        /// The observing ally team
        ally: AllyTeamId,
    },
    /// A unit left line of sight of an ally team
    UnitLeftLos {
        /// The unit
        unit: UnitId,
        /// The observing ally team
        ally: AllyTeamId,
    },
    /// A unit entered radar coverage of an ally team
    UnitEnteredRadar {
        /// The unit
        unit: UnitId,
        /// The observing ally team
        ally: AllyTeamId,
    },
    /// A unit left radar coverage of an ally team
    UnitLeftRadar {
        /// The unit
        unit: UnitId,
        /// The observing ally team
        ally: AllyTeamId,
    },
    /// A unit cloaked
    UnitCloaked {
        /// The unit
        unit: UnitId,
    },
    /// A unit decloaked
    UnitDecloaked {
        /// The unit
        unit: UnitId,
    },
    /// The local player switched ally team or spectator mode
    PlayerChanged {
        /// Ally team whose view is rendered
        ally: AllyTeamId,
        /// Spectating with full view (everything visible)
        full_view: bool,
    },
    /// Sun direction or lighting parameters changed
    SunChanged,
}

impl RenderEvent {
    /// Unit this event is about, if any
    pub fn unit(&self) -> Option<UnitId> {
        match *self {
            RenderEvent::UnitCreated { unit, .. }
            | RenderEvent::UnitDestroyed { unit }
            | RenderEvent::UnitEnteredLos { unit, .. }
            | RenderEvent::UnitLeftLos { unit, .. }
            | RenderEvent::UnitEnteredRadar { unit, .. }
            | RenderEvent::UnitLeftRadar { unit, .. }
            | RenderEvent::UnitCloaked { unit }
            | RenderEvent::UnitDecloaked { unit } => Some(unit),
            RenderEvent::PlayerChanged { .. } | RenderEvent::SunChanged => None,
        }
    }
}

/// Deferred event queue shared with code that runs during drawing
///
/// Cloning the sink is cheap; all clones feed the same queue. Single-threaded
/// by construction.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    queue: Rc<RefCell<VecDeque<RenderEvent>>>,
}

impl EventSink {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for the next update
    pub fn push(&self, event: RenderEvent) {
        log::trace!("Deferring render event {:?}", event);
        self.queue.borrow_mut().push_back(event);
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// True if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Take every queued event, oldest first
    pub fn drain(&self) -> Vec<RenderEvent> {
        self.queue.borrow_mut().drain(..).collect()
    }
}
