//! Event types for the FitCoach event system
//!
//! Fact creations, evaluation changes and relationship changes are announced
//! on the [`EventBus`] for SSE clients.

mod fact_types;

pub use fact_types::{FactKind, StudentRef};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// FitCoach event types
///
/// Events are broadcast via EventBus and can be serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CoachEvent {
    /// A fact record was created
    ///
    /// Triggers:
    /// - SSE: show the new record on the teacher's dashboard
    FactRecorded {
        /// Which evaluation flag this fact satisfies
        kind: FactKind,
        /// Owning student, directly or through the user account
        owner: StudentRef,
        /// Id of the newly created record
        fact_id: Uuid,
        /// When the record was created
        timestamp: DateTime<Utc>,
    },

    /// A teacher took on a student (or re-activated a previous pairing)
    RelationshipAssigned {
        relationship_id: Uuid,
        teacher_id: Uuid,
        student_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A relationship stopped receiving evaluation credit
    RelationshipDeactivated {
        relationship_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// An evaluation flag flipped from unset to set
    ///
    /// Triggers:
    /// - SSE: refresh the teacher's dashboard
    EvaluationUpdated {
        evaluation_id: Uuid,
        relationship_id: Uuid,
        kind: FactKind,
        /// Completion after the change (0-100)
        completion_percentage: f64,
        complete: bool,
        timestamp: DateTime<Utc>,
    },
}

impl CoachEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            CoachEvent::FactRecorded { .. } => "FactRecorded",
            CoachEvent::RelationshipAssigned { .. } => "RelationshipAssigned",
            CoachEvent::RelationshipDeactivated { .. } => "RelationshipDeactivated",
            CoachEvent::EvaluationUpdated { .. } => "EvaluationUpdated",
        }
    }

    /// Convenience constructor for a fact creation event stamped now
    pub fn fact_recorded(kind: FactKind, owner: StudentRef, fact_id: Uuid) -> Self {
        CoachEvent::FactRecorded {
            kind,
            owner,
            fact_id,
            timestamp: Utc::now(),
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use fitcoach_common::events::{CoachEvent, EventBus, FactKind, StudentRef};
/// use uuid::Uuid;
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(CoachEvent::fact_recorded(
///     FactKind::DietPlan,
///     StudentRef::User(Uuid::new_v4()),
///     Uuid::new_v4(),
/// ));
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "FactRecorded");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CoachEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered per subscriber before the
    /// oldest are dropped and the subscriber observes `Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<CoachEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CoachEvent,
    ) -> Result<usize, broadcast::error::SendError<CoachEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: CoachEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
