//! # Event Bus System
//!
//! Typed notifications from the player core to the embedding host, delivered
//! over `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The event bus replaces per-callback props (`onReady`, `onPlay`, `onPause`,
//! `onEnded`, `onTimeUpdate`, `onError`, `onQualityChange`,
//! `onPuzzleComplete`) with one stream of [`CoreEvent`]s:
//! - **Event Types**: [`PlaybackEvent`] for the media lifecycle, [`GateEvent`]
//!   for challenge gates
//! - **EventBus**: Central broadcast channel the controller emits into
//! - **EventStream**: Receiver wrapper with optional filtering
//!
//! ```text
//! ┌────────────────────┐   emit   ┌───────────┐  subscribe  ┌──────────────┐
//! │ PlaybackController ├─────────>│ EventBus  ├────────────>│ UI overlay   │
//! └────────────────────┘          │ (broadcast│             └──────────────┘
//!                                 │  channel) │  subscribe  ┌──────────────┐
//!                                 │           ├────────────>│ Host bridge  │
//!                                 └───────────┘             └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, GateEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(64);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Gate(GateEvent::Activated {
//!         content_id: "lesson-1".to_string(),
//!         level: 1,
//!         trigger_time: 10.0,
//!     }))
//!     .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Gate(GateEvent::Activated { level: 1, .. })));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep
//!   receiving. Position updates are frequent, so UI subscribers should size
//!   the buffer accordingly or filter.
//! - **`RecvError::Closed`**: the controller and every bus clone were dropped.
//!
//! Emitting with no subscribers returns `Err(SendError)`; the controller
//! ignores it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 128;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Media lifecycle events
    Playback(PlaybackEvent),
    /// Challenge gate events
    Gate(GateEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Gate(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { fatal: true, .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::Error { fatal: false, .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Playback(PlaybackEvent::Ready { .. })
            | CoreEvent::Playback(PlaybackEvent::Completed { .. })
            | CoreEvent::Gate(GateEvent::Activated { .. })
            | CoreEvent::Gate(GateEvent::Solved { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Content the event refers to.
    pub fn content_id(&self) -> Option<&str> {
        match self {
            CoreEvent::Playback(e) => e.content_id(),
            CoreEvent::Gate(e) => Some(e.content_id()),
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events describing the media lifecycle of one content session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Metadata or manifest is available and playback can start.
    Ready {
        content_id: String,
        /// Number of adaptive quality levels (0 on the native path).
        quality_levels: usize,
    },
    /// Media started or resumed playing.
    Started {
        content_id: String,
        position_seconds: f64,
    },
    /// Media paused, by the user or by a gate.
    Paused {
        content_id: String,
        position_seconds: f64,
    },
    /// Media reached end-of-stream; the resume point was cleared.
    Completed { content_id: String },
    /// Time update from the media element.
    PositionChanged {
        content_id: String,
        position_seconds: f64,
        duration_seconds: f64,
    },
    /// Selected quality changed. `level == None` means automatic selection.
    QualityChanged {
        content_id: String,
        level: Option<usize>,
        name: Option<String>,
    },
    /// A saved position qualifies for the resume prompt.
    ResumeOffered {
        content_id: String,
        position_seconds: f64,
        percentage: u32,
    },
    /// Playback error. Fatal errors stop the controller until reload.
    Error {
        content_id: Option<String>,
        message: String,
        fatal: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Ready { .. } => "Playback ready",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Completed { .. } => "Playback completed",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::QualityChanged { .. } => "Quality changed",
            PlaybackEvent::ResumeOffered { .. } => "Resume offered",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }

    fn content_id(&self) -> Option<&str> {
        match self {
            PlaybackEvent::Ready { content_id, .. }
            | PlaybackEvent::Started { content_id, .. }
            | PlaybackEvent::Paused { content_id, .. }
            | PlaybackEvent::Completed { content_id }
            | PlaybackEvent::PositionChanged { content_id, .. }
            | PlaybackEvent::QualityChanged { content_id, .. }
            | PlaybackEvent::ResumeOffered { content_id, .. } => Some(content_id),
            PlaybackEvent::Error { content_id, .. } => content_id.as_deref(),
        }
    }
}

// ============================================================================
// Gate Events
// ============================================================================

/// Events describing challenge gates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum GateEvent {
    /// Playback paused and a challenge was mounted.
    Activated {
        content_id: String,
        level: u32,
        trigger_time: f64,
    },
    /// The widget reported a wrong answer.
    AttemptFailed {
        content_id: String,
        level: u32,
        attempts: u32,
    },
    /// The widget reported success; `level` is now completed.
    Solved {
        content_id: String,
        level: u32,
        attempts: u32,
        solve_time_seconds: Option<f64>,
    },
    /// Pacing delay before the next gate may activate.
    CooldownStarted {
        content_id: String,
        completed_level: u32,
        next_level: u32,
        cooldown_seconds: u64,
    },
    CooldownElapsed {
        content_id: String,
        next_level: u32,
    },
    /// A seek was rejected. `level` is the blocking gate, if any.
    SeekBlocked {
        content_id: String,
        requested_time: f64,
        level: Option<u32>,
    },
}

impl GateEvent {
    fn description(&self) -> &str {
        match self {
            GateEvent::Activated { .. } => "Gate activated",
            GateEvent::AttemptFailed { .. } => "Challenge attempt failed",
            GateEvent::Solved { .. } => "Gate solved",
            GateEvent::CooldownStarted { .. } => "Gate cooldown started",
            GateEvent::CooldownElapsed { .. } => "Gate cooldown elapsed",
            GateEvent::SeekBlocked { .. } => "Seek blocked",
        }
    }

    fn content_id(&self) -> &str {
        match self {
            GateEvent::Activated { content_id, .. }
            | GateEvent::AttemptFailed { content_id, .. }
            | GateEvent::Solved { content_id, .. }
            | GateEvent::CooldownStarted { content_id, .. }
            | GateEvent::CooldownElapsed { content_id, .. }
            | GateEvent::SeekBlocked { content_id, .. } => content_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender; every clone publishes into the same
/// channel. Each [`EventBus::subscribe`] call creates an independent receiver
/// that sees only events emitted after it subscribed.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus that buffers up to `capacity` events per
    /// subscriber before reporting `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error when nobody is subscribed.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(16);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::default();
/// let gates_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Gate(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`/`try_recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive a matching event without waiting.
    ///
    /// Returns `None` if no matching events are currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drains every matching event currently buffered.
    ///
    /// Lag notifications are skipped; a closed channel ends the drain.
    pub fn drain(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        loop {
            match self.try_recv() {
                Some(Ok(event)) => events.push(event),
                Some(Err(RecvError::Lagged(_))) => continue,
                Some(Err(RecvError::Closed)) | None => return events,
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
