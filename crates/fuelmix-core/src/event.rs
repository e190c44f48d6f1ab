//! Typed mixer events and their bounded per-kind history.
//!
//! The facility emits events while it ticks. A host either reads the
//! per-kind [`EventBuffer`]s directly or registers listeners and calls
//! [`EventBus::deliver`] after each tick. Suppressed kinds are never
//! recorded.

use std::collections::VecDeque;

use crate::fixed::{Fixed64, Ticks};
use crate::planner::{StallReason, Stream};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A mixer event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixerEvent {
    /// A blend was produced and pushed to the output buffer.
    Mixed {
        quantity: Fixed64,
        filler_frac: Fixed64,
        fissile_frac: Fixed64,
        tick: Ticks,
    },
    /// An input stream limited the blend below throughput / output space.
    Constrained {
        stream: Stream,
        requested: Fixed64,
        reduced_to: Fixed64,
        tick: Ticks,
    },
    /// The solver reported that no ratio reaches the target.
    BlendInfeasible { fissile_frac: Fixed64, tick: Ticks },
    /// The facility stopped mixing. Emitted on transitions only.
    Stalled { reason: StallReason, tick: Ticks },
    /// The facility mixed again after a stall.
    Resumed { tick: Ticks },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Mixed,
    Constrained,
    BlendInfeasible,
    Stalled,
    Resumed,
}

const EVENT_KIND_COUNT: usize = 5;

impl MixerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MixerEvent::Mixed { .. } => EventKind::Mixed,
            MixerEvent::Constrained { .. } => EventKind::Constrained,
            MixerEvent::BlendInfeasible { .. } => EventKind::BlendInfeasible,
            MixerEvent::Stalled { .. } => EventKind::Stalled,
            MixerEvent::Resumed { .. } => EventKind::Resumed,
        }
    }

    pub fn tick(&self) -> Ticks {
        match self {
            MixerEvent::Mixed { tick, .. }
            | MixerEvent::Constrained { tick, .. }
            | MixerEvent::BlendInfeasible { tick, .. }
            | MixerEvent::Stalled { tick, .. }
            | MixerEvent::Resumed { tick } => *tick,
        }
    }
}

impl EventKind {
    const ALL: [EventKind; EVENT_KIND_COUNT] = [
        EventKind::Mixed,
        EventKind::Constrained,
        EventKind::BlendInfeasible,
        EventKind::Stalled,
        EventKind::Resumed,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer -- bounded history of one event kind
// ---------------------------------------------------------------------------

/// Bounded FIFO of events. Once `capacity` events are held, each new event
/// evicts the oldest.
#[derive(Debug, Clone)]
pub struct EventBuffer {
    events: VecDeque<MixerEvent>,
    capacity: usize,
    /// Events ever pushed, evicted ones included.
    total_written: u64,
    evicted: u64,
}

impl EventBuffer {
    /// A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            total_written: 0,
            evicted: 0,
        }
    }

    pub fn push(&mut self, event: MixerEvent) {
        if self.events.len() == self.capacity && self.events.pop_front().is_some() {
            self.evicted += 1;
        }
        self.events.push_back(event);
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Events evicted to make room for newer ones. Cleared events are not
    /// counted.
    pub fn dropped_count(&self) -> u64 {
        self.evicted
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &MixerEvent> + '_ {
        self.events.iter()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Read-only callback run by [`EventBus::deliver`].
pub type PassiveListener = Box<dyn FnMut(&MixerEvent) + Send>;

/// Everything the bus tracks for one event kind. The buffer is created on
/// the first emit.
#[derive(Default)]
struct Channel {
    buffer: Option<EventBuffer>,
    listeners: Vec<PassiveListener>,
    suppressed: bool,
}

/// Routes events into one [`EventBuffer`] per [`EventKind`].
pub struct EventBus {
    channels: [Channel; EVENT_KIND_COUNT],
    default_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            let ch = &self.channels[kind.slot()];
            map.entry(&kind, &(ch.suppressed, ch.buffer.as_ref().map_or(0, EventBuffer::len)));
        }
        map.finish()
    }
}

impl EventBus {
    /// `default_capacity` sizes each kind's buffer when it is first used.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            channels: Default::default(),
            default_capacity,
        }
    }

    fn channel(&self, kind: EventKind) -> &Channel {
        &self.channels[kind.slot()]
    }

    /// Stop recording a kind and drop anything already buffered for it.
    pub fn suppress(&mut self, kind: EventKind) {
        let ch = &mut self.channels[kind.slot()];
        ch.suppressed = true;
        ch.buffer = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.channel(kind).suppressed
    }

    pub fn emit(&mut self, event: MixerEvent) {
        let capacity = self.default_capacity;
        let ch = &mut self.channels[event.kind().slot()];
        if ch.suppressed {
            return;
        }
        ch.buffer.get_or_insert_with(|| EventBuffer::new(capacity)).push(event);
    }

    /// Listeners for a kind run in registration order.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.channels[kind.slot()].listeners.push(listener);
    }

    /// Hand every buffered event to the listeners of its kind, oldest first,
    /// and empty the buffers that had listeners.
    pub fn deliver(&mut self) {
        for ch in &mut self.channels {
            let Some(buffer) = ch.buffer.as_mut() else {
                continue;
            };
            if ch.listeners.is_empty() {
                continue;
            }
            for event in buffer.iter() {
                for listener in &mut ch.listeners {
                    listener(event);
                }
            }
            buffer.clear();
        }
    }

    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.channel(kind).buffer.as_ref()
    }

    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffer(kind).map_or(0, EventBuffer::len)
    }

    /// Includes evicted events.
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffer(kind).map_or(0, EventBuffer::total_written)
    }

    /// Empty every buffer. Listeners and suppression stay.
    pub fn clear_all(&mut self) {
        for buffer in self.channels.iter_mut().filter_map(|ch| ch.buffer.as_mut()) {
            buffer.clear();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn stalled(tick: Ticks) -> MixerEvent {
        MixerEvent::Stalled {
            reason: StallReason::OutputFull,
            tick,
        }
    }

    #[test]
    fn event_buffer_ring_wraps_and_drops_oldest() {
        let mut buf = EventBuffer::new(3);
        for t in 0..5 {
            buf.push(stalled(t));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.total_written(), 5);
        assert_eq!(buf.dropped_count(), 2);
        let ticks: Vec<Ticks> = buf.iter().map(MixerEvent::tick).collect();
        assert_eq!(ticks, vec![2, 3, 4]);
    }

    #[test]
    fn cleared_events_are_not_counted_as_dropped() {
        let mut buf = EventBuffer::new(3);
        for t in 0..3 {
            buf.push(stalled(t));
        }
        buf.clear();
        for t in 3..6 {
            buf.push(stalled(t));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.total_written(), 6);
        assert_eq!(buf.dropped_count(), 0);

        buf.push(stalled(6));
        assert_eq!(buf.dropped_count(), 1);
    }

    #[test]
    fn event_buffer_zero_capacity_clamped() {
        let mut buf = EventBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
        buf.push(stalled(1));
        buf.push(stalled(2));
        let ticks: Vec<Ticks> = buf.iter().map(MixerEvent::tick).collect();
        assert_eq!(ticks, vec![2]);
    }

    #[test]
    fn emit_routes_by_kind() {
        let mut bus = EventBus::new(16);
        bus.emit(stalled(0));
        bus.emit(MixerEvent::Resumed { tick: 1 });
        bus.emit(MixerEvent::Resumed { tick: 2 });
        assert_eq!(bus.buffered_count(EventKind::Stalled), 1);
        assert_eq!(bus.buffered_count(EventKind::Resumed), 2);
        assert_eq!(bus.buffered_count(EventKind::Mixed), 0);
    }

    #[test]
    fn suppressed_events_are_not_buffered() {
        let mut bus = EventBus::new(16);
        bus.suppress(EventKind::Stalled);
        bus.emit(stalled(0));
        assert!(bus.is_suppressed(EventKind::Stalled));
        assert!(bus.buffer(EventKind::Stalled).is_none());
        assert_eq!(bus.total_emitted(EventKind::Stalled), 0);
    }

    #[test]
    fn deliver_calls_listeners_and_clears() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut bus = EventBus::new(16);
        bus.on_passive(
            EventKind::Resumed,
            Box::new(move |e| sink.lock().unwrap().push(e.tick())),
        );
        bus.emit(MixerEvent::Resumed { tick: 4 });
        bus.emit(MixerEvent::Resumed { tick: 5 });
        bus.deliver();

        assert_eq!(*seen.lock().unwrap(), vec![4, 5]);
        assert_eq!(bus.buffered_count(EventKind::Resumed), 0);
        assert_eq!(bus.total_emitted(EventKind::Resumed), 2);
    }

    #[test]
    fn clear_all_keeps_suppression() {
        let mut bus = EventBus::new(4);
        bus.suppress(EventKind::Mixed);
        bus.emit(stalled(0));
        bus.clear_all();
        assert_eq!(bus.buffered_count(EventKind::Stalled), 0);
        assert!(bus.is_suppressed(EventKind::Mixed));
    }
}
