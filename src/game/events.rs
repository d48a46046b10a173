use crate::game::input::ButtonParams;
use crate::game::note::NoteType;
use crate::game::pool::NoteHandle;
use log::debug;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum GameEvent {
    NoteSpawned {
        lane: usize,
        note: NoteHandle,
        note_type: NoteType,
    },
    NoteHit {
        lane: usize,
        note: NoteHandle,
        note_type: NoteType,
    },
    NoteMiss {
        lane: usize,
        note: NoteHandle,
        note_type: NoteType,
    },
    /// A press that found nothing inside the hit window.
    CompleteMiss { lane: usize },
    ButtonStateChanged {
        lane: usize,
        state: ButtonParams,
        color: [f32; 4],
    },
    /// One body segment of a hold note's chain; fired once per segment at activation.
    SegmentSpawned {
        lane: usize,
        note: NoteHandle,
        segment: usize,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    NoteSpawned,
    NoteHit,
    NoteMiss,
    CompleteMiss,
    ButtonStateChanged,
    SegmentSpawned,
}

impl GameEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::NoteSpawned { .. } => EventKind::NoteSpawned,
            GameEvent::NoteHit { .. } => EventKind::NoteHit,
            GameEvent::NoteMiss { .. } => EventKind::NoteMiss,
            GameEvent::CompleteMiss { .. } => EventKind::CompleteMiss,
            GameEvent::ButtonStateChanged { .. } => EventKind::ButtonStateChanged,
            GameEvent::SegmentSpawned { .. } => EventKind::SegmentSpawned,
        }
    }

    pub fn lane(&self) -> usize {
        match *self {
            GameEvent::NoteSpawned { lane, .. }
            | GameEvent::NoteHit { lane, .. }
            | GameEvent::NoteMiss { lane, .. }
            | GameEvent::CompleteMiss { lane }
            | GameEvent::ButtonStateChanged { lane, .. }
            | GameEvent::SegmentSpawned { lane, .. } => lane,
        }
    }
}

/// Identity of a subscriber. The same id can be registered at most once per kind.
pub type SubscriberId = &'static str;

type Callback = Box<dyn FnMut(&GameEvent)>;

struct Subscriber {
    id: SubscriberId,
    callback: Callback,
}

/// Per-kind subscriber lists, invoked synchronously in registration order.
#[derive(Default)]
pub struct EventBus {
    channels: Vec<(EventKind, Vec<Subscriber>)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for `kind`. Returns false, leaving the existing
    /// registration in place, if `id` is already subscribed to that kind.
    pub fn subscribe<F>(&mut self, kind: EventKind, id: SubscriberId, callback: F) -> bool
    where
        F: FnMut(&GameEvent) + 'static,
    {
        let subscribers = self.channel_mut(kind);
        if subscribers.iter().any(|s| s.id == id) {
            return false;
        }
        subscribers.push(Subscriber {
            id,
            callback: Box::new(callback),
        });
        true
    }

    pub fn unsubscribe(&mut self, kind: EventKind, id: SubscriberId) -> bool {
        let subscribers = self.channel_mut(kind);
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    pub fn clear(&mut self, kind: EventKind) {
        self.channel_mut(kind).clear();
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.channels
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, subs)| subs.len())
    }

    pub fn emit(&mut self, event: GameEvent) {
        debug!("{:?}", event);
        let kind = event.kind();
        if let Some((_, subscribers)) = self.channels.iter_mut().find(|(k, _)| *k == kind) {
            for subscriber in subscribers.iter_mut() {
                (subscriber.callback)(&event);
            }
        }
    }

    fn channel_mut(&mut self, kind: EventKind) -> &mut Vec<Subscriber> {
        match self.channels.iter().position(|(k, _)| *k == kind) {
            Some(pos) => &mut self.channels[pos].1,
            None => {
                self.channels.push((kind, Vec::new()));
                let last = self.channels.len() - 1;
                &mut self.channels[last].1
            }
        }
    }
}
