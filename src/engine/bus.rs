// src/engine/bus.rs

//! Typed fan-out of [`WatchEvent`]s to subscribers.

use std::collections::HashSet;

use tokio::sync::mpsc;
use tracing::trace;

use crate::types::{EventKind, WatchEvent};

#[derive(Debug)]
struct Subscriber {
    /// `None` means every kind.
    kinds: Option<HashSet<EventKind>>,
    tx: mpsc::UnboundedSender<WatchEvent>,
}

impl Subscriber {
    fn wants(&self, kind: EventKind) -> bool {
        self.kinds.as_ref().is_none_or(|k| k.contains(&kind))
    }
}

#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        kinds: Option<Vec<EventKind>>,
        tx: mpsc::UnboundedSender<WatchEvent>,
    ) {
        self.subscribers.push(Subscriber {
            kinds: kinds.map(|k| k.into_iter().collect()),
            tx,
        });
    }

    /// Deliver `event` to every interested subscriber. Subscribers whose
    /// receiver was dropped are pruned.
    pub fn emit(&mut self, event: WatchEvent) {
        let kind = event.kind();
        trace!(%kind, path = ?event.path(), "emit");
        self.subscribers
            .retain(|s| !s.wants(kind) || s.tx.send(event.clone()).is_ok());
        self.subscribers.retain(|s| !s.tx.is_closed());
    }

    /// Drop every subscriber; their receivers see the end of the stream.
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    pub fn has_subscribers(&mut self) -> bool {
        self.subscribers.retain(|s| !s.tx.is_closed());
        !self.subscribers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn filters_by_kind_and_prunes_dropped_receivers() {
        let mut bus = EventBus::new();
        let (all_tx, mut all_rx) = mpsc::unbounded_channel();
        let (watch_tx, mut watch_rx) = mpsc::unbounded_channel();
        let (gone_tx, gone_rx) = mpsc::unbounded_channel();
        bus.subscribe(None, all_tx);
        bus.subscribe(Some(vec![EventKind::Watch]), watch_tx);
        bus.subscribe(None, gone_tx);
        drop(gone_rx);

        bus.emit(WatchEvent::Unwatch(PathBuf::from("/a")));
        bus.emit(WatchEvent::Watch(PathBuf::from("/a")));

        assert_eq!(all_rx.try_recv().unwrap().kind(), EventKind::Unwatch);
        assert_eq!(all_rx.try_recv().unwrap().kind(), EventKind::Watch);
        assert_eq!(watch_rx.try_recv().unwrap().kind(), EventKind::Watch);
        assert!(watch_rx.try_recv().is_err());
        assert_eq!(bus.subscribers.len(), 2);

        bus.clear();
        assert!(!bus.has_subscribers());
        assert!(all_rx.try_recv().is_err());
    }
}
