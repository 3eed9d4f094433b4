//! Typed publish/subscribe bus for store mutations.

use crate::model::kind::EntityKind;
use crate::model::workspace::WorkspaceId;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle returned by `subscribe*`, used to unsubscribe.
pub type SubscriptionId = u64;

type Callback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// "Something in this collection changed; refetch it."
///
/// Carries no diff and no record identity by contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub workspace: WorkspaceId,
    pub kind: EntityKind,
}

impl ChangeEvent {
    pub fn new(workspace: &WorkspaceId, kind: EntityKind) -> Self {
        Self {
            workspace: workspace.clone(),
            kind,
        }
    }
}

#[derive(Clone)]
enum Subscriber {
    Callback(Callback),
    Channel(Sender<ChangeEvent>),
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    subscribers: Mutex<BTreeMap<SubscriptionId, Subscriber>>,
}

/// Cloneable handle to one process-wide subscriber registry.
///
/// Clones share subscribers, so every service built from the same
/// context notifies the same observers.
#[derive(Clone, Default)]
pub struct ChangeBus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback invoked synchronously on every event.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.register(Subscriber::Callback(Arc::new(callback)))
    }

    /// Registers a channel subscriber; events queue until the receiver drains.
    ///
    /// Dropping the receiver unsubscribes on the next emit.
    pub fn subscribe_channel(&self) -> (SubscriptionId, Receiver<ChangeEvent>) {
        let (sender, receiver) = mpsc::channel();
        (self.register(Subscriber::Channel(sender)), receiver)
    }

    /// Removes one subscriber; returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers().remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    /// Delivers `event` to every subscriber.
    ///
    /// Subscribers run outside the registry lock, so they may query the
    /// store, subscribe, unsubscribe or emit again.
    pub fn emit(&self, event: ChangeEvent) {
        let snapshot: Vec<(SubscriptionId, Subscriber)> = self
            .subscribers()
            .iter()
            .map(|(id, subscriber)| (*id, subscriber.clone()))
            .collect();

        debug!(
            "event=change_emit module=events status=ok kind={} workspace={} subscribers={}",
            event.kind,
            event.workspace,
            snapshot.len()
        );

        let mut disconnected = Vec::new();
        for (id, subscriber) in snapshot {
            match subscriber {
                Subscriber::Callback(callback) => callback(&event),
                Subscriber::Channel(sender) => {
                    if sender.send(event.clone()).is_err() {
                        disconnected.push(id);
                    }
                }
            }
        }

        if !disconnected.is_empty() {
            let mut subscribers = self.subscribers();
            for id in &disconnected {
                subscribers.remove(id);
            }
            debug!(
                "event=change_unsubscribe module=events status=ok reason=receiver_dropped count={}",
                disconnected.len()
            );
        }
    }

    fn register(&self, subscriber: Subscriber) -> SubscriptionId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers().insert(id, subscriber);
        id
    }

    fn subscribers(&self) -> MutexGuard<'_, BTreeMap<SubscriptionId, Subscriber>> {
        self.inner.subscribers.lock().unwrap_or_else(|poisoned| {
            warn!("event=change_bus_poisoned module=events status=recovered");
            PoisonError::into_inner(poisoned)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeBus, ChangeEvent};
    use crate::model::kind::EntityKind;
    use crate::model::workspace::WorkspaceId;
    use std::sync::{Arc, Mutex};

    fn event(kind: EntityKind) -> ChangeEvent {
        ChangeEvent::new(&WorkspaceId::parse_or("team", "default"), kind)
    }

    #[test]
    fn callbacks_run_in_subscription_order() {
        let bus = ChangeBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for label in ["first", "second"] {
            let seen = Arc::clone(&seen);
            bus.subscribe(move |_| seen.lock().unwrap().push(label));
        }

        bus.emit(event(EntityKind::Timer));
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn dropped_receivers_are_pruned_on_emit() {
        let bus = ChangeBus::new();
        let (_, receiver) = bus.subscribe_channel();
        drop(receiver);
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit(event(EntityKind::Voting));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn callback_may_emit_reentrantly() {
        let bus = ChangeBus::new();
        let (_, receiver) = bus.subscribe_channel();
        let inner = bus.clone();
        bus.subscribe(move |event| {
            if event.kind == EntityKind::Meetings {
                inner.emit(ChangeEvent::new(&event.workspace, EntityKind::Draft));
            }
        });

        bus.emit(event(EntityKind::Meetings));
        let kinds: Vec<EntityKind> = receiver.try_iter().map(|event| event.kind).collect();
        assert_eq!(kinds, vec![EntityKind::Meetings, EntityKind::Draft]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = ChangeBus::new();
        let (id, receiver) = bus.subscribe_channel();
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));

        bus.emit(event(EntityKind::Presence));
        assert!(receiver.try_recv().is_err());
    }
}
