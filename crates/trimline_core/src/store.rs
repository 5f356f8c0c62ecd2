use crate::types::*;
use std::fmt;
use tokio::sync::watch;

pub type SubscriptionId = u64;

/// One notification per `replace_all`, carrying the list as it now stands.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub revision: u64,
    pub segments: Vec<Segment>,
    pub options: ReplaceOptions,
}

type Subscriber = Box<dyn FnMut(&StoreChange)>;

/// The single owned copy of segment state.
///
/// Every change is a whole-list replacement with copied records. Subscribers
/// run synchronously inside `replace_all`, in subscription order.
pub struct SegmentStore {
    segments: Vec<Segment>,
    revision: u64,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: SubscriptionId,
    mirror: watch::Sender<Vec<Segment>>,
}

impl SegmentStore {
    pub fn new() -> Self {
        let (mirror, _) = watch::channel(Vec::new());
        Self {
            segments: Vec::new(),
            revision: 0,
            subscribers: Vec::new(),
            next_subscription: 0,
            mirror,
        }
    }

    pub fn replace_all(&mut self, segments: &[Segment], options: ReplaceOptions) -> u64 {
        self.segments = segments.to_vec();
        self.revision += 1;
        self.mirror.send_replace(self.segments.clone());

        let change = StoreChange {
            revision: self.revision,
            segments: self.segments.clone(),
            options,
        };
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&change);
        }
        self.revision
    }

    pub fn get(&self) -> &[Segment] {
        &self.segments
    }

    pub fn find(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    /// Owned copy in timeline order.
    pub fn sorted(&self) -> Vec<Segment> {
        sorted_refs(&self.segments).into_iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&StoreChange) + 'static) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    /// Receiver that always holds the latest list, for readers living on
    /// other tasks (the auto-save timer reads it at fire time).
    pub fn mirror(&self) -> watch::Receiver<Vec<Segment>> {
        self.mirror.subscribe()
    }
}

impl Default for SegmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SegmentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentStore")
            .field("segments", &self.segments)
            .field("revision", &self.revision)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
