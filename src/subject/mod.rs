//! Multi-subscriber broadcast primitive.
//!
//! A [`BroadcastSubject`] fans a single logical value stream out to any number
//! of independent [`Subscription`] streams. Each subscription owns its own
//! buffer, so a slow consumer never holds back the producer or its siblings.

mod channel;


use std::{
    collections::HashMap,
    fmt,
    pin::Pin,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
    task::{Context, Poll},
};

use futures::Stream;
use tracing::{debug, trace};

use channel::{Sink, Source};

/// Whether a newly joined subscriber receives the most recent value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayPolicy {
    /// Deliver the last sent value (if any) before any live value.
    #[default]
    ReplayLast,
    /// Deliver nothing until the next [`BroadcastSubject::send`].
    AwaitNext,
}

/// Buffering strategy of a single subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferPolicy {
    /// Buffer every value until the consumer reads it.
    #[default]
    Unbounded,
    /// Keep only the most recent values; the oldest buffered value is
    /// discarded when a new one arrives at capacity. Zero is treated as one,
    /// and the capacity is rounded up to the next power of two.
    Newest(usize),
}

/// Opaque identifier of a registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Registry<T> {
    subscribers: HashMap<SubscriberId, Sink<T>>,
    last: Option<T>,
    finished: bool,
}

struct Shared<T> {
    registry: Mutex<Registry<T>>,
    next_id: AtomicU64,
    replay: ReplayPolicy,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Registry<T>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fans a stream of values out to independent subscribers.
///
/// All registry mutation (subscribe, cancel, send, finish) happens under one
/// mutex, so a subscriber is either fully registered before a send walks the
/// registry or not registered at all. Within a single subscription values
/// arrive in send order; no order is promised across subscriptions.
///
/// Each subscriber is fed through its own tokio channel, so dropping a
/// registry entry (on finish, or when the last clone of the subject is
/// dropped) ends that subscription after it drains its buffer.
pub struct BroadcastSubject<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for BroadcastSubject<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + 'static> BroadcastSubject<T> {
    /// Create a subject with the given replay policy.
    pub fn new(replay: ReplayPolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry {
                    subscribers: HashMap::new(),
                    last: None,
                    finished: false,
                }),
                next_id: AtomicU64::new(1),
                replay,
            }),
        }
    }

    /// Create a subject that replays the last value to new subscribers.
    pub fn replay_last() -> Self {
        Self::new(ReplayPolicy::ReplayLast)
    }

    /// Create a subject whose subscribers only see values sent after joining.
    pub fn await_next() -> Self {
        Self::new(ReplayPolicy::AwaitNext)
    }

    /// The replay policy chosen at construction.
    pub fn replay_policy(&self) -> ReplayPolicy {
        self.shared.replay
    }

    /// Record `value` as the latest value and push it to every registered
    /// subscriber exactly once.
    ///
    /// Sending after [`finish`](Self::finish) is a no-op.
    pub fn send(&self, value: T) {
        let mut registry = self.shared.lock();
        if registry.finished {
            trace!("send ignored, subject finished");
            return;
        }

        for sink in registry.subscribers.values() {
            sink.push(value.clone());
        }

        registry.last = Some(value);
    }

    /// Subscribe with an unbounded buffer.
    pub fn subscribe(&self) -> Subscription<T> {
        self.subscribe_with(BufferPolicy::Unbounded)
    }

    /// Subscribe with an explicit buffer policy.
    ///
    /// Under [`ReplayPolicy::ReplayLast`] the latest value is enqueued before
    /// the subscriber becomes visible to concurrent senders, so it always
    /// precedes live values. After [`finish`](Self::finish) the returned
    /// subscription is already terminated.
    pub fn subscribe_with(&self, policy: BufferPolicy) -> Subscription<T> {
        let id = SubscriberId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let (sink, source) = channel::channel(policy);

        {
            let mut registry = self.shared.lock();

            if registry.finished {
                drop(sink);
                debug!(subscriber = %id, "subscribed to finished subject");
            } else {
                if self.shared.replay == ReplayPolicy::ReplayLast {
                    if let Some(last) = &registry.last {
                        sink.push(last.clone());
                    }
                }

                registry.subscribers.insert(id, sink);
                debug!(
                    subscriber = %id,
                    active = registry.subscribers.len(),
                    "subscriber registered"
                );
            }
        }

        Subscription {
            id,
            policy,
            source,
            subject: Arc::downgrade(&self.shared),
        }
    }

    /// Signal end-of-stream to every subscriber and forget them.
    ///
    /// Terminal: later sends are ignored and later subscriptions complete
    /// immediately without replay.
    pub fn finish(&self) {
        let mut registry = self.shared.lock();
        registry.finished = true;
        registry.last = None;

        let closed = registry.subscribers.len();
        registry.subscribers.clear();

        debug!(closed, "subject finished");
    }

    /// Whether [`finish`](Self::finish) has been called.
    pub fn is_finished(&self) -> bool {
        self.shared.lock().finished
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().subscribers.len()
    }

    /// The most recently sent value, if any and not finished.
    pub fn latest(&self) -> Option<T> {
        self.shared.lock().last.clone()
    }
}

impl<T: Clone + Send + 'static> Default for BroadcastSubject<T> {
    fn default() -> Self {
        Self::new(ReplayPolicy::default())
    }
}

impl<T> fmt::Debug for BroadcastSubject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.shared.lock();
        f.debug_struct("BroadcastSubject")
            .field("replay", &self.shared.replay)
            .field("subscribers", &registry.subscribers.len())
            .field("finished", &registry.finished)
            .finish()
    }
}

/// One subscriber's view of a [`BroadcastSubject`].
///
/// Dropping the subscription deregisters it from the subject. Deregistration
/// is idempotent and safe after the subject has finished or been dropped.
pub struct Subscription<T> {
    id: SubscriberId,
    policy: BufferPolicy,
    source: Source<T>,
    subject: Weak<Shared<T>>,
}

impl<T> Subscription<T> {
    /// Identifier assigned at subscription time.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// The buffer policy chosen at subscription time.
    pub fn buffer_policy(&self) -> BufferPolicy {
        self.policy
    }

    /// Stop listening. Equivalent to dropping the subscription.
    pub fn cancel(self) {}
}

impl<T: Clone + Send + 'static> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        Pin::new(&mut self.source).poll_next(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.subject.upgrade() {
            let removed = shared.lock().subscribers.remove(&self.id).is_some();
            if removed {
                trace!(subscriber = %self.id, "subscriber cancelled");
            }
        }
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("policy", &self.policy)
            .finish()
    }
}
