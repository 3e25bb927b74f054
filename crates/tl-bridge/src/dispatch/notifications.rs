//! # Notification Stream
//!
//! Fan-out of uncorrelated inbound messages to subscribers.
//!
//! Each subscriber owns an unbounded queue, so a slow subscriber never
//! stalls the receive loop or loses messages. Only the receive loop
//! publishes, so every subscriber sees notifications in transport order.

use crate::domain::message::Notification;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tracing::debug;

/// Selects which notifications a subscriber receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    /// Accepted type names. Empty means all.
    pub kinds: Vec<String>,
}

impl NotificationFilter {
    /// Create a filter that accepts all notifications.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific type names (e.g. `updateSyncState`).
    #[must_use]
    pub fn kinds<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if a notification matches this filter.
    #[must_use]
    pub fn matches(&self, notification: &Notification) -> bool {
        self.kinds.is_empty() || self.kinds.iter().any(|k| *k == notification.kind)
    }
}

struct Subscriber {
    filter: NotificationFilter,
    sender: mpsc::UnboundedSender<Notification>,
}

/// Publishing side of the notification stream.
pub struct NotificationHub {
    /// `None` once closed
    subscribers: Mutex<Option<Vec<Subscriber>>>,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Some(Vec::new())),
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Attach a subscriber. After [`close`](Self::close) the returned
    /// stream is already finished.
    pub fn subscribe(&self, filter: NotificationFilter) -> NotificationStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut guard = self.subscribers.lock();
        if let Some(subscribers) = guard.as_mut() {
            subscribers.retain(|s| !s.sender.is_closed());
            debug!(kinds = ?filter.kinds, "New notification subscription");
            subscribers.push(Subscriber { filter, sender });
        }
        NotificationStream::new(receiver)
    }

    /// Deliver `notification` to every matching subscriber.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, notification: Notification) -> usize {
        let mut guard = self.subscribers.lock();
        let Some(subscribers) = guard.as_mut() else {
            return 0;
        };

        subscribers.retain(|s| !s.sender.is_closed());
        self.published.fetch_add(1, Ordering::Relaxed);

        let mut delivered = 0;
        for subscriber in subscribers.iter() {
            if subscriber.filter.matches(&notification)
                && subscriber.sender.send(notification.clone()).is_ok()
            {
                delivered += 1;
            }
        }

        if delivered == 0 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(kind = %notification.kind, "Notification had no subscriber");
        }
        delivered
    }

    /// End every stream. Later subscriptions end immediately.
    pub fn close(&self) {
        if let Some(subscribers) = self.subscribers.lock().take() {
            debug!(subscribers = subscribers.len(), "Notification hub closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.subscribers.lock().is_none()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .as_ref()
            .map(|subs| subs.iter().filter(|s| !s.sender.is_closed()).count())
            .unwrap_or(0)
    }

    /// Notifications published so far
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Notifications no subscriber received
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy, unbounded sequence of notifications.
///
/// Ends once the client closes or loses its transport; it cannot be
/// restarted. Implements `tokio_stream::Stream`.
pub struct NotificationStream {
    receiver: mpsc::UnboundedReceiver<Notification>,
}

impl NotificationStream {
    fn new(receiver: mpsc::UnboundedReceiver<Notification>) -> Self {
        Self { receiver }
    }

    /// Receive the next notification.
    ///
    /// Returns `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.receiver.recv().await
    }

    /// Receive the next notification if one is already queued.
    pub fn try_recv(&mut self) -> Option<Notification> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for NotificationStream {
    type Item = Notification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
