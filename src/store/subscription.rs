use std::{
    pin::Pin,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    task::{Context, Poll, Waker},
};

use futures::Stream;

/// Runs once when a subscription is torn down, detaching whatever the bridge
/// registered on the backend for this subscriber.
pub(crate) type Teardown = Box<dyn FnOnce() + Send>;

struct SubscriptionState {
    cancelled: AtomicBool,
    teardown: Mutex<Option<Teardown>>,
    waker: Mutex<Option<Waker>>,
}

impl SubscriptionState {
    fn new(teardown: Teardown) -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            teardown: Mutex::new(Some(teardown)),
            waker: Mutex::new(None),
        }
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let teardown = {
            let mut slot = match self.teardown.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            slot.take()
        };
        if let Some(teardown) = teardown {
            teardown();
        }
        let waker = {
            let mut slot = match self.waker.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            slot.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn register_waker(&self, waker: &Waker) {
        let mut slot = match self.waker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(waker.clone());
    }
}

/// A live registration for change notifications on one key.
///
/// Owned by the caller and consumed as a [`Stream`] of typed values. The
/// subscription ends when [`cancel`](Subscription::cancel) is called or the
/// handle is dropped; both detach the backend observer before returning, so
/// no event is delivered strictly after cancellation. Events already buffered
/// at cancel time are discarded, not delivered.
pub struct Subscription<T> {
    key: String,
    inner: Option<Pin<Box<dyn Stream<Item = T> + Send>>>,
    state: Arc<SubscriptionState>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(
        key: &str,
        inner: Pin<Box<dyn Stream<Item = T> + Send>>,
        teardown: Teardown,
    ) -> Self {
        Self {
            key: key.to_string(),
            inner: Some(inner),
            state: Arc::new(SubscriptionState::new(teardown)),
        }
    }

    /// The key this subscription observes.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Cancels the subscription.
    ///
    /// Idempotent and callable from any execution context. After this
    /// returns, the backend observer is detached and the stream yields
    /// nothing further.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// Whether the subscription has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    /// A detached handle that can cancel this subscription from elsewhere,
    /// e.g. from a task that does not own the stream.
    pub fn handle(&self) -> SubscriptionHandle {
        SubscriptionHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        if this.state.is_cancelled() {
            this.inner = None;
            return Poll::Ready(None);
        }
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };
        let poll = inner.as_mut().poll_next(cx);
        if poll.is_pending() {
            this.state.register_waker(cx.waker());
            // cancel may have landed between the check above and the waker
            // store, taking an empty slot; re-check so this poll ends the
            // stream itself instead of parking with no one left to wake it
            if this.state.is_cancelled() {
                this.inner = None;
                return Poll::Ready(None);
            }
        }
        poll
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.state.cancel();
    }
}

/// Clonable cancellation handle for a [`Subscription`].
#[derive(Clone)]
pub struct SubscriptionHandle {
    state: Arc<SubscriptionState>,
}

impl SubscriptionHandle {
    /// Cancels the subscription this handle mirrors. Idempotent.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// Whether the mirrored subscription has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }
}
