use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Handler = Arc<dyn Fn() + Send + Sync>;

// Fan-out for the "token needed" signal. Multiple observers (dashboard,
// harvesting trigger) register independently; each gets called once per
// genuine empty transition. Handler panics are swallowed so a broken observer
// cannot destabilize pool operations.
#[derive(Clone, Default)]
pub struct NeededNotifier {
    inner: Arc<NotifierInner>,
}

#[derive(Default)]
struct NotifierInner {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(u64, Handler)>>,
}

impl NeededNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F) -> NeededSubscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut handlers) = self.inner.handlers.lock() {
            handlers.push((id, Arc::new(handler)));
        }
        NeededSubscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .handlers
            .lock()
            .map(|handlers| handlers.len())
            .unwrap_or(0)
    }

    // Invoked while the pool lock is held, so handlers must stay lightweight
    // and must not call back into the pool.
    pub(crate) fn notify(&self) {
        let snapshot: Vec<Handler> = match self.inner.handlers.lock() {
            Ok(handlers) => handlers.iter().map(|(_, h)| h.clone()).collect(),
            Err(_) => return,
        };
        for handler in snapshot {
            if catch_unwind(AssertUnwindSafe(|| handler())).is_err() {
                tracing::debug!("Token-needed handler panicked; ignoring");
            }
        }
    }
}

// Dropping the subscription does not detach the handler; call unsubscribe.
pub struct NeededSubscription {
    id: u64,
    inner: Weak<NotifierInner>,
}

impl NeededSubscription {
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            if let Ok(mut handlers) = inner.handlers.lock() {
                handlers.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn notify_reaches_all_subscribers() {
        let notifier = NeededNotifier::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h1 = hits.clone();
        let _s1 = notifier.subscribe(move || {
            h1.fetch_add(1, Ordering::SeqCst);
        });
        let h2 = hits.clone();
        let _s2 = notifier.subscribe(move || {
            h2.fetch_add(1, Ordering::SeqCst);
        });

        notifier.notify();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_detaches_handler() {
        let notifier = NeededNotifier::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        let sub = notifier.subscribe(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(notifier.subscriber_count(), 1);

        sub.unsubscribe();
        assert_eq!(notifier.subscriber_count(), 0);

        notifier.notify();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_handler_does_not_poison_others() {
        let notifier = NeededNotifier::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let _bad = notifier.subscribe(|| panic!("observer bug"));
        let h = hits.clone();
        let _good = notifier.subscribe(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });

        notifier.notify();
        notifier.notify();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
