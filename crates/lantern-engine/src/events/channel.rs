use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use anyhow::Result;

/// When listeners run relative to `publish`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Delivery {
    /// `publish` invokes every listener before returning.
    Immediate,
    /// `publish` only enqueues; listeners run on [`EventChannel::deliver`].
    Deferred,
}

/// Handle returned by `listen`, used to unsubscribe.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Subscription(u64);

type Listener<T> = Box<dyn FnMut(&mut T) -> Result<()>>;

struct Slot<T> {
    id: u64,
    active: Cell<bool>,
    listener: RefCell<Listener<T>>,
}

struct Inner<T> {
    delivery: Cell<Delivery>,
    queue: RefCell<VecDeque<T>>,
    listeners: RefCell<Vec<Rc<Slot<T>>>>,
    next_id: Cell<u64>,
}

/// Typed publish/subscribe channel with optional deferred delivery.
///
/// Cloning a channel yields another handle to the same queue and listener
/// list, so a listener can capture a clone and publish back into it.
///
/// Listeners receive the value by `&mut` so they can flag it (e.g. cancel
/// propagation). A flagged value is still handed to every later listener;
/// flags are advisory for downstream observers.
///
/// Channels are single-threaded. Everything runs on the loop thread.
pub struct EventChannel<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for EventChannel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> EventChannel<T> {
    pub fn new(delivery: Delivery) -> Self {
        Self {
            inner: Rc::new(Inner {
                delivery: Cell::new(delivery),
                queue: RefCell::new(VecDeque::new()),
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    pub fn immediate() -> Self {
        Self::new(Delivery::Immediate)
    }

    pub fn deferred() -> Self {
        Self::new(Delivery::Deferred)
    }

    pub fn delivery(&self) -> Delivery {
        self.inner.delivery.get()
    }

    pub fn is_deferred(&self) -> bool {
        self.delivery() == Delivery::Deferred
    }

    /// Switches delivery mode.
    ///
    /// Leaving deferred mode delivers whatever is still queued, so no value is
    /// stranded in a queue that nothing drains anymore.
    pub fn set_deferred(&self, deferred: bool) -> Result<()> {
        let was_deferred = self.is_deferred();
        self.inner.delivery.set(if deferred {
            Delivery::Deferred
        } else {
            Delivery::Immediate
        });

        if was_deferred && !deferred {
            self.drain_queue()
        } else {
            Ok(())
        }
    }

    /// Registers an infallible listener.
    pub fn listen<F>(&self, mut listener: F) -> Subscription
    where
        F: FnMut(&mut T) + 'static,
    {
        self.try_listen(move |value| {
            listener(value);
            Ok(())
        })
    }

    /// Registers a listener whose errors propagate to whoever triggered
    /// delivery.
    pub fn try_listen<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&mut T) -> Result<()> + 'static,
    {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id.wrapping_add(1));

        self.inner.listeners.borrow_mut().push(Rc::new(Slot {
            id,
            active: Cell::new(true),
            listener: RefCell::new(Box::new(listener)),
        }));

        Subscription(id)
    }

    /// Removes a listener. Returns `false` if it was not registered.
    ///
    /// A listener removed while a value is being dispatched does not see the
    /// rest of that dispatch.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        match listeners.iter().position(|s| s.id == subscription.0) {
            Some(pos) => {
                let slot = listeners.remove(pos);
                slot.active.set(false);
                true
            }
            None => false,
        }
    }

    /// Publishes a value.
    ///
    /// Deferred: enqueues and returns. Immediate: runs every listener now and
    /// returns the first listener error.
    pub fn publish(&self, value: T) -> Result<()> {
        match self.delivery() {
            Delivery::Deferred => {
                self.inner.queue.borrow_mut().push_back(value);
                Ok(())
            }
            Delivery::Immediate => {
                let mut value = value;
                self.dispatch(&mut value)
            }
        }
    }

    /// Delivers every queued value in FIFO order.
    ///
    /// The queue is captured and cleared first: values published while this
    /// runs are held for the next call. On a listener error the rest of the
    /// captured batch is dropped and the error is returned.
    pub fn deliver(&self) -> Result<()> {
        self.drain_queue()
    }

    /// Number of values waiting for `deliver`.
    pub fn pending(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    fn drain_queue(&self) -> Result<()> {
        let batch = std::mem::take(&mut *self.inner.queue.borrow_mut());
        for mut value in batch {
            self.dispatch(&mut value)?;
        }
        Ok(())
    }

    fn dispatch(&self, value: &mut T) -> Result<()> {
        // Snapshot so listeners may subscribe/unsubscribe/publish while running.
        let snapshot: Vec<Rc<Slot<T>>> = self.inner.listeners.borrow().clone();

        for slot in snapshot {
            if !slot.active.get() {
                continue;
            }

            // A listener that publishes into an immediate channel it listens
            // to would re-enter itself; it is skipped for the nested value.
            let Ok(mut listener) = slot.listener.try_borrow_mut() else {
                log::trace!("skipping re-entrant listener {}", slot.id);
                continue;
            };

            listener(value)?;
        }

        Ok(())
    }
}

impl<T> fmt::Debug for EventChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("delivery", &self.inner.delivery.get())
            .field("pending", &self.inner.queue.borrow().len())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping {
        n: u32,
        cancelled: bool,
    }

    fn ping(n: u32) -> Ping {
        Ping { n, cancelled: false }
    }

    fn recorder<T: Clone + 'static>(ch: &EventChannel<T>) -> Rc<RefCell<Vec<T>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        ch.listen(move |v: &mut T| sink.borrow_mut().push(v.clone()));
        seen
    }

    #[test]
    fn deferred_publish_does_not_invoke_listeners() {
        let ch = EventChannel::deferred();
        let seen = recorder(&ch);

        ch.publish(ping(1)).unwrap();

        assert!(seen.borrow().is_empty());
        assert_eq!(ch.pending(), 1);
    }

    #[test]
    fn deliver_preserves_publish_order_exactly_once() {
        let ch = EventChannel::deferred();
        let seen = recorder(&ch);

        for n in 0..5 {
            ch.publish(ping(n)).unwrap();
        }
        ch.deliver().unwrap();
        ch.deliver().unwrap();

        let ns: Vec<u32> = seen.borrow().iter().map(|p| p.n).collect();
        assert_eq!(ns, vec![0, 1, 2, 3, 4]);
        assert_eq!(ch.pending(), 0);
    }

    #[test]
    fn immediate_publish_runs_synchronously() {
        let ch = EventChannel::immediate();
        let seen = recorder(&ch);

        ch.publish(ping(7)).unwrap();

        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(ch.pending(), 0);
    }

    #[test]
    fn value_published_during_deliver_waits_for_next_pass() {
        let ch: EventChannel<Ping> = EventChannel::deferred();
        let seen = recorder(&ch);

        let again = ch.clone();
        ch.listen(move |p| {
            if p.n == 1 {
                again.publish(ping(2)).unwrap();
            }
        });

        ch.publish(ping(1)).unwrap();
        ch.deliver().unwrap();
        assert_eq!(seen.borrow().iter().map(|p| p.n).collect::<Vec<_>>(), vec![1]);
        assert_eq!(ch.pending(), 1);

        ch.deliver().unwrap();
        assert_eq!(seen.borrow().iter().map(|p| p.n).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn cancelled_value_still_reaches_later_listeners() {
        let ch: EventChannel<Ping> = EventChannel::deferred();
        ch.listen(|p| p.cancelled = true);
        let seen = recorder(&ch);

        ch.publish(ping(3)).unwrap();
        ch.deliver().unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].cancelled);
    }

    #[test]
    fn listener_error_propagates_and_drops_rest_of_batch() {
        let ch: EventChannel<Ping> = EventChannel::deferred();
        ch.try_listen(|p| {
            anyhow::ensure!(p.n != 1, "boom on {}", p.n);
            Ok(())
        });
        let seen = recorder(&ch);

        ch.publish(ping(0)).unwrap();
        ch.publish(ping(1)).unwrap();
        ch.publish(ping(2)).unwrap();

        let err = ch.deliver().unwrap_err();
        assert!(err.to_string().contains("boom on 1"));
        assert_eq!(seen.borrow().iter().map(|p| p.n).collect::<Vec<_>>(), vec![0]);
        assert_eq!(ch.pending(), 0);
    }

    #[test]
    fn unsubscribed_listener_stops_receiving() {
        let ch = EventChannel::deferred();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let sub = ch.listen(move |_: &mut Ping| c.set(c.get() + 1));

        ch.publish(ping(0)).unwrap();
        ch.deliver().unwrap();
        assert!(ch.unsubscribe(sub));
        assert!(!ch.unsubscribe(sub));

        ch.publish(ping(1)).unwrap();
        ch.deliver().unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(ch.listener_count(), 0);
    }

    #[test]
    fn listener_added_during_dispatch_joins_afterwards() {
        let ch: EventChannel<Ping> = EventChannel::deferred();
        let late = Rc::new(Cell::new(0));

        let handle = ch.clone();
        let late_c = Rc::clone(&late);
        let mut added = false;
        ch.listen(move |_| {
            if !added {
                added = true;
                let l = Rc::clone(&late_c);
                handle.listen(move |_| l.set(l.get() + 1));
            }
        });

        ch.publish(ping(0)).unwrap();
        ch.publish(ping(1)).unwrap();
        ch.deliver().unwrap();

        // Added while dispatching value 0, so only value 1 reaches it.
        assert_eq!(late.get(), 1);
    }

    #[test]
    fn leaving_deferred_mode_flushes_queue() {
        let ch = EventChannel::deferred();
        let seen = recorder(&ch);

        ch.publish(ping(1)).unwrap();
        ch.set_deferred(false).unwrap();
        assert_eq!(seen.borrow().len(), 1);

        ch.publish(ping(2)).unwrap();
        assert_eq!(seen.borrow().len(), 2);
        assert!(!ch.is_deferred());
    }

    #[test]
    fn nested_immediate_publish_skips_running_listener() {
        let ch: EventChannel<Ping> = EventChannel::immediate();
        let seen = recorder(&ch);

        let again = ch.clone();
        ch.listen(move |p| {
            if p.n == 0 {
                again.publish(ping(1)).unwrap();
            }
        });

        ch.publish(ping(0)).unwrap();
        assert_eq!(seen.borrow().iter().map(|p| p.n).collect::<Vec<_>>(), vec![0, 1]);
    }
}
