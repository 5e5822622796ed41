//! Timer-backed cancellation for the `timeout` goal combinator (§4.3, §7).
//!
//! A push-based engine does not poll a shared stop flag; instead the timer
//! callback must be able to push an error event onto whichever stream it is
//! guarding. This module uses a `ThreadTimer` callback, but each call to
//! [with_timeout] owns its own timer rather than sharing one global flag,
//! since more than one `timeout(...)` goal may be in flight within a single
//! run.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thread_timer::ThreadTimer;

use crate::error::EngineError;
use crate::stream::{Event, Stream, Subscription};
use crate::substitution::Subst;

/// Mirrors `source`'s events, but if `ms` milliseconds elapse before
/// `source` completes, emits [EngineError::Timeout] and unsubscribes from
/// it instead.
///
/// `Subst` and the observer callback are `Rc`-based and so, like everything
/// else in this engine (§5), stay on the owning thread. The background
/// `ThreadTimer` thread is only ever allowed to touch a `Send`-safe
/// `Arc<AtomicBool>` flag — the sole boundary between the timer thread and
/// the query thread. The flag is consulted synchronously, at subscribe
/// time and on every event the source delivers, rather than pushed across
/// the thread boundary.
pub fn with_timeout(source: Stream<Subst>, ms: u64) -> Stream<Subst> {
    Stream::new(move |mut obs| {
        let fired = Arc::new(AtomicBool::new(false));
        let timer = ThreadTimer::new();
        let fired_for_timer = Arc::clone(&fired);
        let _ = timer.start(Duration::from_millis(ms), move || {
            fired_for_timer.store(true, Ordering::SeqCst);
        });

        let done = Rc::new(RefCell::new(false));
        let sub_cell: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let done2 = Rc::clone(&done);
        let fired2 = Arc::clone(&fired);
        let sub_cell2 = Rc::clone(&sub_cell);
        let sub = source.subscribe(move |ev| {
            if *done2.borrow() { return; }
            if fired2.load(Ordering::SeqCst) {
                *done2.borrow_mut() = true;
                if let Some(s) = sub_cell2.borrow().as_ref() { s.unsubscribe(); }
                obs(Event::Error(Rc::new(EngineError::Timeout(ms))));
                return;
            }
            if matches!(ev, Event::Complete | Event::Error(_)) {
                *done2.borrow_mut() = true;
            }
            obs(ev);
        });
        *sub_cell.borrow_mut() = Some(sub.clone());

        Subscription::new(move || {
            *done.borrow_mut() = true;
            sub.unsubscribe();
            let _ = timer.cancel();
        })
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use serial_test::serial;
    use std::thread;

    #[test]
    #[serial]
    fn completes_normally_when_faster_than_timeout() {
        let source = Stream::singleton(Subst::empty());
        let (values, err) = with_timeout(source, 50).drain();
        assert_eq!(values.len(), 1);
        assert!(err.is_none());
    }

    /// A producer that emits a handful of values with a real sleep between
    /// each, standing in for a host back-end that takes longer per row than
    /// the caller is willing to wait (§6, §7). Since this engine's timer
    /// flag is only ever consulted at event-delivery time (the boundary the
    /// timer thread is allowed to cross is an `AtomicBool`, not a `Subst`),
    /// a producer that yields between items is exactly the case `timeout`
    /// is able to interrupt.
    fn slow_producer(delay_ms: u64, count: usize) -> Stream<Subst> {
        Stream::new(move |mut obs| {
            for _ in 0..count {
                thread::sleep(Duration::from_millis(delay_ms));
                obs(Event::Next(Subst::empty()));
            }
            obs(Event::Complete);
            Subscription::noop()
        })
    }

    #[test]
    #[serial]
    fn times_out_when_source_is_slower_than_the_deadline() {
        let guarded = with_timeout(slow_producer(15, 10), 20);
        let (values, err) = guarded.drain();
        assert!(values.len() < 10);
        assert!(matches!(err.as_deref(), Some(EngineError::Timeout(20))));
    }
}
