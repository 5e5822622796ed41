//! The push-based substitution stream (§4.2).
//!
//! This is the inversion of a *pull*-based backtracking driver into a
//! *push*-based one: a goal really is "stream in, stream out" rather than
//! "next solution, please", and producers drive consumers through an
//! ordinary subscribe/unsubscribe/callback-registry pattern.
//!
//! The engine is single-threaded and cooperative (§5): there is exactly one
//! driver per run, so every operator below is built on `Rc<RefCell<_>>`
//! rather than any `Send`/`Sync`/lock machinery.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::EngineError;

/// An event delivered to an observer. `next`/`error`/`complete` are mutually
/// exclusive in time: once `Error` or `Complete` is delivered, a
/// well-behaved producer sends nothing further.
pub enum Event<T> {
    Next(T),
    Error(Rc<EngineError>),
    Complete,
}

impl<T: Clone> Clone for Event<T> {
    fn clone(&self) -> Self {
        match self {
            Event::Next(v) => Event::Next(v.clone()),
            Event::Error(e) => Event::Error(Rc::clone(e)),
            Event::Complete => Event::Complete,
        }
    }
}

type ObserverFn<T> = Box<dyn FnMut(Event<T>)>;

/// A type-erased, cheaply-clonable handle to an observer callback. Centralizes
/// the borrow/deref-call dance so operator implementations don't repeat it.
struct Sink<T>(Rc<RefCell<ObserverFn<T>>>);

impl<T> Sink<T> {
    fn new(f: ObserverFn<T>) -> Self { Sink(Rc::new(RefCell::new(f))) }
    fn emit(&self, ev: Event<T>) { (*self.0.borrow_mut())(ev); }
}

impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self { Sink(Rc::clone(&self.0)) }
}

/// A cooperative-cancellation handle. `unsubscribe` invokes the producer's
/// teardown exactly once, even if called more than once or from more than
/// one clone of the handle.
pub struct Subscription {
    teardown: Rc<RefCell<Option<Box<dyn FnMut()>>>>,
}

impl Subscription {
    pub fn new(teardown: impl FnMut() + 'static) -> Self {
        Subscription { teardown: Rc::new(RefCell::new(Some(Box::new(teardown)))) }
    }

    pub fn noop() -> Self { Subscription::new(|| {}) }

    pub fn unsubscribe(&self) {
        if let Some(mut td) = self.teardown.borrow_mut().take() {
            td();
        }
    }
}

impl Clone for Subscription {
    fn clone(&self) -> Self { Subscription { teardown: Rc::clone(&self.teardown) } }
}

/// A push-based stream of `T`. Cloning a `Stream` is cheap: it shares the
/// underlying producer closure.
pub struct Stream<T: 'static> {
    subscribe_fn: Rc<dyn Fn(ObserverFn<T>) -> Subscription>,
}

impl<T: 'static> Clone for Stream<T> {
    fn clone(&self) -> Self { Stream { subscribe_fn: Rc::clone(&self.subscribe_fn) } }
}

impl<T: Clone + 'static> Stream<T> {
    /// Builds a stream from a raw producer. The producer receives a boxed
    /// observer callback and must return a `Subscription` whose teardown
    /// stops further delivery.
    pub fn new(f: impl Fn(ObserverFn<T>) -> Subscription + 'static) -> Self {
        Stream { subscribe_fn: Rc::new(f) }
    }

    pub fn subscribe(&self, observer: impl FnMut(Event<T>) + 'static) -> Subscription {
        (self.subscribe_fn)(Box::new(observer))
    }

    /// Drains a stream assumed to complete synchronously within `subscribe`
    /// (as every goal combinator in this engine does) into a `Vec`, alongside
    /// any terminal error.
    pub fn drain(&self) -> (Vec<T>, Option<Rc<EngineError>>) {
        let values = Rc::new(RefCell::new(Vec::new()));
        let error = Rc::new(RefCell::new(None));
        let values2 = Rc::clone(&values);
        let error2 = Rc::clone(&error);
        self.subscribe(move |ev| match ev {
            Event::Next(v) => values2.borrow_mut().push(v),
            Event::Error(e) => *error2.borrow_mut() = Some(e),
            Event::Complete => {}
        });
        let values = Rc::try_unwrap(values).map(RefCell::into_inner).unwrap_or_default();
        let error = Rc::try_unwrap(error).map(RefCell::into_inner).unwrap_or(None);
        (values, error)
    }

    pub fn of(values: Vec<T>) -> Self {
        Stream::new(move |mut obs| {
            for v in values.clone() {
                obs(Event::Next(v));
            }
            obs(Event::Complete);
            Subscription::noop()
        })
    }

    pub fn singleton(value: T) -> Self { Stream::of(vec![value]) }

    pub fn empty() -> Self {
        Stream::new(|mut obs| { obs(Event::Complete); Subscription::noop() })
    }

    pub fn fail(err: EngineError) -> Self {
        let err = Rc::new(err);
        Stream::new(move |mut obs| { obs(Event::Error(Rc::clone(&err))); Subscription::noop() })
    }

    /// Models `from_promise`/`from_future` (§4.2): the thunk is evaluated at
    /// subscribe time, standing in for a host scheduler resolving a promise.
    /// Evaluated at most once.
    pub fn from_result_thunk(f: impl FnOnce() -> Result<T, EngineError> + 'static) -> Self {
        let cell = RefCell::new(Some(f));
        Stream::new(move |mut obs| {
            if let Some(f) = cell.borrow_mut().take() {
                match f() {
                    Ok(v) => { obs(Event::Next(v)); obs(Event::Complete); }
                    Err(e) => obs(Event::Error(Rc::new(e))),
                }
            }
            Subscription::noop()
        })
    }

    /// Models `from_async_iterator` (§4.2): drains a host iterator eagerly at
    /// subscribe time. A host wiring in a real async runtime would instead
    /// schedule each `next()` poll through its own scheduler; this engine
    /// makes no assumption about which scheduler that is (§5).
    pub fn from_iter(iter: impl IntoIterator<Item = T> + Clone + 'static) -> Self {
        Stream::new(move |mut obs| {
            for v in iter.clone() {
                obs(Event::Next(v));
            }
            obs(Event::Complete);
            Subscription::noop()
        })
    }

    pub fn map<U: Clone + 'static>(&self, f: impl Fn(T) -> U + 'static) -> Stream<U> {
        let upstream = self.clone();
        let f = Rc::new(f);
        Stream::new(move |obs| {
            let sink = Sink::new(obs);
            let f = Rc::clone(&f);
            upstream.subscribe(move |ev| match ev {
                Event::Next(v) => sink.emit(Event::Next(f(v))),
                Event::Error(e) => sink.emit(Event::Error(e)),
                Event::Complete => sink.emit(Event::Complete),
            })
        })
    }

    pub fn filter(&self, p: impl Fn(&T) -> bool + 'static) -> Stream<T> {
        let upstream = self.clone();
        let p = Rc::new(p);
        Stream::new(move |obs| {
            let sink = Sink::new(obs);
            let p = Rc::clone(&p);
            upstream.subscribe(move |ev| match ev {
                Event::Next(v) => if p(&v) { sink.emit(Event::Next(v)); },
                Event::Error(e) => sink.emit(Event::Error(e)),
                Event::Complete => sink.emit(Event::Complete),
            })
        })
    }

    /// Maps each value to an inner stream and flattens. Tracks outstanding
    /// inner subscriptions and completes only once the outer stream and
    /// every inner stream it spawned have completed (§4.2 guarantee).
    pub fn flat_map<U: Clone + 'static>(&self, f: impl Fn(T) -> Stream<U> + 'static) -> Stream<U> {
        let upstream = self.clone();
        let f = Rc::new(f);
        Stream::new(move |obs| {
            let sink = Sink::new(obs);
            let outer_done = Rc::new(RefCell::new(false));
            let inner_count = Rc::new(RefCell::new(0usize));
            let inner_subs: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));

            let maybe_complete: Rc<dyn Fn()> = {
                let sink = sink.clone();
                let outer_done = Rc::clone(&outer_done);
                let inner_count = Rc::clone(&inner_count);
                Rc::new(move || {
                    if *outer_done.borrow() && *inner_count.borrow() == 0 {
                        sink.emit(Event::Complete);
                    }
                })
            };

            let f2 = Rc::clone(&f);
            let sink2 = sink.clone();
            let inner_count2 = Rc::clone(&inner_count);
            let inner_subs2 = Rc::clone(&inner_subs);
            let outer_done2 = Rc::clone(&outer_done);
            let maybe_complete2 = Rc::clone(&maybe_complete);
            let outer_sub = upstream.subscribe(move |ev| match ev {
                Event::Next(v) => {
                    let inner = f2(v);
                    *inner_count2.borrow_mut() += 1;
                    let sink3 = sink2.clone();
                    let inner_count3 = Rc::clone(&inner_count2);
                    let maybe_complete3 = Rc::clone(&maybe_complete2);
                    let sub = inner.subscribe(move |iev| match iev {
                        Event::Next(iv) => sink3.emit(Event::Next(iv)),
                        Event::Error(e) => sink3.emit(Event::Error(e)),
                        Event::Complete => {
                            *inner_count3.borrow_mut() -= 1;
                            (*maybe_complete3)();
                        }
                    });
                    inner_subs2.borrow_mut().push(sub);
                }
                Event::Error(e) => sink2.emit(Event::Error(e)),
                Event::Complete => {
                    *outer_done2.borrow_mut() = true;
                    (*maybe_complete2)();
                }
            });

            Subscription::new(move || {
                outer_sub.unsubscribe();
                for s in inner_subs.borrow().iter() { s.unsubscribe(); }
            })
        })
    }

    /// Emits only the first `n` values, then completes and unsubscribes
    /// upstream (§5 cancellation contract).
    pub fn take(&self, n: usize) -> Stream<T> {
        let upstream = self.clone();
        Stream::new(move |obs| {
            if n == 0 {
                let mut obs = obs;
                obs(Event::Complete);
                return Subscription::noop();
            }
            let sink = Sink::new(obs);
            let count = Rc::new(RefCell::new(0usize));
            let done = Rc::new(RefCell::new(false));
            let sub_cell: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

            let count2 = Rc::clone(&count);
            let done2 = Rc::clone(&done);
            let sink2 = sink.clone();
            let sub_cell2 = Rc::clone(&sub_cell);
            let sub = upstream.subscribe(move |ev| {
                if *done2.borrow() { return; }
                match ev {
                    Event::Next(v) => {
                        *count2.borrow_mut() += 1;
                        let reached = *count2.borrow() >= n;
                        sink2.emit(Event::Next(v));
                        if reached {
                            *done2.borrow_mut() = true;
                            sink2.emit(Event::Complete);
                            if let Some(s) = sub_cell2.borrow().as_ref() { s.unsubscribe(); }
                        }
                    }
                    Event::Error(e) => { *done2.borrow_mut() = true; sink2.emit(Event::Error(e)); }
                    Event::Complete => { *done2.borrow_mut() = true; sink2.emit(Event::Complete); }
                }
            });
            *sub_cell.borrow_mut() = Some(sub.clone());
            sub
        })
    }

    /// Interleaves two streams in arrival order; completes once both have
    /// completed. Provides no ordering guarantee across the two sources.
    pub fn merge(&self, other: &Stream<T>) -> Stream<T> {
        let a = self.clone();
        let b = other.clone();
        Stream::new(move |obs| {
            let sink = Sink::new(obs);
            let remaining = Rc::new(RefCell::new(2usize));
            let make_observer = || {
                let sink = sink.clone();
                let remaining = Rc::clone(&remaining);
                move |ev: Event<T>| match ev {
                    Event::Next(v) => sink.emit(Event::Next(v)),
                    Event::Error(e) => sink.emit(Event::Error(e)),
                    Event::Complete => {
                        *remaining.borrow_mut() -= 1;
                        if *remaining.borrow() == 0 { sink.emit(Event::Complete); }
                    }
                }
            };
            let sub_a = a.subscribe(make_observer());
            let sub_b = b.subscribe(make_observer());
            Subscription::new(move || { sub_a.unsubscribe(); sub_b.unsubscribe(); })
        })
    }

    /// Multicasts the upstream source, replaying everything seen so far to
    /// each new subscriber before switching it to live values (§4.2, §9).
    /// A subscriber arriving after the source has already terminated still
    /// receives the full backlog followed by the terminal event, without
    /// re-running the source — this is what lets `or`'s branches, which
    /// subscribe to the same `share()`d input one after another, all see
    /// every substitution even when the upstream producer is fully
    /// synchronous and has already finished by the time the second branch
    /// subscribes.
    ///
    /// The backlog buffer is released — not held for the life of the
    /// process — once every subscriber has unsubscribed (resolved open
    /// question, SPEC_FULL.md §13).
    pub fn share(&self) -> Stream<T> {
        let upstream = self.clone();
        let state = Rc::new(RefCell::new(ShareState {
            buffer: Vec::new(),
            terminal: None,
            observers: Vec::new(),
            upstream_sub: None,
        }));

        Stream::new(move |obs| {
            let sink = Sink::new(obs);

            for v in state.borrow().buffer.iter() {
                sink.emit(Event::Next(v.clone()));
            }

            if let Some(term) = state.borrow().terminal.clone() {
                sink.emit(term);
                return Subscription::noop();
            }

            state.borrow_mut().observers.push(sink.clone());

            if state.borrow().upstream_sub.is_none() {
                let state2 = Rc::clone(&state);
                let sub = upstream.subscribe(move |ev| {
                    let observers = {
                        let mut st = state2.borrow_mut();
                        match &ev {
                            Event::Next(v) => st.buffer.push(v.clone()),
                            Event::Complete | Event::Error(_) => {
                                st.terminal = Some(ev.clone());
                            }
                        }
                        st.observers.clone()
                    };
                    for o in observers.iter() { o.emit(ev.clone()); }
                    if matches!(ev, Event::Complete | Event::Error(_)) {
                        let mut st = state2.borrow_mut();
                        st.upstream_sub = None;
                        st.observers.clear();
                    }
                });
                state.borrow_mut().upstream_sub = Some(sub);
            }

            let state3 = Rc::clone(&state);
            let sink3 = sink.clone();
            Subscription::new(move || {
                let mut st = state3.borrow_mut();
                st.observers.retain(|o| !Rc::ptr_eq(&o.0, &sink3.0));
                if st.observers.is_empty() {
                    if let Some(sub) = st.upstream_sub.take() { sub.unsubscribe(); }
                    st.buffer.clear();
                }
            })
        })
    }
}

struct ShareState<T> {
    buffer: Vec<T>,
    terminal: Option<Event<T>>,
    observers: Vec<Sink<T>>,
    upstream_sub: Option<Subscription>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn of_emits_values_then_completes() {
        let s = Stream::of(vec![1, 2, 3]);
        let (values, err) = s.drain();
        assert_eq!(values, vec![1, 2, 3]);
        assert!(err.is_none());
    }

    #[test]
    fn map_transforms_values() {
        let s = Stream::of(vec![1, 2, 3]).map(|x| x * 2);
        let (values, _) = s.drain();
        assert_eq!(values, vec![2, 4, 6]);
    }

    #[test]
    fn filter_drops_values() {
        let s = Stream::of(vec![1, 2, 3, 4]).filter(|x| x % 2 == 0);
        let (values, _) = s.drain();
        assert_eq!(values, vec![2, 4]);
    }

    #[test]
    fn take_limits_and_stops_early() {
        let s = Stream::of(vec![1, 2, 3, 4, 5]).take(2);
        let (values, _) = s.drain();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn flat_map_flattens_in_order_per_source() {
        let s = Stream::of(vec![1, 2]).flat_map(|x| Stream::of(vec![x, x * 10]));
        let (values, _) = s.drain();
        assert_eq!(values, vec![1, 10, 2, 20]);
    }

    #[test]
    fn merge_combines_both_sources() {
        let a = Stream::of(vec![1, 2]);
        let b = Stream::of(vec![3, 4]);
        let (mut values, _) = a.merge(&b).drain();
        values.sort();
        assert_eq!(values, vec![1, 2, 3, 4]);
    }

    #[test]
    fn share_replays_to_late_subscriber() {
        let s = Stream::of(vec![1, 2, 3]).share();
        let (first, _) = s.drain();
        let (second, _) = s.drain();
        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(second, vec![1, 2, 3]);
    }
}
