use atom_bind::{AtomDef, AtomStore, listener_fn, never_equals};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

static COUNT: AtomDef<i32> = AtomDef::new("count", || 0);
static OTHER: AtomDef<i32> = AtomDef::new("other", || 0);

fn init_logs() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn notifications_are_ordered_per_subscriber_and_per_write() {
    init_logs();
    let store = AtomStore::new();
    let log: Rc<RefCell<Vec<(u8, i32)>>> = Rc::new(RefCell::new(Vec::new()));

    let store_a = store.clone();
    let log_a = log.clone();
    let first = listener_fn(move |_| log_a.borrow_mut().push((1, store_a.get(&COUNT))));

    let store_b = store.clone();
    let log_b = log.clone();
    let second = listener_fn(move |_| log_b.borrow_mut().push((2, store_b.get(&COUNT))));

    let _sub_a = store.subscribe(&COUNT, &first);
    let _sub_b = store.subscribe(&COUNT, &second);

    store.set(&COUNT, 10);
    store.set(&COUNT, 20);

    // Subscription order within each write, write order across writes
    assert_eq!(*log.borrow(), vec![(1, 10), (2, 10), (1, 20), (2, 20)]);
}

#[test]
fn subscribers_registered_between_writes_see_only_later_writes() {
    let store = AtomStore::new();
    let hits = Rc::new(Cell::new(0));

    store.set(&COUNT, 1);

    let hits_in = hits.clone();
    let listener = listener_fn(move |_| hits_in.set(hits_in.get() + 1));
    let _sub = store.subscribe(&COUNT, &listener);

    store.set(&COUNT, 2);
    assert_eq!(hits.get(), 1);
}

#[test]
fn equality_gate_suppresses_unchanged_writes() {
    let store = AtomStore::new();
    let hits = Rc::new(Cell::new(0));

    let hits_in = hits.clone();
    let listener = listener_fn(move |_| hits_in.set(hits_in.get() + 1));
    let _sub = store.subscribe(&COUNT, &listener);

    store.set(&COUNT, 7);
    store.set(&COUNT, 7);
    store.set(&COUNT, 7);

    assert_eq!(hits.get(), 1);
}

#[test]
fn never_equals_atoms_notify_on_every_write() {
    static TICK: AtomDef<u32> = AtomDef::with_equals("tick", || 0, never_equals);

    let store = AtomStore::new();
    let hits = Rc::new(Cell::new(0));

    let hits_in = hits.clone();
    let listener = listener_fn(move |_| hits_in.set(hits_in.get() + 1));
    let _sub = store.subscribe(&TICK, &listener);

    store.set(&TICK, 0);
    store.set(&TICK, 0);

    assert_eq!(hits.get(), 2);
}

#[test]
fn unsubscribe_is_immediate_and_idempotent() {
    let store = AtomStore::new();
    let hits = Rc::new(Cell::new(0));

    let hits_in = hits.clone();
    let listener = listener_fn(move |_| hits_in.set(hits_in.get() + 1));
    let sub = store.subscribe(&COUNT, &listener);

    store.set(&COUNT, 1);
    assert_eq!(hits.get(), 1);

    sub.unsubscribe();
    sub.unsubscribe(); // defensive second call is a no-op

    store.set(&COUNT, 2);
    assert_eq!(hits.get(), 1);
    assert_eq!(store.subscriber_count(&COUNT), 0);
}

#[test]
fn dropping_the_handle_unsubscribes() {
    let store = AtomStore::new();
    let hits = Rc::new(Cell::new(0));

    let hits_in = hits.clone();
    let listener = listener_fn(move |_| hits_in.set(hits_in.get() + 1));

    {
        let _sub = store.subscribe(&COUNT, &listener);
        store.set(&COUNT, 1);
        assert_eq!(hits.get(), 1);
    }

    store.set(&COUNT, 2);
    assert_eq!(hits.get(), 1);
}

#[test]
fn dropping_the_listener_silences_without_unsubscribing() {
    let store = AtomStore::new();
    let hits = Rc::new(Cell::new(0));

    let hits_in = hits.clone();
    let listener = listener_fn(move |_| hits_in.set(hits_in.get() + 1));
    let _sub = store.subscribe(&COUNT, &listener);

    drop(listener);

    // The store held the listener weakly, so this neither panics nor counts
    store.set(&COUNT, 1);
    assert_eq!(hits.get(), 0);
    assert_eq!(store.subscriber_count(&COUNT), 0);
}

#[test]
fn unsubscribing_mid_pass_skips_the_in_flight_notification() {
    let store = AtomStore::new();
    let hits = Rc::new(Cell::new(0));

    // The second subscription's handle, reachable from the first listener
    let second_sub: Rc<RefCell<Option<atom_bind::Subscription>>> = Rc::new(RefCell::new(None));

    let second_in = second_sub.clone();
    let first = listener_fn(move |_| {
        if let Some(sub) = second_in.borrow().as_ref() {
            sub.unsubscribe();
        }
    });

    let hits_in = hits.clone();
    let second = listener_fn(move |_| hits_in.set(hits_in.get() + 1));

    let _sub_a = store.subscribe(&COUNT, &first);
    *second_sub.borrow_mut() = Some(store.subscribe(&COUNT, &second));

    store.set(&COUNT, 1);

    // First listener ran and revoked the second before delivery reached it
    assert_eq!(hits.get(), 0);
}

#[test]
fn writes_from_listeners_queue_after_the_current_pass() {
    let store = AtomStore::new();
    let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    let store_in = store.clone();
    let order_a = order.clone();
    let count_listener = listener_fn(move |_| {
        order_a.borrow_mut().push("count:before-write");
        store_in.set(&OTHER, 1);
        order_a.borrow_mut().push("count:after-write");
    });

    let order_b = order.clone();
    let other_listener = listener_fn(move |_| order_b.borrow_mut().push("other"));

    let _sub_a = store.subscribe(&COUNT, &count_listener);
    let _sub_b = store.subscribe(&OTHER, &other_listener);

    store.set(&COUNT, 1);

    // "other" is delivered after the count pass completed, not inside it
    assert_eq!(
        *order.borrow(),
        vec!["count:before-write", "count:after-write", "other"]
    );
    assert_eq!(store.get(&OTHER), 1);
}

#[test]
fn chained_queued_writes_run_in_fifo_order() {
    static THIRD: AtomDef<i32> = AtomDef::new("third", || 0);

    let store = AtomStore::new();
    let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    let store_a = store.clone();
    let order_a = order.clone();
    let count_listener = listener_fn(move |_| {
        order_a.borrow_mut().push("count");
        store_a.set(&OTHER, 1);
        store_a.set(&THIRD, 1);
    });

    let order_b = order.clone();
    let other_listener = listener_fn(move |_| order_b.borrow_mut().push("other"));

    let order_c = order.clone();
    let third_listener = listener_fn(move |_| order_c.borrow_mut().push("third"));

    let _sub_a = store.subscribe(&COUNT, &count_listener);
    let _sub_b = store.subscribe(&OTHER, &other_listener);
    let _sub_c = store.subscribe(&THIRD, &third_listener);

    store.set(&COUNT, 1);

    assert_eq!(*order.borrow(), vec!["count", "other", "third"]);
}

#[test]
fn subscribing_mid_pass_misses_the_in_flight_write() {
    let store = AtomStore::new();
    let hits = Rc::new(Cell::new(0));

    // Keep the late listener alive for the whole test
    let hits_in = hits.clone();
    let late = listener_fn(move |_| hits_in.set(hits_in.get() + 1));
    let late_sub: Rc<RefCell<Option<atom_bind::Subscription>>> = Rc::new(RefCell::new(None));

    let store_in = store.clone();
    let late_in = late.clone();
    let late_sub_in = late_sub.clone();
    let first = listener_fn(move |_| {
        if late_sub_in.borrow().is_none() {
            *late_sub_in.borrow_mut() = Some(store_in.subscribe(&COUNT, &late_in));
        }
    });

    let _sub_a = store.subscribe(&COUNT, &first);

    store.set(&COUNT, 1);
    assert_eq!(hits.get(), 0, "snapshot excludes mid-pass subscribers");

    store.set(&COUNT, 2);
    assert_eq!(hits.get(), 1, "next write reaches the new subscriber");
}

#[test]
fn with_reads_without_cloning() {
    static ITEMS: AtomDef<Vec<i32>> = AtomDef::new("items", Vec::new);

    let store = AtomStore::new();
    store.update(&ITEMS, |v| v.extend([1, 2, 3]));

    let len = store.with(&ITEMS, |v| v.len());
    assert_eq!(len, 3);
}

#[test]
fn dump_renders_every_materialized_atom_in_order() {
    static NAME: AtomDef<String> = AtomDef::new("name", String::new);

    let store = AtomStore::new();
    store.set(&COUNT, 3);
    store.set(&NAME, "demo".to_string());

    let dump = store.dump();
    assert_eq!(
        dump,
        vec![
            ("count", "3".to_string()),
            ("name", "\"demo\"".to_string()),
        ]
    );
}

#[test]
#[should_panic(expected = "already registered with value type")]
fn redeclaring_a_key_at_another_type_panics() {
    static CLASH: AtomDef<bool> = AtomDef::new("count", || false);

    let store = AtomStore::new();
    store.get(&COUNT);
    store.get(&CLASH);
}
