use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use excevent::dispatch::{Emitter, Outcome};

#[test]
fn first_result_in_priority_order_wins() {
    let emitter: Emitter<(), i32> = Emitter::new();
    emitter.subscribe("pick", 0, |_, _| 1.into());
    emitter.subscribe("pick", 5, |_, _| 2.into());

    assert_eq!(emitter.query("pick", &()).get(), Some(2));
}

#[test]
fn filters_stack_and_all_must_pass() {
    let emitter: Emitter<(), i32> = Emitter::new();
    emitter.subscribe("pick", 3, |_, _| 3.into());
    emitter.subscribe("pick", 2, |_, _| 12.into());
    emitter.subscribe("pick", 1, |_, _| 8.into());

    let found = emitter
        .query("pick", &())
        .filter(|n| *n > 5)
        .filter(|n| *n < 10)
        .get();
    assert_eq!(found, Some(8));
}

#[test]
fn no_passing_candidate_means_none() {
    let emitter: Emitter<(), i32> = Emitter::new();
    emitter.on("pick", |_, _| 1.into());

    assert_eq!(emitter.query("pick", &()).filter(|n| *n > 100).get(), None);
    assert_eq!(emitter.query("missing", &()).get(), None);
}

#[test]
fn skip_and_disregard_offer_no_candidates() {
    let emitter: Emitter<(), i32> = Emitter::new();
    emitter.subscribe("pick", 2, |_, _| Outcome::Skip);
    emitter.subscribe("pick", 1, |api, _| {
        api.disregard();
        1.into()
    });
    emitter.subscribe("pick", 0, |_, _| 2.into());

    assert_eq!(emitter.query("pick", &()).get(), Some(2));
}

#[test]
fn collection_results_are_candidates_in_order() {
    let emitter: Emitter<(), i32> = Emitter::new();
    emitter.on("pick", |_, _| vec![1, 8, 3].into());

    assert_eq!(emitter.query("pick", &()).filter(|n| *n > 2).get(), Some(8));
}

#[test]
fn search_stops_once_a_candidate_is_accepted() {
    let emitter: Emitter<(), i32> = Emitter::new();
    let later_calls = Arc::new(AtomicUsize::new(0));
    let later_calls_inner = Arc::clone(&later_calls);

    emitter.subscribe("pick", 1, |_, _| 42.into());
    emitter.subscribe("pick", 0, move |_, _| {
        later_calls_inner.fetch_add(1, Ordering::SeqCst);
        7.into()
    });

    assert_eq!(emitter.query("pick", &()).get(), Some(42));
    assert_eq!(later_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn nothing_runs_until_get() {
    let emitter: Emitter<(), i32> = Emitter::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_inner = Arc::clone(&calls);
    emitter.on("pick", move |_, _| {
        calls_inner.fetch_add(1, Ordering::SeqCst);
        1.into()
    });

    let query = emitter.query("pick", &()).filter(|n| *n > 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(query.get(), Some(1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn query_arguments_reach_the_handlers() {
    let emitter: Emitter<i32, i32> = Emitter::new();
    emitter.on("double", |_, n| (n * 2).into());

    assert_eq!(emitter.query("double", &21).get(), Some(42));
}
