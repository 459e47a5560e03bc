use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use excevent::dispatch::Emitter;
use excevent::watch::Watched;

type Change = (i64, &'static str);

#[test]
fn assignment_emits_the_new_value_and_property() {
    let emitter: Emitter<Change, i64> = Emitter::new();
    emitter.on("healthChanged", |_, (value, property)| {
        assert_eq!(*property, "health");
        (*value).into()
    });

    let mut health = Watched::new("health", "healthChanged", 100i64);
    assert_eq!(health.assign(&emitter, 40), vec![40]);
    assert_eq!(*health.get(), 40);
    assert_eq!(health.property(), "health");
}

#[test]
fn assign_collects_handler_results_in_order() {
    let emitter: Emitter<Change, i64> = Emitter::new();
    emitter.subscribe("healthChanged", 1, |_, (value, _)| (*value).into());
    emitter.subscribe("healthChanged", 0, |_, (value, _)| (*value * 2).into());

    let mut health = Watched::new("health", "healthChanged", 0i64);
    assert_eq!(health.assign(&emitter, 10), vec![10, 20]);
}

#[test]
fn also_emits_fires_every_configured_event_in_order() {
    let emitter: Emitter<Change, &'static str> = Emitter::new();
    emitter.on("healthChanged", |_, _| "specific".into());
    emitter.on("anyChange", |_, _| "general".into());

    let mut health = Watched::new("health", "healthChanged", 0i64).also_emits("anyChange");
    assert_eq!(health.assign(&emitter, 5), vec!["specific", "general"]);
}

#[test]
fn set_silent_does_not_emit() {
    let emitter: Emitter<Change, i64> = Emitter::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let fired_inner = Arc::clone(&fired);
    emitter.on("healthChanged", move |_, _| {
        fired_inner.fetch_add(1, Ordering::SeqCst);
        0.into()
    });

    let mut health = Watched::new("health", "healthChanged", 0i64);
    health.set_silent(7);
    assert_eq!(*health.get(), 7);
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    health.assign(&emitter, 8);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}
