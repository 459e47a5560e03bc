use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use excevent::dispatch::{Emitter, EventHost, Outcome};
use excevent::global::{Excevent, SubscriberSpec};
use excevent::types::ClassToken;

#[derive(Default)]
struct Census {
    seen: AtomicUsize,
}

impl Census {
    fn tally(&self) -> Outcome<i32> {
        self.seen.fetch_add(1, Ordering::SeqCst);
        Outcome::Skip
    }
}

#[test]
fn bus_subscribers_hear_wired_class_emissions() {
    let coordinator = Excevent::<(), i32>::new();
    let animals = ClassToken::new("Animal");
    coordinator.register_bus("farm", &animals);

    let spec = SubscriberSpec::new("Census").handler(
        "tally",
        "farm",
        "fed",
        0,
        |census: &Census, _, _| census.tally(),
    );
    let census = coordinator.adopt(&spec, Census::default());

    let pig = coordinator.create_emitter(&animals);
    let cow = coordinator.create_emitter(&animals);
    pig.emit("fed", &());
    cow.emit("fed", &());
    assert_eq!(census.seen.load(Ordering::SeqCst), 2);

    assert!(coordinator.unsubscribe(&spec, &census));
    pig.emit("fed", &());
    assert_eq!(census.seen.load(Ordering::SeqCst), 2);
}

#[test]
fn class_subscribers_hear_every_instance() {
    let coordinator = Excevent::<(), i32>::new();
    let doors = ClassToken::new("Door");

    let spec = SubscriberSpec::new("Census").handler(
        "tally",
        &doors,
        "opened",
        0,
        |census: &Census, _, _| census.tally(),
    );
    let census = coordinator.adopt(&spec, Census::default());

    let front = coordinator.create_emitter(&doors);
    let back = coordinator.create_emitter(&doors);
    front.emit("opened", &());
    back.emit("opened", &());
    assert_eq!(census.seen.load(Ordering::SeqCst), 2);
}

#[test]
fn one_method_counts_across_bus_class_and_host() {
    let coordinator = Excevent::<(), i32>::new();
    let animals = ClassToken::new("Animal");
    coordinator.register_bus("farm", &animals);

    let stray: Emitter<(), i32> = Emitter::new();

    let spec = SubscriberSpec::new("Census")
        .handler("tally", "farm", "fed", 0, |c: &Census, _, _| c.tally())
        .handler("tally", &animals, "fed", 0, |c: &Census, _, _| c.tally())
        .handler("tally", stray.handle(), "fed", 0, |c: &Census, _, _| {
            c.tally()
        });
    let census = coordinator.adopt(&spec, Census::default());

    let animal = coordinator.create_emitter(&animals);
    animal.emit("fed", &()); // class + bus
    animal.emit("fed", &()); // class + bus
    stray.emit("fed", &()); // host only
    assert_eq!(census.seen.load(Ordering::SeqCst), 5);

    coordinator.unsubscribe(&spec, &census);
    animal.emit("fed", &());
    stray.emit("fed", &());
    assert_eq!(census.seen.load(Ordering::SeqCst), 5);
}

#[test]
fn subscribe_and_unsubscribe_are_idempotent_per_instance() {
    let coordinator = Excevent::<(), i32>::new();
    let spec = SubscriberSpec::new("Census").handler(
        "tally",
        "farm",
        "fed",
        0,
        |census: &Census, _, _| census.tally(),
    );
    let census = Arc::new(Census::default());

    assert!(coordinator.subscribe(&spec, &census));
    assert!(!coordinator.subscribe(&spec, &census));

    let animals = ClassToken::new("Animal");
    coordinator.register_bus("farm", &animals);
    let animal = coordinator.create_emitter(&animals);
    animal.emit("fed", &());
    // The double subscribe did not double the handler.
    assert_eq!(census.seen.load(Ordering::SeqCst), 1);

    assert!(coordinator.unsubscribe(&spec, &census));
    assert!(!coordinator.unsubscribe(&spec, &census));
}

#[test]
fn deregistering_a_bus_mutes_it_without_dropping_subscriptions() {
    let coordinator = Excevent::<(), i32>::new();
    let animals = ClassToken::new("Animal");
    coordinator.register_bus("farm", &animals);

    let spec = SubscriberSpec::new("Census").handler(
        "tally",
        "farm",
        "fed",
        0,
        |census: &Census, _, _| census.tally(),
    );
    let census = coordinator.adopt(&spec, Census::default());
    let animal = coordinator.create_emitter(&animals);

    animal.emit("fed", &());
    assert_eq!(census.seen.load(Ordering::SeqCst), 1);

    coordinator.deregister_bus("farm");
    animal.emit("fed", &());
    assert_eq!(census.seen.load(Ordering::SeqCst), 1);

    coordinator.register_bus("farm", &animals);
    animal.emit("fed", &());
    assert_eq!(census.seen.load(Ordering::SeqCst), 2);
}

struct Pig {
    events: Emitter<String, String>,
    name: String,
}

impl EventHost<String, String> for Pig {
    fn events(&self) -> &Emitter<String, String> {
        &self.events
    }
}

#[test]
fn own_handlers_bind_to_the_instance_emitter() {
    let coordinator = Excevent::<String, String>::new();
    let spec = SubscriberSpec::new("Pig").own_handler(
        "on_fed",
        "fed",
        0,
        |pig: &Pig, _api, food| format!("{} ate {food}", pig.name).into(),
    );

    let pig = coordinator.adopt(
        &spec,
        Pig {
            events: Emitter::new(),
            name: "Babe".into(),
        },
    );
    let other = Pig {
        events: Emitter::new(),
        name: "Napoleon".into(),
    };

    let fed = pig.events().emit("fed", &"slop".to_string());
    assert_eq!(fed, vec!["Babe ate slop".to_string()]);
    // Unsubscribed instances of the same type hear nothing.
    assert!(other.events().emit("fed", &"slop".to_string()).is_empty());
}

#[test]
fn priorities_merge_across_own_class_and_bus_handlers() {
    let coordinator = Excevent::<(), &'static str>::new();
    let doors = ClassToken::new("Door");
    coordinator.register_bus("building", &doors);

    struct Noop;
    let spec = SubscriberSpec::<Noop, (), &'static str>::new("Listeners")
        .handler("high", "building", "opened", 10, |_: &Noop, _, _| {
            "bus-high".into()
        })
        .handler("tie", &doors, "opened", 0, |_: &Noop, _, _| {
            "class-tie".into()
        });
    let _listener = coordinator.adopt(&spec, Noop);

    let door = coordinator.create_emitter(&doors);
    door.on("opened", |_, _| "own-tie".into());

    // Descending priority overall; at priority 0 the host's own handler
    // precedes the class handler.
    assert_eq!(
        door.emit("opened", &()),
        vec!["bus-high", "own-tie", "class-tie"]
    );
}

struct Engine {
    revs: AtomicUsize,
}

struct Car {
    engine: Engine,
}

#[test]
fn extend_inherits_component_bindings_through_a_projection() {
    let coordinator = Excevent::<(), i32>::new();
    let vehicles = ClassToken::new("Vehicle");
    coordinator.register_bus("road", &vehicles);

    let engine_spec = SubscriberSpec::new("Engine").handler(
        "on_start",
        "road",
        "started",
        0,
        |engine: &Engine, _, _| {
            engine.revs.fetch_add(1, Ordering::SeqCst);
            Outcome::Skip
        },
    );
    let car_spec =
        SubscriberSpec::<Car, (), i32>::new("Car").extend(&engine_spec, |car| &car.engine);

    let car = coordinator.adopt(
        &car_spec,
        Car {
            engine: Engine {
                revs: AtomicUsize::new(0),
            },
        },
    );

    let vehicle = coordinator.create_emitter(&vehicles);
    vehicle.emit("started", &());
    assert_eq!(car.engine.revs.load(Ordering::SeqCst), 1);

    coordinator.unsubscribe(&car_spec, &car);
    vehicle.emit("started", &());
    assert_eq!(car.engine.revs.load(Ordering::SeqCst), 1);
}

#[test]
fn batch_subscriber_toggles_registrations_as_a_unit() {
    let coordinator = Excevent::<(), i32>::new();
    let animals = ClassToken::new("Animal");
    coordinator.register_bus("farm", &animals);
    let barn: Emitter<(), i32> = Emitter::new();

    let batch = coordinator.create_subscriber();
    assert!(!batch.has_registrations());
    batch
        .register("farm", "fed", 0, |_, _| 1.into())
        .register(barn.handle(), "mucked", 0, |_, _| 2.into());
    assert!(batch.has_registrations());

    let animal = coordinator.create_emitter(&animals);
    // Nothing attached yet.
    assert!(animal.emit("fed", &()).is_empty());

    batch.subscribe();
    batch.subscribe(); // idempotent
    assert_eq!(animal.emit("fed", &()), vec![1]);
    assert_eq!(barn.emit("mucked", &()), vec![2]);

    batch.unsubscribe();
    assert!(animal.emit("fed", &()).is_empty());
    assert!(barn.emit("mucked", &()).is_empty());

    batch.subscribe();
    assert_eq!(animal.emit("fed", &()), vec![1]);
}

#[test]
fn registering_on_an_active_batch_attaches_immediately() {
    let coordinator = Excevent::<(), i32>::new();
    let barn: Emitter<(), i32> = Emitter::new();

    let batch = coordinator.create_subscriber();
    batch.subscribe();
    batch.register(barn.handle(), "mucked", 0, |_, _| 2.into());

    assert_eq!(barn.emit("mucked", &()), vec![2]);
}

#[test]
fn dropped_subscribers_go_quiet() {
    let coordinator = Excevent::<(), i32>::new();
    let animals = ClassToken::new("Animal");

    let spec = SubscriberSpec::new("Census").handler(
        "tally",
        &animals,
        "fed",
        0,
        |census: &Census, _, _| census.tally(),
    );
    let census = coordinator.adopt(&spec, Census::default());
    let animal = coordinator.create_emitter(&animals);

    animal.emit("fed", &());
    drop(census);

    // The binding holds the instance weakly; nothing to call anymore.
    assert!(animal.emit("fed", &()).is_empty());
}

#[test]
fn dropped_subscribers_are_swept_on_the_next_lifecycle_call() {
    let coordinator = Excevent::<(), i32>::new();
    let animals = ClassToken::new("Animal");

    let spec = SubscriberSpec::new("Census").handler(
        "tally",
        &animals,
        "fed",
        0,
        |census: &Census, _, _| census.tally(),
    );
    let census = coordinator.adopt(&spec, Census::default());
    let animal = coordinator.create_emitter(&animals);
    assert!(animal.has_handlers("fed"));
    drop(census);

    // The next subscribe evicts the dead membership and its registry
    // entries, so a fresh instance attaches even if it reuses the address.
    let replacement = coordinator.adopt(&spec, Census::default());
    animal.emit("fed", &());
    assert_eq!(replacement.seen.load(Ordering::SeqCst), 1);

    // Only the replacement's entries remain; unsubscribing it leaves the
    // class registry empty.
    assert!(coordinator.unsubscribe(&spec, &replacement));
    assert!(!animal.has_handlers("fed"));
}

#[test]
fn bus_handle_targets_the_bus_registry_directly() {
    let coordinator = Excevent::<(), i32>::new();
    let animals = ClassToken::new("Animal");
    coordinator.register_bus("farm", &animals);

    let batch = coordinator.create_subscriber();
    batch.register(coordinator.bus_handle("farm"), "fed", 0, |_, _| 7.into());
    batch.subscribe();

    let animal = coordinator.create_emitter(&animals);
    assert_eq!(animal.emit("fed", &()), vec![7]);
}
