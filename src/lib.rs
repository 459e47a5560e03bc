//! # Excevent: Typed, Priority-Ordered Publish/Subscribe
//!
//! Excevent is an event dispatch library built around three ideas: handlers
//! run in a strict priority order no matter where they were registered,
//! subscriptions can live on things other than the emitting object (named
//! buses, host classes, specific hosts), and every dispatch is typed end to
//! end — an emitter carries an argument type its handlers receive and a
//! result type they produce.
//!
//! ## Core Concepts
//!
//! - **Emitter**: the per-host dispatcher — subscribe, emit, query, wait.
//! - **Priority**: higher runs first; ties resolve by source order, then
//!   registration order. One emission merges a host's own handlers with its
//!   class and bus handlers into a single descending walk.
//! - **Coordinator**: an [`global::Excevent`] instance owns the bus and
//!   class registries and manages declarative subscriber lifecycles.
//! - **Outcome**: handlers return nothing, one result, or many; emissions
//!   collect them in invocation order.
//!
//! ## Quick Start
//!
//! ### Emitting and subscribing
//!
//! ```
//! use excevent::dispatch::Emitter;
//!
//! let emitter: Emitter<String, usize> = Emitter::new();
//!
//! emitter.subscribe("measure", 10, |_api, text| text.len().into());
//! emitter.on("measure", |_api, text| text.chars().count().into());
//!
//! // Priority 10 runs before the default priority 0.
//! let lengths = emitter.emit("measure", &"hällo".to_string());
//! assert_eq!(lengths, vec![6, 5]);
//! ```
//!
//! ### Steering a dispatch from inside a handler
//!
//! ```
//! use excevent::dispatch::Emitter;
//!
//! let emitter: Emitter<(), i32> = Emitter::new();
//! emitter.subscribe("count", 2, |_api, _| 1.into());
//! emitter.subscribe("count", 1, |api, _| {
//!     api.stop();
//!     2.into()
//! });
//! emitter.subscribe("count", 0, |_api, _| 3.into());
//!
//! // The priority-1 handler halts the dispatch; priority 0 never runs.
//! assert_eq!(emitter.emit("count", &()), vec![1, 2]);
//! ```
//!
//! ### Buses and declarative subscribers
//!
//! ```
//! use excevent::dispatch::Emitter;
//! use excevent::global::{Excevent, SubscriberSpec};
//! use excevent::types::ClassToken;
//!
//! let coordinator = Excevent::<String, String>::new();
//! let doors = ClassToken::new("Door");
//! coordinator.register_bus("building", &doors);
//!
//! struct Alarm;
//! let spec = SubscriberSpec::new("Alarm")
//!     .handler("on_open", "building", "opened", 0, |_alarm: &Alarm, _api, which| {
//!         format!("{which} opened").into()
//!     });
//! let alarm = coordinator.adopt(&spec, Alarm);
//!
//! let front_door = coordinator.create_emitter(&doors);
//! let noted = front_door.emit("opened", &"front".to_string());
//! assert_eq!(noted, vec!["front opened".to_string()]);
//! # drop(alarm);
//! ```
//!
//! ## Module Guide
//!
//! - [`dispatch`] - Emitters, the handler context, queries, waits, and
//!   scoped subscriptions
//! - [`global`] - The coordinator, buses, and subscriber specs
//! - [`priority`] - The ordered priority container and its merge traversal
//! - [`types`] - Priorities, event lists, and identity tokens
//! - [`watch`] - Properties that emit on assignment
//! - [`telemetry`] - Tracing setup helpers

pub mod dispatch;
pub mod global;
pub mod priority;
pub mod telemetry;
pub mod types;
pub mod watch;
