//! Priority-ordered event dispatch for a single host.
//!
//! The pieces here cover everything one emitter can do on its own:
//!
//! - [`Emitter`]: subscribe, emit, and query, merging own/class/bus handlers
//!   into one descending priority order per dispatch.
//! - [`EventApi`] and [`Outcome`]: the context and return model handlers see.
//! - [`EventWait`]: the future behind [`Emitter::wait_for`].
//! - [`UntilScope`]: subscriptions that expire when a chosen event fires.
//!
//! Cross-host coordination (buses, classes, declarative subscriber specs)
//! lives in [`crate::global`].

mod api;
mod emitter;
mod query;
pub(crate) mod registry;
mod until;

pub use api::{EventApi, Outcome};
pub use emitter::{Emitter, EventHost, EventWait, HostHandle, WaitError};
pub use query::Query;
pub use registry::Handler;
pub use until::UntilScope;
