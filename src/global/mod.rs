//! Cross-host coordination: the [`Excevent`] coordinator, declarative
//! [`SubscriberSpec`] bindings, and imperative [`BatchSubscriber`] batches.

mod batch;
mod bindings;
mod excevent;

pub use batch::BatchSubscriber;
pub use bindings::{InvokeFn, SubscriberSpec};
pub use excevent::Excevent;
