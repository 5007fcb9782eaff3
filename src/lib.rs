//! Reactive module stores with path watchers, events and a shared
//! namespace.
//!
//! A module is declared once as a [`ModuleDefinition`] (state fields,
//! getter/setter accessors, methods, event names) and materialized by
//! [`init_store`] into a live [`Store`] registered under a shared
//! [`Namespace`]. Every field is backed by an observable cell: writes run
//! shallow change detection, and [`Store::watch`] subscribes a callback to
//! a dotted/bracketed path that fires with the new value, the old value
//! and the namespace.
//!
//! Misuse never panics or returns errors from the store surface. Invalid
//! declarations and operations are skipped and reported through a
//! pluggable [`LogSink`] (the default forwards to `tracing`).
//!
//! ```
//! use modstore::{ModuleDefinition, Value, init_store};
//!
//! let namespace = init_store([ModuleDefinition::new("counter")
//! 	.state("count", 0.0)
//! 	.method("increment", |store, _args| {
//! 		let next = store.get("count").and_then(|v| v.as_f64()).unwrap_or(0.0) + 1.0;
//! 		store.set("count", next);
//! 		Value::from(next)
//! 	})]);
//!
//! let counter = namespace.get("counter").unwrap();
//! assert_eq!(counter.call("increment", &[]), Some(Value::from(1.0)));
//! assert_eq!(counter.call("increment", &[]), Some(Value::from(2.0)));
//! assert_eq!(counter.get("count"), Some(Value::from(2.0)));
//! ```

mod accessor;
pub mod diagnostics;
mod events;
pub mod path;
mod registry;
mod store;
pub mod value;
mod watch;

pub use diagnostics::{Diagnostic, LogSink, MemorySink, StoreError, TracingSink};
pub use events::EventCallback;
pub use registry::{ModuleDefinition, Namespace, init_store, init_store_with};
pub use store::{BoundMethod, FieldKind, GetterFn, MethodFn, SetterFn, Store};
pub use value::{ListRef, ObjectRef, Value};
pub use watch::WatchCallback;
