//! Per-store event bus.
//!
//! Events are declared up front in the module definition; the declared set
//! is frozen at construction and `on`/`emit` silently ignore names outside
//! it. Dispatch is synchronous and failure-isolated: a subscriber returning
//! an error is logged and the remaining subscribers still run.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use crate::diagnostics::{Diagnostic, LogSink, StoreError};
use crate::value::Value;

/// Event subscriber. `Err` is the throwing-subscriber case: logged,
/// isolated, dispatch continues.
pub type EventCallback = Rc<dyn Fn(&[Value]) -> Result<(), StoreError>>;

/// Callback identity, used for de-duplication and removal.
pub(crate) fn same_callback<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
	std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

pub(crate) struct EventBus {
	declared: BTreeSet<String>,
	subscribers: RefCell<HashMap<String, Vec<EventCallback>>>,
}

impl EventBus {
	pub(crate) fn new(declared: BTreeSet<String>) -> Self {
		Self {
			declared,
			subscribers: RefCell::new(HashMap::new()),
		}
	}

	pub(crate) fn declared(&self) -> &BTreeSet<String> {
		&self.declared
	}

	/// Subscribe to a declared event. Undeclared names are ignored.
	pub(crate) fn on(&self, name: &str, callback: EventCallback) {
		if !self.declared.contains(name) {
			return;
		}
		self.subscribers
			.borrow_mut()
			.entry(name.to_string())
			.or_default()
			.push(callback);
	}

	/// Remove one subscriber by identity, or all subscribers for the name.
	pub(crate) fn off(&self, name: &str, callback: Option<&EventCallback>) {
		let mut subscribers = self.subscribers.borrow_mut();
		match callback {
			Some(target) => {
				if let Some(list) = subscribers.get_mut(name) {
					if let Some(index) = list.iter().position(|cb| same_callback(cb, target)) {
						list.remove(index);
					}
				}
			}
			None => {
				subscribers.remove(name);
			}
		}
	}

	/// Dispatch to every subscriber in registration order. The subscriber
	/// list is cloned out first so reentrant `on`/`off` calls from a
	/// callback do not hit a held borrow.
	pub(crate) fn emit(&self, module: &str, name: &str, args: &[Value], sink: &Rc<dyn LogSink>) {
		if !self.declared.contains(name) {
			return;
		}
		let list = match self.subscribers.borrow().get(name) {
			Some(list) => list.clone(),
			None => return,
		};
		for callback in list {
			if let Err(source) = callback(args) {
				let diagnostic = Diagnostic::SubscriberFailed {
					module: module.to_string(),
					event: name.to_string(),
					source,
				};
				sink.log(&diagnostic.to_string());
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::diagnostics::MemorySink;

	fn bus(events: &[&str]) -> EventBus {
		EventBus::new(events.iter().map(|e| e.to_string()).collect())
	}

	fn recording(log: &Rc<RefCell<Vec<String>>>, tag: &str) -> EventCallback {
		let log = log.clone();
		let tag = tag.to_string();
		Rc::new(move |_args| {
			log.borrow_mut().push(tag.clone());
			Ok(())
		})
	}

	#[test]
	fn emit_runs_subscribers_in_registration_order() {
		let bus = bus(&["ping"]);
		let log = Rc::new(RefCell::new(Vec::new()));
		bus.on("ping", recording(&log, "first"));
		bus.on("ping", recording(&log, "second"));

		let sink: Rc<dyn LogSink> = Rc::new(MemorySink::new());
		bus.emit("m", "ping", &[], &sink);

		assert_eq!(*log.borrow(), vec!["first", "second"]);
	}

	#[test]
	fn undeclared_event_is_ignored_by_on_and_emit() {
		let bus = bus(&["ping"]);
		let log = Rc::new(RefCell::new(Vec::new()));
		bus.on("pong", recording(&log, "never"));

		let sink: Rc<dyn LogSink> = Rc::new(MemorySink::new());
		bus.emit("m", "pong", &[], &sink);

		assert!(log.borrow().is_empty());
	}

	#[test]
	fn off_without_callback_clears_the_event() {
		let bus = bus(&["ping"]);
		let log = Rc::new(RefCell::new(Vec::new()));
		bus.on("ping", recording(&log, "a"));
		bus.on("ping", recording(&log, "b"));

		bus.off("ping", None);
		let sink: Rc<dyn LogSink> = Rc::new(MemorySink::new());
		bus.emit("m", "ping", &[], &sink);

		assert!(log.borrow().is_empty());
	}

	#[test]
	fn off_with_callback_removes_only_that_subscriber() {
		let bus = bus(&["ping"]);
		let log = Rc::new(RefCell::new(Vec::new()));
		let keep = recording(&log, "keep");
		let drop_me = recording(&log, "drop");
		bus.on("ping", keep.clone());
		bus.on("ping", drop_me.clone());

		bus.off("ping", Some(&drop_me));
		let sink: Rc<dyn LogSink> = Rc::new(MemorySink::new());
		bus.emit("m", "ping", &[], &sink);

		assert_eq!(*log.borrow(), vec!["keep"]);
	}

	#[test]
	fn failing_subscriber_is_isolated_and_logged() {
		let bus = bus(&["ping"]);
		let log = Rc::new(RefCell::new(Vec::new()));
		bus.on("ping", Rc::new(|_| Err(StoreError::new("boom"))));
		bus.on("ping", recording(&log, "after"));

		let memory = Rc::new(MemorySink::new());
		let sink: Rc<dyn LogSink> = memory.clone();
		bus.emit("m", "ping", &[], &sink);

		assert_eq!(*log.borrow(), vec!["after"]);
		assert!(memory.contains("boom"));
	}

	#[test]
	fn emit_passes_arguments_through() {
		let bus = bus(&["ping"]);
		let seen = Rc::new(RefCell::new(Vec::new()));
		let target = seen.clone();
		bus.on(
			"ping",
			Rc::new(move |args| {
				target.borrow_mut().extend(args.iter().cloned());
				Ok(())
			}),
		);

		let sink: Rc<dyn LogSink> = Rc::new(MemorySink::new());
		bus.emit("m", "ping", &[Value::from(1.0), Value::from("x")], &sink);

		assert_eq!(*seen.borrow(), vec![Value::from(1.0), Value::from("x")]);
	}
}
