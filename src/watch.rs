//! Path-based change subscriptions.
//!
//! The registry maps exact path strings to subscriber lists. The first
//! subscription for a path locates the terminal field — on the store itself
//! for single-segment paths, or inside a nested object container for longer
//! ones — and installs a fan-out hook on its observable cell. The hook
//! reads the subscriber list at dispatch time, so later subscriptions and
//! removals take effect without reinstalling, and a path whose subscribers
//! are all gone simply delivers to nobody (the cell is never torn down).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::accessor::ValueAccessor;
use crate::diagnostics::Diagnostic;
use crate::events::same_callback;
use crate::path;
use crate::registry::Namespace;
use crate::store::Store;
use crate::value::Value;

/// Watch subscriber: `(new_value, old_value, namespace)`. The namespace is
/// the shared cross-module namespace, so a watcher can read any registered
/// store, not just the one it watched.
pub type WatchCallback = Rc<dyn Fn(&Value, &Value, &Namespace)>;

struct WatchEntry {
	subscribers: RefCell<Vec<WatchCallback>>,
}

pub(crate) struct WatchRegistry {
	entries: RefCell<HashMap<String, Rc<WatchEntry>>>,
}

impl WatchRegistry {
	pub(crate) fn new() -> Self {
		Self {
			entries: RefCell::new(HashMap::new()),
		}
	}

	pub(crate) fn watch(&self, store: &Store, path_string: &str, callback: WatchCallback) {
		let segments = path::parse(path_string);
		if path_string.is_empty() || segments.is_empty() {
			store.report(Diagnostic::InvalidWatchPath {
				module: store.name().to_string(),
			});
			return;
		}

		if let Some(entry) = self.entries.borrow().get(path_string) {
			// later subscription on an installed path: append, de-duplicated
			// by callback identity
			let mut subscribers = entry.subscribers.borrow_mut();
			if !subscribers.iter().any(|cb| same_callback(cb, &callback)) {
				subscribers.push(callback);
			}
			return;
		}

		let cell = match self.locate_cell(store, path_string, &segments) {
			Some(cell) => cell,
			None => return,
		};

		let entry = Rc::new(WatchEntry {
			subscribers: RefCell::new(vec![callback]),
		});
		self.entries
			.borrow_mut()
			.insert(path_string.to_string(), entry.clone());

		// the hook holds weak handles back into the store so the cell it
		// lives in does not keep itself alive through the closure
		let weak_store = store.weak_self();
		let weak_cell = Rc::downgrade(&cell);
		cell.install_notify(Rc::new(move |old: Value| {
			let Some(cell) = weak_cell.upgrade() else {
				return;
			};
			let Some(store) = weak_store.upgrade() else {
				return;
			};
			let Some(namespace) = store.namespace() else {
				return;
			};
			let new = cell.get();
			let subscribers = entry.subscribers.borrow().clone();
			for subscriber in subscribers {
				subscriber(&new, &old, &namespace);
			}
		}));
	}

	/// Resolve the terminal cell for a first subscription.
	fn locate_cell(
		&self,
		store: &Store,
		path_string: &str,
		segments: &[String],
	) -> Option<Rc<ValueAccessor>> {
		if let [terminal] = segments {
			// the store itself is the container
			match store.field_cell(terminal) {
				Some(cell) => Some(cell),
				None => {
					store.report(Diagnostic::UnwatchableField {
						module: store.name().to_string(),
						field: terminal.clone(),
					});
					None
				}
			}
		} else {
			let (terminal, container_path) = segments.split_last()?;
			match store.resolve_segments(container_path) {
				Some(Value::Object(container)) => Some(container.promote(terminal)),
				_ => {
					store.report(Diagnostic::UnwatchableContainer {
						module: store.name().to_string(),
						path: path_string.to_string(),
					});
					None
				}
			}
		}
	}

	/// Remove one subscriber by identity, or all subscribers for the path.
	/// The installed cell stays in place either way.
	pub(crate) fn unwatch(&self, path_string: &str, callback: Option<&WatchCallback>) {
		let entries = self.entries.borrow();
		let Some(entry) = entries.get(path_string) else {
			return;
		};
		let mut subscribers = entry.subscribers.borrow_mut();
		match callback {
			Some(target) => {
				if let Some(index) = subscribers.iter().position(|cb| same_callback(cb, target)) {
					subscribers.remove(index);
				}
			}
			None => subscribers.clear(),
		}
	}
}
