//! The observable cell behind every reactive field.
//!
//! A `ValueAccessor` is the explicit rendition of an intercepted field: a
//! value slot, an optional preserved getter/setter pair (already bound to
//! their store), and an optional notify hook installed lazily by the watch
//! registry. Writes run change detection first and invoke the hook at most
//! once per real change, after the new value is in place.

use std::cell::RefCell;
use std::rc::Rc;

use crate::value::{Value, shallow_equal};

/// Getter already bound to its store.
pub(crate) type BoundGetter = Rc<dyn Fn() -> Value>;
/// Setter already bound to its store.
pub(crate) type BoundSetter = Rc<dyn Fn(&[Value])>;
/// Change hook, invoked with the previous value.
pub(crate) type NotifyFn = Rc<dyn Fn(Value)>;

pub(crate) struct ValueAccessor {
	slot: RefCell<Value>,
	getter: Option<BoundGetter>,
	setter: Option<BoundSetter>,
	notify: RefCell<Vec<NotifyFn>>,
}

impl ValueAccessor {
	/// Plain data cell holding an initial value.
	pub(crate) fn data(initial: Value) -> Self {
		Self {
			slot: RefCell::new(initial),
			getter: None,
			setter: None,
			notify: RefCell::new(Vec::new()),
		}
	}

	/// Cell backed by a preserved getter/setter pair. A getter-only cell is
	/// read-only; a setter-only cell reads `Null`.
	pub(crate) fn accessor(getter: Option<BoundGetter>, setter: Option<BoundSetter>) -> Self {
		Self {
			slot: RefCell::new(Value::Null),
			getter,
			setter,
			notify: RefCell::new(Vec::new()),
		}
	}

	pub(crate) fn get(&self) -> Value {
		match &self.getter {
			Some(getter) => getter(),
			None => self.slot.borrow().clone(),
		}
	}

	/// Write with change detection.
	///
	/// A value shallow-equal to the current one is a no-op. A getter-only
	/// cell drops the write silently. Otherwise the write is applied through
	/// the preserved setter (or the slot) and every installed notify hook
	/// receives the previous value exactly once.
	pub(crate) fn set(&self, new: Value) {
		let old = self.get();
		if shallow_equal(&new, &old) {
			return;
		}
		if self.getter.is_some() && self.setter.is_none() {
			return;
		}
		match &self.setter {
			Some(setter) => setter(std::slice::from_ref(&new)),
			None => *self.slot.borrow_mut() = new,
		}
		// clone the hooks out so reentrant writes from a callback do not
		// hit a held borrow
		let hooks = self.notify.borrow().clone();
		for notify in hooks {
			notify(old.clone());
		}
	}

	/// Install a notify hook. Hooks accumulate (one per watched path that
	/// lands on this cell) and are never removed; each fan-out closure
	/// consults its own subscriber list.
	pub(crate) fn install_notify(&self, hook: NotifyFn) {
		self.notify.borrow_mut().push(hook);
	}

	pub(crate) fn is_accessor(&self) -> bool {
		self.getter.is_some() || self.setter.is_some()
	}
}
