//! Store composition and the live store surface.
//!
//! A `Store` materializes one module definition into an immutable field
//! table. Composition runs in a fixed order — events, merged
//! getter/setter accessors, state, methods — and each step rejects keys
//! already claimed by an earlier step or matching a reserved keyword,
//! logging a diagnostic and leaving the original binding intact. After
//! construction the table is structurally closed: no field can be added or
//! removed, but every field stays readable and writable through its cell.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::accessor::{BoundGetter, BoundSetter, ValueAccessor};
use crate::diagnostics::{Diagnostic, LogSink};
use crate::events::{EventBus, EventCallback};
use crate::path;
use crate::registry::{ModuleDefinition, Namespace};
use crate::value::Value;
use crate::watch::{WatchCallback, WatchRegistry};

/// Computed field read, bound to the store at call time.
pub type GetterFn = Rc<dyn Fn(&Store) -> Value>;
/// Mutating field write; receives the written value(s) as arguments.
pub type SetterFn = Rc<dyn Fn(&Store, &[Value])>;
/// Callable action on the store.
pub type MethodFn = Rc<dyn Fn(&Store, &[Value]) -> Value>;

/// Method already bound to its store, as handed out by [`Store::callable`].
pub type BoundMethod = Rc<dyn Fn(&[Value]) -> Value>;

/// Field names that can never be declared: they name store surfaces.
const RESERVED_FIELD_NAMES: [&str; 2] = ["event", "state"];

/// What kind of declaration backs a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
	/// Plain data field from a `state` declaration.
	Data,
	/// Computed field from `getter`/`setter` declarations.
	Accessor,
	/// Callable field from a `method` declaration.
	Method,
}

enum Field {
	Cell(Rc<ValueAccessor>),
	Method(BoundMethod),
}

/// A live module store.
pub struct Store {
	name: String,
	fields: BTreeMap<String, Field>,
	state_keys: BTreeSet<String>,
	bus: EventBus,
	watches: WatchRegistry,
	namespace: Weak<Namespace>,
	weak_self: Weak<Store>,
	sink: Rc<dyn LogSink>,
}

impl Store {
	/// Compose a store from its definition, bound to the shared namespace
	/// by reference (the namespace may not be fully populated yet).
	pub(crate) fn build(
		definition: ModuleDefinition,
		namespace: &Rc<Namespace>,
		sink: Rc<dyn LogSink>,
	) -> Rc<Store> {
		let module = definition.name.clone();
		Rc::new_cyclic(|weak: &Weak<Store>| {
			let mut fields: BTreeMap<String, Field> = BTreeMap::new();
			let mut state_keys = BTreeSet::new();

			// 1. freeze the declared event names
			let events: BTreeSet<String> = definition.events.into_iter().collect();

			// 2. getter/setter declarations, merged by key in declaration order
			for (key, getter, setter) in merge_accessors(definition.getters, definition.setters) {
				if !claim(&fields, &module, &key, &sink) {
					continue;
				}
				let bound_getter: Option<BoundGetter> = getter.map(|user| {
					let weak = weak.clone();
					Rc::new(move || match weak.upgrade() {
						Some(store) => user(&store),
						None => Value::Null,
					}) as BoundGetter
				});
				let bound_setter: Option<BoundSetter> = setter.map(|user| {
					let weak = weak.clone();
					Rc::new(move |args: &[Value]| {
						if let Some(store) = weak.upgrade() {
							user(&store, args);
						}
					}) as BoundSetter
				});
				fields.insert(
					key,
					Field::Cell(Rc::new(ValueAccessor::accessor(bound_getter, bound_setter))),
				);
			}

			// 3. state entries become data cells
			for (key, initial) in definition.state {
				if !claim(&fields, &module, &key, &sink) {
					continue;
				}
				fields.insert(key.clone(), Field::Cell(Rc::new(ValueAccessor::data(initial))));
				state_keys.insert(key);
			}

			// 4. methods become bound callables
			for (key, user) in definition.methods {
				if !claim(&fields, &module, &key, &sink) {
					continue;
				}
				let weak = weak.clone();
				let bound: BoundMethod = Rc::new(move |args: &[Value]| match weak.upgrade() {
					Some(store) => user(&store, args),
					None => Value::Null,
				});
				fields.insert(key, Field::Method(bound));
			}

			Store {
				name: module,
				fields,
				state_keys,
				bus: EventBus::new(events),
				watches: WatchRegistry::new(),
				namespace: Rc::downgrade(namespace),
				weak_self: weak.clone(),
				sink,
			}
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// The frozen declared event names.
	pub fn events(&self) -> &BTreeSet<String> {
		self.bus.declared()
	}

	/// Keys declared under `state`.
	pub fn state_keys(&self) -> &BTreeSet<String> {
		&self.state_keys
	}

	pub fn field_kind(&self, key: &str) -> Option<FieldKind> {
		self.fields.get(key).map(|field| match field {
			Field::Cell(cell) if cell.is_accessor() => FieldKind::Accessor,
			Field::Cell(_) => FieldKind::Data,
			Field::Method(_) => FieldKind::Method,
		})
	}

	/// Read a data or accessor field. Unknown keys and method fields read
	/// as `None`.
	pub fn get(&self, key: &str) -> Option<Value> {
		match self.fields.get(key) {
			Some(Field::Cell(cell)) => Some(cell.get()),
			_ => None,
		}
	}

	/// Write a data or accessor field. Writes to getter-only fields and to
	/// method fields are dropped silently (read-only precedence); writes to
	/// unknown fields are diagnosed, since the store is structurally closed.
	pub fn set(&self, key: &str, value: impl Into<Value>) {
		match self.fields.get(key) {
			Some(Field::Cell(cell)) => cell.set(value.into()),
			Some(Field::Method(_)) => {}
			None => self.report(Diagnostic::UnknownField {
				module: self.name.clone(),
				field: key.to_string(),
			}),
		}
	}

	/// Invoke a method field. Non-callable fields are diagnosed and return
	/// `None`.
	pub fn call(&self, key: &str, args: &[Value]) -> Option<Value> {
		match self.fields.get(key) {
			Some(Field::Method(method)) => Some(method(args)),
			_ => {
				self.report(Diagnostic::NotCallable {
					module: self.name.clone(),
					field: key.to_string(),
				});
				None
			}
		}
	}

	/// The bound callable behind a method field.
	pub fn callable(&self, key: &str) -> Option<BoundMethod> {
		match self.fields.get(key) {
			Some(Field::Method(method)) => Some(method.clone()),
			_ => None,
		}
	}

	/// Subscribe to a declared event.
	pub fn on(&self, name: &str, callback: EventCallback) {
		self.bus.on(name, callback);
	}

	/// Remove one event subscriber by identity, or all subscribers for the
	/// name.
	pub fn off(&self, name: &str, callback: Option<&EventCallback>) {
		self.bus.off(name, callback);
	}

	/// Emit a declared event to its subscribers, in registration order and
	/// failure-isolated.
	pub fn emit(&self, name: &str, args: &[Value]) {
		self.bus.emit(&self.name, name, args, &self.sink);
	}

	/// Subscribe to changes of the field addressed by `path`.
	pub fn watch(&self, path: &str, callback: WatchCallback) {
		self.watches.watch(self, path, callback);
	}

	/// Remove one watch subscriber by identity, or all subscribers for the
	/// path.
	pub fn unwatch(&self, path: &str, callback: Option<&WatchCallback>) {
		self.watches.unwatch(path, callback);
	}

	/// The shared cross-module namespace, resolved lazily.
	pub fn namespace(&self) -> Option<Rc<Namespace>> {
		self.namespace.upgrade()
	}

	pub(crate) fn weak_self(&self) -> Weak<Store> {
		self.weak_self.clone()
	}

	/// The observable cell behind a data or accessor field.
	pub(crate) fn field_cell(&self, key: &str) -> Option<Rc<ValueAccessor>> {
		match self.fields.get(key) {
			Some(Field::Cell(cell)) => Some(cell.clone()),
			_ => None,
		}
	}

	/// Resolve path segments with the store as root: the first segment is a
	/// field read, the rest walk nested values.
	pub(crate) fn resolve_segments(&self, segments: &[String]) -> Option<Value> {
		let (first, rest) = segments.split_first()?;
		let root = self.get(first)?;
		if rest.is_empty() {
			Some(root)
		} else {
			path::resolve_opt(&root, rest)
		}
	}

	pub(crate) fn report(&self, diagnostic: Diagnostic) {
		self.sink.log(&diagnostic.to_string());
	}
}

impl fmt::Debug for Store {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Store")
			.field("name", &self.name)
			.field("fields", &self.fields.keys().collect::<Vec<_>>())
			.field("events", &self.bus.declared())
			.finish()
	}
}

/// Merge getter and setter declarations by key, keeping the order in which
/// each key first appears. A key declared twice in the same list keeps the
/// last callback.
fn merge_accessors(
	getters: Vec<(String, GetterFn)>,
	setters: Vec<(String, SetterFn)>,
) -> Vec<(String, Option<GetterFn>, Option<SetterFn>)> {
	let mut merged: Vec<(String, Option<GetterFn>, Option<SetterFn>)> = Vec::new();
	for (key, getter) in getters {
		match merged.iter_mut().find(|(k, ..)| *k == key) {
			Some(slot) => slot.1 = Some(getter),
			None => merged.push((key, Some(getter), None)),
		}
	}
	for (key, setter) in setters {
		match merged.iter_mut().find(|(k, ..)| *k == key) {
			Some(slot) => slot.2 = Some(setter),
			None => merged.push((key, None, Some(setter))),
		}
	}
	merged
}

/// Field-name claim check: reserved keywords and already-claimed keys are
/// rejected with a diagnostic.
fn claim(
	fields: &BTreeMap<String, Field>,
	module: &str,
	key: &str,
	sink: &Rc<dyn LogSink>,
) -> bool {
	if RESERVED_FIELD_NAMES.contains(&key) {
		let diagnostic = Diagnostic::ReservedField {
			module: module.to_string(),
			field: key.to_string(),
		};
		sink.log(&diagnostic.to_string());
		return false;
	}
	if fields.contains_key(key) {
		let diagnostic = Diagnostic::DuplicateField {
			module: module.to_string(),
			field: key.to_string(),
		};
		sink.log(&diagnostic.to_string());
		return false;
	}
	true
}
