//! Module definitions and the shared namespace.
//!
//! [`ModuleDefinition`] is the declarative input: a named bundle of state,
//! getter/setter, method and event declarations, collected in declaration
//! order. [`init_store`] materializes a batch of definitions into live
//! stores under one [`Namespace`]; definitions with a missing or duplicate
//! name are skipped with a diagnostic and the rest of the batch still
//! registers.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::diagnostics::{Diagnostic, LogSink, TracingSink};
use crate::store::{GetterFn, MethodFn, SetterFn, Store};
use crate::value::Value;

/// Declarative description of one module, built up fluently.
#[derive(Clone, Default)]
pub struct ModuleDefinition {
	pub(crate) name: String,
	pub(crate) state: Vec<(String, Value)>,
	pub(crate) getters: Vec<(String, GetterFn)>,
	pub(crate) setters: Vec<(String, SetterFn)>,
	pub(crate) methods: Vec<(String, MethodFn)>,
	pub(crate) events: Vec<String>,
}

impl ModuleDefinition {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Self::default()
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Declare a data field with its initial value.
	pub fn state(mut self, key: impl Into<String>, initial: impl Into<Value>) -> Self {
		self.state.push((key.into(), initial.into()));
		self
	}

	/// Declare a computed read for a field.
	pub fn getter(
		mut self,
		key: impl Into<String>,
		getter: impl Fn(&Store) -> Value + 'static,
	) -> Self {
		self.getters.push((key.into(), Rc::new(getter)));
		self
	}

	/// Declare a delegated write for a field.
	pub fn setter(
		mut self,
		key: impl Into<String>,
		setter: impl Fn(&Store, &[Value]) + 'static,
	) -> Self {
		self.setters.push((key.into(), Rc::new(setter)));
		self
	}

	/// Declare a callable method.
	pub fn method(
		mut self,
		key: impl Into<String>,
		method: impl Fn(&Store, &[Value]) -> Value + 'static,
	) -> Self {
		self.methods.push((key.into(), Rc::new(method)));
		self
	}

	/// Declare an event name this module may emit.
	pub fn event(mut self, name: impl Into<String>) -> Self {
		self.events.push(name.into());
		self
	}
}

impl std::fmt::Debug for ModuleDefinition {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ModuleDefinition")
			.field("name", &self.name)
			.field("state", &self.state.iter().map(|(k, _)| k).collect::<Vec<_>>())
			.field("getters", &self.getters.iter().map(|(k, _)| k).collect::<Vec<_>>())
			.field("setters", &self.setters.iter().map(|(k, _)| k).collect::<Vec<_>>())
			.field("methods", &self.methods.iter().map(|(k, _)| k).collect::<Vec<_>>())
			.field("events", &self.events)
			.finish()
	}
}

/// The shared registry of live stores, keyed by module name.
///
/// Every watcher receives a reference to the namespace it was registered
/// under, so cross-module reads never need a global.
#[derive(Default)]
pub struct Namespace {
	modules: RefCell<BTreeMap<String, Rc<Store>>>,
}

impl Namespace {
	pub fn get(&self, name: &str) -> Option<Rc<Store>> {
		self.modules.borrow().get(name).cloned()
	}

	pub fn names(&self) -> Vec<String> {
		self.modules.borrow().keys().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.modules.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.modules.borrow().is_empty()
	}
}

impl std::fmt::Debug for Namespace {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Namespace")
			.field("modules", &self.names())
			.finish()
	}
}

/// Materialize a batch of module definitions into one namespace, logging
/// diagnostics through `tracing`.
pub fn init_store(definitions: impl IntoIterator<Item = ModuleDefinition>) -> Rc<Namespace> {
	init_store_with(definitions, Rc::new(TracingSink))
}

/// [`init_store`] with an explicit diagnostic sink.
pub fn init_store_with(
	definitions: impl IntoIterator<Item = ModuleDefinition>,
	sink: Rc<dyn LogSink>,
) -> Rc<Namespace> {
	let namespace = Rc::new(Namespace::default());
	for definition in definitions {
		if definition.name.is_empty() {
			sink.log(&Diagnostic::MissingModuleName.to_string());
			continue;
		}
		if namespace.modules.borrow().contains_key(&definition.name) {
			sink.log(&Diagnostic::DuplicateModuleName(definition.name.clone()).to_string());
			continue;
		}
		let name = definition.name.clone();
		let store = Store::build(definition, &namespace, sink.clone());
		namespace.modules.borrow_mut().insert(name, store);
	}
	namespace
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::diagnostics::MemorySink;

	#[test]
	fn init_store_registers_every_named_definition() {
		let namespace = init_store([
			ModuleDefinition::new("cart").state("items", Value::list([])),
			ModuleDefinition::new("user").state("id", Value::Null),
		]);

		assert_eq!(namespace.len(), 2);
		assert_eq!(namespace.names(), vec!["cart", "user"]);
		assert!(namespace.get("cart").is_some());
		assert!(namespace.get("missing").is_none());
	}

	#[test]
	fn unnamed_definition_is_skipped_with_a_diagnostic() {
		let memory = Rc::new(MemorySink::new());
		let namespace = init_store_with(
			[
				ModuleDefinition::default().state("orphan", 1.0),
				ModuleDefinition::new("kept").state("n", 1.0),
			],
			memory.clone(),
		);

		assert_eq!(namespace.len(), 1);
		assert!(namespace.get("kept").is_some());
		assert!(memory.contains("missing a name"));
	}

	#[test]
	fn duplicate_module_name_keeps_the_first_definition() {
		let memory = Rc::new(MemorySink::new());
		let namespace = init_store_with(
			[
				ModuleDefinition::new("m").state("n", 1.0),
				ModuleDefinition::new("m").state("n", 2.0),
			],
			memory.clone(),
		);

		assert_eq!(namespace.len(), 1);
		let store = namespace.get("m").unwrap();
		assert_eq!(store.get("n"), Some(Value::from(1.0)));
		assert!(memory.contains("duplicate module name 'm'"));
	}

	#[test]
	fn stores_reach_each_other_through_the_namespace() {
		let namespace = init_store([
			ModuleDefinition::new("rates").state("tax", 0.2),
			ModuleDefinition::new("cart")
				.state("net", 100.0)
				.getter("gross", |store| {
					let namespace = store.namespace().unwrap();
					let tax = namespace
						.get("rates")
						.and_then(|rates| rates.get("tax"))
						.and_then(|v| v.as_f64())
						.unwrap_or(0.0);
					let net = store.get("net").and_then(|v| v.as_f64()).unwrap_or(0.0);
					Value::from(net * (1.0 + tax))
				}),
		]);

		let cart = namespace.get("cart").unwrap();
		assert_eq!(cart.get("gross"), Some(Value::from(120.0)));
	}

	#[test]
	fn definition_builder_preserves_declaration_order() {
		let definition = ModuleDefinition::new("m")
			.state("b", 1.0)
			.state("a", 2.0)
			.event("second")
			.event("first");

		let keys: Vec<&str> = definition.state.iter().map(|(k, _)| k.as_str()).collect();
		assert_eq!(keys, vec!["b", "a"]);
		assert_eq!(definition.events, vec!["second", "first"]);
	}
}
