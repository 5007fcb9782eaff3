//! Dynamic value model shared by every store field.
//!
//! `Value` covers the ground a loosely typed state tree needs: scalars plus
//! reference-typed lists and string-keyed objects. List and object handles
//! are `Rc`-shared with interior mutability, so clones alias the same
//! underlying container and identity comparison stays meaningful after a
//! value has been passed around. Object entries start out as plain values
//! and are promoted to observable cells the first time a watcher lands on
//! them.
//!
//! Two comparison primitives back the change-detection contract:
//!
//! - [`is_identical`] — strict identity: NaN is identical to itself, +0 and
//!   −0 are distinct, containers compare by handle identity.
//! - [`shallow_equal`] — identity, or a one-level entrywise identity
//!   comparison for two lists or two objects.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::rc::Rc;

use crate::accessor::ValueAccessor;

/// A dynamically typed store value.
#[derive(Clone)]
pub enum Value {
	Null,
	Bool(bool),
	Number(f64),
	String(String),
	List(ListRef),
	Object(ObjectRef),
}

impl Value {
	/// Build an object value from key/value pairs.
	pub fn object<K, I>(entries: I) -> Value
	where
		K: Into<String>,
		I: IntoIterator<Item = (K, Value)>,
	{
		let object = ObjectRef::new();
		for (key, value) in entries {
			object.set(&key.into(), value);
		}
		Value::Object(object)
	}

	/// Build a list value from items.
	pub fn list<I>(items: I) -> Value
	where
		I: IntoIterator<Item = Value>,
	{
		Value::List(ListRef::from_vec(items.into_iter().collect()))
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Value::Number(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<ListRef> {
		match self {
			Value::List(list) => Some(list.clone()),
			_ => None,
		}
	}

	pub fn as_object(&self) -> Option<ObjectRef> {
		match self {
			Value::Object(object) => Some(object.clone()),
			_ => None,
		}
	}

	/// Name of the value's kind, used in diagnostics.
	pub fn kind(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Bool(_) => "bool",
			Value::Number(_) => "number",
			Value::String(_) => "string",
			Value::List(_) => "list",
			Value::Object(_) => "object",
		}
	}
}

/// Number identity: NaN is identical to itself, +0 and −0 are not.
fn number_identical(a: f64, b: f64) -> bool {
	if a.is_nan() && b.is_nan() {
		return true;
	}
	// +0 == -0 under IEEE comparison, so zeros fall back to the bit pattern
	a == b && (a != 0.0 || a.to_bits() == b.to_bits())
}

/// Strict identity comparison.
///
/// Scalars compare by value with the NaN-equal / signed-zero-distinct number
/// rule; lists and objects compare by handle identity only.
pub fn is_identical(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Null, Value::Null) => true,
		(Value::Bool(a), Value::Bool(b)) => a == b,
		(Value::Number(a), Value::Number(b)) => number_identical(*a, *b),
		(Value::String(a), Value::String(b)) => a == b,
		(Value::List(a), Value::List(b)) => a.ptr_eq(b),
		(Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
		_ => false,
	}
}

/// Shallow equality: identity, or a one-level entrywise identity comparison
/// of two objects or two lists.
///
/// This is the change-suppression predicate: a write whose new value is
/// shallow-equal to the current one is a no-op.
pub fn shallow_equal(a: &Value, b: &Value) -> bool {
	if is_identical(a, b) {
		return true;
	}
	match (a, b) {
		(Value::Object(a), Value::Object(b)) => {
			let left = a.entries();
			let right = b.entries();
			left.len() == right.len()
				&& left.iter().all(|(key, value)| {
					b.get(key).is_some_and(|other| is_identical(value, &other))
				})
		}
		(Value::List(a), Value::List(b)) => {
			let left = a.to_vec();
			let right = b.to_vec();
			left.len() == right.len()
				&& left
					.iter()
					.zip(right.iter())
					.all(|(x, y)| is_identical(x, y))
		}
		_ => false,
	}
}

impl PartialEq for Value {
	/// Deep structural equality, using the identity rule for numbers.
	///
	/// This backs test assertions; the reactive engine itself uses
	/// [`is_identical`] and [`shallow_equal`]. Recurses through shared
	/// containers with no cycle guard: do not compare a self-referential
	/// value with `==` (same caveat as `Debug`).
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Number(a), Value::Number(b)) => number_identical(*a, *b),
			(Value::String(a), Value::String(b)) => a == b,
			(Value::List(a), Value::List(b)) => a.ptr_eq(b) || a.to_vec() == b.to_vec(),
			(Value::Object(a), Value::Object(b)) => a.ptr_eq(b) || a.entries() == b.entries(),
			_ => false,
		}
	}
}

impl fmt::Debug for Value {
	/// Recurses through shared containers with no cycle guard; formatting a
	/// self-referential value does not terminate.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => write!(f, "null"),
			Value::Bool(b) => write!(f, "{b}"),
			Value::Number(n) => write!(f, "{n}"),
			Value::String(s) => write!(f, "{s:?}"),
			Value::List(list) => f.debug_list().entries(list.to_vec()).finish(),
			Value::Object(object) => {
				let mut map = f.debug_map();
				for (key, value) in object.entries() {
					map.entry(&key, &value);
				}
				map.finish()
			}
		}
	}
}

impl Default for Value {
	fn default() -> Self {
		Value::Null
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Value::Bool(v)
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::Number(v)
	}
}

impl From<f32> for Value {
	fn from(v: f32) -> Self {
		Value::Number(f64::from(v))
	}
}

impl From<i32> for Value {
	fn from(v: i32) -> Self {
		Value::Number(f64::from(v))
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Number(v as f64)
	}
}

impl From<u32> for Value {
	fn from(v: u32) -> Self {
		Value::Number(f64::from(v))
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::String(v.to_string())
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::String(v)
	}
}

impl From<Vec<Value>> for Value {
	fn from(v: Vec<Value>) -> Self {
		Value::List(ListRef::from_vec(v))
	}
}

impl From<BTreeMap<String, Value>> for Value {
	fn from(v: BTreeMap<String, Value>) -> Self {
		Value::object(v)
	}
}

impl From<serde_json::Value> for Value {
	fn from(v: serde_json::Value) -> Self {
		match v {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(b) => Value::Bool(b),
			serde_json::Value::Number(n) => {
				n.as_f64().map(Value::Number).unwrap_or(Value::Null)
			}
			serde_json::Value::String(s) => Value::String(s),
			serde_json::Value::Array(items) => {
				Value::list(items.into_iter().map(Value::from))
			}
			serde_json::Value::Object(map) => {
				Value::object(map.into_iter().map(|(k, v)| (k, Value::from(v))))
			}
		}
	}
}

impl From<&Value> for serde_json::Value {
	/// Deep copy into a JSON tree. Non-finite numbers have no JSON
	/// representation and map to `null`.
	fn from(v: &Value) -> Self {
		match v {
			Value::Null => serde_json::Value::Null,
			Value::Bool(b) => serde_json::Value::Bool(*b),
			Value::Number(n) => serde_json::Number::from_f64(*n)
				.map(serde_json::Value::Number)
				.unwrap_or(serde_json::Value::Null),
			Value::String(s) => serde_json::Value::String(s.clone()),
			Value::List(list) => serde_json::Value::Array(
				list.to_vec().iter().map(serde_json::Value::from).collect(),
			),
			Value::Object(object) => serde_json::Value::Object(
				object
					.entries()
					.iter()
					.map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
					.collect(),
			),
		}
	}
}

/// Shared handle to a list of values.
#[derive(Clone, Default)]
pub struct ListRef(Rc<RefCell<Vec<Value>>>);

impl ListRef {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_vec(items: Vec<Value>) -> Self {
		Self(Rc::new(RefCell::new(items)))
	}

	pub fn get(&self, index: usize) -> Option<Value> {
		self.0.borrow().get(index).cloned()
	}

	/// Overwrite an existing element; out-of-bounds writes are ignored.
	pub fn set(&self, index: usize, value: Value) {
		let mut items = self.0.borrow_mut();
		if let Some(slot) = items.get_mut(index) {
			*slot = value;
		}
	}

	pub fn push(&self, value: Value) {
		self.0.borrow_mut().push(value);
	}

	pub fn len(&self) -> usize {
		self.0.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.borrow().is_empty()
	}

	pub fn to_vec(&self) -> Vec<Value> {
		self.0.borrow().clone()
	}

	/// Handle identity.
	pub fn ptr_eq(&self, other: &ListRef) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

/// One entry of an object: plain until a watcher promotes it to a cell.
enum Slot {
	Plain(Value),
	Cell(Rc<ValueAccessor>),
}

impl Slot {
	fn read(&self) -> Value {
		match self {
			Slot::Plain(value) => value.clone(),
			Slot::Cell(cell) => cell.get(),
		}
	}
}

/// Shared handle to a string-keyed object.
#[derive(Clone, Default)]
pub struct ObjectRef(Rc<RefCell<BTreeMap<String, Slot>>>);

impl ObjectRef {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, key: &str) -> Option<Value> {
		self.0.borrow().get(key).map(Slot::read)
	}

	/// Write an entry. Promoted entries go through their cell, which applies
	/// change detection and notification; plain entries are overwritten in
	/// place.
	pub fn set(&self, key: &str, value: Value) {
		let cell = {
			let map = self.0.borrow();
			match map.get(key) {
				Some(Slot::Cell(cell)) => Some(cell.clone()),
				_ => None,
			}
		};
		match cell {
			Some(cell) => cell.set(value),
			None => {
				self.0
					.borrow_mut()
					.insert(key.to_string(), Slot::Plain(value));
			}
		}
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.0.borrow().contains_key(key)
	}

	pub fn keys(&self) -> Vec<String> {
		self.0.borrow().keys().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.0.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.borrow().is_empty()
	}

	pub fn entries(&self) -> Vec<(String, Value)> {
		self.0
			.borrow()
			.iter()
			.map(|(key, slot)| (key.clone(), slot.read()))
			.collect()
	}

	/// Handle identity.
	pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Promote an entry to an observable cell, creating a `Null` entry when
	/// the key is missing. Idempotent: an already promoted entry returns its
	/// existing cell.
	pub(crate) fn promote(&self, key: &str) -> Rc<ValueAccessor> {
		let mut map = self.0.borrow_mut();
		match map.entry(key.to_string()) {
			Entry::Occupied(mut occupied) => match occupied.get() {
				Slot::Cell(cell) => cell.clone(),
				Slot::Plain(value) => {
					let cell = Rc::new(ValueAccessor::data(value.clone()));
					occupied.insert(Slot::Cell(cell.clone()));
					cell
				}
			},
			Entry::Vacant(vacant) => {
				let cell = Rc::new(ValueAccessor::data(Value::Null));
				vacant.insert(Slot::Cell(cell.clone()));
				cell
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn nan_is_identical_to_itself() {
		assert!(is_identical(
			&Value::Number(f64::NAN),
			&Value::Number(f64::NAN)
		));
	}

	#[test]
	fn signed_zeros_are_distinct() {
		assert!(!is_identical(&Value::Number(0.0), &Value::Number(-0.0)));
		assert!(is_identical(&Value::Number(0.0), &Value::Number(0.0)));
		assert!(is_identical(&Value::Number(-0.0), &Value::Number(-0.0)));
	}

	#[rstest]
	#[case(Value::Null, Value::Null, true)]
	#[case(Value::Bool(true), Value::Bool(true), true)]
	#[case(Value::Bool(true), Value::Bool(false), false)]
	#[case(Value::from("a"), Value::from("a"), true)]
	#[case(Value::from("a"), Value::from(1.0), false)]
	fn scalar_identity(#[case] a: Value, #[case] b: Value, #[case] expected: bool) {
		assert_eq!(is_identical(&a, &b), expected);
	}

	#[test]
	fn containers_are_identical_by_handle_only() {
		let a = Value::object([("k", Value::from(1.0))]);
		let b = Value::object([("k", Value::from(1.0))]);
		let alias = a.clone();

		assert!(is_identical(&a, &alias));
		assert!(!is_identical(&a, &b));
	}

	#[test]
	fn shallow_equal_compares_one_level() {
		let a = Value::object([("x", Value::from(1.0)), ("y", Value::from("s"))]);
		let b = Value::object([("x", Value::from(1.0)), ("y", Value::from("s"))]);
		let c = Value::object([("x", Value::from(2.0)), ("y", Value::from("s"))]);

		assert!(shallow_equal(&a, &b));
		assert!(!shallow_equal(&a, &c));
	}

	#[test]
	fn shallow_equal_requires_entry_identity_for_nested_containers() {
		let inner = Value::object([("n", Value::from(1.0))]);
		let a = Value::object([("inner", inner.clone())]);
		// structurally equal nested object, but a different handle
		let b = Value::object([("inner", Value::object([("n", Value::from(1.0))]))]);
		let c = Value::object([("inner", inner)]);

		assert!(!shallow_equal(&a, &b));
		assert!(shallow_equal(&a, &c));
	}

	#[test]
	fn shallow_equal_lists() {
		let a = Value::list([Value::from(1.0), Value::from(2.0)]);
		let b = Value::list([Value::from(1.0), Value::from(2.0)]);
		let c = Value::list([Value::from(1.0)]);

		assert!(shallow_equal(&a, &b));
		assert!(!shallow_equal(&a, &c));
		assert!(!shallow_equal(&a, &Value::object([("0", Value::from(1.0))])));
	}

	#[test]
	fn structural_equality_is_deep() {
		let a = Value::object([("inner", Value::object([("n", Value::from(1.0))]))]);
		let b = Value::object([("inner", Value::object([("n", Value::from(1.0))]))]);

		assert_eq!(a, b);
	}

	#[test]
	fn object_set_and_get_round_trip() {
		let object = ObjectRef::new();
		object.set("a", Value::from(1.0));

		assert_eq!(object.get("a"), Some(Value::from(1.0)));
		assert_eq!(object.get("missing"), None);
		assert_eq!(object.len(), 1);
	}

	#[test]
	fn promoted_entry_keeps_its_value_and_identity() {
		let object = ObjectRef::new();
		object.set("a", Value::from(7.0));

		let cell = object.promote("a");
		assert_eq!(cell.get(), Value::from(7.0));
		assert_eq!(object.get("a"), Some(Value::from(7.0)));

		// promotion is idempotent
		let again = object.promote("a");
		assert!(Rc::ptr_eq(&cell, &again));

		// writes through the handle now flow through the cell
		object.set("a", Value::from(8.0));
		assert_eq!(cell.get(), Value::from(8.0));
	}

	#[test]
	fn promote_missing_key_creates_null_entry() {
		let object = ObjectRef::new();
		let cell = object.promote("ghost");

		assert_eq!(cell.get(), Value::Null);
		assert_eq!(object.get("ghost"), Some(Value::Null));
	}

	#[test]
	fn json_conversion_round_trip() {
		let json = serde_json::json!({
			"name": "pad",
			"count": 3,
			"tags": ["a", "b"],
			"nested": { "on": true },
		});

		let value = Value::from(json.clone());
		assert_eq!(value.as_object().unwrap().get("name"), Some(Value::from("pad")));
		assert_eq!(serde_json::Value::from(&value), json);
	}

	#[test]
	fn non_finite_numbers_serialize_to_null() {
		let value = Value::Number(f64::NAN);
		assert_eq!(serde_json::Value::from(&value), serde_json::Value::Null);
	}
}
