//! Diagnostics and the pluggable log sink.
//!
//! The store never throws on misuse: every invalid registration or
//! operation is rendered as a [`Diagnostic`] and handed to the namespace's
//! [`LogSink`], and the offending operation is skipped. The default sink
//! forwards to `tracing`; tests inject a [`MemorySink`] to assert on the
//! reported messages.

use std::cell::RefCell;

/// Failure value returned by an event subscriber.
///
/// Returning `Err(StoreError)` from a subscriber is the throwing-subscriber
/// case: the error is logged and dispatch continues with the remaining
/// subscribers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StoreError {
	message: String,
}

impl StoreError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}

	pub fn message(&self) -> &str {
		&self.message
	}
}

/// Everything the store reports instead of failing.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Diagnostic {
	#[error("module registration skipped: definition is missing a name")]
	MissingModuleName,

	#[error("module registration skipped: duplicate module name '{0}'")]
	DuplicateModuleName(String),

	#[error(
		"module '{module}': duplicate field '{field}', check the state, getter, setter and method declarations"
	)]
	DuplicateField { module: String, field: String },

	#[error("module '{module}': '{field}' is a reserved store keyword and cannot be declared as a field")]
	ReservedField { module: String, field: String },

	#[error("module '{module}': watch requires a non-empty path string")]
	InvalidWatchPath { module: String },

	#[error("module '{module}': '{path}' does not resolve to an object container and cannot be watched")]
	UnwatchableContainer { module: String, path: String },

	#[error("module '{module}': '{field}' is not a watchable field")]
	UnwatchableField { module: String, field: String },

	#[error("module '{module}': cannot write to unknown field '{field}'")]
	UnknownField { module: String, field: String },

	#[error("module '{module}': '{field}' is not callable")]
	NotCallable { module: String, field: String },

	#[error("module '{module}': event '{event}' subscriber failed: {source}")]
	SubscriberFailed {
		module: String,
		event: String,
		source: StoreError,
	},
}

/// Destination for diagnostic messages.
pub trait LogSink {
	fn log(&self, message: &str);
}

/// Default sink: forwards diagnostics to `tracing` at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
	fn log(&self, message: &str) {
		tracing::error!(target: "modstore", "{message}");
	}
}

/// Sink that records every message, for tests and diagnostics capture.
#[derive(Debug, Default)]
pub struct MemorySink {
	messages: RefCell<Vec<String>>,
}

impl MemorySink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn messages(&self) -> Vec<String> {
		self.messages.borrow().clone()
	}

	pub fn is_empty(&self) -> bool {
		self.messages.borrow().is_empty()
	}

	pub fn contains(&self, needle: &str) -> bool {
		self.messages.borrow().iter().any(|m| m.contains(needle))
	}
}

impl LogSink for MemorySink {
	fn log(&self, message: &str) {
		self.messages.borrow_mut().push(message.to_string());
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn diagnostic_display_names_the_module_and_field() {
		let diagnostic = Diagnostic::DuplicateField {
			module: "cart".into(),
			field: "total".into(),
		};

		let rendered = diagnostic.to_string();
		assert!(rendered.contains("cart"));
		assert!(rendered.contains("total"));
	}

	#[test]
	fn subscriber_failure_carries_the_source_message() {
		let diagnostic = Diagnostic::SubscriberFailed {
			module: "cart".into(),
			event: "checkout".into(),
			source: StoreError::new("boom"),
		};

		assert!(diagnostic.to_string().contains("boom"));
	}

	#[test]
	fn memory_sink_records_in_order() {
		let sink = MemorySink::new();
		sink.log("first");
		sink.log("second");

		assert_eq!(sink.messages(), vec!["first", "second"]);
		assert!(sink.contains("second"));
		assert!(!sink.is_empty());
	}
}
