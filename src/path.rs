//! Path parsing and resolution over nested values.
//!
//! A path string addresses a nested field with dots and brackets:
//! `"a.b[0]"` parses to the segments `["a", "b", "0"]`. Bracket keys may be
//! quoted (`item["a.b"]`, `item['k']`) with backslash escapes inside the
//! quotes, or left unquoted, in which case the bracket content is taken
//! verbatim and trimmed. A leading separator yields a leading `""` segment,
//! and an empty segment appears wherever a separator is immediately
//! followed by another separator or the end of the input.

use crate::value::Value;

/// Parse a path string into ordered segments.
///
/// # Examples
///
/// ```
/// use modstore::path::parse;
///
/// assert_eq!(parse("a.b[0]"), vec!["a", "b", "0"]);
/// assert_eq!(parse(".a"), vec!["", "a"]);
/// assert_eq!(parse(""), Vec::<String>::new());
/// ```
pub fn parse(input: &str) -> Vec<String> {
	let chars: Vec<char> = input.chars().collect();
	let mut segments = Vec::new();
	if chars.first() == Some(&'.') {
		segments.push(String::new());
	}

	let mut i = 0;
	while i < chars.len() {
		match chars[i] {
			'[' => {
				if let Some((segment, next)) = parse_bracket(&chars, i) {
					segments.push(segment);
					i = next;
				} else {
					if separator_run_at(&chars, i) {
						segments.push(String::new());
					}
					i += 1;
				}
			}
			'.' => {
				if separator_run_at(&chars, i) {
					segments.push(String::new());
				}
				i += 1;
			}
			']' => {
				i += 1;
			}
			_ => {
				let start = i;
				while i < chars.len() && !matches!(chars[i], '.' | '[' | ']') {
					i += 1;
				}
				segments.push(chars[start..i].iter().collect());
			}
		}
	}
	segments
}

/// Length of the separator token starting at `i`: `.` or `[]`.
fn separator_len(chars: &[char], i: usize) -> Option<usize> {
	match chars.get(i) {
		Some('.') => Some(1),
		Some('[') if chars.get(i + 1) == Some(&']') => Some(2),
		_ => None,
	}
}

/// True when the separator at `i` is immediately followed by another
/// separator or the end of input, which denotes an empty segment.
fn separator_run_at(chars: &[char], i: usize) -> bool {
	match separator_len(chars, i) {
		Some(len) => {
			let next = i + len;
			next == chars.len() || separator_len(chars, next).is_some()
		}
		None => false,
	}
}

/// Parse one bracket group starting at the `[` at `open`. Returns the
/// extracted key and the index just past the closing bracket.
fn parse_bracket(chars: &[char], open: usize) -> Option<(String, usize)> {
	let first = *chars.get(open + 1)?;
	if first == '"' || first == '\'' {
		parse_quoted_bracket(chars, open, first)
	} else {
		// unquoted expression: greedy up to the last closing bracket,
		// matching the source model's parser
		let close = (open + 2..chars.len()).rev().find(|&j| chars[j] == ']')?;
		let inner: String = chars[open + 1..close].iter().collect();
		Some((inner.trim().to_string(), close + 1))
	}
}

fn parse_quoted_bracket(chars: &[char], open: usize, quote: char) -> Option<(String, usize)> {
	let mut key = String::new();
	let mut i = open + 2;
	while i < chars.len() {
		match chars[i] {
			'\\' if i + 1 < chars.len() => {
				key.push(chars[i + 1]);
				i += 2;
			}
			c if c == quote => {
				// closing quote must be followed by the closing bracket
				if chars.get(i + 1) == Some(&']') {
					return Some((key, i + 2));
				}
				return None;
			}
			c => {
				key.push(c);
				i += 1;
			}
		}
	}
	None
}

/// Resolve `segments` against `root`, returning `fallback` when the walk
/// hits a null or unreadable value before all segments are consumed, when
/// the final lookup misses, or when `segments` is empty.
pub fn resolve<S: AsRef<str>>(root: &Value, segments: &[S], fallback: Value) -> Value {
	if segments.is_empty() {
		return fallback;
	}
	resolve_opt(root, segments).unwrap_or(fallback)
}

/// Resolve to `Some(value)` only when every segment reads successfully.
pub(crate) fn resolve_opt<S: AsRef<str>>(root: &Value, segments: &[S]) -> Option<Value> {
	let mut current = root.clone();
	for segment in segments {
		let segment = segment.as_ref();
		let next = match &current {
			Value::Object(object) => object.get(segment),
			Value::List(list) => segment.parse::<usize>().ok().and_then(|i| list.get(i)),
			_ => None,
		};
		match next {
			Some(value) => current = value,
			None => return None,
		}
	}
	Some(current)
}
