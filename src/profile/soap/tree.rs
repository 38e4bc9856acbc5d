//! XML to key/value tree conversion for SOAP responses.
//!
//! Element names keep their namespace prefix (`a:Email`), attribute names drop it and are
//! collected under `"$"`, text of mixed elements lives under `"_"`, elements with neither
//! attributes nor children collapse to their text, and repeated siblings become arrays.

// crates.io
use quick_xml::{
	Reader,
	events::{BytesStart, Event},
};
use serde_json::Map;
// self
use crate::{_prelude::*, error::ProfileFetchError};

const ATTRIBUTES_KEY: &str = "$";
const TEXT_KEY: &str = "_";

#[derive(Default)]
struct Frame {
	name: String,
	attributes: Map<String, JsonValue>,
	children: Map<String, JsonValue>,
	text: String,
}
impl Frame {
	fn open(start: &BytesStart) -> Result<Self, ProfileFetchError> {
		let mut attributes = Map::new();

		for attr in start.attributes() {
			let attr = attr.map_err(xml_message)?;
			let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
			let value = attr.unescape_value().map_err(xml_message)?.into_owned();

			attributes.insert(key, JsonValue::String(value));
		}

		Ok(Self {
			name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
			attributes,
			..Default::default()
		})
	}

	fn close(self) -> (String, JsonValue) {
		if self.attributes.is_empty() && self.children.is_empty() {
			return (self.name, JsonValue::String(self.text));
		}

		let mut object = Map::new();

		if !self.attributes.is_empty() {
			object.insert(ATTRIBUTES_KEY.into(), JsonValue::Object(self.attributes));
		}
		if !self.text.is_empty() {
			object.insert(TEXT_KEY.into(), JsonValue::String(self.text));
		}

		object.extend(self.children);

		(self.name, JsonValue::Object(object))
	}
}

/// Parses `xml` into a single-key object holding the root element.
pub(crate) fn parse(xml: &str) -> Result<JsonValue, ProfileFetchError> {
	let mut reader = Reader::from_str(xml);

	reader.config_mut().trim_text(true);

	let mut stack: Vec<Frame> = Vec::new();
	let mut root = None;

	loop {
		match reader.read_event().map_err(xml_message)? {
			Event::Start(start) => stack.push(Frame::open(&start)?),
			Event::Empty(start) => {
				let (name, value) = Frame::open(&start)?.close();

				attach(&mut stack, &mut root, name, value)?;
			},
			Event::End(_) => {
				let frame = stack.pop().ok_or_else(|| xml_message("unexpected closing tag"))?;
				let (name, value) = frame.close();

				attach(&mut stack, &mut root, name, value)?;
			},
			Event::Text(text) =>
				if let Some(frame) = stack.last_mut() {
					frame.text.push_str(&text.unescape().map_err(xml_message)?);
				},
			Event::CData(data) =>
				if let Some(frame) = stack.last_mut() {
					frame.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
				},
			Event::Eof => break,
			_ => {},
		}
	}

	if !stack.is_empty() {
		return Err(xml_message("unclosed element"));
	}

	root.ok_or_else(|| xml_message("document has no root element"))
}

fn attach(
	stack: &mut [Frame],
	root: &mut Option<JsonValue>,
	name: String,
	value: JsonValue,
) -> Result<(), ProfileFetchError> {
	match stack.last_mut() {
		Some(parent) => add_to_parent(&mut parent.children, name, value),
		None if root.is_none() => {
			let mut object = Map::new();

			object.insert(name, value);
			*root = Some(JsonValue::Object(object));
		},
		None => return Err(xml_message("multiple root elements")),
	}

	Ok(())
}

fn add_to_parent(parent: &mut Map<String, JsonValue>, name: String, value: JsonValue) {
	match parent.get_mut(&name) {
		Some(JsonValue::Array(items)) => items.push(value),
		Some(existing) => {
			let first = existing.take();

			*existing = JsonValue::Array(vec![first, value]);
		},
		None => {
			parent.insert(name, value);
		},
	}
}

fn xml_message(message: impl Display) -> ProfileFetchError {
	ProfileFetchError::Xml { message: message.to_string() }
}

/// Text content of `node`: the string itself, or the `"_"` entry of an element with
/// attributes. Arrays yield the text of their first item.
pub(crate) fn text(node: &JsonValue) -> Option<&str> {
	match node {
		JsonValue::String(value) => Some(value.as_str()),
		JsonValue::Object(object) => object.get(TEXT_KEY).and_then(JsonValue::as_str),
		JsonValue::Array(items) => items.first().and_then(text),
		_ => None,
	}
}

/// Child element `key` of `node`, taking the first occurrence when repeated.
pub(crate) fn child<'a>(node: &'a JsonValue, key: &str) -> Option<&'a JsonValue> {
	let found = match node {
		JsonValue::Array(items) => items.first().and_then(|item| item.get(key)),
		_ => node.get(key),
	}?;

	match found {
		JsonValue::Array(items) => items.first(),
		value => Some(value),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn elements_keep_prefixes_and_attributes_drop_them() {
		let tree = parse(
			r#"<s:Envelope xmlns:s="urn:s"><s:Body><a:Id i:nil="false">99</a:Id><a:Name>A &amp; B</a:Name></s:Body></s:Envelope>"#,
		)
		.expect("Well-formed fixture should parse.");
		let body = &tree["s:Envelope"]["s:Body"];

		assert_eq!(tree["s:Envelope"]["$"]["s"], "urn:s");
		assert_eq!(body["a:Id"]["$"]["nil"], "false");
		assert_eq!(body["a:Id"]["_"], "99");
		assert_eq!(body["a:Name"], "A & B");
	}

	#[test]
	fn repeated_siblings_become_arrays() {
		let tree = parse("<Errors><Error>one</Error><Error>two</Error><Empty/></Errors>")
			.expect("Well-formed fixture should parse.");

		assert_eq!(tree["Errors"]["Error"], serde_json::json!(["one", "two"]));
		assert_eq!(tree["Errors"]["Empty"], "");
		assert_eq!(child(&tree["Errors"], "Error").and_then(text), Some("one"));
	}

	#[test]
	fn malformed_documents_are_rejected() {
		assert!(matches!(parse("<a><b></a>"), Err(ProfileFetchError::Xml { .. })));
		assert!(matches!(parse("<a>"), Err(ProfileFetchError::Xml { .. })));
		assert!(matches!(parse(""), Err(ProfileFetchError::Xml { .. })));
	}
}
