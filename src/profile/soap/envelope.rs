//! Customer Management v13 `GetUser` request envelope.

// crates.io
use quick_xml::{
	Writer,
	events::{BytesEnd, BytesStart, BytesText, Event},
};
// self
use crate::{_prelude::*, auth::TokenSecret, error::ProfileFetchError};

const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const SCHEMA_INSTANCE_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const CUSTOMER_NS: &str = "https://bingads.microsoft.com/Customer/v13";

/// Writes the `GetUser` envelope for the signed-in user.
///
/// Both tokens are written as escaped text nodes.
pub(crate) fn get_user_request(
	access_token: &TokenSecret,
	developer_token: &TokenSecret,
) -> Result<Vec<u8>, ProfileFetchError> {
	let mut writer = Writer::new(Vec::new());

	start(
		&mut writer,
		"s:Envelope",
		&[("xmlns:i", SCHEMA_INSTANCE_NS), ("xmlns:s", SOAP_ENVELOPE_NS)],
	)?;
	start(&mut writer, "s:Header", &[("xmlns", CUSTOMER_NS)])?;
	text_element(&mut writer, "Action", &[("mustUnderstand", "1")], "GetUser")?;
	text_element(
		&mut writer,
		"AuthenticationToken",
		&[("i:nil", "false")],
		access_token.expose(),
	)?;
	text_element(&mut writer, "DeveloperToken", &[("i:nil", "false")], developer_token.expose())?;
	end(&mut writer, "s:Header")?;
	start(&mut writer, "s:Body", &[])?;
	start(&mut writer, "GetUserRequest", &[("xmlns", CUSTOMER_NS)])?;
	write(
		&mut writer,
		Event::Empty(BytesStart::new("UserId").with_attributes([("i:nil", "true")])),
	)?;
	end(&mut writer, "GetUserRequest")?;
	end(&mut writer, "s:Body")?;
	end(&mut writer, "s:Envelope")?;

	Ok(writer.into_inner())
}

fn start(
	writer: &mut Writer<Vec<u8>>,
	name: &str,
	attributes: &[(&str, &str)],
) -> Result<(), ProfileFetchError> {
	write(writer, Event::Start(BytesStart::new(name).with_attributes(attributes.iter().copied())))
}

fn end(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), ProfileFetchError> {
	write(writer, Event::End(BytesEnd::new(name)))
}

fn text_element(
	writer: &mut Writer<Vec<u8>>,
	name: &str,
	attributes: &[(&str, &str)],
	value: &str,
) -> Result<(), ProfileFetchError> {
	start(writer, name, attributes)?;
	write(writer, Event::Text(BytesText::new(value)))?;
	end(writer, name)
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ProfileFetchError> {
	writer.write_event(event).map_err(envelope_error)
}

fn envelope_error(err: impl Display) -> ProfileFetchError {
	ProfileFetchError::Envelope { message: err.to_string() }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::profile::soap::tree;

	#[test]
	fn envelope_carries_tokens_in_header() {
		let body = get_user_request(&TokenSecret::new("access"), &TokenSecret::new("dev"))
			.expect("Envelope should be written.");
		let xml = String::from_utf8(body).expect("Envelope should be UTF-8.");

		assert!(xml.starts_with(
			"<s:Envelope xmlns:i=\"http://www.w3.org/2001/XMLSchema-instance\" xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\">"
		));
		assert!(xml.contains("<Action mustUnderstand=\"1\">GetUser</Action>"));
		assert!(xml.contains("<AuthenticationToken i:nil=\"false\">access</AuthenticationToken>"));
		assert!(xml.contains("<DeveloperToken i:nil=\"false\">dev</DeveloperToken>"));
		assert!(xml.contains("<UserId i:nil=\"true\"/>"));
	}

	#[test]
	fn token_markup_is_escaped() {
		let body = get_user_request(
			&TokenSecret::new("a</AuthenticationToken><x>"),
			&TokenSecret::new("d&e"),
		)
		.expect("Envelope should be written.");
		let xml = String::from_utf8(body).expect("Envelope should be UTF-8.");
		let parsed = tree::parse(&xml).expect("Escaped envelope should stay well-formed.");
		let header = &parsed["s:Envelope"]["s:Header"];

		assert!(!xml.contains("<x>"));
		assert_eq!(tree::text(&header["AuthenticationToken"]), Some("a</AuthenticationToken><x>"));
		assert_eq!(tree::text(&header["DeveloperToken"]), Some("d&e"));
	}
}
