//! Microsoft Advertising Customer Management `GetUser` profile fetcher.

mod envelope;
mod tree;

// crates.io
use oauth2::{
	AsyncHttpClient,
	http::{Method, Request, header::CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::ProfileFetchError,
	http::{ProviderHttpClient, ResponseMetadataSlot},
	profile::{Profile, ProfileEmail, ProfileFetcher, ProfileFuture, ProfileName},
};

const SOAP_ACTION: &str = "GetUser";

/// Fault reported inside a SOAP response body, flattened into one message.
///
/// The message is the first provider error `Message` found under the fault `detail`,
/// falling back to `faultstring`.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct SoapFault {
	message: String,
}
impl SoapFault {
	/// Creates a fault carrying `message`.
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}

	/// Flattened fault message.
	pub fn message(&self) -> &str {
		&self.message
	}

	fn from_node(fault: &JsonValue) -> Self {
		let message = tree::child(fault, "detail")
			.and_then(detail_message)
			.or_else(|| tree::child(fault, "faultstring").and_then(tree::text))
			.filter(|message| !message.is_empty())
			.unwrap_or("Unknown SOAP fault");

		Self::new(message)
	}
}

// Depth-first search below `detail` for the first non-empty `Message` leaf. Covers both
// `*FaultDetail/Errors/*Error` and `ApiFault/OperationErrors/OperationError` shapes.
fn detail_message(node: &JsonValue) -> Option<&str> {
	let object = match node {
		JsonValue::Object(object) => object,
		JsonValue::Array(items) => return items.iter().find_map(detail_message),
		_ => return None,
	};

	if let Some(message) =
		object.get("Message").and_then(tree::text).filter(|message| !message.is_empty())
	{
		return Some(message);
	}

	object
		.iter()
		.filter(|(key, _)| !matches!(key.as_str(), "$" | "_"))
		.find_map(|(_, child)| detail_message(child))
}

/// Fetches profiles through the Customer Management `GetUser` SOAP operation.
///
/// The HTTP status is not inspected; faults arrive with a `500` and are read from the body.
pub struct CustomerManagementProfileFetcher<C>
where
	C: ?Sized + ProviderHttpClient,
{
	http_client: Arc<C>,
	endpoint: Url,
	developer_token: TokenSecret,
}
impl<C> CustomerManagementProfileFetcher<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Label reported by [`ProfileFetcher::api`].
	pub const API: &'static str = "customer_management";

	/// Creates a fetcher posting to `endpoint` with the given developer token.
	pub fn new(http_client: impl Into<Arc<C>>, endpoint: Url, developer_token: TokenSecret) -> Self {
		Self { http_client: http_client.into(), endpoint, developer_token }
	}

	/// Service URL the envelope is posted to.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	async fn fetch(&self, access_token: &TokenSecret) -> Result<Profile, ProfileFetchError> {
		let body = envelope::get_user_request(access_token, &self.developer_token)?;
		let request = Request::builder()
			.method(Method::POST)
			.uri(self.endpoint.as_str())
			.header(CONTENT_TYPE, "text/xml; charset=utf-8")
			.header("SOAPAction", SOAP_ACTION)
			.body(body)?;
		let handle = self.http_client.with_metadata(ResponseMetadataSlot::default());
		let response = handle.call(request).await.map_err(ProfileFetchError::network)?;
		let raw = String::from_utf8_lossy(response.body()).into_owned();
		let json = tree::parse(&raw)?;

		profile_from_tree(raw, json)
	}
}
impl<C> ProfileFetcher for CustomerManagementProfileFetcher<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn api(&self) -> &'static str {
		Self::API
	}

	fn fetch_profile<'a>(&'a self, access_token: &'a TokenSecret) -> ProfileFuture<'a> {
		Box::pin(async move { self.fetch(access_token).await.map_err(Error::from) })
	}
}
impl<C> Debug for CustomerManagementProfileFetcher<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CustomerManagementProfileFetcher")
			.field("endpoint", &self.endpoint)
			.field("developer_token", &self.developer_token)
			.finish()
	}
}

fn profile_from_tree(raw: String, json: JsonValue) -> Result<Profile, ProfileFetchError> {
	let body = require(&json, &["s:Envelope", "s:Body"])?;

	if let Some(fault) = tree::child(body, "s:Fault") {
		return Err(SoapFault::from_node(fault).into());
	}

	let user = require(body, &["GetUserResponse", "User"])?;
	let first_name = require_text(user, &["a:Name", "a:FirstName"])?;
	let last_name = require_text(user, &["a:Name", "a:LastName"])?;
	let email = require_text(user, &["a:ContactInfo", "a:Email"])?;
	let id = require_text(user, &["a:Id"])?;

	Ok(Profile {
		provider: Profile::PROVIDER.into(),
		id: id.to_owned(),
		display_name: format!("{first_name} {last_name}"),
		name: ProfileName {
			given_name: Some(first_name.to_owned()),
			family_name: Some(last_name.to_owned()),
		},
		emails: vec![ProfileEmail::work(email)],
		user_principal_name: None,
		raw,
		json,
	})
}

fn require<'a>(node: &'a JsonValue, path: &[&str]) -> Result<&'a JsonValue, ProfileFetchError> {
	path.iter().try_fold(node, |current, key| {
		tree::child(current, key).ok_or_else(|| ProfileFetchError::missing(path.join("/")))
	})
}

fn require_text<'a>(node: &'a JsonValue, path: &[&str]) -> Result<&'a str, ProfileFetchError> {
	require(node, path)
		.and_then(|value| tree::text(value).ok_or_else(|| ProfileFetchError::missing(path.join("/"))))
}
