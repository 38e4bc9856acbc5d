//! Microsoft Graph `/me/` profile fetcher.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::ConfigError,
	oauth::OAuth2Client,
	profile::{Profile, ProfileEmail, ProfileFetcher, ProfileFuture, ProfileName},
};

/// Fetches profiles from `GET {api_entry_point}/{api_version}/me/`.
///
/// The request goes through the delegated [`OAuth2Client`], so the bearer header and the
/// configured custom headers are attached the same way as for the token exchange.
#[derive(Clone)]
pub struct GraphProfileFetcher {
	client: Arc<dyn OAuth2Client>,
	endpoint: Url,
	add_upn_as_email: bool,
}
impl GraphProfileFetcher {
	/// Label reported by [`ProfileFetcher::api`].
	pub const API: &'static str = "graph";

	/// Creates a fetcher for the given entry point and API version.
	pub fn new(
		client: Arc<dyn OAuth2Client>,
		api_entry_point: &Url,
		api_version: &str,
		add_upn_as_email: bool,
	) -> Result<Self, ConfigError> {
		let raw = format!("{}/{}/me/", api_entry_point.as_str().trim_end_matches('/'), api_version);
		let endpoint = Url::parse(&raw)
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "profile", source })?;

		Ok(Self { client, endpoint, add_upn_as_email })
	}

	/// Resolved `/me/` URL.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	async fn fetch(&self, access_token: &TokenSecret) -> Result<Profile> {
		let response = self.client.fetch_resource(self.endpoint.clone(), access_token).await?;
		let raw = String::from_utf8_lossy(response.body()).into_owned();
		let json = serde_json::from_str::<JsonValue>(&raw).map_err(Error::ProfileParse)?;

		Ok(profile_from_json(raw, json, self.add_upn_as_email))
	}
}
impl ProfileFetcher for GraphProfileFetcher {
	fn api(&self) -> &'static str {
		Self::API
	}

	fn fetch_profile<'a>(&'a self, access_token: &'a TokenSecret) -> ProfileFuture<'a> {
		Box::pin(self.fetch(access_token))
	}
}
impl Debug for GraphProfileFetcher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GraphProfileFetcher")
			.field("endpoint", &self.endpoint)
			.field("add_upn_as_email", &self.add_upn_as_email)
			.finish()
	}
}

fn profile_from_json(raw: String, json: JsonValue, add_upn_as_email: bool) -> Profile {
	let field = |key: &str| json.get(key).and_then(JsonValue::as_str).map(str::to_owned);
	let user_principal_name = field("userPrincipalName");
	let mut emails = Vec::new();

	if let Some(mail) = field("mail").filter(|mail| !mail.trim().is_empty()) {
		emails.push(ProfileEmail::work(mail));
	}
	if let Some(upn) =
		user_principal_name.as_deref().filter(|upn| add_upn_as_email && !upn.trim().is_empty())
	{
		emails.push(ProfileEmail::work(upn));
	}

	Profile {
		provider: Profile::PROVIDER.into(),
		id: field("id").unwrap_or_default(),
		display_name: field("displayName").unwrap_or_default(),
		name: ProfileName { given_name: field("givenName"), family_name: field("surname") },
		emails,
		user_principal_name,
		raw,
		json,
	}
}
