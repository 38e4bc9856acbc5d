//! Strategy options and the validated configuration derived from them.

// crates.io
use serde::Deserializer;
// self
use crate::{
	_prelude::*,
	auth::{TenantId, TokenSecret},
	error::ConfigError,
	http,
};

/// Host serving the Microsoft identity platform endpoints.
pub const LOGIN_HOST: &str = "https://login.microsoftonline.com";
/// Default Microsoft Graph entry point.
pub const DEFAULT_API_ENTRY_POINT: &str = "https://graph.microsoft.com";
/// Default Microsoft Graph API version.
pub const DEFAULT_GRAPH_API_VERSION: &str = "v1.0";
/// Customer Management v13 service URL.
pub const CUSTOMER_MANAGEMENT_ENDPOINT: &str =
	"https://clientcenter.api.bingads.microsoft.com/Api/CustomerManagement/v13/CustomerManagementService.svc";
/// Default separator placed between scopes.
pub const DEFAULT_SCOPE_SEPARATOR: &str = " ";

/// Upstream API used to load the user profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileApiKind {
	/// Microsoft Graph REST `/me/`.
	Graph,
	/// Microsoft Advertising Customer Management SOAP `GetUser`.
	CustomerManagement,
}

/// Caller-supplied options; every field is optional and empty values fall back to defaults.
///
/// Deserializes from camel-cased JSON option names (`clientID`, `callbackURL`,
/// `addUPNAsEmail`, ...).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyOptions {
	/// Application (client) identifier.
	#[serde(rename = "clientID")]
	pub client_id: Option<String>,
	/// Application secret; omit for public clients.
	pub client_secret: Option<TokenSecret>,
	/// Absolute redirect URI registered for the application.
	#[serde(rename = "callbackURL")]
	pub callback_url: Option<String>,
	/// Directory tenant; defaults to `common`.
	pub tenant: Option<String>,
	/// Authorize endpoint override.
	#[serde(rename = "authorizationURL")]
	pub authorization_url: Option<String>,
	/// Token endpoint override.
	#[serde(rename = "tokenURL")]
	pub token_url: Option<String>,
	/// Default scopes; a single string or a list.
	#[serde(default, deserialize_with = "deserialize_scope")]
	pub scope: Option<Vec<String>>,
	/// Separator used to join scopes; defaults to a single space.
	pub scope_separator: Option<String>,
	/// Extra headers sent with the token exchange and Graph requests.
	pub custom_headers: Option<BTreeMap<String, String>>,
	/// Explicit profile API selection.
	pub profile_api: Option<ProfileApiKind>,
	/// Microsoft Advertising developer token; selects the Customer Management API.
	pub developer_token: Option<TokenSecret>,
	/// Customer Management service URL override.
	#[serde(rename = "customerManagementURL")]
	pub customer_management_url: Option<String>,
	/// Graph entry point; defaults to [`DEFAULT_API_ENTRY_POINT`].
	pub api_entry_point: Option<String>,
	/// Graph API version; defaults to [`DEFAULT_GRAPH_API_VERSION`].
	pub graph_api_version: Option<String>,
	/// Appends `userPrincipalName` to the Graph profile emails.
	#[serde(rename = "addUPNAsEmail")]
	pub add_upn_as_email: Option<bool>,
	/// Sends an S256 PKCE challenge with the authorize request.
	pub pkce: Option<bool>,
	/// Skips the profile request after the code exchange.
	pub skip_user_profile: Option<bool>,
}
impl StrategyOptions {
	/// Starts a set of options for `client_id`.
	pub fn new(client_id: impl Into<String>) -> Self {
		Self { client_id: Some(client_id.into()), ..Default::default() }
	}

	/// Parses options from a JSON document, reporting the path of the offending field.
	pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_str(json);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ConfigError::InvalidOptions { source })
	}

	/// Sets the client secret.
	pub fn client_secret(mut self, secret: impl Into<TokenSecret>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Sets the callback URL.
	pub fn callback_url(mut self, url: impl Into<String>) -> Self {
		self.callback_url = Some(url.into());

		self
	}

	/// Sets the tenant.
	pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
		self.tenant = Some(tenant.into());

		self
	}

	/// Overrides the authorize endpoint.
	pub fn authorization_url(mut self, url: impl Into<String>) -> Self {
		self.authorization_url = Some(url.into());

		self
	}

	/// Overrides the token endpoint.
	pub fn token_url(mut self, url: impl Into<String>) -> Self {
		self.token_url = Some(url.into());

		self
	}

	/// Sets the default scopes.
	pub fn scope<I, S>(mut self, scope: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scope = Some(scope.into_iter().map(Into::into).collect());

		self
	}

	/// Sets the scope separator.
	pub fn scope_separator(mut self, separator: impl Into<String>) -> Self {
		self.scope_separator = Some(separator.into());

		self
	}

	/// Replaces the custom header map.
	pub fn custom_headers(mut self, headers: BTreeMap<String, String>) -> Self {
		self.custom_headers = Some(headers);

		self
	}

	/// Adds one custom header.
	pub fn custom_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.custom_headers.get_or_insert_with(BTreeMap::new).insert(name.into(), value.into());

		self
	}

	/// Forces the profile API.
	pub fn profile_api(mut self, kind: ProfileApiKind) -> Self {
		self.profile_api = Some(kind);

		self
	}

	/// Sets the Microsoft Advertising developer token.
	pub fn developer_token(mut self, token: impl Into<TokenSecret>) -> Self {
		self.developer_token = Some(token.into());

		self
	}

	/// Overrides the Customer Management service URL.
	pub fn customer_management_url(mut self, url: impl Into<String>) -> Self {
		self.customer_management_url = Some(url.into());

		self
	}

	/// Sets the Graph entry point.
	pub fn api_entry_point(mut self, url: impl Into<String>) -> Self {
		self.api_entry_point = Some(url.into());

		self
	}

	/// Sets the Graph API version.
	pub fn graph_api_version(mut self, version: impl Into<String>) -> Self {
		self.graph_api_version = Some(version.into());

		self
	}

	/// Toggles the `userPrincipalName` email.
	pub fn add_upn_as_email(mut self, enabled: bool) -> Self {
		self.add_upn_as_email = Some(enabled);

		self
	}

	/// Toggles PKCE.
	pub fn pkce(mut self, enabled: bool) -> Self {
		self.pkce = Some(enabled);

		self
	}

	/// Toggles the post-exchange profile request.
	pub fn skip_user_profile(mut self, enabled: bool) -> Self {
		self.skip_user_profile = Some(enabled);

		self
	}

	/// Validates the options and fills in defaults.
	pub fn build(self) -> Result<StrategyConfig, ConfigError> {
		let client_id = non_empty(self.client_id).ok_or(ConfigError::MissingClientId)?;
		let tenant = match non_empty(self.tenant) {
			Some(tenant) => TenantId::new(tenant)?,
			None => TenantId::common(),
		};
		let authorization_url = parse_url(
			"authorization",
			&non_empty(self.authorization_url)
				.unwrap_or_else(|| format!("{LOGIN_HOST}/{tenant}/oauth2/v2.0/authorize")),
		)?;
		let token_url = parse_url(
			"token",
			&non_empty(self.token_url)
				.unwrap_or_else(|| format!("{LOGIN_HOST}/{tenant}/oauth2/v2.0/token")),
		)?;
		let callback_url =
			non_empty(self.callback_url).map(|url| parse_url("callback", &url)).transpose()?;
		let custom_headers = self.custom_headers.unwrap_or_default();

		http::header_map(&custom_headers)?;

		let developer_token = self.developer_token.filter(|token| !token.is_empty());
		let kind = self.profile_api.unwrap_or(if developer_token.is_some() {
			ProfileApiKind::CustomerManagement
		} else {
			ProfileApiKind::Graph
		});
		let profile_api = match kind {
			ProfileApiKind::Graph => ProfileApi::Graph {
				api_entry_point: parse_url(
					"api entry point",
					&non_empty(self.api_entry_point).unwrap_or_else(|| DEFAULT_API_ENTRY_POINT.into()),
				)?,
				api_version: non_empty(self.graph_api_version)
					.unwrap_or_else(|| DEFAULT_GRAPH_API_VERSION.into()),
				add_upn_as_email: self.add_upn_as_email.unwrap_or(false),
			},
			ProfileApiKind::CustomerManagement => ProfileApi::CustomerManagement {
				developer_token: developer_token.unwrap_or_default(),
				endpoint: parse_url(
					"customer management",
					&non_empty(self.customer_management_url)
						.unwrap_or_else(|| CUSTOMER_MANAGEMENT_ENDPOINT.into()),
				)?,
			},
		};

		Ok(StrategyConfig {
			client_id,
			client_secret: self.client_secret.filter(|secret| !secret.is_empty()),
			callback_url,
			tenant,
			authorization_url,
			token_url,
			scope: self.scope.unwrap_or_default(),
			scope_separator: non_empty(self.scope_separator)
				.unwrap_or_else(|| DEFAULT_SCOPE_SEPARATOR.into()),
			custom_headers,
			pkce: self.pkce.unwrap_or(false),
			skip_user_profile: self.skip_user_profile.unwrap_or(false),
			profile_api,
		})
	}
}

/// Profile API selection with its variant-specific settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileApi {
	/// Microsoft Graph REST.
	Graph {
		/// Base URL of the Graph service.
		api_entry_point: Url,
		/// Graph API version segment.
		api_version: String,
		/// Whether `userPrincipalName` is appended to the emails.
		add_upn_as_email: bool,
	},
	/// Customer Management SOAP.
	CustomerManagement {
		/// Developer token sent in the SOAP header; empty when not supplied.
		developer_token: TokenSecret,
		/// Service URL the envelope is posted to.
		endpoint: Url,
	},
}
impl ProfileApi {
	/// Kind of the selected API.
	pub fn kind(&self) -> ProfileApiKind {
		match self {
			ProfileApi::Graph { .. } => ProfileApiKind::Graph,
			ProfileApi::CustomerManagement { .. } => ProfileApiKind::CustomerManagement,
		}
	}
}

/// Validated, immutable strategy configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrategyConfig {
	/// Application (client) identifier.
	pub client_id: String,
	/// Application secret, if any.
	pub client_secret: Option<TokenSecret>,
	/// Redirect URI sent with authorize and token requests.
	pub callback_url: Option<Url>,
	/// Directory tenant the endpoints were derived from.
	pub tenant: TenantId,
	/// Authorize endpoint.
	pub authorization_url: Url,
	/// Token endpoint.
	pub token_url: Url,
	/// Default scopes.
	pub scope: Vec<String>,
	/// Separator placed between scopes.
	pub scope_separator: String,
	/// Validated custom headers.
	pub custom_headers: BTreeMap<String, String>,
	/// Whether authorize requests carry a PKCE challenge.
	pub pkce: bool,
	/// Whether the profile request is skipped after the code exchange.
	pub skip_user_profile: bool,
	/// Profile API and its settings.
	pub profile_api: ProfileApi,
}
impl StrategyConfig {
	/// Builds a configuration from optional options.
	///
	/// Absent options never panic; they fail with [`ConfigError::MissingClientId`] because a
	/// client identifier cannot be defaulted.
	pub fn from_options(options: Option<StrategyOptions>) -> Result<Self, ConfigError> {
		options.ok_or(ConfigError::MissingClientId)?.build()
	}

	/// Joins `scope` (or the default scopes) with the configured separator.
	///
	/// Returns `None` when there is nothing to send.
	pub fn scope_param(&self, scope: Option<&[String]>) -> Option<String> {
		let scope = scope.unwrap_or(&self.scope);

		if scope.is_empty() {
			return None;
		}

		Some(scope.join(&self.scope_separator))
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScopeValue {
	One(String),
	Many(Vec<String>),
}

fn deserialize_scope<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Option::<ScopeValue>::deserialize(deserializer)?;

	Ok(value.map(|value| match value {
		ScopeValue::One(scope) => vec![scope],
		ScopeValue::Many(scopes) => scopes,
	}))
}

fn non_empty(value: Option<String>) -> Option<String> {
	value.filter(|value| !value.is_empty())
}

fn parse_url(endpoint: &'static str, value: &str) -> Result<Url, ConfigError> {
	Url::parse(value).map_err(|source| ConfigError::InvalidEndpoint { endpoint, source })
}
