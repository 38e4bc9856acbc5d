//! OAuth 2.0 client capability consumed by the strategy.
//!
//! [`OAuth2Client`] is the seam between the Microsoft-specific parts of the crate and the
//! generic authorization-code machinery (authorize URL, code exchange, protected GET).
//! [`BasicOAuth2Client`] is the default implementation backed by the `oauth2` crate.

pub use oauth2;

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AsyncHttpClient, AuthType, AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret,
	EndpointNotSet, EndpointSet, ExtraTokenFields, HttpClientError, HttpResponse,
	PkceCodeVerifier, RedirectUrl, RequestTokenError, StandardRevocableToken,
	StandardTokenResponse, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
		BasicTokenType,
	},
	http::{
		HeaderMap, Method, Request,
		header::{ACCEPT, AUTHORIZATION},
	},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, ProfileFetchError, TransportError},
	http::{
		HeaderInjector, ProviderHttpClient, ResponseMetadata, ResponseMetadataSlot, header_map,
	},
	strategy::StrategyConfig,
};

type MicrosoftTokenResponse = StandardTokenResponse<MicrosoftTokenFields, BasicTokenType>;
type ConfiguredClient = Client<
	BasicErrorResponse,
	MicrosoftTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;

/// Boxed future returned by [`OAuth2Client`] token operations.
pub type OAuthFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;
/// Boxed future returned by [`OAuth2Client::fetch_resource`].
pub type ResourceFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, ProfileFetchError>> + 'a + Send>>;

/// Generic OAuth 2.0 client capability the strategy delegates to.
///
/// Hosts that already run their own OAuth stack can implement this trait and hand it to
/// [`MicrosoftStrategy::from_parts`](crate::strategy::MicrosoftStrategy::from_parts).
pub trait OAuth2Client: Send + Sync {
	/// Builds the provider authorize URL the user agent is redirected to.
	fn authorization_url(&self, request: &AuthorizationRequest) -> Url;

	/// Exchanges an authorization code for tokens.
	fn exchange_code<'a>(&'a self, request: &'a CodeExchangeRequest) -> OAuthFuture<'a, TokenGrant>;

	/// Performs an authenticated GET against a protected resource.
	///
	/// Non-success statuses resolve to [`ProfileFetchError::Status`].
	fn fetch_resource<'a>(&'a self, url: Url, access_token: &'a TokenSecret) -> ResourceFuture<'a>;
}

/// Inputs for [`OAuth2Client::authorization_url`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthorizationRequest {
	/// Redirect URI registered for the application.
	pub redirect_uri: Option<Url>,
	/// Scope parameter, already joined with the configured separator.
	pub scope: Option<String>,
	/// Opaque CSRF state that must round-trip through the redirect.
	pub state: String,
	/// S256 PKCE code challenge, when PKCE is enabled.
	pub code_challenge: Option<String>,
	/// Provider-specific parameters appended verbatim.
	pub extra_params: BTreeMap<String, String>,
}

/// Inputs for [`OAuth2Client::exchange_code`].
#[derive(Clone, Debug, Default)]
pub struct CodeExchangeRequest {
	/// Authorization code returned to the callback.
	pub code: String,
	/// Redirect URI used when the code was requested.
	pub redirect_uri: Option<Url>,
	/// PKCE verifier matching the challenge sent with the authorize request.
	pub pkce_verifier: Option<TokenSecret>,
}

/// Microsoft-specific fields carried by the token response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicrosoftTokenFields {
	/// OpenID Connect ID token, when `openid` was requested. Not validated.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id_token: Option<String>,
	/// Extended lifetime hint for outage resilience, in seconds.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ext_expires_in: Option<u64>,
}
impl ExtraTokenFields for MicrosoftTokenFields {}

/// Tokens issued by a successful code exchange.
#[derive(Clone, Debug)]
pub struct TokenGrant {
	/// Access token for the profile API.
	pub access_token: TokenSecret,
	/// Refresh token, when `offline_access` was granted.
	pub refresh_token: Option<TokenSecret>,
	/// ID token, when issued.
	pub id_token: Option<TokenSecret>,
	/// Token type reported by the provider (usually `Bearer`).
	pub token_type: String,
	/// Granted scopes, space-delimited as returned.
	pub scope: Option<String>,
	/// Access token lifetime.
	pub expires_in: Option<Duration>,
	/// Extended access token lifetime.
	pub ext_expires_in: Option<Duration>,
	/// Local time the grant was received.
	pub issued_at: OffsetDateTime,
}
impl TokenGrant {
	fn from_response(response: &MicrosoftTokenResponse) -> Self {
		let extra = response.extra_fields();
		let expires_in = response.expires_in().and_then(|value| Duration::try_from(value).ok());
		let ext_expires_in = extra
			.ext_expires_in
			.and_then(|secs| i64::try_from(secs).ok())
			.map(Duration::seconds);

		Self {
			access_token: TokenSecret::new(response.access_token().secret().to_owned()),
			refresh_token: response
				.refresh_token()
				.map(|token| TokenSecret::new(token.secret().to_owned())),
			id_token: extra.id_token.clone().map(TokenSecret::new),
			token_type: response.token_type().as_ref().to_owned(),
			scope: response.scopes().map(|scopes| {
				scopes.iter().map(|scope| scope.as_str()).collect::<Vec<_>>().join(" ")
			}),
			expires_in,
			ext_expires_in,
			issued_at: OffsetDateTime::now_utc(),
		}
	}

	/// Absolute expiry derived from `issued_at + expires_in`.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.expires_in.map(|lifetime| self.issued_at + lifetime)
	}
}

/// Default [`OAuth2Client`] built on the `oauth2` crate and a [`ProviderHttpClient`].
///
/// Client credentials travel in the request body, custom headers are attached to every
/// call, and protected GETs carry the token either in the `Authorization` header or as an
/// `access_token` query parameter.
pub struct BasicOAuth2Client<C>
where
	C: ?Sized + ProviderHttpClient,
{
	oauth_client: ConfiguredClient,
	client_id: String,
	authorization_endpoint: Url,
	http_client: Arc<C>,
	custom_headers: HeaderMap,
	use_authorization_header_for_get: bool,
}
impl<C> BasicOAuth2Client<C>
where
	C: ?Sized + ProviderHttpClient,
{
	/// Builds the client from a validated strategy configuration.
	pub fn from_config(config: &StrategyConfig, http_client: impl Into<Arc<C>>) -> Result<Self> {
		let auth_url = AuthUrl::from_url(config.authorization_url.clone());
		let token_url = TokenUrl::from_url(config.token_url.clone());
		let mut oauth_client: ConfiguredClient = Client::new(ClientId::new(config.client_id.clone()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody);

		if let Some(secret) = config.client_secret.as_ref() {
			oauth_client =
				oauth_client.set_client_secret(ClientSecret::new(secret.expose().to_owned()));
		}
		if let Some(callback) = config.callback_url.as_ref() {
			oauth_client = oauth_client.set_redirect_uri(RedirectUrl::from_url(callback.clone()));
		}

		Ok(Self {
			oauth_client,
			client_id: config.client_id.clone(),
			authorization_endpoint: config.authorization_url.clone(),
			http_client: http_client.into(),
			custom_headers: header_map(&config.custom_headers)?,
			use_authorization_header_for_get: false,
		})
	}

	/// Chooses whether protected GETs send `Authorization: Bearer` instead of the
	/// `access_token` query parameter.
	pub fn use_authorization_header_for_get(mut self, enabled: bool) -> Self {
		self.use_authorization_header_for_get = enabled;

		self
	}

	fn handle(&self, slot: ResponseMetadataSlot) -> HeaderInjector<C::Handle> {
		HeaderInjector::new(self.http_client.with_metadata(slot), self.custom_headers.clone())
	}
}
impl<C> OAuth2Client for BasicOAuth2Client<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn authorization_url(&self, request: &AuthorizationRequest) -> Url {
		let mut url = self.authorization_endpoint.clone();
		let mut pairs = url.query_pairs_mut();

		pairs.append_pair("response_type", "code");
		pairs.append_pair("client_id", &self.client_id);

		if let Some(redirect_uri) = request.redirect_uri.as_ref() {
			pairs.append_pair("redirect_uri", redirect_uri.as_str());
		}
		if let Some(scope) = request.scope.as_deref() {
			pairs.append_pair("scope", scope);
		}

		pairs.append_pair("state", &request.state);

		if let Some(challenge) = request.code_challenge.as_deref() {
			pairs.append_pair("code_challenge", challenge);
			pairs.append_pair("code_challenge_method", "S256");
		}

		for (key, value) in &request.extra_params {
			pairs.append_pair(key, value);
		}

		drop(pairs);

		url
	}

	fn exchange_code<'a>(&'a self, request: &'a CodeExchangeRequest) -> OAuthFuture<'a, TokenGrant> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let handle = self.handle(meta.clone());
			let mut exchange =
				self.oauth_client.exchange_code(AuthorizationCode::new(request.code.clone()));

			if let Some(verifier) = request.pkce_verifier.as_ref() {
				exchange =
					exchange.set_pkce_verifier(PkceCodeVerifier::new(verifier.expose().to_owned()));
			}
			if let Some(redirect) = request.redirect_uri.as_ref() {
				exchange = exchange.set_redirect_uri(Cow::Owned(RedirectUrl::from_url(redirect.clone())));
			}

			exchange
				.request_async(&handle)
				.await
				.map(|response| TokenGrant::from_response(&response))
				.map_err(|err| map_request_error(meta.take(), err))
		})
	}

	fn fetch_resource<'a>(&'a self, url: Url, access_token: &'a TokenSecret) -> ResourceFuture<'a> {
		Box::pin(async move {
			let mut url = url;
			let mut builder = Request::builder().method(Method::GET).header(ACCEPT, "application/json");

			if self.use_authorization_header_for_get {
				builder = builder.header(AUTHORIZATION, format!("Bearer {}", access_token.expose()));
			} else {
				url.query_pairs_mut().append_pair("access_token", access_token.expose());
			}

			let request = builder.uri(url.as_str()).body(Vec::new())?;
			let handle = self.handle(ResponseMetadataSlot::default());
			let response = handle.call(request).await.map_err(ProfileFetchError::network)?;
			let status = response.status();

			if !status.is_success() {
				return Err(ProfileFetchError::Status {
					status: status.as_u16(),
					body: String::from_utf8_lossy(response.body()).into_owned(),
				});
			}

			Ok(response)
		})
	}
}
impl<C> Debug for BasicOAuth2Client<C>
where
	C: ?Sized + ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BasicOAuth2Client")
			.field("client_id", &self.client_id)
			.field("authorization_endpoint", &self.authorization_endpoint)
			.field("use_authorization_header_for_get", &self.use_authorization_header_for_get)
			.finish()
	}
}

fn map_request_error<E>(
	meta: Option<ResponseMetadata>,
	err: RequestTokenError<HttpClientError<E>, BasicErrorResponse>,
) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => Error::TokenEndpoint {
			error: response.error().as_ref().to_owned(),
			description: response.error_description().cloned(),
			status,
		},
		RequestTokenError::Request(error) => map_transport_error(status, error),
		RequestTokenError::Parse(source, _body) => Error::TokenResponseParse { source, status },
		RequestTokenError::Other(message) => Error::TokenUnexpected { message, status },
	}
}

fn map_transport_error<E>(status: Option<u16>, err: HttpClientError<E>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match err {
		HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => Error::TokenUnexpected {
			message: format!("HTTP client error occurred while calling the token endpoint: {message}"),
			status,
		},
		_ => Error::TokenUnexpected {
			message: "HTTP client error occurred while calling the token endpoint".into(),
			status,
		},
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::{http::ReqwestHttpClient, strategy::StrategyOptions};

	fn client(header_for_get: bool) -> BasicOAuth2Client<ReqwestHttpClient> {
		let config = StrategyOptions::new("client-id")
			.client_secret("secret")
			.tenant("contoso")
			.build()
			.expect("Strategy options fixture should be valid.");

		BasicOAuth2Client::from_config(&config, ReqwestHttpClient::default())
			.expect("Client should build from a valid config.")
			.use_authorization_header_for_get(header_for_get)
	}

	#[test]
	fn authorization_url_carries_standard_and_extra_params() {
		let request = AuthorizationRequest {
			redirect_uri: Some(
				Url::parse("https://app.example.com/cb").expect("Redirect fixture should parse."),
			),
			scope: Some("openid User.Read".into()),
			state: "state-123".into(),
			code_challenge: Some("challenge".into()),
			extra_params: BTreeMap::from([("prompt".to_owned(), "login".to_owned())]),
		};
		let url = client(true).authorization_url(&request);
		let pairs: BTreeMap<_, _> = url.query_pairs().into_owned().collect();

		assert!(url.as_str().starts_with(
			"https://login.microsoftonline.com/contoso/oauth2/v2.0/authorize?response_type=code"
		));
		assert_eq!(pairs.get("client_id").map(String::as_str), Some("client-id"));
		assert_eq!(pairs.get("scope").map(String::as_str), Some("openid User.Read"));
		assert_eq!(pairs.get("state").map(String::as_str), Some("state-123"));
		assert_eq!(pairs.get("code_challenge_method").map(String::as_str), Some("S256"));
		assert_eq!(pairs.get("prompt").map(String::as_str), Some("login"));
	}

	#[test]
	fn authorization_url_omits_optional_params() {
		let request = AuthorizationRequest { state: "s".into(), ..Default::default() };
		let url = client(false).authorization_url(&request);
		let pairs: BTreeMap<_, _> = url.query_pairs().into_owned().collect();

		assert!(!pairs.contains_key("scope"));
		assert!(!pairs.contains_key("redirect_uri"));
		assert!(!pairs.contains_key("code_challenge"));
	}

	#[test]
	fn grant_expiry_is_relative_to_issue_time() {
		let grant = TokenGrant {
			access_token: TokenSecret::new("a"),
			refresh_token: None,
			id_token: None,
			token_type: "bearer".into(),
			scope: None,
			expires_in: Some(Duration::seconds(3600)),
			ext_expires_in: None,
			issued_at: OffsetDateTime::UNIX_EPOCH,
		};

		assert_eq!(grant.expires_at(), Some(OffsetDateTime::UNIX_EPOCH + Duration::seconds(3600)));
	}
}
