//! The Microsoft login strategy: configuration, authorize redirect, and callback handling.
//!
//! [`MicrosoftStrategy`] composes a validated [`StrategyConfig`], an [`OAuth2Client`] for the
//! authorization-code mechanics, and a [`ProfileFetcher`] chosen from the configured profile
//! API. Hosts either drive the whole callback through [`MicrosoftStrategy::handle_callback`]
//! or call [`MicrosoftStrategy::exchange_code`] and [`MicrosoftStrategy::user_profile`]
//! themselves.

pub mod authorize;
pub mod config;
pub mod params;

pub use authorize::*;
pub use config::*;
pub use params::*;

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	http::ProviderHttpClient,
	oauth::{AuthorizationRequest, BasicOAuth2Client, CodeExchangeRequest, OAuth2Client, TokenGrant},
	obs::{FlowKind, FlowSpan},
	profile::{CustomerManagementProfileFetcher, GraphProfileFetcher, Profile, ProfileFetcher},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Microsoft login strategy.
#[derive(Clone)]
pub struct MicrosoftStrategy {
	config: Arc<StrategyConfig>,
	oauth_client: Arc<dyn OAuth2Client>,
	profile_fetcher: Arc<dyn ProfileFetcher>,
}
impl MicrosoftStrategy {
	/// Name the strategy registers under.
	pub const NAME: &'static str = "microsoft";

	/// Builds the strategy on the default reqwest transport.
	#[cfg(feature = "reqwest")]
	pub fn new(config: StrategyConfig) -> Result<Self> {
		Self::with_http_client(config, ReqwestHttpClient::default())
	}

	/// Builds the strategy on a caller-supplied transport.
	///
	/// The same transport serves the token exchange and the selected profile API. Graph
	/// requests carry the access token in the `Authorization` header.
	pub fn with_http_client<C>(config: StrategyConfig, http_client: impl Into<Arc<C>>) -> Result<Self>
	where
		C: ?Sized + ProviderHttpClient,
	{
		let http_client = http_client.into();
		let oauth_client: Arc<dyn OAuth2Client> = Arc::new(
			BasicOAuth2Client::<C>::from_config(&config, Arc::clone(&http_client))?
				.use_authorization_header_for_get(true),
		);
		let profile_fetcher: Arc<dyn ProfileFetcher> = match &config.profile_api {
			ProfileApi::Graph { api_entry_point, api_version, add_upn_as_email } =>
				Arc::new(GraphProfileFetcher::new(
					Arc::clone(&oauth_client),
					api_entry_point,
					api_version,
					*add_upn_as_email,
				)?),
			ProfileApi::CustomerManagement { developer_token, endpoint } =>
				Arc::new(CustomerManagementProfileFetcher::<C>::new(
					http_client,
					endpoint.clone(),
					developer_token.clone(),
				)),
		};

		Ok(Self::from_parts(config, oauth_client, profile_fetcher))
	}

	/// Assembles the strategy from explicit collaborators.
	pub fn from_parts(
		config: StrategyConfig,
		oauth_client: Arc<dyn OAuth2Client>,
		profile_fetcher: Arc<dyn ProfileFetcher>,
	) -> Self {
		Self { config: Arc::new(config), oauth_client, profile_fetcher }
	}

	/// Returns [`Self::NAME`].
	pub fn name(&self) -> &'static str {
		Self::NAME
	}

	/// Validated configuration.
	pub fn config(&self) -> &StrategyConfig {
		&self.config
	}

	/// Supported authorize parameters taken from `options`; see [`build_auth_params`].
	pub fn authorization_params(
		&self,
		options: &BTreeMap<String, String>,
	) -> BTreeMap<String, String> {
		build_auth_params(options)
	}

	/// Builds the authorize redirect and the values to keep until the callback.
	pub fn authorization_redirect(&self, options: AuthorizationOptions) -> AuthorizationRedirect {
		let span = FlowSpan::new(FlowKind::Authorization, "redirect");
		let state = options.state.filter(|state| !state.is_empty()).unwrap_or_else(random_state);
		let pkce = self.config.pkce.then(PkcePair::generate);
		let redirect_uri = options.redirect_uri.or_else(|| self.config.callback_url.clone());
		let request = AuthorizationRequest {
			redirect_uri: redirect_uri.clone(),
			scope: self.config.scope_param(options.scope.as_deref()),
			state: state.clone(),
			code_challenge: pkce.as_ref().map(|pair| pair.challenge.clone()),
			extra_params: self.authorization_params(&options.params),
		};
		let url = span.observe_sync(|| self.oauth_client.authorization_url(&request));

		AuthorizationRedirect {
			url,
			pending: PendingAuthorization {
				state,
				pkce_verifier: pkce.map(|pair| TokenSecret::new(pair.verifier)),
				redirect_uri,
			},
		}
	}

	/// Exchanges an authorization code for tokens.
	pub async fn exchange_code(&self, request: &CodeExchangeRequest) -> Result<TokenGrant> {
		FlowSpan::new(FlowKind::CodeExchange, "token")
			.observe(self.oauth_client.exchange_code(request))
			.await
	}

	/// Loads the profile that belongs to `access_token` from the configured API.
	pub async fn user_profile(&self, access_token: &TokenSecret) -> Result<Profile> {
		FlowSpan::new(FlowKind::ProfileFetch, self.profile_fetcher.api())
			.observe(self.profile_fetcher.fetch_profile(access_token))
			.await
	}

	/// Completes a login from the callback query.
	///
	/// `error=access_denied` yields [`CallbackOutcome::Denied`]; any other `error`, a missing
	/// `code`, or a state that does not match `pending` fails with [`Error::Authorization`].
	/// Token and profile failures are returned unchanged.
	pub async fn handle_callback(
		&self,
		query: &BTreeMap<String, String>,
		pending: Option<&PendingAuthorization>,
	) -> Result<CallbackOutcome> {
		if let Some(code) = query.get("error") {
			if code == "access_denied" {
				return Ok(CallbackOutcome::Denied { params: query.clone() });
			}

			return Err(Error::Authorization {
				code: code.clone(),
				description: query.get("error_description").cloned(),
				uri: query.get("error_uri").cloned(),
			});
		}

		let code = query.get("code").filter(|code| !code.is_empty()).ok_or_else(|| {
			Error::authorization("invalid_request", "Callback is missing the `code` parameter.")
		})?;

		if let Some(pending) = pending {
			pending.validate_state(query.get("state").map(String::as_str))?;
		}

		let request = CodeExchangeRequest {
			code: code.clone(),
			redirect_uri: pending.and_then(|pending| pending.redirect_uri.clone()),
			pkce_verifier: pending.and_then(|pending| pending.pkce_verifier.clone()),
		};
		let grant = self.exchange_code(&request).await?;
		let profile = if self.config.skip_user_profile {
			None
		} else {
			Some(self.user_profile(&grant.access_token).await?)
		};

		Ok(CallbackOutcome::Authenticated(Box::new(AuthenticatedLogin { grant, profile })))
	}
}
impl Debug for MicrosoftStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MicrosoftStrategy")
			.field("config", &self.config)
			.field("profile_api", &self.profile_fetcher.api())
			.finish()
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	#[test]
	fn strategy_registers_as_microsoft() {
		let strategy = build_test_strategy(test_options());

		assert_eq!(strategy.name(), "microsoft");
		assert_eq!(MicrosoftStrategy::NAME, "microsoft");
		assert!(format!("{strategy:?}").contains("graph"));
	}

	#[test]
	fn default_and_shared_transports_build() {
		let config = test_options().build().expect("Options should build.");
		let strategy = MicrosoftStrategy::new(config.clone()).expect("Default transport should build.");

		assert_eq!(strategy.config().client_id, "client-it");

		let shared: Arc<ReqwestHttpClient> = Arc::new(ReqwestHttpClient::default());
		let strategy = MicrosoftStrategy::with_http_client::<ReqwestHttpClient>(config, Arc::clone(&shared))
			.expect("Shared transport should build.");

		assert!(format!("{strategy:?}").contains("graph"));
	}

	#[test]
	fn developer_token_selects_soap_fetcher() {
		let strategy = build_test_strategy(test_options().developer_token("dev"));

		assert!(format!("{strategy:?}").contains("customer_management"));
	}

	#[test]
	fn redirect_carries_scope_params_state_and_pkce() {
		let strategy = build_test_strategy(
			test_options().tenant("contoso").scope(["openid", "User.Read"]).pkce(true),
		);
		let redirect = strategy.authorization_redirect(AuthorizationOptions {
			params: BTreeMap::from([
				("prompt".to_owned(), "select_account".to_owned()),
				("foo".to_owned(), "bar".to_owned()),
			]),
			..Default::default()
		});
		let pairs: BTreeMap<_, _> = redirect.url.query_pairs().into_owned().collect();

		assert_eq!(redirect.url.path(), "/contoso/oauth2/v2.0/authorize");
		assert_eq!(pairs.get("scope").map(String::as_str), Some("openid User.Read"));
		assert_eq!(pairs.get("prompt").map(String::as_str), Some("select_account"));
		assert!(!pairs.contains_key("foo"));
		assert_eq!(pairs.get("state"), Some(&redirect.pending.state));
		assert_eq!(
			pairs.get("redirect_uri").map(String::as_str),
			Some("https://app.example.com/auth/microsoft/callback")
		);
		assert!(pairs.contains_key("code_challenge"));
		assert!(redirect.pending.pkce_verifier.is_some());
	}

	#[test]
	fn redirect_honors_caller_state_and_scope() {
		let strategy = build_test_strategy(test_options().scope(["User.Read"]));
		let redirect = strategy.authorization_redirect(AuthorizationOptions {
			scope: Some(vec!["Mail.Read".into()]),
			state: Some("caller-state".into()),
			..Default::default()
		});
		let pairs: BTreeMap<_, _> = redirect.url.query_pairs().into_owned().collect();

		assert_eq!(pairs.get("scope").map(String::as_str), Some("Mail.Read"));
		assert_eq!(redirect.pending.state, "caller-state");
		assert!(!pairs.contains_key("code_challenge"));
		assert!(redirect.pending.pkce_verifier.is_none());
	}

	#[tokio::test]
	async fn callback_errors_are_classified() {
		let strategy = build_test_strategy(test_options());
		let denied = BTreeMap::from([
			("error".to_owned(), "access_denied".to_owned()),
			("error_description".to_owned(), "The user declined.".to_owned()),
		]);

		match strategy.handle_callback(&denied, None).await {
			Ok(CallbackOutcome::Denied { params }) => assert_eq!(params, denied),
			other => panic!("Expected a denial, got {other:?}."),
		}

		let failed = BTreeMap::from([("error".to_owned(), "server_error".to_owned())]);

		assert!(matches!(
			strategy.handle_callback(&failed, None).await,
			Err(Error::Authorization { ref code, .. }) if code == "server_error"
		));
		assert!(matches!(
			strategy.handle_callback(&BTreeMap::new(), None).await,
			Err(Error::Authorization { ref code, .. }) if code == "invalid_request"
		));

		let pending = PendingAuthorization { state: "expected".into(), ..Default::default() };
		let query = BTreeMap::from([
			("code".to_owned(), "abc".to_owned()),
			("state".to_owned(), "forged".to_owned()),
		]);

		assert!(matches!(
			strategy.handle_callback(&query, Some(&pending)).await,
			Err(Error::Authorization { ref code, .. }) if code == "invalid_state"
		));
	}
}
