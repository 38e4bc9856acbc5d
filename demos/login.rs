//! Walks through a full Microsoft login against a local mock of the token and Graph
//! endpoints: build the authorize redirect, then complete the callback and print the
//! normalized profile.

// std
use std::collections::BTreeMap;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use microsoft_oauth2_strategy::{
	http::ReqwestHttpClient,
	reqwest::Client,
	strategy::{AuthorizationOptions, CallbackOutcome, MicrosoftStrategy, StrategyOptions},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/common/oauth2/v2.0/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"Bearer\",\"expires_in\":3599,\"scope\":\"User.Read\"}",
			);
		})
		.await;
	let profile_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/me/").header("authorization", "Bearer demo-access");
			then.status(200).header("content-type", "application/json").body(
				"{\"id\":\"demo-user\",\"displayName\":\"Demo User\",\"givenName\":\"Demo\",\"surname\":\"User\",\"mail\":\"demo@contoso.com\"}",
			);
		})
		.await;
	let config = StrategyOptions::new("demo-client")
		.client_secret("demo-secret")
		.callback_url("https://app.example.com/auth/microsoft/callback")
		.scope(["User.Read"])
		.pkce(true)
		.token_url(server.url("/common/oauth2/v2.0/token"))
		.api_entry_point(server.base_url())
		.build()?;
	let http_client = ReqwestHttpClient::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let strategy = MicrosoftStrategy::with_http_client(config, http_client)?;
	let redirect = strategy.authorization_redirect(AuthorizationOptions {
		params: BTreeMap::from([("prompt".to_owned(), "select_account".to_owned())]),
		..Default::default()
	});

	println!("Send the user to: {}", redirect.url);

	let query = BTreeMap::from([
		("code".to_owned(), "demo-code".to_owned()),
		("state".to_owned(), redirect.pending.state.clone()),
	]);

	match strategy.handle_callback(&query, Some(&redirect.pending)).await? {
		CallbackOutcome::Authenticated(login) => {
			println!("Token expires at: {:?}", login.grant.expires_at());

			if let Some(profile) = login.profile {
				println!("Profile: {}", serde_json::to_string_pretty(&profile)?);
			}
		},
		CallbackOutcome::Denied { params } => println!("Login denied: {params:?}"),
	}

	token_mock.assert_async().await;
	profile_mock.assert_async().await;

	Ok(())
}
