#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use microsoft_oauth2_strategy::{
	_preludet::*,
	auth::TokenSecret,
	error::ProfileFetchError,
	profile::ProfileEmail,
	strategy::{MicrosoftStrategy, StrategyOptions},
};

const ACCESS_TOKEN: &str = "graph-access-it";

fn graph_strategy(server: &MockServer, options: StrategyOptions) -> MicrosoftStrategy {
	build_test_strategy(options.api_entry_point(server.base_url()))
}

#[tokio::test]
async fn me_request_uses_bearer_and_custom_headers() {
	let server = MockServer::start_async().await;
	let strategy =
		graph_strategy(&server, test_options().custom_header("x-app-name", "login-it"));
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v1.0/me/")
				.header("authorization", format!("Bearer {ACCESS_TOKEN}"))
				.header("accept", "application/json")
				.header("x-app-name", "login-it");
			then.status(200).header("content-type", "application/json").body(
				r#"{"id":"42","displayName":"Ada Lovelace","givenName":"Ada","surname":"Lovelace","mail":"ada@contoso.com","userPrincipalName":"ada@contoso.onmicrosoft.com"}"#,
			);
		})
		.await;
	let profile = strategy
		.user_profile(&TokenSecret::new(ACCESS_TOKEN))
		.await
		.expect("Graph profile should load.");

	mock.assert_async().await;

	assert_eq!(profile.provider, "microsoft");
	assert_eq!(profile.id, "42");
	assert_eq!(profile.display_name, "Ada Lovelace");
	assert_eq!(profile.name.given_name.as_deref(), Some("Ada"));
	assert_eq!(profile.name.family_name.as_deref(), Some("Lovelace"));
	assert_eq!(profile.emails, vec![ProfileEmail::work("ada@contoso.com")]);
	assert_eq!(profile.json["userPrincipalName"], "ada@contoso.onmicrosoft.com");
	assert!(profile.raw.contains("\"id\":\"42\""));
}

#[tokio::test]
async fn upn_is_added_when_mail_is_blank() {
	let server = MockServer::start_async().await;
	let strategy = graph_strategy(
		&server,
		test_options().add_upn_as_email(true).graph_api_version("beta"),
	);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/beta/me/");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"id":"7","mail":"","userPrincipalName":"u@x.com"}"#);
		})
		.await;
	let profile = strategy
		.user_profile(&TokenSecret::new(ACCESS_TOKEN))
		.await
		.expect("Graph profile should load.");

	mock.assert_async().await;

	assert_eq!(profile.emails, vec![ProfileEmail::work("u@x.com")]);
	assert_eq!(profile.user_principal_name.as_deref(), Some("u@x.com"));
}

#[tokio::test]
async fn error_status_is_wrapped() {
	let server = MockServer::start_async().await;
	let strategy = graph_strategy(&server, test_options());
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/me/");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"error":{"code":"InvalidAuthenticationToken"}}"#);
		})
		.await;
	let err = strategy
		.user_profile(&TokenSecret::new(ACCESS_TOKEN))
		.await
		.expect_err("Unauthorized profile request should fail.");

	mock.assert_async().await;

	assert_eq!(err.to_string(), "Failed to fetch user profile.");
	assert!(matches!(
		err,
		Error::ProfileFetch(ProfileFetchError::Status { status: 401, ref body })
			if body.contains("InvalidAuthenticationToken")
	));
}

#[tokio::test]
async fn malformed_json_is_not_wrapped() {
	let server = MockServer::start_async().await;
	let strategy = graph_strategy(&server, test_options());
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1.0/me/");
			then.status(200).header("content-type", "application/json").body("{not json");
		})
		.await;
	let err = strategy
		.user_profile(&TokenSecret::new(ACCESS_TOKEN))
		.await
		.expect_err("Malformed profile body should fail.");

	mock.assert_async().await;

	assert!(matches!(err, Error::ProfileParse(_)));
}

#[tokio::test]
async fn transport_failure_is_wrapped() {
	let strategy = build_test_strategy(test_options().api_entry_point("http://127.0.0.1:9"));
	let err = strategy
		.user_profile(&TokenSecret::new(ACCESS_TOKEN))
		.await
		.expect_err("Unreachable Graph endpoint should fail the fetch.");

	assert_eq!(err.to_string(), "Failed to fetch user profile.");
	assert!(matches!(err, Error::ProfileFetch(ProfileFetchError::Network { .. })));
}
