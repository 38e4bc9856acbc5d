#![cfg(feature = "reqwest")]

// self
use microsoft_oauth2_strategy::{
	_preludet::*,
	error::ConfigError,
	strategy::{
		AuthorizationOptions, MicrosoftStrategy, ProfileApi, ProfileApiKind, StrategyConfig,
		StrategyOptions, build_auth_params,
	},
};

#[test]
fn json_options_build_a_customer_management_strategy() {
	let options = StrategyOptions::from_json_str(
		r#"{
			"clientID": "client-json",
			"clientSecret": "secret-json",
			"callbackURL": "https://app.example.com/auth/microsoft/callback",
			"tenant": "organizations",
			"scope": ["openid", "https://ads.microsoft.com/msads.manage"],
			"developerToken": "developer-json",
			"customerManagementURL": "https://clientcenter.api.sandbox.bingads.microsoft.com/Api/CustomerManagement/v13/CustomerManagementService.svc"
		}"#,
	)
	.expect("Options document should deserialize.");
	let config = StrategyConfig::from_options(Some(options)).expect("Options should build.");

	assert_eq!(config.profile_api.kind(), ProfileApiKind::CustomerManagement);
	assert_eq!(
		config.authorization_url.as_str(),
		"https://login.microsoftonline.com/organizations/oauth2/v2.0/authorize"
	);
	assert!(matches!(
		&config.profile_api,
		ProfileApi::CustomerManagement { endpoint, .. }
			if endpoint.host_str() == Some("clientcenter.api.sandbox.bingads.microsoft.com")
	));

	let strategy = build_test_strategy(
		test_options().tenant("organizations").developer_token("developer-json"),
	);

	assert_eq!(strategy.name(), MicrosoftStrategy::NAME);
}

#[test]
fn authorize_url_is_derived_from_tenant_unless_overridden() {
	let strategy = build_test_strategy(test_options().tenant("consumers"));
	let redirect = strategy.authorization_redirect(AuthorizationOptions::default());

	assert_eq!(redirect.url.host_str(), Some("login.microsoftonline.com"));
	assert_eq!(redirect.url.path(), "/consumers/oauth2/v2.0/authorize");

	let strategy = build_test_strategy(
		test_options().tenant("consumers").authorization_url("https://login.example.com/authorize"),
	);
	let redirect = strategy.authorization_redirect(AuthorizationOptions::default());

	assert_eq!(redirect.url.host_str(), Some("login.example.com"));
	assert_eq!(redirect.url.path(), "/authorize");
}

#[test]
fn authorization_params_keep_only_supported_keys() {
	let strategy = build_test_strategy(test_options());
	let options = BTreeMap::from([
		("display".to_owned(), "mobile".to_owned()),
		("foo".to_owned(), "bar".to_owned()),
	]);
	let expected = BTreeMap::from([("display".to_owned(), "mobile".to_owned())]);

	assert_eq!(strategy.authorization_params(&options), expected);
	assert_eq!(build_auth_params(&options), expected);
}

#[test]
fn missing_options_are_a_configuration_error() {
	assert!(matches!(StrategyConfig::from_options(None), Err(ConfigError::MissingClientId)));
	assert!(matches!(
		StrategyOptions::from_json_str(r#"{ "tenant": "common" }"#)
			.and_then(StrategyOptions::build),
		Err(ConfigError::MissingClientId)
	));
}
