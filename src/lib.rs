//! Microsoft login strategy for Rust web apps.
//!
//! The crate derives tenant-aware OAuth 2.0 endpoints, drives the authorization-code
//! callback, and loads a normalized user profile from Microsoft Graph or from the Microsoft
//! Advertising Customer Management API.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod error;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod profile;
pub mod strategy;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		http::ReqwestHttpClient,
		strategy::{MicrosoftStrategy, StrategyOptions},
	};

	/// Client identifier shared by integration tests.
	pub const TEST_CLIENT_ID: &str = "client-it";
	/// Client secret shared by integration tests.
	pub const TEST_CLIENT_SECRET: &str = "secret-it";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Options pre-populated with the test client credentials.
	pub fn test_options() -> StrategyOptions {
		StrategyOptions::new(TEST_CLIENT_ID)
			.client_secret(TEST_CLIENT_SECRET)
			.callback_url("https://app.example.com/auth/microsoft/callback")
	}

	/// Constructs a [`MicrosoftStrategy`] from `options` on top of the insecure test transport.
	pub fn build_test_strategy(options: StrategyOptions) -> MicrosoftStrategy {
		let config = options.build().expect("Test strategy options should be valid.");

		MicrosoftStrategy::with_http_client(config, test_reqwest_http_client())
			.expect("Test strategy should build successfully.")
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value as JsonValue;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
