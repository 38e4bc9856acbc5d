//! Authorize redirect and callback types.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::TokenSecret, oauth::TokenGrant, profile::Profile};

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Per-request inputs for [`MicrosoftStrategy::authorization_redirect`].
///
/// [`MicrosoftStrategy::authorization_redirect`]: crate::strategy::MicrosoftStrategy::authorization_redirect
#[derive(Clone, Debug, Default)]
pub struct AuthorizationOptions {
	/// Caller options; only the supported authorize parameters are forwarded.
	pub params: BTreeMap<String, String>,
	/// Scope override; the configured scopes are used when `None`.
	pub scope: Option<Vec<String>>,
	/// Caller-managed state; a random value is generated when `None`.
	pub state: Option<String>,
	/// Redirect URI override; the configured callback URL is used when `None`.
	pub redirect_uri: Option<Url>,
}

/// Authorize URL plus the values the host must keep until the callback.
#[derive(Clone, Debug)]
pub struct AuthorizationRedirect {
	/// URL the user agent is sent to.
	pub url: Url,
	/// State and PKCE verifier to hand back to the callback.
	pub pending: PendingAuthorization,
}

/// Values that tie a callback to the authorize request that started it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuthorization {
	/// State that must round-trip unchanged.
	pub state: String,
	/// PKCE verifier, when PKCE is enabled.
	pub pkce_verifier: Option<TokenSecret>,
	/// Redirect URI sent with the authorize request.
	pub redirect_uri: Option<Url>,
}
impl PendingAuthorization {
	/// Compares `returned` against the stored state.
	pub fn validate_state(&self, returned: Option<&str>) -> Result<()> {
		if returned == Some(self.state.as_str()) {
			Ok(())
		} else {
			Err(Error::authorization("invalid_state", "Authorization state mismatch."))
		}
	}
}

/// Result of [`MicrosoftStrategy::handle_callback`].
///
/// [`MicrosoftStrategy::handle_callback`]: crate::strategy::MicrosoftStrategy::handle_callback
#[derive(Clone, Debug)]
pub enum CallbackOutcome {
	/// Code exchanged and, unless skipped, the profile loaded.
	Authenticated(Box<AuthenticatedLogin>),
	/// The user declined consent (`error=access_denied`); the query is forwarded as is.
	Denied {
		/// Callback query parameters.
		params: BTreeMap<String, String>,
	},
}

/// Tokens and profile of a completed login.
#[derive(Clone, Debug)]
pub struct AuthenticatedLogin {
	/// Token grant from the code exchange.
	pub grant: TokenGrant,
	/// Normalized profile; `None` when the profile request is skipped.
	pub profile: Option<Profile>,
}

#[derive(Clone)]
pub(crate) struct PkcePair {
	pub(crate) verifier: String,
	pub(crate) challenge: String,
}
impl PkcePair {
	pub(crate) fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge }
	}
}

pub(crate) fn random_state() -> String {
	random_string(STATE_LEN)
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn pkce_challenge_matches_rfc_vector() {
		assert_eq!(
			compute_pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
			"E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
		);

		let pair = PkcePair::generate();

		assert_eq!(pair.verifier.len(), PKCE_VERIFIER_LEN);
		assert_eq!(pair.challenge, compute_pkce_challenge(&pair.verifier));
	}

	#[test]
	fn state_validation_requires_exact_match() {
		let pending = PendingAuthorization { state: random_state(), ..Default::default() };

		assert_eq!(pending.state.len(), STATE_LEN);
		assert!(pending.validate_state(Some(&pending.state)).is_ok());
		assert!(matches!(
			pending.validate_state(Some("other")),
			Err(Error::Authorization { ref code, .. }) if code == "invalid_state"
		));
		assert!(pending.validate_state(None).is_err());
	}
}
