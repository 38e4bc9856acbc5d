//! Authorize-request parameters forwarded from the caller.

// self
use crate::_prelude::*;

/// Parameters Microsoft's authorize endpoint accepts from the caller.
pub const AUTHORIZATION_PARAMS: [&str; 5] =
	["locale", "display", "prompt", "login_hint", "domain_hint"];

/// Copies the supported authorize parameters out of `options`.
///
/// Absent and empty values are skipped and unknown keys are dropped.
pub fn build_auth_params(options: &BTreeMap<String, String>) -> BTreeMap<String, String> {
	AUTHORIZATION_PARAMS
		.iter()
		.filter_map(|&key| {
			options
				.get(key)
				.filter(|value| !value.is_empty())
				.map(|value| (key.to_owned(), value.clone()))
		})
		.collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn options(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
		pairs.iter().map(|(key, value)| ((*key).to_owned(), (*value).to_owned())).collect()
	}

	#[test]
	fn unknown_keys_are_dropped() {
		let params = build_auth_params(&options(&[("display", "mobile"), ("foo", "bar")]));

		assert_eq!(params, options(&[("display", "mobile")]));
	}

	#[test]
	fn empty_values_are_skipped() {
		let params = build_auth_params(&options(&[
			("prompt", "select_account"),
			("login_hint", ""),
			("domain_hint", "contoso.com"),
			("locale", "en-US"),
		]));

		assert_eq!(
			params,
			options(&[
				("domain_hint", "contoso.com"),
				("locale", "en-US"),
				("prompt", "select_account"),
			])
		);
		assert!(build_auth_params(&BTreeMap::new()).is_empty());
	}
}
