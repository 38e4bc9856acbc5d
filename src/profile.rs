//! Normalized user profile and the fetchers that produce it.
//!
//! `graph` reads the JSON `/me/` resource of Microsoft Graph, `soap` calls the Customer
//! Management `GetUser` operation of Microsoft Advertising. Both implement
//! [`ProfileFetcher`], so a deployment picks one at configuration time and the rest of the
//! strategy never learns which upstream answered.

pub mod graph;
pub mod soap;

pub use graph::*;
pub use soap::*;

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Boxed future returned by [`ProfileFetcher::fetch_profile`].
pub type ProfileFuture<'a> = Pin<Box<dyn Future<Output = Result<Profile>> + 'a + Send>>;

/// Fetches and normalizes the signed-in user's profile.
///
/// Each call performs exactly one upstream request and resolves exactly once.
pub trait ProfileFetcher: Send + Sync {
	/// Stable label of the upstream API, used as the tracing stage.
	fn api(&self) -> &'static str;

	/// Loads the profile that belongs to `access_token`.
	fn fetch_profile<'a>(&'a self, access_token: &'a TokenSecret) -> ProfileFuture<'a>;
}

/// Email category attached to profile addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailKind {
	/// Organizational or primary mailbox.
	Work,
}

/// Email entry in a normalized profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEmail {
	/// Address category.
	#[serde(rename = "type")]
	pub kind: EmailKind,
	/// Email address.
	pub value: String,
}
impl ProfileEmail {
	/// Creates a `work` email entry.
	pub fn work(value: impl Into<String>) -> Self {
		Self { kind: EmailKind::Work, value: value.into() }
	}
}

/// Structured name parts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileName {
	/// Given (first) name.
	pub given_name: Option<String>,
	/// Family (last) name.
	pub family_name: Option<String>,
}

/// Provider-agnostic user profile handed to the hosting application.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
	/// Always [`Profile::PROVIDER`].
	pub provider: String,
	/// Provider-scoped user identifier.
	pub id: String,
	/// Name suitable for display.
	pub display_name: String,
	/// Structured name parts.
	pub name: ProfileName,
	/// Email addresses, primary first; may be empty.
	pub emails: Vec<ProfileEmail>,
	/// Graph `userPrincipalName`, when the upstream reports one.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_principal_name: Option<String>,
	/// Raw response body.
	#[serde(rename = "_raw")]
	pub raw: String,
	/// Parsed response (JSON document or XML tree).
	#[serde(rename = "_json")]
	pub json: JsonValue,
}
impl Profile {
	/// Provider label stamped on every profile.
	pub const PROVIDER: &'static str = "microsoft";

	/// Primary email address, if any.
	pub fn primary_email(&self) -> Option<&str> {
		self.emails.first().map(|email| email.value.as_str())
	}
}
