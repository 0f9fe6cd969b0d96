//! Host-facing auth result shapes and recorded failures.
//!
//! The host framework consumes exactly one of two things per callback: the
//! normalized [`AuthResult`] on success, or a list of [`StrategyFailure`]
//! values to render. Everything in this module serializes cleanly so hosts can
//! persist or forward the result without reshaping it.

// self
use crate::{
	_prelude::*,
	apple::AppleProfile,
	auth::{TokenResult, TokenSecret},
	identity::IdentityDecodeError,
};

/// Recorded failure surfaced to the host framework instead of an auth result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyFailure {
	/// Stable failure code the host can branch on.
	pub code: String,
	/// Optional provider- or strategy-supplied message.
	pub message: Option<String>,
}
impl StrategyFailure {
	/// Code recorded when the provider reported an `error` parameter.
	pub const AUTH_FAILED: &'static str = "auth_failed";
	/// Code recorded when the identity token could not be decoded.
	pub const IDENTITY_DECODE_FAILED: &'static str = "identity_decode_failed";
	/// Code recorded when the callback carried neither `code` nor `error`.
	pub const MISSING_CODE: &'static str = "missing_code";
	/// Code recorded when the exchange failed without a provider error code.
	pub const TOKEN_EXCHANGE_FAILED: &'static str = "token_exchange_failed";

	/// Creates a failure from a code and optional message.
	pub fn new(code: impl Into<String>, message: Option<String>) -> Self {
		Self { code: code.into(), message }
	}

	/// Failure for a provider-reported `error` callback parameter.
	pub fn auth_failed(message: impl Into<String>) -> Self {
		Self::new(Self::AUTH_FAILED, Some(message.into()))
	}

	/// Failure for a callback carrying neither `code` nor `error`.
	pub fn missing_code() -> Self {
		Self::new(Self::MISSING_CODE, None)
	}

	/// Failure wrapping a typed identity-decode error.
	pub fn identity_decode_failed(err: &IdentityDecodeError) -> Self {
		Self::new(Self::IDENTITY_DECODE_FAILED, Some(err.to_string()))
	}
}

/// Credentials block of the auth result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credentials {
	/// Access token issued by the provider.
	pub token: TokenSecret,
	/// Refresh token, when the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Whether the access token carries an expiry.
	pub expires: bool,
	/// Expiry instant as a Unix timestamp, when present.
	#[serde(with = "time::serde::timestamp::option")]
	pub expires_at: Option<OffsetDateTime>,
	/// Granted scopes in the order the provider reported them.
	pub scopes: Vec<String>,
	/// Token type copied verbatim from the provider response.
	pub token_type: String,
}
impl Credentials {
	/// Derives the credentials block from a stored token result.
	///
	/// `delimiter` splits the provider's granted-scope string; Apple
	/// space-delimits, so anything else reproduces legacy host behavior only.
	pub fn from_token(token: &TokenResult, delimiter: char) -> Self {
		Self {
			token: token.access_token.clone(),
			refresh_token: token.refresh_token.clone(),
			expires: token.expires(),
			expires_at: token.expires_at,
			scopes: token
				.granted_scope
				.as_deref()
				.map(|raw| {
					raw.split(delimiter)
						.filter(|entry| !entry.is_empty())
						.map(ToOwned::to_owned)
						.collect()
				})
				.unwrap_or_default(),
			token_type: token.token_type.clone(),
		}
	}
}

/// Profile info block of the auth result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
	/// Email address recovered from the identity token.
	pub email: Option<String>,
	/// Given name from the first-consent `user` fragment, when present.
	pub first_name: Option<String>,
	/// Family name from the first-consent `user` fragment, when present.
	pub last_name: Option<String>,
}
impl Info {
	/// Derives the info block from a stored profile.
	pub fn from_profile(profile: &AppleProfile) -> Self {
		let name = profile.name();

		Self {
			email: profile.email().map(ToOwned::to_owned),
			first_name: name.as_ref().and_then(|n| n.first_name.clone()),
			last_name: name.and_then(|n| n.last_name),
		}
	}
}

/// Verbatim source material kept for audit and debugging purposes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawInfo {
	/// The stored token result, exactly as the exchange produced it.
	pub token: TokenResult,
	/// The stored profile, exactly as the merge produced it.
	pub user: AppleProfile,
}

/// Extra block of the auth result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Extra {
	/// Raw exchange material.
	pub raw_info: RawInfo,
}

/// Normalized auth result consumed by the host framework.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthResult {
	/// Unique subject identifier (the identity token's `sub`).
	pub uid: String,
	/// Credentials block.
	pub credentials: Credentials,
	/// Profile info block.
	pub info: Info,
	/// Raw source material.
	pub extra: Extra,
}
