//! Token result structs, redaction helpers, and builders.

// self
use crate::_prelude::*;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Errors produced by [`TokenResultBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenResultBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
}

/// Immutable record describing the outcome of a token exchange.
///
/// Lives only for the duration of the callback request that produced it; the
/// provider-specific extras (raw identity token, granted-scope string) ride
/// along so later extraction steps never need a second network call.
#[derive(Serialize, Deserialize, Clone)]
pub struct TokenResult {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret, if the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Token type string copied verbatim from the provider response.
	pub token_type: String,
	/// Expiry instant derived from the provider's `expires_in`, when supplied.
	pub expires_at: Option<OffsetDateTime>,
	/// Raw signed identity token issued alongside the access token.
	pub id_token: Option<String>,
	/// Granted-scope string exactly as the provider reported it.
	pub granted_scope: Option<String>,
}
impl TokenResult {
	/// Returns a builder for assembling exchange outcomes.
	pub fn builder() -> TokenResultBuilder {
		TokenResultBuilder::new()
	}

	/// Returns `true` iff the provider supplied an expiry for the access token.
	pub fn expires(&self) -> bool {
		self.expires_at.is_some()
	}
}
impl Debug for TokenResult {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenResult")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("token_type", &self.token_type)
			.field("expires_at", &self.expires_at)
			.field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
			.field("granted_scope", &self.granted_scope)
			.finish()
	}
}

/// Builder for [`TokenResult`].
#[derive(Clone, Debug, Default)]
pub struct TokenResultBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	token_type: Option<String>,
	expires_at: Option<OffsetDateTime>,
	id_token: Option<String>,
	granted_scope: Option<String>,
}
impl TokenResultBuilder {
	const DEFAULT_TOKEN_TYPE: &'static str = "bearer";

	fn new() -> Self {
		Self::default()
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Overrides the token type (defaults to `bearer`).
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Sets the absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Attaches the raw identity token string.
	pub fn id_token(mut self, token: impl Into<String>) -> Self {
		self.id_token = Some(token.into());

		self
	}

	/// Attaches the granted-scope string as reported by the provider.
	pub fn granted_scope(mut self, scope: impl Into<String>) -> Self {
		self.granted_scope = Some(scope.into());

		self
	}

	/// Consumes the builder and produces a [`TokenResult`].
	pub fn build(self) -> Result<TokenResult, TokenResultBuilderError> {
		let access_token = self.access_token.ok_or(TokenResultBuilderError::MissingAccessToken)?;

		Ok(TokenResult {
			access_token,
			refresh_token: self.refresh_token,
			token_type: self.token_type.unwrap_or_else(|| Self::DEFAULT_TOKEN_TYPE.into()),
			expires_at: self.expires_at,
			id_token: self.id_token,
			granted_scope: self.granted_scope,
		})
	}
}
