//! Apple-specific constants, client-secret minting, and profile shapes.
//!
//! Sign In with Apple deviates from garden-variety OAuth 2.0 providers in two
//! ways this module absorbs: the client secret is a short-lived ES256 JWT
//! signed with a developer key rather than a static string, and the user's
//! name arrives only once, as an inline JSON blob on the first consent
//! callback, never in the identity token.

// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Apple's OAuth 2.0 authorization endpoint.
pub const AUTHORIZATION_ENDPOINT: &str = "https://appleid.apple.com/auth/authorize";
/// Apple's OAuth 2.0 token endpoint.
pub const TOKEN_ENDPOINT: &str = "https://appleid.apple.com/auth/token";
/// Apple's JWKS endpoint for identity-token signature verification.
pub const JWKS_ENDPOINT: &str = "https://appleid.apple.com/auth/keys";
/// Issuer expected in Apple identity tokens and targeted by client-secret JWTs.
pub const ISSUER: &str = "https://appleid.apple.com";

/// Client secret lifetime. Apple accepts up to six months; a short window
/// limits the exposure if a minted secret leaks.
const CLIENT_SECRET_LIFETIME: Duration = Duration::days(1);

#[derive(Serialize)]
struct ClientSecretClaims<'a> {
	iss: &'a str,
	iat: i64,
	exp: i64,
	aud: &'a str,
	sub: &'a str,
}

/// Mints the ES256 client-secret JWT Apple requires at the token endpoint.
///
/// The `iss` claim carries the developer team identifier, `sub` the client
/// (service) identifier, and the JWT header names the signing key via `kid`.
///
/// # Errors
///
/// Returns [`ConfigError::ClientSecretSigning`] when the private key PEM cannot
/// be parsed or the JWT cannot be serialized.
pub fn mint_client_secret(
	team_id: &str,
	key_id: &str,
	private_key_pem: &TokenSecret,
	client_id: &str,
) -> Result<TokenSecret, ConfigError> {
	let header =
		Header { alg: Algorithm::ES256, kid: Some(key_id.to_owned()), ..Default::default() };
	let now = OffsetDateTime::now_utc();
	let claims = ClientSecretClaims {
		iss: team_id,
		iat: now.unix_timestamp(),
		exp: (now + CLIENT_SECRET_LIFETIME).unix_timestamp(),
		aud: ISSUER,
		sub: client_id,
	};
	let key = EncodingKey::from_ec_pem(private_key_pem.expose().as_bytes())
		.map_err(|source| ConfigError::ClientSecretSigning { source })?;
	let jwt = jsonwebtoken::encode(&header, &claims, &key)
		.map_err(|source| ConfigError::ClientSecretSigning { source })?;

	Ok(TokenSecret::new(jwt))
}

/// Name structure Apple embeds in the first-consent `user` JSON blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppleName {
	/// Given name, when the user consented to sharing it.
	#[serde(rename = "firstName")]
	pub first_name: Option<String>,
	/// Family name, when the user consented to sharing it.
	#[serde(rename = "lastName")]
	pub last_name: Option<String>,
}

/// Normalized per-login profile merged from identity-token claims and the
/// optional inline `user` fragment.
///
/// The map-backed representation keeps host-configurable field lookups (the
/// `uid_field` option) working without committing to a fixed struct shape;
/// `uid` and `email` always come from the identity token and overwrite
/// whatever the fragment carried under the same keys.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppleProfile(Map<String, Value>);
impl AppleProfile {
	/// Parses the inline `user` JSON parameter into a profile fragment.
	///
	/// Absent or malformed input yields the empty fragment; Apple omits the
	/// parameter entirely on repeat logins, so an empty fragment is the common
	/// case rather than an error.
	pub fn parse_fragment(raw: Option<&str>) -> Map<String, Value> {
		raw.and_then(|value| serde_json::from_str::<Map<String, Value>>(value).ok())
			.unwrap_or_default()
	}

	/// Merges the authoritative identity-token claims over a parsed fragment.
	pub fn from_claims(mut fragment: Map<String, Value>, uid: &str, email: &str) -> Self {
		fragment.insert("uid".into(), Value::String(uid.to_owned()));
		fragment.insert("email".into(), Value::String(email.to_owned()));

		Self(fragment)
	}

	/// Looks up an arbitrary profile field by name.
	pub fn get(&self, field: &str) -> Option<&Value> {
		self.0.get(field)
	}

	/// Returns the string value stored under `field`, typically the host's
	/// configured uid field.
	pub fn field_str(&self, field: &str) -> Option<String> {
		self.get(field)?.as_str().map(ToOwned::to_owned)
	}

	/// Verified email address merged from the identity token.
	pub fn email(&self) -> Option<&str> {
		self.get("email")?.as_str()
	}

	/// First-consent name structure, when Apple supplied one.
	pub fn name(&self) -> Option<AppleName> {
		serde_json::from_value(self.get("name")?.clone()).ok()
	}
}
