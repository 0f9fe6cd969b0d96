//! Identity-token decoding behind a narrow trait seam.
//!
//! The strategy never inspects JWT internals itself; it hands the raw token to
//! an [`IdentityTokenDecoder`] and consumes the typed claim set. The default
//! [`JwksDecoder`] verifies RS256 signatures against the provider's JWKS,
//! fetching the key set lazily and refreshing it only when an unknown key id
//! shows up.

// crates.io
#[cfg(feature = "reqwest")]
use jsonwebtoken::{Algorithm, DecodingKey, Validation, jwk::JwkSet};
use serde::Deserializer;
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::apple;

/// Claim set recovered from a verified identity token.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityClaims {
	/// Stable subject identifier; becomes the host-facing uid.
	pub sub: String,
	/// Email address, either the real one or Apple's private relay address.
	pub email: Option<String>,
	/// Whether the provider verified the email. Apple serializes this as a
	/// bool or the strings `"true"`/`"false"` depending on the client.
	#[serde(default, deserialize_with = "lenient_bool")]
	pub email_verified: Option<bool>,
	/// Whether the shared email is a private relay address.
	#[serde(default, deserialize_with = "lenient_bool")]
	pub is_private_email: Option<bool>,
}
impl IdentityClaims {
	/// Builds a claim set from its two load-bearing fields.
	pub fn new(sub: impl Into<String>, email: Option<impl Into<String>>) -> Self {
		Self {
			sub: sub.into(),
			email: email.map(Into::into),
			email_verified: None,
			is_private_email: None,
		}
	}
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Bool(bool),
		Str(String),
	}

	Ok(match Option::<Raw>::deserialize(deserializer)? {
		None => None,
		Some(Raw::Bool(value)) => Some(value),
		Some(Raw::Str(value)) => Some(value == "true"),
	})
}

/// Failures raised while decoding an identity token into [`IdentityClaims`].
#[derive(Debug, ThisError)]
pub enum IdentityDecodeError {
	/// Token response did not include an identity token at all.
	#[error("Token response did not include an identity token.")]
	MissingIdToken,
	/// Token is not a structurally valid JWT.
	#[error("Identity token is malformed.")]
	Malformed {
		/// Underlying parsing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Token header does not name a signing key.
	#[error("Identity token header is missing the key id.")]
	MissingKeyId,
	/// No key in the provider's JWKS matches the token's key id.
	#[error("No signing key matches the identity token's key id: {kid}.")]
	UnknownKeyId {
		/// Key id the token was signed with.
		kid: String,
	},
	/// A matching JWK could not be converted into a verification key.
	#[error("Signing key could not be used for verification.")]
	InvalidKey {
		/// Underlying conversion failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// The provider's key set could not be fetched.
	#[error("Signing key set could not be fetched: {message}.")]
	KeysFetch {
		/// Transport- or decoding-level failure summary.
		message: String,
	},
	/// Signature or registered-claim validation failed.
	#[error("Identity token failed verification.")]
	Verification {
		/// Underlying verification failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// A claim the strategy requires is absent from the verified token.
	#[error("Identity token is missing the required claim: {claim}.")]
	MissingClaim {
		/// Name of the absent claim.
		claim: &'static str,
	},
}

/// Boxed claim-decoding future returned by [`IdentityTokenDecoder::decode`].
pub type DecodeFuture<'a> =
	Pin<Box<dyn Future<Output = Result<IdentityClaims, IdentityDecodeError>> + 'a + Send>>;

/// Decodes and validates signed identity tokens into typed claim sets.
pub trait IdentityTokenDecoder: Send + Sync {
	/// Verifies `raw` and returns its claims.
	fn decode<'a>(&'a self, raw: &'a str) -> DecodeFuture<'a>;
}

/// JWKS-backed decoder verifying RS256 signatures, issuer, and audience.
///
/// The key set is cached behind a read-mostly lock; a fetch happens on first
/// use and again only when a token names a key id the cache does not know,
/// which is how providers signal key rotation.
#[cfg(feature = "reqwest")]
pub struct JwksDecoder {
	http_client: ReqwestClient,
	jwks_endpoint: Url,
	validation: Validation,
	keys: RwLock<Option<JwkSet>>,
}
#[cfg(feature = "reqwest")]
impl JwksDecoder {
	/// Creates a decoder expecting tokens issued to `client_id`.
	pub fn new(client_id: &str, jwks_endpoint: Url) -> Self {
		let mut validation = Validation::new(Algorithm::RS256);

		validation.set_audience(&[client_id]);
		validation.set_issuer(&[apple::ISSUER]);
		validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

		Self {
			http_client: ReqwestClient::default(),
			jwks_endpoint,
			validation,
			keys: RwLock::new(None),
		}
	}

	/// Replaces the HTTP client used for key-set fetches.
	pub fn with_http_client(mut self, client: ReqwestClient) -> Self {
		self.http_client = client;

		self
	}

	async fn fetch_keys(&self) -> Result<JwkSet, IdentityDecodeError> {
		let response = self
			.http_client
			.get(self.jwks_endpoint.clone())
			.send()
			.await
			.map_err(|e| IdentityDecodeError::KeysFetch { message: e.to_string() })?;

		if !response.status().is_success() {
			return Err(IdentityDecodeError::KeysFetch {
				message: format!("key endpoint answered {}", response.status()),
			});
		}

		response
			.json::<JwkSet>()
			.await
			.map_err(|e| IdentityDecodeError::KeysFetch { message: e.to_string() })
	}

	fn cached_key(&self, kid: &str) -> Option<Result<DecodingKey, IdentityDecodeError>> {
		let guard = self.keys.read();
		let jwk = guard.as_ref()?.find(kid)?;

		Some(
			DecodingKey::from_jwk(jwk)
				.map_err(|source| IdentityDecodeError::InvalidKey { source }),
		)
	}

	async fn key_for(&self, kid: &str) -> Result<DecodingKey, IdentityDecodeError> {
		if let Some(key) = self.cached_key(kid) {
			return key;
		}

		let fresh = self.fetch_keys().await?;
		let key = fresh
			.find(kid)
			.map(|jwk| {
				DecodingKey::from_jwk(jwk)
					.map_err(|source| IdentityDecodeError::InvalidKey { source })
			})
			.unwrap_or_else(|| Err(IdentityDecodeError::UnknownKeyId { kid: kid.to_owned() }));

		*self.keys.write() = Some(fresh);

		key
	}
}
#[cfg(feature = "reqwest")]
impl IdentityTokenDecoder for JwksDecoder {
	fn decode<'a>(&'a self, raw: &'a str) -> DecodeFuture<'a> {
		Box::pin(async move {
			let header = jsonwebtoken::decode_header(raw)
				.map_err(|source| IdentityDecodeError::Malformed { source })?;
			let kid = header.kid.ok_or(IdentityDecodeError::MissingKeyId)?;
			let key = self.key_for(&kid).await?;
			let data = jsonwebtoken::decode::<IdentityClaims>(raw, &key, &self.validation)
				.map_err(|source| IdentityDecodeError::Verification { source })?;

			Ok(data.claims)
		})
	}
}
#[cfg(feature = "reqwest")]
impl Debug for JwksDecoder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JwksDecoder").field("jwks_endpoint", &self.jwks_endpoint.as_str()).finish()
	}
}
