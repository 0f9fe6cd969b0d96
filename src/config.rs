//! Immutable strategy configuration and per-request override options.
//!
//! The configuration is constructed once at process start through a validating
//! builder and passed by reference into every request handler; nothing here is
//! mutable after [`StrategyConfigBuilder::build`] returns.

// self
use crate::{_prelude::*, apple, auth::{ScopeSet, TokenSecret}, error::ConfigError};

const DEFAULT_SCOPE: &str = "name email";
const DEFAULT_UID_FIELD: &str = "uid";

/// Errors raised while constructing or validating a strategy configuration.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StrategyConfigError {
	/// Client-secret material is mandatory for the token exchange.
	#[error("Client credentials (static secret or signing material) are required.")]
	MissingClientCredentials,
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Reject scope delimiters that are control characters.
	#[error("Scope delimiter must be a printable character.")]
	InvalidScopeDelimiter {
		/// Invalid delimiter that was supplied.
		delimiter: char,
	},
	/// The uid field name cannot be empty.
	#[error("The uid field name cannot be empty.")]
	EmptyUidField,
}

/// Endpoint set the strategy talks to; defaults to Apple's production hosts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint the user-agent is redirected to.
	pub authorization: Url,
	/// Token endpoint used for the authorization-code exchange.
	pub token: Url,
	/// JWKS endpoint serving the identity-token signing keys.
	pub jwks: Url,
}
impl Default for ProviderEndpoints {
	fn default() -> Self {
		Self {
			authorization: Url::parse(apple::AUTHORIZATION_ENDPOINT)
				.expect("Apple authorization endpoint constant must parse."),
			token: Url::parse(apple::TOKEN_ENDPOINT)
				.expect("Apple token endpoint constant must parse."),
			jwks: Url::parse(apple::JWKS_ENDPOINT)
				.expect("Apple JWKS endpoint constant must parse."),
		}
	}
}

/// Client-secret material used to authenticate against the token endpoint.
#[derive(Clone, Debug)]
pub enum ClientCredentials {
	/// Pre-provisioned static client secret.
	Static(TokenSecret),
	/// Developer signing material; the strategy mints Apple's ES256
	/// client-secret JWT on demand.
	SignedJwt {
		/// Apple developer team identifier (the JWT `iss`).
		team_id: String,
		/// Identifier of the signing key (the JWT header `kid`).
		key_id: String,
		/// ES256 private key in PEM form.
		private_key_pem: TokenSecret,
	},
}

/// Immutable strategy configuration consumed by both phases.
#[derive(Clone, Debug)]
pub struct StrategyConfig {
	/// OAuth 2.0 client identifier (Apple "service id").
	pub client_id: String,
	/// Client-secret material for the token exchange.
	pub credentials: ClientCredentials,
	/// Provider endpoints; overridable for tests and private deployments.
	pub endpoints: ProviderEndpoints,
	/// Scope requested when the inbound request does not override it.
	pub default_scope: ScopeSet,
	/// Profile field the host framework treats as the unique identifier.
	pub uid_field: String,
	/// Optional `prompt` forwarded to the authorization endpoint.
	pub prompt: Option<String>,
	/// Optional `access_type` forwarded to the authorization endpoint.
	pub access_type: Option<String>,
	/// Character used to split the provider's granted-scope string.
	pub scope_delimiter: char,
}
impl StrategyConfig {
	/// Creates a new builder for the provided client identifier.
	pub fn builder(client_id: impl Into<String>) -> StrategyConfigBuilder {
		StrategyConfigBuilder::new(client_id)
	}

	/// Resolves the client secret, minting the ES256 JWT when the
	/// configuration carries signing material instead of a static secret.
	pub fn resolve_client_secret(&self) -> Result<TokenSecret, ConfigError> {
		match &self.credentials {
			ClientCredentials::Static(secret) => Ok(secret.clone()),
			ClientCredentials::SignedJwt { team_id, key_id, private_key_pem } =>
				apple::mint_client_secret(team_id, key_id, private_key_pem, &self.client_id),
		}
	}

	/// Resolves the client identifier for a request, honoring the pairing
	/// rule: per-request overrides take effect only when the options supply
	/// BOTH `client_id` and `client_secret`.
	pub fn effective_client_id<'a>(&'a self, options: &'a AuthorizationOptions) -> &'a str {
		match (&options.client_id, &options.client_secret) {
			(Some(id), Some(_)) => id,
			_ => &self.client_id,
		}
	}

	/// Resolves the `(client_id, client_secret)` pair for a request under the
	/// same pairing rule as [`Self::effective_client_id`].
	pub fn effective_client(
		&self,
		options: &AuthorizationOptions,
	) -> Result<(String, TokenSecret), ConfigError> {
		if let (Some(id), Some(secret)) = (&options.client_id, &options.client_secret) {
			return Ok((id.clone(), secret.clone()));
		}

		Ok((self.client_id.clone(), self.resolve_client_secret()?))
	}
}

/// Builder for [`StrategyConfig`] values.
#[derive(Debug)]
pub struct StrategyConfigBuilder {
	/// Client identifier for the configuration being constructed.
	pub client_id: String,
	/// Client-secret material (required).
	pub credentials: Option<ClientCredentials>,
	/// Provider endpoints, defaulting to Apple's production hosts.
	pub endpoints: ProviderEndpoints,
	/// Default scope, `"name email"` unless overridden.
	pub default_scope: ScopeSet,
	/// Uid field name, `"uid"` unless overridden.
	pub uid_field: String,
	/// Optional configured `prompt`.
	pub prompt: Option<String>,
	/// Optional configured `access_type`.
	pub access_type: Option<String>,
	/// Granted-scope delimiter, a space unless overridden.
	pub scope_delimiter: char,
}
impl StrategyConfigBuilder {
	/// Creates a new builder seeded with Apple defaults.
	pub fn new(client_id: impl Into<String>) -> Self {
		Self {
			client_id: client_id.into(),
			credentials: None,
			endpoints: ProviderEndpoints::default(),
			default_scope: ScopeSet::new(DEFAULT_SCOPE.split_whitespace())
				.expect("Default scope constant must be valid."),
			uid_field: DEFAULT_UID_FIELD.into(),
			prompt: None,
			access_type: None,
			scope_delimiter: ' ',
		}
	}

	/// Sets a static client secret.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.credentials = Some(ClientCredentials::Static(TokenSecret::new(secret)));

		self
	}

	/// Sets ES256 signing material used to mint client secrets on demand.
	pub fn signing_material(
		mut self,
		team_id: impl Into<String>,
		key_id: impl Into<String>,
		private_key_pem: impl Into<String>,
	) -> Self {
		self.credentials = Some(ClientCredentials::SignedJwt {
			team_id: team_id.into(),
			key_id: key_id.into(),
			private_key_pem: TokenSecret::new(private_key_pem),
		});

		self
	}

	/// Overrides the provider endpoints.
	pub fn endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Overrides the default scope.
	pub fn default_scope(mut self, scope: ScopeSet) -> Self {
		self.default_scope = scope;

		self
	}

	/// Overrides the uid field name.
	pub fn uid_field(mut self, field: impl Into<String>) -> Self {
		self.uid_field = field.into();

		self
	}

	/// Sets the configured `prompt` parameter.
	pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
		self.prompt = Some(prompt.into());

		self
	}

	/// Sets the configured `access_type` parameter.
	pub fn access_type(mut self, access_type: impl Into<String>) -> Self {
		self.access_type = Some(access_type.into());

		self
	}

	/// Overrides the granted-scope delimiter.
	pub fn scope_delimiter(mut self, delimiter: char) -> Self {
		self.scope_delimiter = delimiter;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<StrategyConfig, StrategyConfigError> {
		let credentials = self.credentials.ok_or(StrategyConfigError::MissingClientCredentials)?;
		let config = StrategyConfig {
			client_id: self.client_id,
			credentials,
			endpoints: self.endpoints,
			default_scope: self.default_scope,
			uid_field: self.uid_field,
			prompt: self.prompt,
			access_type: self.access_type,
			scope_delimiter: self.scope_delimiter,
		};

		config.validate()?;

		Ok(config)
	}
}

impl StrategyConfig {
	fn validate(&self) -> Result<(), StrategyConfigError> {
		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("jwks", &self.endpoints.jwks)?;

		if self.scope_delimiter.is_control() {
			return Err(StrategyConfigError::InvalidScopeDelimiter {
				delimiter: self.scope_delimiter,
			});
		}
		if self.uid_field.is_empty() {
			return Err(StrategyConfigError::EmptyUidField);
		}

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), StrategyConfigError> {
	if url.scheme() != "https" {
		Err(StrategyConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}

/// Per-request overrides extracted from the inbound request parameters.
///
/// Created per request and discarded after the redirect; every field layers
/// over the static configuration through [`layered_option`].
#[derive(Clone, Debug, Default)]
pub struct AuthorizationOptions {
	/// Scope override (raw space-delimited string from the request).
	pub scope: Option<String>,
	/// `prompt` override.
	pub prompt: Option<String>,
	/// `access_type` override.
	pub access_type: Option<String>,
	/// `response_mode` override.
	pub response_mode: Option<String>,
	/// Client identifier override (effective only when paired with a secret).
	pub client_id: Option<String>,
	/// Client secret override (effective only when paired with an id).
	pub client_secret: Option<TokenSecret>,
}
impl AuthorizationOptions {
	/// Sets the scope override.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = Some(scope.into());

		self
	}

	/// Sets the `prompt` override.
	pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
		self.prompt = Some(prompt.into());

		self
	}

	/// Sets the `access_type` override.
	pub fn with_access_type(mut self, access_type: impl Into<String>) -> Self {
		self.access_type = Some(access_type.into());

		self
	}

	/// Sets the `response_mode` override.
	pub fn with_response_mode(mut self, response_mode: impl Into<String>) -> Self {
		self.response_mode = Some(response_mode.into());

		self
	}

	/// Sets the client identifier override.
	pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Sets the client secret override.
	pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
		self.client_secret = Some(TokenSecret::new(client_secret));

		self
	}
}

/// Layered lookup over the two ordered config sources: the request-scoped
/// override wins, the static configuration fills in behind it.
pub fn layered_option<'a>(
	request_value: Option<&'a str>,
	configured: Option<&'a str>,
) -> Option<&'a str> {
	request_value.or(configured)
}
