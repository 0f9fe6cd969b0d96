//! Callback phase: code exchange, identity decode, and result extraction.

// self
use crate::{
	_prelude::*,
	apple::AppleProfile,
	auth::TokenResult,
	config::{AuthorizationOptions, StrategyConfig},
	http::TokenHttpClient,
	identity::IdentityDecodeError,
	oauth::{AppleFacade, TransportErrorMapper},
	obs::{self, PhaseKind, PhaseOutcome, PhaseSpan},
	result::{AuthResult, Credentials, Extra, Info, RawInfo, StrategyFailure},
	strategy::AppleStrategy,
};

/// Parameters the provider sends to the callback endpoint.
///
/// Exactly one of `code` and `error` is present on well-formed callbacks;
/// `user` shows up only on the first consent, as a JSON-encoded string.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CallbackParams {
	/// Authorization code to exchange for tokens.
	pub code: Option<String>,
	/// Echoed anti-forgery state parameter.
	pub state: Option<String>,
	/// Inline JSON `user` blob sent by Apple on first login.
	pub user: Option<String>,
	/// Provider-reported failure, mutually exclusive with `code`.
	pub error: Option<String>,
}

/// Request-scoped state record produced by [`AppleStrategy::handle_callback`].
///
/// Holds the exchanged token and merged profile until the host framework has
/// extracted what it needs, then [`clear`](Self::clear) drops both so a reused
/// request context can never observe credentials from a prior exchange.
#[derive(Clone, Debug, Default)]
pub struct CallbackSession {
	token: Option<TokenResult>,
	profile: Option<AppleProfile>,
	failures: Vec<StrategyFailure>,
}
impl CallbackSession {
	pub(crate) fn success(token: TokenResult, profile: AppleProfile) -> Self {
		Self { token: Some(token), profile: Some(profile), failures: Vec::new() }
	}

	pub(crate) fn failed(failure: StrategyFailure) -> Self {
		Self { token: None, profile: None, failures: vec![failure] }
	}

	/// Returns `true` when the callback produced a usable token + profile pair.
	pub fn succeeded(&self) -> bool {
		self.token.is_some() && self.failures.is_empty()
	}

	/// Failures recorded for the host framework to render.
	pub fn failures(&self) -> &[StrategyFailure] {
		&self.failures
	}

	/// The stored token result, present only after a successful callback.
	pub fn token(&self) -> Option<&TokenResult> {
		self.token.as_ref()
	}

	/// The stored profile, present only after a successful callback.
	pub fn profile(&self) -> Option<&AppleProfile> {
		self.profile.as_ref()
	}

	/// Extracts the unique identifier named by the configured uid field.
	pub fn uid(&self, config: &StrategyConfig) -> Option<String> {
		self.profile.as_ref()?.field_str(&config.uid_field)
	}

	/// Extracts the credentials block, splitting granted scopes with the
	/// configured delimiter.
	pub fn credentials(&self, config: &StrategyConfig) -> Option<Credentials> {
		Some(Credentials::from_token(self.token.as_ref()?, config.scope_delimiter))
	}

	/// Extracts the profile info block.
	pub fn info(&self) -> Option<Info> {
		Some(Info::from_profile(self.profile.as_ref()?))
	}

	/// Extracts the raw audit block (`raw_info = {token, user}`).
	pub fn extra(&self) -> Option<Extra> {
		let token = self.token.clone()?;
		let user = self.profile.clone()?;

		Some(Extra { raw_info: RawInfo { token, user } })
	}

	/// Assembles the full normalized auth result for the host framework.
	pub fn auth_result(&self, config: &StrategyConfig) -> Option<AuthResult> {
		Some(AuthResult {
			uid: self.uid(config)?,
			credentials: self.credentials(config)?,
			info: self.info()?,
			extra: self.extra()?,
		})
	}

	/// Clears the stored token and profile.
	///
	/// Idempotent and unconditional; must run after every callback outcome,
	/// including failures where nothing was stored.
	pub fn clear(&mut self) {
		self.token = None;
		self.profile = None;
	}
}

impl<C, M> AppleStrategy<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Handles the provider callback and produces the request-scoped session.
	///
	/// Three mutually exclusive shapes are matched in priority order: a `code`
	/// parameter starts the exchange path, an `error` parameter records a
	/// single `auth_failed` failure, and anything else records `missing_code`.
	/// Flow-level failures (provider rejections, transport faults, identity
	/// decode problems) are recorded on the session for the host to render; no
	/// retries happen anywhere on this path.
	///
	/// # Errors
	///
	/// Only configuration-level faults (unusable endpoint or redirect URLs,
	/// client-secret signing failures) surface as `Err`; they indicate
	/// programming errors rather than flow outcomes.
	pub async fn handle_callback(
		&self,
		params: &CallbackParams,
		options: &AuthorizationOptions,
		redirect_uri: Url,
	) -> Result<CallbackSession> {
		const KIND: PhaseKind = PhaseKind::Callback;

		let span = PhaseSpan::new(KIND, "handle_callback");

		obs::record_phase_outcome(KIND, PhaseOutcome::Attempt);

		let result = span
			.instrument(async move {
				if let Some(code) = params.code.as_deref() {
					self.exchange_and_decode(code, params.user.as_deref(), options, &redirect_uri)
						.await
				} else if let Some(error) = params.error.as_deref() {
					Ok(CallbackSession::failed(StrategyFailure::auth_failed(error)))
				} else {
					Ok(CallbackSession::failed(StrategyFailure::missing_code()))
				}
			})
			.await;

		match &result {
			Ok(session) if session.succeeded() =>
				obs::record_phase_outcome(KIND, PhaseOutcome::Success),
			_ => obs::record_phase_outcome(KIND, PhaseOutcome::Failure),
		}

		result
	}

	async fn exchange_and_decode(
		&self,
		code: &str,
		user: Option<&str>,
		options: &AuthorizationOptions,
		redirect_uri: &Url,
	) -> Result<CallbackSession> {
		let fragment = AppleProfile::parse_fragment(user);
		let (client_id, client_secret) = self.config.effective_client(options)?;
		let facade: AppleFacade<C, M> = AppleFacade::from_config(
			&self.config,
			&client_id,
			&client_secret,
			redirect_uri,
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)?;
		let token = match facade.exchange_authorization_code(code).await {
			Ok(token) => token,
			Err(Error::Config(e)) => return Err(e.into()),
			Err(err) => return Ok(CallbackSession::failed(exchange_failure(err))),
		};
		let (uid, email) = match self.decode_identity(&token).await {
			Ok(identity) => identity,
			Err(err) =>
				return Ok(CallbackSession::failed(StrategyFailure::identity_decode_failed(&err))),
		};
		let profile = AppleProfile::from_claims(fragment, &uid, &email);

		Ok(CallbackSession::success(token, profile))
	}

	async fn decode_identity(
		&self,
		token: &TokenResult,
	) -> Result<(String, String), IdentityDecodeError> {
		let raw = token.id_token.as_deref().ok_or(IdentityDecodeError::MissingIdToken)?;
		let claims = self.identity_decoder.decode(raw).await?;
		let email = claims.email.ok_or(IdentityDecodeError::MissingClaim { claim: "email" })?;

		Ok((claims.sub, email))
	}
}

fn exchange_failure(err: Error) -> StrategyFailure {
	match err {
		Error::ExchangeRejected { code, description } => StrategyFailure::new(code, description),
		other =>
			StrategyFailure::new(StrategyFailure::TOKEN_EXCHANGE_FAILED, Some(other.to_string())),
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, identity::IdentityClaims};

	fn test_strategy() -> ReqwestTestStrategy {
		let config = StrategyConfig::builder("com.example.service")
			.client_secret("secret")
			.build()
			.expect("Configuration fixture should validate.");
		let decoder = StaticClaimsDecoder(IdentityClaims::new("001234.abcd", Some("a@b.com")));

		build_reqwest_test_strategy(config, Arc::new(decoder))
	}

	fn redirect_uri() -> Url {
		Url::parse("https://app.example.com/callback").expect("Redirect URI fixture should parse.")
	}

	#[tokio::test]
	async fn provider_error_records_single_auth_failed() {
		let strategy = test_strategy();
		let params =
			CallbackParams { error: Some("user_cancelled_authorize".into()), ..Default::default() };
		let session = strategy
			.handle_callback(&params, &AuthorizationOptions::default(), redirect_uri())
			.await
			.expect("Provider-error callbacks should not be fatal.");

		assert!(!session.succeeded());
		assert_eq!(
			session.failures(),
			&[StrategyFailure::auth_failed("user_cancelled_authorize")]
		);
		assert!(session.token().is_none(), "No private state may be written on provider errors.");
		assert!(session.profile().is_none());
	}

	#[tokio::test]
	async fn malformed_callback_records_single_missing_code() {
		let strategy = test_strategy();
		let session = strategy
			.handle_callback(
				&CallbackParams::default(),
				&AuthorizationOptions::default(),
				redirect_uri(),
			)
			.await
			.expect("Malformed callbacks should not be fatal.");

		assert_eq!(session.failures(), &[StrategyFailure::missing_code()]);
		assert!(session.token().is_none());
	}

	#[tokio::test]
	async fn code_takes_priority_over_error() {
		// Both parameters present is out of contract; the code path must win,
		// which shows up here as an exchange attempt rather than auth_failed.
		// The token endpoint points at a closed local port so the attempt
		// fails fast without leaving the machine.
		let endpoints = crate::config::ProviderEndpoints {
			token: Url::parse("https://127.0.0.1:1/token").expect("Test URL should parse."),
			..Default::default()
		};
		let config = StrategyConfig::builder("com.example.service")
			.client_secret("secret")
			.endpoints(endpoints)
			.build()
			.expect("Configuration fixture should validate.");
		let decoder = StaticClaimsDecoder(IdentityClaims::new("001234.abcd", Some("a@b.com")));
		let strategy = build_reqwest_test_strategy(config, Arc::new(decoder));
		let params = CallbackParams {
			code: Some("auth-code".into()),
			error: Some("access_denied".into()),
			..Default::default()
		};
		let session = strategy
			.handle_callback(&params, &AuthorizationOptions::default(), redirect_uri())
			.await
			.expect("Exchange-path callbacks should not be fatal.");
		let failure = &session.failures()[0];

		assert_ne!(failure.code, StrategyFailure::AUTH_FAILED);
	}

	#[test]
	fn clear_is_unconditional_and_idempotent() {
		let token = TokenResult::builder()
			.access_token("access")
			.build()
			.expect("Token fixture should build successfully.");
		let profile = AppleProfile::from_claims(Default::default(), "001234.abcd", "a@b.com");
		let mut session = CallbackSession::success(token, profile);

		assert!(session.succeeded());

		session.clear();

		assert!(session.token().is_none());
		assert!(session.profile().is_none());

		session.clear();

		assert!(session.token().is_none(), "Clearing an empty session must be a no-op.");

		let mut failed = CallbackSession::failed(StrategyFailure::missing_code());

		failed.clear();

		assert_eq!(failed.failures().len(), 1, "Failures stay for the host to render.");
	}
}
