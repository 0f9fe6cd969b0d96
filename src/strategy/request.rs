//! Request phase: authorization-redirect construction.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	config::{AuthorizationOptions, StrategyConfig, layered_option},
	error::ConfigError,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, PhaseKind, PhaseOutcome, PhaseSpan},
	strategy::AppleStrategy,
};

const STATE_LEN: usize = 32;

/// Redirect instruction returned by [`AppleStrategy::begin_authorization`].
#[derive(Clone, Debug)]
pub struct AuthorizationRedirect {
	/// Fully-formed HTTPS authorize URL that callers should send end-users to.
	pub authorize_url: Url,
	/// Opaque anti-forgery value that must round-trip via the callback.
	pub state: String,
	/// Redirect URI supplied when constructing the authorize URL.
	pub redirect_uri: Url,
	/// Effective scope after applying the request override.
	pub scope: ScopeSet,
}
impl AuthorizationRedirect {
	/// Validates the `state` parameter echoed back by the provider.
	pub fn validate_state(&self, returned_state: &str) -> Result<()> {
		if returned_state == self.state { Ok(()) } else { Err(Error::StateMismatch) }
	}
}

impl<C, M> AppleStrategy<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds the authorization redirect for an inbound sign-in request.
	///
	/// The effective scope is the request override when present, else the
	/// configured default. Parameters merge with later-wins precedence: base
	/// scope, configured `prompt`/`access_type` (only when configured
	/// non-empty), request-supplied `access_type`/`prompt`/`response_mode`,
	/// then a freshly generated anti-forgery `state`.
	///
	/// # Errors
	///
	/// Only URL- and scope-construction failures surface here; they indicate
	/// misconfiguration and are fatal to the request.
	pub fn begin_authorization(
		&self,
		options: &AuthorizationOptions,
		redirect_uri: Url,
	) -> Result<AuthorizationRedirect> {
		const KIND: PhaseKind = PhaseKind::Request;

		let span = PhaseSpan::new(KIND, "begin_authorization");

		obs::record_phase_outcome(KIND, PhaseOutcome::Attempt);

		let result = {
			let _guard = span.entered();

			self.build_redirect(options, redirect_uri)
		};

		match &result {
			Ok(_) => obs::record_phase_outcome(KIND, PhaseOutcome::Success),
			Err(_) => obs::record_phase_outcome(KIND, PhaseOutcome::Failure),
		}

		result
	}

	fn build_redirect(
		&self,
		options: &AuthorizationOptions,
		redirect_uri: Url,
	) -> Result<AuthorizationRedirect> {
		let scope = match options.scope.as_deref() {
			Some(raw) => ScopeSet::from_str(raw).map_err(ConfigError::from)?,
			None => self.config.default_scope.clone(),
		};
		let state = random_string(STATE_LEN);
		let params = merge_authorize_params(&self.config, options, &scope, &state);
		let client_id = self.config.effective_client_id(options);
		let authorize_url = build_authorize_url(
			&self.config.endpoints.authorization,
			client_id,
			&redirect_uri,
			&params,
		);

		Ok(AuthorizationRedirect { authorize_url, state, redirect_uri, scope })
	}
}

fn merge_authorize_params(
	config: &StrategyConfig,
	options: &AuthorizationOptions,
	scope: &ScopeSet,
	state: &str,
) -> BTreeMap<String, String> {
	let mut params = BTreeMap::new();

	if let Some(value) = scope.delimited(' ') {
		params.insert("scope".to_owned(), value);
	}

	for (key, request_value, configured) in [
		(
			"prompt",
			options.prompt.as_deref(),
			config.prompt.as_deref().filter(|value| !value.is_empty()),
		),
		(
			"access_type",
			options.access_type.as_deref(),
			config.access_type.as_deref().filter(|value| !value.is_empty()),
		),
	] {
		if let Some(value) = layered_option(request_value, configured) {
			params.insert(key.to_owned(), value.to_owned());
		}
	}

	if let Some(value) = options.response_mode.as_deref() {
		params.insert("response_mode".to_owned(), value.to_owned());
	}

	params.insert("state".to_owned(), state.to_owned());

	params
}

fn build_authorize_url(
	endpoint: &Url,
	client_id: &str,
	redirect_uri: &Url,
	params: &BTreeMap<String, String>,
) -> Url {
	let mut url = endpoint.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("response_type", "code");
	pairs.append_pair("client_id", client_id);
	pairs.append_pair("redirect_uri", redirect_uri.as_str());

	for (key, value) in params {
		pairs.append_pair(key, value);
	}

	drop(pairs);

	url
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}
