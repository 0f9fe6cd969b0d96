//! Strategy facade orchestrating the two-phase Sign In with Apple handshake.

pub mod callback;
pub mod request;

pub use callback::*;
pub use request::*;

// self
use crate::{
	_prelude::*, config::StrategyConfig, http::TokenHttpClient, identity::IdentityTokenDecoder,
	oauth::TransportErrorMapper,
};
#[cfg(feature = "reqwest")]
use crate::{
	http::ReqwestHttpClient,
	identity::JwksDecoder,
	oauth::ReqwestTransportErrorMapper,
};

#[cfg(feature = "reqwest")]
/// Strategy specialized for the crate's default reqwest transport stack.
pub type ReqwestAppleStrategy = AppleStrategy<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Coordinates the Sign In with Apple handshake for a host framework.
///
/// The strategy owns the HTTP client, transport error mapper, immutable
/// configuration, and identity decoder so the phase implementations can focus
/// on parameter merging and result normalization. Each inbound request runs a
/// phase to completion on its own task; nothing here is mutated after
/// construction, so a single strategy value serves concurrent requests without
/// locking.
#[derive(Clone)]
pub struct AppleStrategy<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for the token exchange.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them.
	pub transport_mapper: Arc<M>,
	/// Immutable strategy configuration established at process start.
	pub config: StrategyConfig,
	/// Decoder applied to the identity token returned by the exchange.
	pub identity_decoder: Arc<dyn IdentityTokenDecoder>,
}
impl<C, M> AppleStrategy<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a strategy that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: StrategyConfig,
		identity_decoder: Arc<dyn IdentityTokenDecoder>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			config,
			identity_decoder,
		}
	}
}
#[cfg(feature = "reqwest")]
impl ReqwestAppleStrategy {
	/// Creates a new strategy for the provided configuration.
	///
	/// The strategy provisions its own reqwest-backed transport and a
	/// JWKS-backed identity decoder pointed at the configured key endpoint, so
	/// callers do not need to pass HTTP handles explicitly.
	pub fn new(config: StrategyConfig) -> Self {
		let decoder = JwksDecoder::new(&config.client_id, config.endpoints.jwks.clone());

		Self::with_http_client(
			config,
			Arc::new(decoder),
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Debug for AppleStrategy<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppleStrategy")
			.field("client_id", &self.config.client_id)
			.field("authorization_endpoint", &self.config.endpoints.authorization.as_str())
			.field("token_endpoint", &self.config.endpoints.token.as_str())
			.finish()
	}
}
