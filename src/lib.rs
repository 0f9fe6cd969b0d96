//! Rust’s turnkey Sign In with Apple strategy - authorization redirects, callback exchanges, and
//! identity-token decoding in one crate built for pluggable auth stacks.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod apple;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod oauth;
pub mod obs;
pub mod result;
pub mod strategy;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::StrategyConfig,
		http::ReqwestHttpClient,
		identity::{DecodeFuture, IdentityClaims, IdentityTokenDecoder},
		oauth::ReqwestTransportErrorMapper,
		strategy::AppleStrategy,
	};

	/// Strategy type alias used by reqwest-backed integration tests.
	pub type ReqwestTestStrategy = AppleStrategy<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Identity decoder stub that returns the same claim set for every token.
	#[derive(Clone, Debug)]
	pub struct StaticClaimsDecoder(pub IdentityClaims);
	impl IdentityTokenDecoder for StaticClaimsDecoder {
		fn decode<'a>(&'a self, _raw: &'a str) -> DecodeFuture<'a> {
			let claims = self.0.clone();

			Box::pin(async move { Ok(claims) })
		}
	}

	/// Constructs an [`AppleStrategy`] backed by the insecure test transport and the provided
	/// identity decoder stub.
	pub fn build_reqwest_test_strategy(
		config: StrategyConfig,
		decoder: Arc<dyn IdentityTokenDecoder>,
	) -> ReqwestTestStrategy {
		AppleStrategy::with_http_client(
			config,
			decoder,
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
