#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use siwa_strategy::{
	_preludet::*,
	config::{AuthorizationOptions, ProviderEndpoints, StrategyConfig},
	identity::IdentityClaims,
	result::StrategyFailure,
	strategy::CallbackParams,
};

const CLIENT_ID: &str = "com.example.service-it";
const CLIENT_SECRET: &str = "secret-it";

fn build_endpoints(server: &MockServer) -> ProviderEndpoints {
	ProviderEndpoints {
		authorization: Url::parse(&server.url("/authorize"))
			.expect("Mock authorization endpoint should parse successfully."),
		token: Url::parse(&server.url("/token"))
			.expect("Mock token endpoint should parse successfully."),
		jwks: Url::parse(&server.url("/keys"))
			.expect("Mock JWKS endpoint should parse successfully."),
	}
}

fn build_config(server: &MockServer) -> StrategyConfig {
	StrategyConfig::builder(CLIENT_ID)
		.client_secret(CLIENT_SECRET)
		.endpoints(build_endpoints(server))
		.build()
		.expect("Strategy configuration should build successfully.")
}

fn build_strategy(config: StrategyConfig) -> ReqwestTestStrategy {
	let decoder = StaticClaimsDecoder(IdentityClaims::new("U1", Some("a@b.com")));

	build_reqwest_test_strategy(config, Arc::new(decoder))
}

fn redirect_uri() -> Url {
	Url::parse("https://app.example.com/callback").expect("Redirect URI should parse successfully.")
}

#[tokio::test]
async fn successful_exchange_yields_normalized_auth_result() {
	let server = MockServer::start_async().await;
	let config = build_config(&server);
	let strategy = build_strategy(config.clone());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("content-type", "application/x-www-form-urlencoded");
			then
				.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"access-success\",\"refresh_token\":\"refresh-success\",\"token_type\":\"bearer\",\"expires_in\":3600,\"id_token\":\"stub-identity-token\",\"scope\":\"name email\"}",
				);
		})
		.await;
	let params = CallbackParams { code: Some("valid-code".into()), ..Default::default() };
	let session = strategy
		.handle_callback(&params, &AuthorizationOptions::default(), redirect_uri())
		.await
		.expect("Callback handling should succeed.");

	mock.assert_async().await;

	assert!(session.succeeded());
	assert!(session.failures().is_empty());
	assert_eq!(session.uid(&config).as_deref(), Some("U1"));

	let credentials =
		session.credentials(&config).expect("Credentials should be extractable.");

	assert_eq!(credentials.token.expose(), "access-success");
	assert_eq!(
		credentials.refresh_token.as_ref().map(|secret| secret.expose()),
		Some("refresh-success")
	);
	assert!(credentials.expires);
	assert!(credentials.expires_at.is_some());
	assert_eq!(credentials.scopes, vec!["name".to_owned(), "email".to_owned()]);
	assert_eq!(credentials.token_type, "bearer");

	let info = session.info().expect("Info should be extractable.");

	assert_eq!(info.email.as_deref(), Some("a@b.com"));
	assert_eq!(info.first_name, None, "Repeat logins omit the user fragment, so no name.");
	assert_eq!(info.last_name, None);

	let extra = session.extra().expect("Extra should be extractable.");

	assert_eq!(extra.raw_info.token.access_token.expose(), "access-success");
	assert_eq!(extra.raw_info.token.id_token.as_deref(), Some("stub-identity-token"));
	assert_eq!(extra.raw_info.user.field_str("uid").as_deref(), Some("U1"));

	let auth_result =
		session.auth_result(&config).expect("The full auth result should assemble.");

	assert_eq!(auth_result.uid, "U1");
}

#[tokio::test]
async fn first_consent_user_fragment_supplies_names() {
	let server = MockServer::start_async().await;
	let config = build_config(&server);
	let strategy = build_strategy(config.clone());
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then
				.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"access-success\",\"token_type\":\"bearer\",\"expires_in\":3600,\"id_token\":\"stub-identity-token\"}",
				);
		})
		.await;
	let params = CallbackParams {
		code: Some("valid-code".into()),
		user: Some(
			"{\"name\":{\"firstName\":\"Ada\",\"lastName\":\"Lovelace\"},\"email\":\"spoofed@example.com\"}"
				.into(),
		),
		..Default::default()
	};
	let session = strategy
		.handle_callback(&params, &AuthorizationOptions::default(), redirect_uri())
		.await
		.expect("Callback handling should succeed.");
	let info = session.info().expect("Info should be extractable.");

	assert_eq!(info.first_name.as_deref(), Some("Ada"));
	assert_eq!(info.last_name.as_deref(), Some("Lovelace"));
	assert_eq!(
		info.email.as_deref(),
		Some("a@b.com"),
		"The identity token's email is authoritative over the inline fragment."
	);
}

#[tokio::test]
async fn exchange_rejection_records_the_provider_error_code() {
	let server = MockServer::start_async().await;
	let config = build_config(&server);
	let strategy = build_strategy(config);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\",\"error_description\":\"already used\"}");
		})
		.await;
	let params = CallbackParams { code: Some("stale-code".into()), ..Default::default() };
	let session = strategy
		.handle_callback(&params, &AuthorizationOptions::default(), redirect_uri())
		.await
		.expect("Exchange rejections should be recorded, not fatal.");

	mock.assert_async().await;

	assert!(!session.succeeded());
	assert_eq!(
		session.failures(),
		&[StrategyFailure::new("invalid_grant", Some("already used".into()))]
	);
	assert!(session.token().is_none(), "No partial state may be stored on rejected exchanges.");
	assert!(session.profile().is_none());
}

#[tokio::test]
async fn missing_id_token_records_identity_decode_failure() {
	let server = MockServer::start_async().await;
	let config = build_config(&server);
	let strategy = build_strategy(config);
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then
				.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"access-success\",\"token_type\":\"bearer\",\"expires_in\":3600}");
		})
		.await;
	let params = CallbackParams { code: Some("valid-code".into()), ..Default::default() };
	let session = strategy
		.handle_callback(&params, &AuthorizationOptions::default(), redirect_uri())
		.await
		.expect("Identity decode failures should be recorded, not fatal.");

	assert!(!session.succeeded());
	assert_eq!(session.failures().len(), 1);
	assert_eq!(session.failures()[0].code, StrategyFailure::IDENTITY_DECODE_FAILED);
}

#[tokio::test]
async fn configured_uid_field_drives_uid_extraction() {
	let server = MockServer::start_async().await;
	let config = StrategyConfig::builder(CLIENT_ID)
		.client_secret(CLIENT_SECRET)
		.endpoints(build_endpoints(&server))
		.uid_field("email")
		.build()
		.expect("Strategy configuration should build successfully.");
	let strategy = build_strategy(config.clone());
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then
				.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"access-success\",\"token_type\":\"bearer\",\"expires_in\":3600,\"id_token\":\"stub-identity-token\"}",
				);
		})
		.await;
	let params = CallbackParams { code: Some("valid-code".into()), ..Default::default() };
	let session = strategy
		.handle_callback(&params, &AuthorizationOptions::default(), redirect_uri())
		.await
		.expect("Callback handling should succeed.");

	assert_eq!(session.uid(&config).as_deref(), Some("a@b.com"));
}

#[tokio::test]
async fn cleanup_leaves_nothing_observable() {
	let server = MockServer::start_async().await;
	let config = build_config(&server);
	let strategy = build_strategy(config.clone());
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then
				.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"access-success\",\"token_type\":\"bearer\",\"expires_in\":3600,\"id_token\":\"stub-identity-token\"}",
				);
		})
		.await;
	let params = CallbackParams { code: Some("valid-code".into()), ..Default::default() };
	let mut session = strategy
		.handle_callback(&params, &AuthorizationOptions::default(), redirect_uri())
		.await
		.expect("Callback handling should succeed.");

	assert!(session.succeeded());

	session.clear();

	assert!(session.uid(&config).is_none());
	assert!(session.credentials(&config).is_none());
	assert!(session.info().is_none());
	assert!(session.extra().is_none());
	assert!(session.auth_result(&config).is_none());

	session.clear();

	assert!(session.uid(&config).is_none(), "Cleanup must stay idempotent.");
}
