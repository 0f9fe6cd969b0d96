#![cfg(feature = "reqwest")]

// std
use std::collections::HashMap;
// self
use siwa_strategy::{
	_preludet::*,
	config::{AuthorizationOptions, StrategyConfig},
	identity::IdentityClaims,
};

const CLIENT_ID: &str = "com.example.service-it";

fn build_strategy(config: StrategyConfig) -> ReqwestTestStrategy {
	let decoder = StaticClaimsDecoder(IdentityClaims::new("001234.abcd", Some("a@b.com")));

	build_reqwest_test_strategy(config, Arc::new(decoder))
}

fn redirect_uri() -> Url {
	Url::parse("https://app.example.com/callback").expect("Redirect URI should parse successfully.")
}

fn query_pairs(url: &Url) -> HashMap<String, String> {
	url.query_pairs().into_owned().collect()
}

#[test]
fn default_scope_applies_when_request_is_silent() {
	let config = StrategyConfig::builder(CLIENT_ID)
		.client_secret("secret-it")
		.build()
		.expect("Configuration should validate.");
	let strategy = build_strategy(config);
	let redirect = strategy
		.begin_authorization(&AuthorizationOptions::default(), redirect_uri())
		.expect("Authorization redirect should build successfully.");
	let pairs = query_pairs(&redirect.authorize_url);

	assert_eq!(pairs.get("scope").map(String::as_str), Some("email name"));
	assert_eq!(redirect.scope.normalized(), "email name");
	assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));
	assert_eq!(pairs.get("client_id").map(String::as_str), Some(CLIENT_ID));
	assert_eq!(pairs.get("redirect_uri").map(String::as_str), Some(redirect_uri().as_str()));
}

#[test]
fn request_scope_override_wins() {
	let config = StrategyConfig::builder(CLIENT_ID)
		.client_secret("secret-it")
		.build()
		.expect("Configuration should validate.");
	let strategy = build_strategy(config);
	let options = AuthorizationOptions::default().with_scope("email");
	let redirect = strategy
		.begin_authorization(&options, redirect_uri())
		.expect("Authorization redirect should build successfully.");
	let pairs = query_pairs(&redirect.authorize_url);

	assert_eq!(pairs.get("scope").map(String::as_str), Some("email"));
	assert_eq!(redirect.scope.normalized(), "email");
}

#[test]
fn request_supplied_parameters_override_configured_ones() {
	let config = StrategyConfig::builder(CLIENT_ID)
		.client_secret("secret-it")
		.prompt("consent")
		.access_type("offline")
		.build()
		.expect("Configuration should validate.");
	let strategy = build_strategy(config);
	let configured_only = strategy
		.begin_authorization(&AuthorizationOptions::default(), redirect_uri())
		.expect("Authorization redirect should build successfully.");
	let pairs = query_pairs(&configured_only.authorize_url);

	assert_eq!(pairs.get("prompt").map(String::as_str), Some("consent"));
	assert_eq!(pairs.get("access_type").map(String::as_str), Some("offline"));
	assert!(!pairs.contains_key("response_mode"));

	let options = AuthorizationOptions::default()
		.with_prompt("login")
		.with_access_type("online")
		.with_response_mode("form_post");
	let overridden = strategy
		.begin_authorization(&options, redirect_uri())
		.expect("Authorization redirect should build successfully.");
	let pairs = query_pairs(&overridden.authorize_url);

	assert_eq!(pairs.get("prompt").map(String::as_str), Some("login"));
	assert_eq!(pairs.get("access_type").map(String::as_str), Some("online"));
	assert_eq!(pairs.get("response_mode").map(String::as_str), Some("form_post"));
}

#[test]
fn state_binds_the_redirect_and_round_trips_validation() {
	let config = StrategyConfig::builder(CLIENT_ID)
		.client_secret("secret-it")
		.build()
		.expect("Configuration should validate.");
	let strategy = build_strategy(config);
	let redirect = strategy
		.begin_authorization(&AuthorizationOptions::default(), redirect_uri())
		.expect("Authorization redirect should build successfully.");
	let pairs = query_pairs(&redirect.authorize_url);

	assert_eq!(redirect.state.len(), 32);
	assert!(redirect.state.chars().all(char::is_alphanumeric));
	assert_eq!(pairs.get("state"), Some(&redirect.state));
	assert!(redirect.validate_state(&redirect.state).is_ok());
	assert!(redirect.validate_state("tampered").is_err());
}

#[test]
fn client_id_override_requires_the_paired_secret() {
	let config = StrategyConfig::builder(CLIENT_ID)
		.client_secret("secret-it")
		.build()
		.expect("Configuration should validate.");
	let strategy = build_strategy(config);
	let id_only = AuthorizationOptions::default().with_client_id("override-id");
	let redirect = strategy
		.begin_authorization(&id_only, redirect_uri())
		.expect("Authorization redirect should build successfully.");

	assert_eq!(
		query_pairs(&redirect.authorize_url).get("client_id").map(String::as_str),
		Some(CLIENT_ID),
		"A lone client_id override must fall back to the configured client."
	);

	let paired = AuthorizationOptions::default()
		.with_client_id("override-id")
		.with_client_secret("override-secret");
	let redirect = strategy
		.begin_authorization(&paired, redirect_uri())
		.expect("Authorization redirect should build successfully.");

	assert_eq!(
		query_pairs(&redirect.authorize_url).get("client_id").map(String::as_str),
		Some("override-id")
	);
}
