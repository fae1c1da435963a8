//! Cognito hosted UI login and access-token verification.

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::models::{ServiceError, ServiceResult};
use crate::web::Response;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Token endpoint answer for an authorization code exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwt {
    pub access_token: String,
    pub expires_in: i64,
}

/// Claims checked on every access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub username: Option<String>,
}

/// Verifies a bearer token and returns its claims
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> ServiceResult<AccessTokenClaims>;
}

/// Verifies RS256 tokens against a user pool's JSON Web Key Set
pub struct JwksTokenVerifier {
    http_client: reqwest::Client,
    jwks_url: String,
    issuer: String,
    cache_ttl: Duration,
    cache: RwLock<Option<(JwkSet, Instant)>>,
}

impl JwksTokenVerifier {
    /// Verifier for the Cognito user pool `user_pool_id` in `region`
    pub fn for_user_pool(
        http_client: reqwest::Client,
        region: &str,
        user_pool_id: &str,
        cache_ttl: Duration,
    ) -> Self {
        let issuer = format!("https://cognito-idp.{}.amazonaws.com/{}", region, user_pool_id);
        let jwks_url = format!("{}/.well-known/jwks.json", issuer);
        Self::new(http_client, jwks_url, issuer, cache_ttl)
    }

    pub fn new(http_client: reqwest::Client, jwks_url: String, issuer: String, cache_ttl: Duration) -> Self {
        Self {
            http_client,
            jwks_url,
            issuer,
            cache_ttl,
            cache: RwLock::new(None),
        }
    }

    async fn key_set(&self) -> ServiceResult<JwkSet> {
        {
            let cache = self.cache.read().await;
            if let Some((key_set, fetched_at)) = cache.as_ref() {
                if fetched_at.elapsed() < self.cache_ttl {
                    return Ok(key_set.clone());
                }
                debug!("JWKS cache expired");
            }
        }

        debug!("Fetching JWKS from {}", self.jwks_url);
        let key_set: JwkSet = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| ServiceError::external("cognito-jwks", e))?
            .json()
            .await
            .map_err(|e| ServiceError::external("cognito-jwks", e))?;

        let mut cache = self.cache.write().await;
        *cache = Some((key_set.clone(), Instant::now()));
        Ok(key_set)
    }
}

#[async_trait]
impl TokenVerifier for JwksTokenVerifier {
    async fn verify(&self, token: &str) -> ServiceResult<AccessTokenClaims> {
        let header = decode_header(token).map_err(|e| ServiceError::external("jwt", e))?;
        let key_set = self.key_set().await?;

        let jwk = match header.kid.as_deref() {
            Some(kid) => key_set.find(kid),
            None => key_set.keys.first(),
        }
        .ok_or_else(|| ServiceError::external("jwt", "no matching signing key"))?;

        let key = DecodingKey::from_jwk(jwk).map_err(|e| ServiceError::external("jwt", e))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["sub", "iat", "exp", "iss"]);
        // Cognito access tokens carry client_id instead of aud
        validation.validate_aud = false;

        let data = decode::<AccessTokenClaims>(token, &key, &validation)
            .map_err(|e| ServiceError::external("jwt", e))?;
        Ok(data.claims)
    }
}

/// Login state checks used by the API entrypoint and the login route
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Whether the request cookies carry a valid access token
    async fn is_authenticated(&self, cookies: &[String]) -> bool;

    /// Exchange an authorization code; `None` when the token endpoint refuses it
    async fn authenticate(&self, code: &str) -> ServiceResult<Option<Jwt>>;

    /// Redirect to the hosted UI login page
    fn login_redirect_response(&self) -> Response;
}

#[derive(Debug, Clone)]
pub struct CognitoSettings {
    /// Origin of the hosted UI, e.g. `https://auth.example.com`
    pub hosted_ui_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Public domain of the site
    pub domain_name: String,
}

pub struct CognitoService {
    settings: CognitoSettings,
    http_client: reqwest::Client,
    verifier: Arc<dyn TokenVerifier>,
}

impl CognitoService {
    pub fn new(
        settings: CognitoSettings,
        http_client: reqwest::Client,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            settings,
            http_client,
            verifier,
        }
    }

    fn redirect_uri(&self) -> String {
        format!("https://{}/login", self.settings.domain_name)
    }

    pub fn login_url(&self) -> String {
        format!(
            "{}/login?client_id={}&redirect_uri={}&response_type=code&scope=openid",
            self.settings.hosted_ui_url,
            self.settings.client_id,
            urlencoding::encode(&self.redirect_uri())
        )
    }

    fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.settings.hosted_ui_url)
    }
}

/// Finds the access token among `name=value` cookie strings
pub fn access_token_cookie(cookies: &[String]) -> Option<String> {
    cookies
        .iter()
        .flat_map(|cookie| cookie.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| name.trim() == ACCESS_TOKEN_COOKIE)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
}

#[async_trait]
impl Authenticator for CognitoService {
    async fn is_authenticated(&self, cookies: &[String]) -> bool {
        let Some(access_token) = access_token_cookie(cookies) else {
            return false;
        };
        if access_token.trim().is_empty() {
            return false;
        }

        match self.verifier.verify(&access_token).await {
            Ok(claims) => {
                debug!(sub = %claims.sub, "Access token verified");
                true
            }
            Err(e) => {
                error!("Access token rejected: {}", e);
                false
            }
        }
    }

    #[instrument(skip(self, code))]
    async fn authenticate(&self, code: &str) -> ServiceResult<Option<Jwt>> {
        let redirect_uri = self.redirect_uri();
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
        ];

        let response = self
            .http_client
            .post(self.token_url())
            .basic_auth(&self.settings.client_id, Some(&self.settings.client_secret))
            .form(&params)
            .send()
            .await
            .map_err(|e| ServiceError::external("cognito", e))?;

        if response.status() != reqwest::StatusCode::OK {
            warn!(status = %response.status(), "Authorization code exchange refused");
            return Ok(None);
        }

        let jwt = response
            .json::<Jwt>()
            .await
            .map_err(|e| ServiceError::external("cognito", e))?;
        info!("Authorization code exchanged");
        Ok(Some(jwt))
    }

    fn login_redirect_response(&self) -> Response {
        Response {
            status_code: 302,
            path: self.login_url(),
            body: None,
            cookies: Vec::new(),
        }
    }
}
