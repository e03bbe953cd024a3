use crate::config::StravaConfig;
use crate::types::{AccessToken, UserId};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

const SCOPE: &str = "activity:read";

#[derive(thiserror::Error, Debug)]
pub enum OAuthError {
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("token endpoint returned {0}")]
    Status(StatusCode),
    #[error("invalid token response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid OAuth URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Deserialize)]
struct Athlete {
    id: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    athlete: Athlete,
}

// The refresh grant does not repeat the athlete.
#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
}

/// Result of a successful authorization-code exchange.
#[derive(Debug, PartialEq)]
pub struct TokenGrant {
    pub user_id: UserId,
    pub access_token: AccessToken,
}

/// Authorization-code flow against the upstream OAuth endpoints.
pub struct OAuthClient {
    client: reqwest::Client,
    authorize_url: Url,
    token_url: Url,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl OAuthClient {
    pub fn new(strava: &StravaConfig) -> Result<Self, OAuthError> {
        Ok(OAuthClient {
            client: reqwest::Client::new(),
            authorize_url: strava.authorize_url()?,
            token_url: strava.token_url()?,
            client_id: strava.client_id.clone(),
            client_secret: strava.client_secret.clone(),
            redirect_uri: strava.redirect_uri.clone(),
        })
    }

    /// Where `/login` sends the browser.
    pub fn authorize_url(&self) -> Url {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPE);
        url
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, OAuthError> {
        let token: TokenResponse = self
            .post_token(&[("code", code), ("grant_type", "authorization_code")])
            .await?;

        Ok(TokenGrant {
            user_id: token.athlete.id.to_string(),
            access_token: AccessToken::new(token.access_token),
        })
    }

    /// Trades a long-lived refresh token for a fresh access token.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<AccessToken, OAuthError> {
        let token: RefreshResponse = self
            .post_token(&[
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        Ok(AccessToken::new(token.access_token))
    }

    async fn post_token<T: DeserializeOwned>(
        &self,
        grant: &[(&str, &str)],
    ) -> Result<T, OAuthError> {
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        let response = self
            .client
            .post(self.token_url.clone())
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OAuthError::Status(response.status()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
