//! # Graph API
//!
//! Thin typed client over the handful of read-only Graph API calls the relay needs.
//!
//! ## Calls
//! - `/oauth/access_token`: trade a short-lived user token for a long-lived one
//! - `/me`: the user behind a token
//! - `/me/accounts`: pages the user manages, with page tokens and linked accounts
//! - `/{page_id}`: page follower/like counts, or the linked Instagram account
//! - `/{ig_user_id}`: Instagram follower/media counts
//!
//! Nothing is retried. Non-success statuses surface as [`GraphError::Api`] with the
//! upstream body attached so callers can forward it.
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

pub mod error;
pub mod models;

pub use error::GraphError;
use models::{
    Accounts, INSTAGRAM_FIELDS, InstagramInsights, LongLivedToken, PAGE_INSIGHT_FIELDS,
    PAGE_LINK_FIELDS, PAGE_LIST_FIELDS, Page, PageInsights, PageLink, USER_FIELDS, User,
};

pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com/v18.0";

/// App id and secret used for the token exchange.
#[derive(Clone)]
pub struct AppCredentials {
    pub id: String,
    pub secret: String,
}

#[derive(Clone)]
pub struct GraphClient {
    http: Client,
    base_url: String,
}

impl GraphClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GraphError> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, GraphError> {
        let url = format!("{}{path}", self.base_url);
        debug!("Graph GET {path}");

        let response = self.http.get(&url).query(params).send().await?;
        let status = response.status();

        if !status.is_success() {
            let bytes = response.bytes().await?;
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes)
                    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            };

            return Err(GraphError::from_response(status.as_u16(), body));
        }

        Ok(response.json().await?)
    }

    pub async fn exchange_token(
        &self,
        app: &AppCredentials,
        short_token: &str,
    ) -> Result<LongLivedToken, GraphError> {
        self.get(
            "/oauth/access_token",
            &[
                ("grant_type", "fb_exchange_token"),
                ("client_id", app.id.as_str()),
                ("client_secret", app.secret.as_str()),
                ("fb_exchange_token", short_token),
            ],
        )
        .await
    }

    pub async fn me(&self, access_token: &str) -> Result<User, GraphError> {
        self.get(
            "/me",
            &[("fields", USER_FIELDS), ("access_token", access_token)],
        )
        .await
    }

    pub async fn pages(&self, access_token: &str) -> Result<Vec<Page>, GraphError> {
        let accounts: Accounts = self
            .get(
                "/me/accounts",
                &[("fields", PAGE_LIST_FIELDS), ("access_token", access_token)],
            )
            .await?;

        Ok(accounts.data)
    }

    pub async fn page_insights(
        &self,
        page_id: &str,
        page_token: &str,
    ) -> Result<PageInsights, GraphError> {
        self.get(
            &format!("/{page_id}"),
            &[("fields", PAGE_INSIGHT_FIELDS), ("access_token", page_token)],
        )
        .await
    }

    /// Instagram business account linked to a page, if any.
    pub async fn linked_instagram(
        &self,
        page_id: &str,
        page_token: &str,
    ) -> Result<Option<String>, GraphError> {
        let link: PageLink = self
            .get(
                &format!("/{page_id}"),
                &[("fields", PAGE_LINK_FIELDS), ("access_token", page_token)],
            )
            .await?;

        Ok(link.instagram_business_account.map(|account| account.id))
    }

    pub async fn instagram_insights(
        &self,
        ig_user_id: &str,
        access_token: &str,
    ) -> Result<InstagramInsights, GraphError> {
        self.get(
            &format!("/{ig_user_id}"),
            &[("fields", INSTAGRAM_FIELDS), ("access_token", access_token)],
        )
        .await
    }
}
