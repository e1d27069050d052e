use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, TimeDelta, Utc};
use reqwest::{Client, Method, Url};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{
    CalendarEvent, Delivery, GraphEvent, NotificationError, StoredTokens, TokenGrant,
    TokenResponse,
};

pub const MICROSOFT_SCOPES: &str = "Calendars.ReadWrite User.Read offline_access";

/// Access tokens closer than this to expiry are refreshed before use.
const REFRESH_MARGIN_MINUTES: i64 = 5;
const DEFAULT_EXPIRES_IN_SECONDS: i64 = 3600;

/// Absolute expiry for a token lifetime reported by the token endpoint.
fn expiry_after(expires_in: Option<i64>) -> Result<DateTime<Utc>, NotificationError> {
    let seconds = expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECONDS);

    TimeDelta::try_seconds(seconds)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or(NotificationError::InvalidExpiry(seconds))
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Creates `event` in `user_id`'s calendar. A user without a connected calendar is `NotConnected`.
    async fn create_event(
        &self,
        user_id: Uuid,
        event: &CalendarEvent,
    ) -> Result<Delivery, NotificationError>;
}

/// Microsoft identity platform (authorization-code flow) and Graph calendar client.
/// Tokens live on the `users` row.
pub struct OutlookCalendarClient {
    client: Client,
    supabase: Arc<SupabaseClient>,
    client_id: String,
    client_secret: String,
    login_base_url: String,
    graph_base_url: String,
    redirect_uri: String,
}

impl OutlookCalendarClient {
    pub fn new(config: &AppConfig, supabase: Arc<SupabaseClient>) -> Self {
        Self {
            client: Client::new(),
            supabase,
            client_id: config.microsoft_client_id.clone(),
            client_secret: config.microsoft_client_secret.clone(),
            login_base_url: config.microsoft_login_base_url.trim_end_matches('/').to_string(),
            graph_base_url: config.graph_base_url.trim_end_matches('/').to_string(),
            redirect_uri: config.microsoft_redirect_uri(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    // ==============================================================================
    // AUTHORIZATION CODE FLOW
    // ==============================================================================

    pub fn authorize_url(&self, state: &str) -> Result<String, NotificationError> {
        let url = Url::parse_with_params(
            &format!("{}/authorize", self.login_base_url),
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", MICROSOFT_SCOPES),
                ("state", state),
                ("response_mode", "query"),
            ],
        )
        .map_err(|e| NotificationError::InvalidUrl(e.to_string()))?;

        Ok(url.to_string())
    }

    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, NotificationError> {
        if !self.is_configured() {
            return Err(NotificationError::NotConfigured);
        }

        let tokens = self
            .token_request(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .await?;

        match (tokens.access_token, tokens.refresh_token) {
            (Some(access_token), Some(refresh_token)) => Ok(TokenGrant {
                access_token,
                refresh_token,
                expires_at: expiry_after(tokens.expires_in)?,
            }),
            _ => Err(NotificationError::MissingTokens),
        }
    }

    #[instrument(skip(self, grant))]
    pub async fn store_grant(&self, user_id: Uuid, grant: &TokenGrant) -> Result<(), NotificationError> {
        self.update_user(
            user_id,
            json!({
                "microsoft_access_token": grant.access_token,
                "microsoft_refresh_token": grant.refresh_token,
                "microsoft_token_expires_at": grant.expires_at,
                "updated_at": Utc::now(),
            }),
        )
        .await?;

        info!("Outlook calendar connected for user {}", user_id);
        Ok(())
    }

    pub async fn is_connected(&self, user_id: Uuid) -> Result<bool, NotificationError> {
        Ok(self
            .stored_tokens(user_id)
            .await?
            .and_then(|t| t.microsoft_refresh_token)
            .is_some())
    }

    pub async fn disconnect(&self, user_id: Uuid) -> Result<(), NotificationError> {
        self.update_user(
            user_id,
            json!({
                "microsoft_access_token": null,
                "microsoft_refresh_token": null,
                "microsoft_token_expires_at": null,
                "updated_at": Utc::now(),
            }),
        )
        .await?;

        info!("Outlook calendar disconnected for user {}", user_id);
        Ok(())
    }

    // ==============================================================================
    // ACCESS TOKENS
    // ==============================================================================

    /// A usable access token for `user_id`, refreshing it first when close to expiry.
    /// `None` when no calendar is connected.
    pub async fn access_token_for(&self, user_id: Uuid) -> Result<Option<String>, NotificationError> {
        let Some(stored) = self.stored_tokens(user_id).await? else {
            return Ok(None);
        };
        let Some(refresh_token) = stored.microsoft_refresh_token else {
            return Ok(None);
        };

        let fresh_until = Utc::now() + Duration::minutes(REFRESH_MARGIN_MINUTES);
        if let (Some(token), Some(expires_at)) =
            (stored.microsoft_access_token, stored.microsoft_token_expires_at)
        {
            if expires_at > fresh_until {
                return Ok(Some(token));
            }
        }

        if !self.is_configured() {
            return Ok(None);
        }

        debug!("Refreshing Microsoft access token for user {}", user_id);
        let tokens = self
            .token_request(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        let access_token = tokens.access_token.ok_or(NotificationError::MissingTokens)?;
        let expires_at = expiry_after(tokens.expires_in)?;

        let mut update = json!({
            "microsoft_access_token": access_token,
            "microsoft_token_expires_at": expires_at,
            "updated_at": Utc::now(),
        });
        if let Some(rotated) = tokens.refresh_token {
            update["microsoft_refresh_token"] = Value::String(rotated);
        }
        self.update_user(user_id, update).await?;

        Ok(Some(access_token))
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, NotificationError> {
        let url = format!("{}/token", self.login_base_url);

        let response = self.client.post(&url).form(form).send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!("Microsoft token request failed: {} - {}", status, text);
            return Err(NotificationError::Provider {
                status: status.as_u16(),
                message: text,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    async fn stored_tokens(&self, user_id: Uuid) -> Result<Option<StoredTokens>, NotificationError> {
        let path = format!(
            "/rest/v1/users?id=eq.{}&select=microsoft_access_token,microsoft_refresh_token,microsoft_token_expires_at",
            user_id
        );

        let rows: Vec<StoredTokens> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| NotificationError::Storage(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    async fn update_user(&self, user_id: Uuid, body: Value) -> Result<(), NotificationError> {
        let path = format!("/rest/v1/users?id=eq.{}", user_id);

        self.supabase
            .execute(Method::PATCH, &path, Some(body))
            .await
            .map_err(|e| NotificationError::Storage(e.to_string()))
    }
}

#[async_trait]
impl CalendarProvider for OutlookCalendarClient {
    async fn create_event(
        &self,
        user_id: Uuid,
        event: &CalendarEvent,
    ) -> Result<Delivery, NotificationError> {
        let Some(token) = self.access_token_for(user_id).await? else {
            debug!("No calendar connected for user {}", user_id);
            return Ok(Delivery::NotConnected);
        };

        let mut payload = json!({
            "subject": event.subject,
            "start": {
                "dateTime": event.start.to_rfc3339_opts(SecondsFormat::Millis, true),
                "timeZone": "UTC",
            },
            "end": {
                "dateTime": event.end.to_rfc3339_opts(SecondsFormat::Millis, true),
                "timeZone": "UTC",
            },
        });
        if let Some(body) = &event.body {
            payload["body"] = json!({ "contentType": "text", "content": body });
        }

        let url = format!("{}/me/calendar/events", self.graph_base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!("Graph event creation failed: {} - {}", status, text);
            return Err(NotificationError::Provider {
                status: status.as_u16(),
                message: text,
            });
        }

        let created: GraphEvent = serde_json::from_str(&text)?;
        info!(
            "Calendar event {} created for user {}",
            created.id.as_deref().unwrap_or("<unknown>"),
            user_id
        );
        Ok(Delivery::Sent)
    }
}
