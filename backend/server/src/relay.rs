//! # Relay
//!
//! Pushes follower counts to the browser over Server-Sent Events.
//!
//! ## Flow
//! - Resolve a target: the session's selected page first, then token mode
//! - No target: one `error` event, then the stream ends
//! - Otherwise spawn one polling task per connection; the first poll fires immediately
//! - Each tick queries the page and the linked Instagram account concurrently and
//!   merges both into one `message` event
//! - A failed branch is reported inline as `{"error": ...}`; the other branch still ships
//! - The task stops once the client goes away and the channel closes, or on shutdown
//!
//! ## Payload
//! ```json
//! {
//!   "ts": "2025-01-01T00:00:00.000Z",
//!   "facebook": { "page_id": "1", "page_name": "Cafe", "followers": 1000, "likes": 900 },
//!   "instagram": { "ig_user_id": "2", "username": "cafe", "followers": 250, "posts": 42 },
//!   "total_followers": 1250
//! }
//! ```
use std::{convert::Infallible, time::Duration};

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use chrono::{SecondsFormat, Utc};
use graph::{
    GraphClient, GraphError,
    models::{InstagramInsights, PageInsights},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{
    sync::{
        mpsc::{Sender, channel},
        watch,
    },
    time::{MissedTickBehavior, interval},
};
use tokio_stream::{once, wrappers::ReceiverStream};
use tracing::{debug, info};

use crate::{
    config::{KEEP_ALIVE_INTERVAL, TokenMode, clamp_interval},
    session::Session,
    state::SharedState,
};

pub const NO_TARGET: &str = "Not authenticated and no token mode configured";
pub const NO_INSTAGRAM: &str = "No IG linked";

/// Identifiers and credentials one stream polls with.
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub page_id: String,
    pub page_access_token: String,
    pub ig_user_id: Option<String>,
    pub ig_access_token: String,
}

impl Target {
    pub fn resolve(session: Option<&Session>, token_mode: Option<&TokenMode>) -> Option<Self> {
        if let Some(session) = session.filter(|session| session.is_resolvable()) {
            return Some(Self {
                page_id: session.page.page_id.clone(),
                page_access_token: session.page.page_access_token.clone(),
                ig_user_id: session.page.ig_user_id.clone(),
                ig_access_token: session.page.page_access_token.clone(),
            });
        }

        token_mode.map(|mode| Self {
            page_id: mode.page_id.clone(),
            page_access_token: mode.page_access_token.clone(),
            ig_user_id: mode.ig_user_id.clone(),
            ig_access_token: mode.ig_access_token.clone(),
        })
    }
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum FacebookStats {
    Stats {
        page_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        page_name: Option<String>,
        followers: Option<u64>,
        likes: Option<u64>,
    },
    Failed {
        error: String,
    },
}

impl FacebookStats {
    pub fn from_result(page_id: &str, result: Result<PageInsights, GraphError>) -> Self {
        match result {
            Ok(insights) => FacebookStats::Stats {
                page_id: page_id.to_string(),
                page_name: insights.name,
                followers: insights.followers_count,
                likes: insights.fan_count,
            },
            Err(e) => FacebookStats::Failed {
                error: error_message(e, "FB error"),
            },
        }
    }

    fn followers(&self) -> Option<u64> {
        match self {
            FacebookStats::Stats { followers, .. } => *followers,
            FacebookStats::Failed { .. } => None,
        }
    }
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum InstagramStats {
    Stats {
        ig_user_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        followers: Option<u64>,
        posts: Option<u64>,
    },
    Unlinked {
        info: &'static str,
    },
    Failed {
        error: String,
    },
}

impl InstagramStats {
    pub fn from_result(
        ig_user_id: Option<&str>,
        result: Option<Result<InstagramInsights, GraphError>>,
    ) -> Self {
        match (ig_user_id, result) {
            (Some(id), Some(Ok(insights))) => InstagramStats::Stats {
                ig_user_id: id.to_string(),
                username: insights.username,
                followers: insights.followers_count,
                posts: insights.media_count,
            },
            (_, Some(Err(e))) => InstagramStats::Failed {
                error: error_message(e, "IG error"),
            },
            _ => InstagramStats::Unlinked { info: NO_INSTAGRAM },
        }
    }

    fn followers(&self) -> Option<u64> {
        match self {
            InstagramStats::Stats { followers, .. } => *followers,
            _ => None,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct Payload {
    pub ts: String,
    pub facebook: FacebookStats,
    pub instagram: InstagramStats,
    pub total_followers: u64,
}

impl Payload {
    pub fn new(facebook: FacebookStats, instagram: InstagramStats) -> Self {
        let total_followers =
            facebook.followers().unwrap_or(0) + instagram.followers().unwrap_or(0);

        Self {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            facebook,
            instagram,
            total_followers,
        }
    }
}

fn error_message(error: GraphError, fallback: &str) -> String {
    let message = error.to_string();

    if message.is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

/// One polling round: both upstream reads run concurrently.
pub async fn poll(graph: &GraphClient, target: &Target) -> Payload {
    let facebook = graph.page_insights(&target.page_id, &target.page_access_token);
    let instagram = async {
        match &target.ig_user_id {
            Some(id) => Some(graph.instagram_insights(id, &target.ig_access_token).await),
            None => None,
        }
    };

    let (facebook, instagram) = tokio::join!(facebook, instagram);

    Payload::new(
        FacebookStats::from_result(&target.page_id, facebook),
        InstagramStats::from_result(target.ig_user_id.as_deref(), instagram),
    )
}

#[derive(Deserialize)]
pub struct StreamParams {
    interval: Option<String>,
}

/// Requested interval in milliseconds, falling back to `default`, always clamped.
/// Only the leading integer counts, so `5000ms` reads as 5000.
pub fn interval_from_query(raw: Option<&str>, default: Duration) -> Duration {
    let requested = raw.and_then(leading_integer).filter(|ms| *ms != 0);

    match requested {
        Some(ms) => clamp_interval(Duration::from_millis(ms.max(0).unsigned_abs())),
        None => clamp_interval(default),
    }
}

fn leading_integer(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let (negative, rest) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };

    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let number = rest[..end].parse::<i64>().ok()?;

    Some(if negative { -number } else { number })
}

fn message_event(payload: &Payload) -> Event {
    Event::default()
        .event("message")
        .json_data(payload)
        .unwrap_or_else(|e| error_event(&e.to_string()))
}

fn error_event(message: &str) -> Event {
    Event::default()
        .event("error")
        .data(json!({ "error": message }).to_string())
}

pub async fn stream_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(params): Query<StreamParams>,
) -> Response {
    let period = interval_from_query(params.interval.as_deref(), state.config.poll_interval);
    let session = state.sessions.lookup(&headers).await;

    let Some(target) = Target::resolve(session.as_ref(), state.config.token_mode.as_ref()) else {
        info!("Rejected stream: {NO_TARGET}");
        return Sse::new(once(Ok::<_, Infallible>(error_event(NO_TARGET)))).into_response();
    };

    let (tx, rx) = channel(1);
    let shutdown = state.shutdown.subscribe();
    tokio::spawn(relay(state.graph.clone(), target, period, tx, shutdown));

    Sse::new(ReceiverStream::new(rx))
        .keep_alive(
            KeepAlive::new()
                .interval(KEEP_ALIVE_INTERVAL)
                .text("ping"),
        )
        .into_response()
}

async fn relay(
    graph: GraphClient,
    target: Target,
    period: Duration,
    tx: Sender<Result<Event, Infallible>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Stream opened for page {} every {}ms",
        target.page_id,
        period.as_millis()
    );

    // A dropped shutdown sender is not a shutdown; that branch just goes idle.
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tx.closed() => break,
            Ok(()) = shutdown.changed() => break,
        }

        let payload = poll(&graph, &target).await;
        debug!("Polled page {}: {} followers", target.page_id, payload.total_followers);

        // A client that stops reading must not hold the task past shutdown.
        tokio::select! {
            sent = tx.send(Ok(message_event(&payload))) => {
                if sent.is_err() {
                    break;
                }
            }
            Ok(()) = shutdown.changed() => break,
        }
    }

    info!("Stream closed for page {}", target.page_id);
}
