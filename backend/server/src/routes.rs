use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header::SET_COOKIE},
    response::IntoResponse,
};
use graph::models::Page;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    error::AppError,
    session::{
        PageSelection, Session, SessionUser, expired_cookie, session_cookie, session_id,
    },
    state::SharedState,
};

#[derive(Deserialize)]
pub struct Token {
    token: Option<String>,
}

#[derive(Serialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub authenticated: bool,
    pub token_mode: bool,
    pub user: Option<Identity>,
    pub page: Option<Identity>,
}

pub async fn status_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let session = state
        .sessions
        .lookup(&headers)
        .await
        .filter(Session::is_resolvable);

    let (user, page) = match session {
        Some(session) => (
            Some(Identity {
                id: session.user.id,
                name: session.user.name,
            }),
            Some(Identity {
                id: session.page.page_id,
                name: session.page.page_name,
            }),
        ),
        None => (None, None),
    };

    Json(Status {
        authenticated: page.is_some(),
        token_mode: state.config.token_mode.is_some(),
        user,
        page,
    })
}

pub async fn auth_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let app = state
        .config
        .app
        .as_ref()
        .ok_or(AppError::MissingAppCredentials)?;
    let short_token = parse_token(&body)?;

    let long_lived = state.graph.exchange_token(app, &short_token).await?;
    let long_user_token = long_lived.access_token;

    let me = state.graph.me(&long_user_token).await?;

    let pages = state.graph.pages(&long_user_token).await?;
    let selected = select_page(&pages).ok_or(AppError::NoPages)?;

    let page_access_token = selected
        .access_token
        .clone()
        .filter(|token| !token.is_empty())
        .ok_or(AppError::MissingPageToken)?;

    let ig_user_id = match selected.linked_account_id() {
        Some(id) => Some(id.to_string()),
        None => {
            state
                .graph
                .linked_instagram(&selected.id, &page_access_token)
                .await?
        }
    };

    let session = Session {
        user: SessionUser {
            id: me.id,
            name: me.name,
            long_user_token,
        },
        page: PageSelection {
            page_id: selected.id.clone(),
            page_name: selected.name.clone(),
            page_access_token,
            ig_user_id,
        },
    };

    let body = json!({
        "success": true,
        "user": { "id": session.user.id, "name": session.user.name },
        "page": {
            "pageId": session.page.page_id,
            "pageName": session.page.page_name,
            "igUserId": session.page.ig_user_id,
        },
    });

    info!(
        "Session created for user {} on page {}",
        session.user.id, session.page.page_id
    );

    if let Some(previous) = session_id(&headers) {
        state.sessions.remove(&previous).await;
    }
    let id = state.sessions.insert(session).await;

    Ok(([(SET_COOKIE, session_cookie(&id))], Json(body)))
}

pub async fn logout_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(id) = session_id(&headers) {
        if state.sessions.remove(&id).await.is_some() {
            info!("Session logged out");
        }
    }

    (
        [(SET_COOKIE, expired_cookie())],
        Json(json!({ "success": true })),
    )
}

fn parse_token(body: &[u8]) -> Result<String, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::MissingToken);
    }

    let payload: Token = serde_json::from_slice(body).map_err(|e| {
        warn!("Rejected auth payload: {e}");
        AppError::MalformedPayload
    })?;

    payload
        .token
        .filter(|token| !token.is_empty())
        .ok_or(AppError::MissingToken)
}

/// First page with a linked Instagram account, else the first page.
pub fn select_page(pages: &[Page]) -> Option<&Page> {
    pages
        .iter()
        .find(|page| page.instagram_business_account.is_some())
        .or_else(|| pages.first())
}
