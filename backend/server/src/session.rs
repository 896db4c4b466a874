//! # Sessions
//!
//! In-memory only. A session lives from a successful token exchange until logout or
//! process restart. The browser holds nothing but a random id in an `HttpOnly` cookie.
use std::{collections::HashMap, sync::Arc};

use axum::http::{HeaderMap, HeaderValue, header::COOKIE};
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "pulse.sid";

#[derive(Clone)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub long_user_token: String,
}

#[derive(Clone)]
pub struct PageSelection {
    pub page_id: String,
    pub page_name: String,
    pub page_access_token: String,
    pub ig_user_id: Option<String>,
}

#[derive(Clone)]
pub struct Session {
    pub user: SessionUser,
    pub page: PageSelection,
}

impl Session {
    pub fn is_resolvable(&self) -> bool {
        !self.page.page_id.is_empty() && !self.page.page_access_token.is_empty()
    }
}

#[derive(Clone, Default)]
pub struct SessionStore(Arc<RwLock<HashMap<String, Session>>>);

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the session under a fresh id and returns it.
    pub async fn insert(&self, session: Session) -> String {
        let id = Uuid::new_v4().to_string();
        self.0.write().await.insert(id.clone(), session);

        id
    }

    pub async fn get(&self, id: &str) -> Option<Session> {
        self.0.read().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> Option<Session> {
        self.0.write().await.remove(id)
    }

    pub async fn lookup(&self, headers: &HeaderMap) -> Option<Session> {
        let id = session_id(headers)?;
        self.get(&id).await
    }
}

/// Session id from the `Cookie` header, if present.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(id: &str) -> HeaderValue {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax"
    ))
    .unwrap_or_else(|_| expired_cookie())
}

pub fn expired_cookie() -> HeaderValue {
    HeaderValue::from_static("pulse.sid=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, header::COOKIE};

    use super::{PageSelection, Session, SessionStore, SessionUser, session_cookie, session_id};

    fn session() -> Session {
        Session {
            user: SessionUser {
                id: "u1".to_string(),
                name: "Ada".to_string(),
                long_user_token: "long".to_string(),
            },
            page: PageSelection {
                page_id: "p1".to_string(),
                page_name: "Bakery".to_string(),
                page_access_token: "pt".to_string(),
                ig_user_id: None,
            },
        }
    }

    #[test]
    fn test_session_id_from_cookie_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_id(&headers), None);

        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; pulse.sid=abc-123; other=1"),
        );
        assert_eq!(session_id(&headers).as_deref(), Some("abc-123"));

        headers.insert(COOKIE, HeaderValue::from_static("pulse.sid="));
        assert_eq!(session_id(&headers), None);
    }

    #[test]
    fn test_cookie_round_trip() {
        let mut headers = HeaderMap::new();
        let set_cookie = session_cookie("xyz");
        let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
        headers.insert(COOKIE, HeaderValue::from_str(pair).unwrap());

        assert_eq!(session_id(&headers).as_deref(), Some("xyz"));
    }

    #[tokio::test]
    async fn test_store_lifecycle() {
        let store = SessionStore::new();

        let id = store.insert(session()).await;
        assert!(store.get(&id).await.unwrap().is_resolvable());

        let other = store.insert(session()).await;
        assert_ne!(other, id);

        assert!(store.remove(&id).await.is_some());
        assert!(store.get(&id).await.is_none());
        assert!(store.remove(&id).await.is_none());
    }
}
