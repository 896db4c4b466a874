use std::sync::Arc;

use anyhow::Result;
use graph::GraphClient;
use tokio::sync::watch;

use super::{config::Config, session::SessionStore};

pub struct State {
    pub config: Config,
    pub graph: GraphClient,
    pub sessions: SessionStore,
    /// Flips to `true` once the server starts shutting down; open streams end on it.
    pub shutdown: watch::Sender<bool>,
}

impl State {
    pub fn new(config: Config) -> Result<Arc<Self>> {
        let graph = GraphClient::new(&config.graph_url, config.graph_timeout)?;
        let (shutdown, _) = watch::channel(false);

        Ok(Arc::new(Self {
            config,
            graph,
            sessions: SessionStore::new(),
            shutdown,
        }))
    }
}

pub type SharedState = Arc<State>;
