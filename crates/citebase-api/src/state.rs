//! Application state wiring configuration, clock, and the chat service.
//!
//! `ChatService` is generic over its response generator; `AppState` pins it
//! to the canned responder used by the demo.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;

use citebase_core::chat::service::ChatService;
use citebase_core::clock::{Clock, SystemClock};
use citebase_core::responder::CannedResponder;
use citebase_infra::config::load_config;
use citebase_infra::filesystem::resolve_data_dir;
use citebase_types::config::CitebaseConfig;

pub type ConcreteChatService = ChatService<CannedResponder>;

/// Shared application state.
///
/// The service sits behind one async mutex: the REPL and the rate window
/// ticker are its only writers and take turns.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<Mutex<ConcreteChatService>>,
    pub clock: Arc<dyn Clock>,
    pub config: CitebaseConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load configuration and build the service.
    ///
    /// `model` overrides the configured default model.
    pub async fn init(model: Option<&str>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_config(&data_dir).await;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let mut service = ChatService::new(config.clone(), CannedResponder::new(), clock.now())
            .context("configured default model is not in the catalog")?;
        if let Some(name) = model {
            service.switch_model(name)?;
        }

        Ok(Self {
            service: Arc::new(Mutex::new(service)),
            clock,
            config,
            data_dir,
        })
    }
}
