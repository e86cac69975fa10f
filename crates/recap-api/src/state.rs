//! Application state.

use std::sync::Arc;

use tracing::{info, warn};

use recap_ai::{AiConfig, GeminiClient, OpenAiClient};
use recap_cache::{CacheConfig, CacheGateway};
use recap_pipeline::{AggregationPipeline, Collaborators, JobCoordinator, PipelineConfig};
use recap_queue::UsageLedger;
use recap_render::{RenderConfig, ShotstackClient, VideoComposer};
use recap_source::HttpContentSource;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub coordinator: Arc<JobCoordinator>,
    pub cache: CacheGateway,
}

impl AppState {
    pub fn new(config: ApiConfig, coordinator: Arc<JobCoordinator>, cache: CacheGateway) -> Self {
        Self {
            config,
            coordinator,
            cache,
        }
    }

    /// Build the ledger, collaborators and pipeline from the environment.
    pub fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let cache = CacheGateway::from_config(&CacheConfig::from_env()?)?;
        let source = Arc::new(HttpContentSource::from_env()?);

        let ai_config = AiConfig::from_env();
        let video = Arc::new(GeminiClient::new(ai_config.clone())?);
        let openai = Arc::new(OpenAiClient::new(ai_config)?);

        let render_config = RenderConfig::from_env();
        let composer: Option<Arc<dyn VideoComposer>> = if render_config.is_configured() {
            Some(Arc::new(ShotstackClient::new(render_config)?))
        } else {
            warn!("SHOTSTACK_API_KEY not set, video composition disabled");
            None
        };

        let collaborators = Collaborators {
            source,
            video,
            image: openai.clone(),
            folder: openai,
            composer,
            cache: cache.clone(),
        };

        let pipeline = Arc::new(AggregationPipeline::new(collaborators, PipelineConfig::from_env()));
        let ledger = Arc::new(UsageLedger::from_env());
        info!("Usage ledger ready");

        Ok(Self::new(
            config,
            Arc::new(JobCoordinator::new(ledger, pipeline)),
            cache,
        ))
    }

    pub fn ledger(&self) -> &Arc<UsageLedger> {
        self.coordinator.ledger()
    }
}
