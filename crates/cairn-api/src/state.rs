//! Server state wiring the pipeline to its SQLite and provider
//! implementations.
//!
//! Core stays generic over its trait seams; this module pins every
//! seam to the concrete infra type and builds one shared
//! [`ChatPipeline`] for the process.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::task::TaskTracker;

use cairn_core::context::ContextAssembler;
use cairn_core::ledger::{QuotaGate, QuotaLimits};
use cairn_core::pipeline::{ChatPipeline, PipelineConfig};
use cairn_core::scanner::ScanMemo;
use cairn_infra::config::{default_data_dir, load_global_config};
use cairn_infra::llm::build_provider;
use cairn_infra::sqlite::{
    DatabasePool, SqliteCompletionSink, SqliteContextRepository, SqliteConversationRepository,
    SqliteMessageRepository, SqliteUsageLedger, SqliteUserStore,
};
use cairn_types::config::GlobalConfig;

/// Base coaching persona. Tag semantics on top of it come from the
/// prompt builder, which appends them only when backing data exists.
pub const CORE_INSTRUCTIONS: &str = "You are a thoughtful personal coach. \
Help the user think through their situation with concrete, honest \
questions and suggestions. Be direct and warm; never lecture.";

/// Capacity of the full-text scan memo used when re-rendering
/// persisted messages.
const SCAN_MEMO_CAPACITY: usize = 256;

/// The pipeline with every seam pinned to its SQLite implementation.
pub type ConcretePipeline = ChatPipeline<
    SqliteUsageLedger,
    SqliteConversationRepository,
    SqliteMessageRepository,
    SqliteContextRepository,
    SqliteCompletionSink,
>;

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ConcretePipeline>,
    pub conversations: Arc<SqliteConversationRepository>,
    pub messages: Arc<SqliteMessageRepository>,
    pub users: Arc<SqliteUserStore>,
    pub scan_memo: Arc<ScanMemo>,
    pub config: Arc<GlobalConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Connect to the database, build the provider, and wire the
    /// pipeline.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = PathBuf::from(default_data_dir());
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("creating data dir {}", data_dir.display()))?;

        let config = load_global_config(&data_dir).await;
        let db_url = format!("sqlite://{}/cairn.db", data_dir.display());
        let db_pool = DatabasePool::new(&db_url)
            .await
            .context("opening database")?;

        Self::with_pool(db_pool, config, data_dir)
    }

    /// Wire the state against an existing pool (tests use a temp
    /// database here).
    pub fn with_pool(
        db_pool: DatabasePool,
        config: GlobalConfig,
        data_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        let provider = build_provider(&config.provider, &config.stream)
            .context("configuring LLM provider")?;

        let messages = Arc::new(SqliteMessageRepository::new(db_pool.clone()));
        let conversations = Arc::new(SqliteConversationRepository::new(db_pool.clone()));

        let gate = QuotaGate::new(
            SqliteUsageLedger::new(db_pool.clone()),
            QuotaLimits {
                trial_messages: config.limits.trial_messages,
                monthly_messages: config.limits.monthly_messages,
            },
        );
        let assembler = ContextAssembler::new(
            SqliteConversationRepository::new(db_pool.clone()),
            Arc::clone(&messages),
            SqliteContextRepository::new(db_pool.clone()),
            Duration::from_millis(config.stream.context_budget_ms),
            config.stream.history_token_budget,
        );
        let sink = Arc::new(SqliteCompletionSink::new(
            db_pool.clone(),
            config.pricing.clone(),
        ));

        let pipeline = ChatPipeline::new(
            gate,
            assembler,
            Arc::clone(&messages),
            provider,
            sink,
            TaskTracker::new(),
            PipelineConfig {
                core_instructions: CORE_INSTRUCTIONS.to_string(),
                max_tokens: config.provider.max_tokens,
                temperature: config.provider.temperature,
            },
        );

        Ok(Self {
            pipeline: Arc::new(pipeline),
            conversations,
            messages,
            users: Arc::new(SqliteUserStore::new(db_pool.clone())),
            scan_memo: Arc::new(ScanMemo::with_capacity(SCAN_MEMO_CAPACITY)),
            config: Arc::new(config),
            data_dir,
            db_pool,
        })
    }

    /// Database path shown in startup output.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("cairn.db")
    }
}
