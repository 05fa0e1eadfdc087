//! Application context - dependency injection container

use std::sync::Arc;

use timewise_core::{
    AgentService, CalendarRepository, Clock, CompletionPort, SystemClock, TimeResolver,
};
use timewise_domain::{Config, Result};
use timewise_infra::{
    DbManager, HttpClient, NaturalDateParser, OpenAiCompletionClient, SqliteCalendarRepository,
    SqliteContextStore, SqliteConversationLog,
};

/// Application context - holds all services and dependencies.
///
/// Built once at startup and shared across request handlers.
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub agent: Arc<AgentService>,
    pub calendar: Arc<dyn CalendarRepository>,
}

impl AppContext {
    /// Wire the full production stack from configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        let http_client = HttpClient::new()?;
        let completion: Arc<dyn CompletionPort> = Arc::new(
            OpenAiCompletionClient::new(config.openai.api_key.clone(), http_client)
                .with_model(config.openai.model.clone()),
        );

        Self::assemble(config, completion)
    }

    /// Wire repositories and the agent around an already-built completion
    /// port.
    ///
    /// This entry point exists for tests, which substitute a scripted
    /// completion backend and a temporary database path.
    pub fn assemble(config: Config, completion: Arc<dyn CompletionPort>) -> Result<Self> {
        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;

        let calendar: Arc<dyn CalendarRepository> =
            Arc::new(SqliteCalendarRepository::new(db.clone()));
        let log = Arc::new(SqliteConversationLog::new(db.clone()));
        let state = Arc::new(SqliteContextStore::new(db.clone()));
        let resolver = TimeResolver::new(Arc::new(NaturalDateParser::new()));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let agent =
            Arc::new(AgentService::new(completion, calendar.clone(), log, state, resolver, clock));

        Ok(Self { config, db, agent, calendar })
    }
}
