//! Application state wiring all services together.
//!
//! The core services are generic over repository traits; AppState pins
//! them to the concrete SQLite implementations. The external
//! request-handling layer wires the same services the same way.

use std::sync::Arc;

use lingua_core::service::ledger::RatingLedger;
use lingua_core::service::registry::ChatRoomRegistry;
use lingua_infra::sqlite::message::SqliteMessageRepository;
use lingua_infra::sqlite::pool::{DatabasePool, default_database_url};
use lingua_infra::sqlite::room::SqliteChatRoomRepository;
use lingua_infra::sqlite::user::SqliteUserRepository;
use lingua_types::config::AppConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteLedger = RatingLedger<SqliteUserRepository>;

pub type ConcreteRegistry =
    ChatRoomRegistry<SqliteChatRoomRepository, SqliteUserRepository, SqliteMessageRepository>;

/// Shared application state holding the services the CLI drives.
pub struct AppState {
    pub ledger: Arc<ConcreteLedger>,
    pub registry: ConcreteRegistry,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to the database (running
    /// migrations) and wire the services.
    pub async fn init(config: &AppConfig) -> anyhow::Result<Self> {
        let db_url = config
            .database_url
            .clone()
            .unwrap_or_else(default_database_url);
        let db_pool = DatabasePool::new(&db_url).await?;

        let ledger = Arc::new(RatingLedger::new(SqliteUserRepository::new(
            db_pool.clone(),
        )));
        let registry = ChatRoomRegistry::new(
            SqliteChatRoomRepository::new(db_pool.clone()),
            SqliteMessageRepository::new(db_pool.clone()),
            ledger.clone(),
        );

        Ok(Self {
            ledger,
            registry,
            db_pool,
        })
    }
}
