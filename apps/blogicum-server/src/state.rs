//! Application state - shared across all handlers.

use std::sync::Arc;

use blogicum_core::ports::{
    CategoryRepository, Clock, CommentRepository, LocationRepository, PasswordService,
    PostRepository, TokenService, UserRepository,
};
use blogicum_infra::{Argon2PasswordService, InMemoryStore, JwtTokenService, SystemClock};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub locations: Arc<dyn LocationRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    pub clock: Arc<dyn Clock>,
    /// `postgres` or `memory`, reported by the health check.
    pub storage: &'static str,
    pub secure_cookies: bool,
}

impl AppState {
    /// State backed by the in-memory store.
    pub fn in_memory(
        store: &InMemoryStore,
        tokens: Arc<dyn TokenService>,
        passwords: Arc<dyn PasswordService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users: Arc::new(store.users()),
            categories: Arc::new(store.categories()),
            locations: Arc::new(store.locations()),
            posts: Arc::new(store.posts()),
            comments: Arc::new(store.comments()),
            tokens,
            passwords,
            clock,
            storage: "memory",
            secure_cookies: false,
        }
    }

    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(config.jwt.clone()));
        let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        #[cfg(feature = "postgres")]
        let state = match &config.database {
            Some(db_config) => {
                match Self::postgres(db_config, config.run_migrations, &tokens, &passwords, &clock)
                    .await
                {
                    Ok(state) => Some(state),
                    Err(e) => {
                        tracing::error!(
                            "Failed to connect to database: {}. Using in-memory fallback.",
                            e
                        );
                        None
                    }
                }
            }
            None => {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
                None
            }
        };

        #[cfg(not(feature = "postgres"))]
        let state: Option<Self> = {
            tracing::info!("Running without postgres feature - using in-memory repositories");
            None
        };

        let mut state = state.unwrap_or_else(|| {
            Self::in_memory(&InMemoryStore::new(), tokens, passwords, clock)
        });
        state.secure_cookies = config.secure_cookies;

        tracing::info!(storage = state.storage, "Application state initialized");
        state
    }

    #[cfg(feature = "postgres")]
    async fn postgres(
        db_config: &blogicum_infra::DatabaseConfig,
        run_migrations: bool,
        tokens: &Arc<dyn TokenService>,
        passwords: &Arc<dyn PasswordService>,
        clock: &Arc<dyn Clock>,
    ) -> Result<Self, blogicum_infra::database::DbErr> {
        use blogicum_infra::DatabaseConnections;
        use blogicum_infra::database::{
            PostgresCategoryRepository, PostgresCommentRepository, PostgresLocationRepository,
            PostgresPostRepository, PostgresUserRepository,
        };
        use migration::MigratorTrait;

        let connections = DatabaseConnections::init(db_config).await?;
        let db = connections.main;

        if run_migrations {
            tracing::info!("Applying pending migrations");
            migration::Migrator::up(&db, None).await?;
        }

        Ok(Self {
            users: Arc::new(PostgresUserRepository::new(db.clone())),
            categories: Arc::new(PostgresCategoryRepository::new(db.clone())),
            locations: Arc::new(PostgresLocationRepository::new(db.clone())),
            posts: Arc::new(PostgresPostRepository::new(db.clone())),
            comments: Arc::new(PostgresCommentRepository::new(db)),
            tokens: tokens.clone(),
            passwords: passwords.clone(),
            clock: clock.clone(),
            storage: "postgres",
            secure_cookies: false,
        })
    }
}
