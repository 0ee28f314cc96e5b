use fiscus_core::config::StorageConfig;
use fiscus_core::config::shellexpand;
use fiscus_core::error::FiscusError;
use fiscus_core::types::{Event, Message, Transaction, UserProfile};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// Namespace for the chat message collection.
const NS_MESSAGES: &str = "messages";
/// Namespace for the event collection.
const NS_EVENTS: &str = "events";
/// Namespace for the transaction collection.
const NS_TRANSACTIONS: &str = "transactions";
/// Namespace for the user profile.
const NS_PROFILE: &str = "profile";

/// The four namespaces cleared by [`Store::clear_all`].
const ALL_NAMESPACES: [&str; 4] = [NS_MESSAGES, NS_EVENTS, NS_TRANSACTIONS, NS_PROFILE];

/// Persistent store backed by SQLite.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Create a new store, running migrations on first use.
    pub async fn new(config: &StorageConfig) -> Result<Self, FiscusError> {
        let db_path = shellexpand(&config.db_path);

        // Ensure parent directory exists.
        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| FiscusError::Store(format!("failed to create data dir: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| FiscusError::Store(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| FiscusError::Store(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;

        info!("Store initialized at {db_path}");

        Ok(Self { pool })
    }

    /// Run SQL migrations, tracking which have already been applied.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), FiscusError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| FiscusError::Store(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] =
            &[("001_init", include_str!("../migrations/001_init.sql"))];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        FiscusError::Store(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| FiscusError::Store(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| {
                    FiscusError::Store(format!("failed to record migration {name}: {e}"))
                })?;
        }
        Ok(())
    }

    /// Read the raw JSON document stored under `namespace`, if any.
    async fn get_raw(&self, namespace: &str) -> Result<Option<String>, FiscusError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv WHERE namespace = ?")
            .bind(namespace)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| FiscusError::Store(format!("failed to read {namespace}: {e}")))?;
        Ok(row.map(|(v,)| v))
    }

    /// Write a JSON document under `namespace`, replacing any previous value.
    async fn put_raw(&self, namespace: &str, value: &str) -> Result<(), FiscusError> {
        sqlx::query(
            "INSERT INTO kv (namespace, value, updated_at) VALUES (?, ?, datetime('now'))
             ON CONFLICT(namespace) DO UPDATE SET value = excluded.value,
                 updated_at = excluded.updated_at",
        )
        .bind(namespace)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| FiscusError::Store(format!("failed to write {namespace}: {e}")))?;
        Ok(())
    }

    /// Load a collection namespace, returning an empty vec when absent.
    async fn load_collection<T: DeserializeOwned>(
        &self,
        namespace: &str,
    ) -> Result<Vec<T>, FiscusError> {
        match self.get_raw(namespace).await? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| FiscusError::Store(format!("corrupt {namespace} data: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    async fn save_collection<T: Serialize>(
        &self,
        namespace: &str,
        items: &[T],
    ) -> Result<(), FiscusError> {
        let json = serde_json::to_string(items)?;
        self.put_raw(namespace, &json).await
    }

    /// All stored chat messages, oldest first.
    pub async fn messages(&self) -> Result<Vec<Message>, FiscusError> {
        self.load_collection(NS_MESSAGES).await
    }

    pub async fn save_messages(&self, messages: &[Message]) -> Result<(), FiscusError> {
        self.save_collection(NS_MESSAGES, messages).await
    }

    /// Append a message to the stored history.
    pub async fn append_message(&self, message: Message) -> Result<(), FiscusError> {
        let mut messages = self.messages().await?;
        messages.push(message);
        self.save_messages(&messages).await
    }

    pub async fn events(&self) -> Result<Vec<Event>, FiscusError> {
        self.load_collection(NS_EVENTS).await
    }

    pub async fn save_events(&self, events: &[Event]) -> Result<(), FiscusError> {
        self.save_collection(NS_EVENTS, events).await
    }

    pub async fn transactions(&self) -> Result<Vec<Transaction>, FiscusError> {
        self.load_collection(NS_TRANSACTIONS).await
    }

    pub async fn save_transactions(&self, transactions: &[Transaction]) -> Result<(), FiscusError> {
        self.save_collection(NS_TRANSACTIONS, transactions).await
    }

    /// Append imported transactions to the stored set.
    pub async fn append_transactions(
        &self,
        new: Vec<Transaction>,
    ) -> Result<usize, FiscusError> {
        let mut transactions = self.transactions().await?;
        transactions.extend(new);
        self.save_transactions(&transactions).await?;
        Ok(transactions.len())
    }

    /// The stored user profile, if one has been saved.
    pub async fn profile(&self) -> Result<Option<UserProfile>, FiscusError> {
        match self.get_raw(NS_PROFILE).await? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| FiscusError::Store(format!("corrupt profile data: {e}"))),
            None => Ok(None),
        }
    }

    pub async fn save_profile(&self, profile: &UserProfile) -> Result<(), FiscusError> {
        let json = serde_json::to_string(profile)?;
        self.put_raw(NS_PROFILE, &json).await
    }

    /// Delete all stored data: messages, events, transactions, and profile.
    pub async fn clear_all(&self) -> Result<(), FiscusError> {
        for namespace in ALL_NAMESPACES {
            sqlx::query("DELETE FROM kv WHERE namespace = ?")
                .bind(namespace)
                .execute(&self.pool)
                .await
                .map_err(|e| FiscusError::Store(format!("failed to clear {namespace}: {e}")))?;
        }
        Ok(())
    }
}
