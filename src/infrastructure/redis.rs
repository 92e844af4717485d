//! Redis repository implementation.
//!
//! Uses `deadpool-redis` for connection pooling. Each item is a JSON
//! document; every mutation is a Lua script so it runs atomically on the
//! server in one round trip.
//!
//! # Key Design
//!
//! - Item: `todo:{id}` -> JSON
//! - Index: `todos:index` -> ZSET (score = creation time in milliseconds)

use deadpool_redis::{Config, Pool, Runtime};
use futures::FutureExt;
use redis::AsyncCommands;

use crate::domain::{NewTodo, TodoId, TodoItem, TodoPatch};
use crate::infrastructure::{RepositoryError, RepositoryFuture, TodoRepository};

// =============================================================================
// Redis Key Constants
// =============================================================================

/// Prefix for item keys.
const TODO_KEY_PREFIX: &str = "todo:";

/// Key for the item index (sorted set).
const TODO_INDEX_KEY: &str = "todos:index";

/// Merges a JSON patch into an existing document.
///
/// Returns `{0}` when the key does not exist, `{1, json}` with the merged
/// document, `{2}` when the stored document cannot be decoded.
const MERGE_SCRIPT: &str = r"
local key = KEYS[1]
local existing = redis.call('GET', key)
if not existing then
    return {0}
end
local ok, document = pcall(cjson.decode, existing)
if not ok then
    return {2}
end
local patch = cjson.decode(ARGV[1])
for field, value in pairs(patch) do
    document[field] = value
end
local merged = cjson.encode(document)
redis.call('SET', key, merged)
return {1, merged}
";

/// Stores a new document and indexes it.
const INSERT_SCRIPT: &str = r"
redis.call('SET', KEYS[1], ARGV[1])
redis.call('ZADD', KEYS[2], ARGV[3], ARGV[2])
return 1
";

/// Removes a document and its index entry. Returns 1 if it existed.
const DELETE_SCRIPT: &str = r"
local deleted = redis.call('DEL', KEYS[1])
if deleted == 1 then
    redis.call('ZREM', KEYS[2], ARGV[1])
    return 1
end
return 0
";

// =============================================================================
// Helper Functions
// =============================================================================

/// Generates a Redis key for an item.
fn todo_key(id: &TodoId) -> String {
    format!("{TODO_KEY_PREFIX}{id}")
}

/// Current time as a sorted set score (milliseconds since UNIX epoch).
#[allow(clippy::cast_precision_loss)]
fn creation_score() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64
}

fn redis_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::RedisError(error.to_string())
}

fn serialization_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::SerializationError(error.to_string())
}

/// Interprets the reply of [`MERGE_SCRIPT`].
fn parse_merge_reply(reply: redis::Value) -> Result<Option<TodoItem>, RepositoryError> {
    let (status, payload): (i64, Option<String>) = match reply {
        redis::Value::Array(values) => {
            let mut values = values.into_iter();
            let status = values
                .next()
                .map(|value| redis::from_redis_value::<i64>(&value))
                .transpose()
                .map_err(redis_error)?
                .unwrap_or(-1);
            let payload = values
                .next()
                .map(|value| redis::from_redis_value::<String>(&value))
                .transpose()
                .map_err(redis_error)?;
            (status, payload)
        }
        other => {
            return Err(RepositoryError::RedisError(format!(
                "Unexpected merge script reply: {other:?}"
            )));
        }
    };

    match (status, payload) {
        (0, _) => Ok(None),
        (1, Some(json)) => serde_json::from_str(&json)
            .map(Some)
            .map_err(serialization_error),
        (2, _) => Err(RepositoryError::SerializationError(
            "Corrupted data in Redis: stored document is not valid JSON".to_string(),
        )),
        _ => Err(RepositoryError::RedisError(
            "Unexpected merge script result".to_string(),
        )),
    }
}

// =============================================================================
// Redis Todo Repository
// =============================================================================

/// Redis implementation of `TodoRepository`.
///
/// # Example
///
/// ```ignore
/// use todo_service::infrastructure::RedisTodoRepository;
///
/// let repository = RedisTodoRepository::from_url("redis://localhost:6379")?;
/// let item = repository.create(new_todo).await?;
/// ```
#[derive(Debug, Clone)]
pub struct RedisTodoRepository {
    /// Connection pool for Redis.
    pool: Pool,
}

impl RedisTodoRepository {
    /// Creates a new Redis repository with the given connection pool.
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Creates a new Redis repository from a Redis URL.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::RedisError` if the pool cannot be created.
    pub fn from_url(redis_url: &str) -> Result<Self, RepositoryError> {
        let config = Config::from_url(redis_url);
        let pool = config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(redis_error)?;
        Ok(Self { pool })
    }

    /// Checks that a connection can be obtained and answers `PING`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::RedisError` if Redis is unreachable.
    pub async fn ping(&self) -> Result<(), RepositoryError> {
        let mut connection = self.pool.get().await.map_err(redis_error)?;
        let _: String = redis::cmd("PING")
            .query_async(&mut *connection)
            .await
            .map_err(redis_error)?;
        Ok(())
    }
}

#[allow(clippy::significant_drop_tightening)]
impl TodoRepository for RedisTodoRepository {
    fn list(&self) -> RepositoryFuture<Vec<TodoItem>> {
        let pool = self.pool.clone();
        async move {
            let mut connection = pool.get().await.map_err(redis_error)?;

            let ids: Vec<String> = connection
                .zrange(TODO_INDEX_KEY, 0, -1)
                .await
                .map_err(redis_error)?;

            if ids.is_empty() {
                return Ok(Vec::new());
            }

            let keys: Vec<String> = ids
                .iter()
                .map(|id| format!("{TODO_KEY_PREFIX}{id}"))
                .collect();

            // Explicit MGET: the `mget` helper sends GET for a single key.
            let documents: Vec<Option<String>> = redis::cmd("MGET")
                .arg(&keys)
                .query_async(&mut *connection)
                .await
                .map_err(redis_error)?;

            // Index entries whose document vanished between ZRANGE and MGET are skipped.
            documents
                .into_iter()
                .flatten()
                .map(|json| serde_json::from_str(&json).map_err(serialization_error))
                .collect()
        }
        .boxed()
    }

    fn create(&self, new_todo: NewTodo) -> RepositoryFuture<TodoItem> {
        let pool = self.pool.clone();
        async move {
            let item = TodoItem::create(TodoId::generate(), new_todo);
            let json = serde_json::to_string(&item).map_err(serialization_error)?;
            let mut connection = pool.get().await.map_err(redis_error)?;

            let _: i64 = redis::Script::new(INSERT_SCRIPT)
                .key(todo_key(&item.id))
                .key(TODO_INDEX_KEY)
                .arg(&json)
                .arg(item.id.to_string())
                .arg(creation_score())
                .invoke_async(&mut *connection)
                .await
                .map_err(redis_error)?;

            Ok(item)
        }
        .boxed()
    }

    fn update(&self, id: &TodoId, patch: &TodoPatch) -> RepositoryFuture<Option<TodoItem>> {
        let pool = self.pool.clone();
        let key = todo_key(id);
        let patch = serde_json::to_string(patch).map_err(serialization_error);
        async move {
            let patch = patch?;
            let mut connection = pool.get().await.map_err(redis_error)?;

            let reply: redis::Value = redis::Script::new(MERGE_SCRIPT)
                .key(&key)
                .arg(&patch)
                .invoke_async(&mut *connection)
                .await
                .map_err(redis_error)?;

            parse_merge_reply(reply)
        }
        .boxed()
    }

    fn delete(&self, id: &TodoId) -> RepositoryFuture<bool> {
        let pool = self.pool.clone();
        let key = todo_key(id);
        let member = id.to_string();
        async move {
            let mut connection = pool.get().await.map_err(redis_error)?;

            let deleted: i64 = redis::Script::new(DELETE_SCRIPT)
                .key(&key)
                .key(TODO_INDEX_KEY)
                .arg(&member)
                .invoke_async(&mut *connection)
                .await
                .map_err(redis_error)?;

            Ok(deleted == 1)
        }
        .boxed()
    }
}

// =============================================================================
// Tests
// =============================================================================
