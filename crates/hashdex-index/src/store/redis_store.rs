//! Redis-backed store
//!
//! Speaks the search module's `FT.*` commands plus the handful of plain hash
//! and keyspace commands the lifecycle and executor need.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use hashdex_config::StoreConfig;
use redis::aio::ConnectionManager;
use redis::{Client, IntoConnectionInfo, Value};
use tracing::{debug, info};

use super::{Reply, SearchRequest, SearchStore};
use crate::definition::IndexSchema;
use crate::error::{IndexError, Result};

/// Messages the server uses when dropping an index that does not exist.
const UNKNOWN_INDEX_MESSAGES: &[&str] = &["unknown index name", "no such index"];

/// Store backed by a Redis server with the search module loaded.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    url: String,
}

impl RedisStore {
    /// Connect using the `[store]` configuration section.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        info!("Connecting to Redis at {}", config.url);

        let mut info = config
            .url
            .as_str()
            .into_connection_info()
            .map_err(|e| IndexError::Connection(format!("Invalid store URL: {}", e)))?;
        if let Some(ref username) = config.username {
            info.redis.username = Some(username.clone());
        }
        if let Some(ref password) = config.password {
            info.redis.password = Some(password.clone());
        }

        let client = Client::open(info)
            .map_err(|e| IndexError::Connection(format!("Failed to build Redis client: {}", e)))?;

        let timeout = Duration::from_secs(config.connect_timeout_secs);
        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                IndexError::Connection(format!(
                    "Timed out after {}s connecting to {}",
                    config.connect_timeout_secs, config.url
                ))
            })??;

        let store = Self {
            conn,
            url: config.url.clone(),
        };
        store.ping().await?;

        info!("Successfully connected to Redis");
        Ok(store)
    }

    /// URL this store was connected with.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn query(&self, cmd: &redis::Cmd) -> Result<Value> {
        let mut conn = self.conn.clone();
        let value: Value = cmd.query_async(&mut conn).await?;
        Ok(value)
    }
}

/// Whether a drop failure means the index was already absent.
fn is_unknown_index(err: &redis::RedisError) -> bool {
    let message = err.to_string().to_lowercase();
    UNKNOWN_INDEX_MESSAGES.iter().any(|m| message.contains(m))
}

/// Convert a client value into a [`Reply`].
fn to_reply(value: Value) -> Reply {
    match value {
        Value::Nil => Reply::Nil,
        Value::Int(n) => Reply::Int(n),
        Value::BulkString(bytes) => Reply::Data(String::from_utf8_lossy(&bytes).into_owned()),
        Value::SimpleString(s) => Reply::Data(s),
        Value::Okay => Reply::Data("OK".to_string()),
        Value::Double(d) => Reply::Data(d.to_string()),
        Value::Boolean(b) => Reply::Int(i64::from(b)),
        Value::VerbatimString { text, .. } => Reply::Data(text),
        Value::Array(items) | Value::Set(items) => {
            Reply::Array(items.into_iter().map(to_reply).collect())
        }
        Value::Map(pairs) => Reply::Array(
            pairs
                .into_iter()
                .flat_map(|(k, v)| [to_reply(k), to_reply(v)])
                .collect(),
        ),
        _ => Reply::Nil,
    }
}

#[async_trait]
impl SearchStore for RedisStore {
    async fn create_index(&self, schema: &IndexSchema) -> Result<()> {
        info!(
            "Creating index '{}' over '{}' ({} fields)",
            schema.index_name,
            schema.key_prefix,
            schema.fields.len()
        );
        let mut cmd = redis::cmd("FT.CREATE");
        for arg in schema.create_args() {
            cmd.arg(arg);
        }
        self.query(&cmd).await?;
        Ok(())
    }

    async fn drop_index(&self, index_name: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let result: redis::RedisResult<Value> = redis::cmd("FT.DROPINDEX")
            .arg(index_name)
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => {
                info!("Dropped index '{}'", index_name);
                Ok(true)
            }
            Err(e) if is_unknown_index(&e) => {
                debug!("Index '{}' did not exist, nothing to drop", index_name);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn search(&self, request: &SearchRequest) -> Result<Reply> {
        debug!(
            "FT.SEARCH {} '{}' (offset={}, count={})",
            request.index_name, request.query, request.offset, request.count
        );
        let mut cmd = redis::cmd("FT.SEARCH");
        for arg in request.args() {
            cmd.arg(arg);
        }
        Ok(to_reply(self.query(&cmd).await?))
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.conn.clone();
        let map: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(key)
            .query_async(&mut conn)
            .await?;
        Ok(map)
    }

    async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in fields {
            cmd.arg(field).arg(value);
        }
        self.query(&cmd).await?;
        Ok(())
    }

    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = redis::cmd("HINCRBY")
            .arg(key)
            .arg(field)
            .arg(delta)
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: u32) -> Result<(u64, Vec<String>)> {
        let mut conn = self.conn.clone();
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;
        Ok((next, keys))
    }

    async fn ping(&self) -> Result<()> {
        let reply = to_reply(self.query(&redis::cmd("PING")).await?);
        match reply.as_str() {
            Some("PONG") => Ok(()),
            _ => Err(IndexError::invalid_response(format!(
                "unexpected PING reply: {:?}",
                reply
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_to_reply_flattens_nested_values() {
        let value = Value::Array(vec![
            Value::Int(2),
            Value::BulkString(b"cars:1".to_vec()),
            Value::Array(vec![
                Value::BulkString(b"make".to_vec()),
                Value::SimpleString("Ford".to_string()),
            ]),
            Value::Nil,
        ]);

        assert_eq!(
            to_reply(value),
            Reply::Array(vec![
                Reply::Int(2),
                Reply::Data("cars:1".to_string()),
                Reply::Array(vec![
                    Reply::Data("make".to_string()),
                    Reply::Data("Ford".to_string()),
                ]),
                Reply::Nil,
            ])
        );
    }

    #[test]
    fn test_to_reply_map_becomes_pairs() {
        let value = Value::Map(vec![(
            Value::SimpleString("year".to_string()),
            Value::Int(1999),
        )]);
        assert_eq!(
            to_reply(value),
            Reply::Array(vec![Reply::Data("year".to_string()), Reply::Int(1999)])
        );
        assert_eq!(to_reply(Value::Okay), Reply::Data("OK".to_string()));
    }

    #[test]
    fn test_unknown_index_detection() {
        let err = redis::RedisError::from((
            redis::ErrorKind::ResponseError,
            "An error was signalled by the server",
            "Unknown Index name".to_string(),
        ));
        assert!(is_unknown_index(&err));

        let err = redis::RedisError::from((
            redis::ErrorKind::ResponseError,
            "An error was signalled by the server",
            "no such index".to_string(),
        ));
        assert!(is_unknown_index(&err));

        let err = redis::RedisError::from((
            redis::ErrorKind::ResponseError,
            "An error was signalled by the server",
            "wrong arity".to_string(),
        ));
        assert!(!is_unknown_index(&err));
    }
}
