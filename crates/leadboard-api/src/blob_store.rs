//! Redis storage for attachment blobs

use async_trait::async_trait;
use chrono::Utc;
use leadboard_common::{Blob, BlobId, BlobMeta, BlobStore, Error, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

fn blob_key(id: &BlobId) -> String {
    format!("blob:{}", id)
}

/// Blob store keeping each file in a hash with `data` and `meta` fields
#[derive(Clone)]
pub struct RedisBlobStore {
    conn: ConnectionManager,
}

impl RedisBlobStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let conn = crate::storage::connect(redis_url).await?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl BlobStore for RedisBlobStore {
    async fn put(&self, filename: &str, content_type: Option<&str>, data: &[u8]) -> Result<BlobId> {
        let mut conn = self.conn.clone();
        let id = BlobId::new();

        let meta = BlobMeta {
            filename: filename.to_string(),
            content_type: content_type.map(str::to_string),
            size: data.len() as u64,
            uploaded_at: Utc::now(),
        };
        let meta_json = serde_json::to_string(&meta)?;

        redis::cmd("HSET")
            .arg(blob_key(&id))
            .arg("data")
            .arg(data)
            .arg("meta")
            .arg(meta_json)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(Error::storage)?;

        info!("Stored blob: {} ({} bytes, {})", id, data.len(), filename);
        Ok(id)
    }

    async fn get(&self, id: &BlobId) -> Result<Option<Blob>> {
        let mut conn = self.conn.clone();

        let (data, meta): (Option<Vec<u8>>, Option<String>) = redis::cmd("HMGET")
            .arg(blob_key(id))
            .arg("data")
            .arg("meta")
            .query_async(&mut conn)
            .await
            .map_err(Error::storage)?;

        match (data, meta) {
            (Some(data), Some(meta)) => Ok(Some(Blob {
                id: *id,
                meta: serde_json::from_str(&meta)?,
                data,
            })),
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: &BlobId) -> Result<bool> {
        let mut conn = self.conn.clone();

        let removed: i64 = conn.del(blob_key(id)).await.map_err(Error::storage)?;

        if removed == 0 {
            debug!("Blob already absent: {}", id);
        }

        Ok(removed > 0)
    }
}
