//! Redis storage for lead documents

use async_trait::async_trait;
use leadboard_common::{Error, Lead, LeadId, LeadRepository, ReplaceOutcome, Result};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use tracing::{debug, info};

use crate::scripts;

const LEADS_BY_CREATED: &str = "leads:by_created";

fn lead_key(id: &LeadId) -> String {
    format!("lead:{}", id)
}

/// Lead repository backed by Redis hashes plus a creation-time index
#[derive(Clone)]
pub struct RedisLeadStore {
    conn: ConnectionManager,
}

impl RedisLeadStore {
    /// Connect to Redis and build a store on the managed connection
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let conn = connect(redis_url).await?;
        Ok(Self::new(conn))
    }

    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

/// Open a managed Redis connection
pub async fn connect(redis_url: &str) -> anyhow::Result<ConnectionManager> {
    use anyhow::Context;

    let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

    let conn = ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")?;

    info!("Connected to Redis at {}", redis_url);

    Ok(conn)
}

#[async_trait]
impl LeadRepository for RedisLeadStore {
    async fn insert(&self, lead: &Lead) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(lead)?;

        let script = Script::new(scripts::INSERT_LEAD);
        let inserted: i64 = script
            .key(lead_key(&lead.id))
            .key(LEADS_BY_CREATED)
            .arg(json)
            .arg(lead.version)
            .arg(lead.created_at.timestamp_millis())
            .arg(lead.id.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(Error::storage)?;

        if inserted != 1 {
            return Err(Error::storage(format!("Lead already exists: {}", lead.id)));
        }

        info!("Inserted lead: {}", lead.id);
        Ok(())
    }

    async fn get(&self, id: &LeadId) -> Result<Option<Lead>> {
        let mut conn = self.conn.clone();

        let json: Option<String> = conn
            .hget(lead_key(id), "doc")
            .await
            .map_err(Error::storage)?;

        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn replace(&self, lead: &Lead, expected_version: u64) -> Result<ReplaceOutcome> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(lead)?;

        let script = Script::new(scripts::REPLACE_LEAD);
        let result: Vec<i64> = script
            .key(lead_key(&lead.id))
            .arg(expected_version)
            .arg(json)
            .arg(lead.version)
            .invoke_async(&mut conn)
            .await
            .map_err(Error::storage)?;

        match result.as_slice() {
            [1, ..] => {
                debug!("Replaced lead: {} version: {}", lead.id, lead.version);
                Ok(ReplaceOutcome::Replaced)
            }
            [0, found, ..] => Ok(ReplaceOutcome::Conflict {
                found: u64::try_from(*found).unwrap_or_default(),
            }),
            [-1, ..] => Ok(ReplaceOutcome::NotFound),
            other => Err(Error::storage(format!(
                "Unexpected replace script reply: {:?}",
                other
            ))),
        }
    }

    async fn delete(&self, id: &LeadId) -> Result<bool> {
        let mut conn = self.conn.clone();

        let script = Script::new(scripts::DELETE_LEAD);
        let removed: i64 = script
            .key(lead_key(id))
            .key(LEADS_BY_CREATED)
            .arg(id.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(Error::storage)?;

        if removed > 0 {
            info!("Deleted lead: {}", id);
        }

        Ok(removed > 0)
    }

    async fn list(&self) -> Result<Vec<Lead>> {
        let mut conn = self.conn.clone();

        let ids: Vec<String> = conn
            .zrevrange(LEADS_BY_CREATED, 0, -1)
            .await
            .map_err(Error::storage)?;

        let mut leads = Vec::with_capacity(ids.len());
        for raw in ids {
            let id = match LeadId::parse(&raw) {
                Ok(id) => id,
                Err(_) => {
                    debug!("Skipping malformed index entry: {}", raw);
                    continue;
                }
            };

            if let Some(lead) = self.get(&id).await? {
                leads.push(lead);
            }
        }

        Ok(leads)
    }
}
