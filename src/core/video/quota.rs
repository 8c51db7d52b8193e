//! Per-owner daily render quota.
//!
//! Checked before the provider is invoked; incremented only after a provider
//! accepts a job, so a rejection never consumes quota.

use anyhow::Result;
use serde::Serialize;

use crate::core::store::ProjectStore;

#[derive(Debug, Clone, Serialize)]
pub struct QuotaCheck {
    pub allowed: bool,
    pub used: i64,
    pub remaining: i64,
    pub limit: i64,
}

pub async fn check(store: &ProjectStore, owner_id: &str, limit: i64) -> Result<QuotaCheck> {
    let used = store.quota_used_today(owner_id).await?;
    Ok(QuotaCheck {
        allowed: used < limit,
        used,
        remaining: (limit - used).max(0),
        limit,
    })
}

pub async fn increment(store: &ProjectStore, owner_id: &str) -> Result<()> {
    store.increment_quota(owner_id).await
}
