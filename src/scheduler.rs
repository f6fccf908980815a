//! Expiration Alert Scheduling
//!
//! Turns each inventory item's expiration date, plus the user's configured
//! warning offsets (e.g. 1/3/7 days before), into a set of point-in-time
//! alerts registered with the platform's notification facility. Planning is
//! pure date arithmetic over the current inventory; the facility itself sits
//! behind the [`NotificationScheduler`] trait.
//!
//! A refresh cancels every previously scheduled expiration alert and
//! re-schedules from scratch, so no stale alert survives a deleted item or a
//! changed date.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Result;
use crate::model::InventoryItem;

/// Prefix for every alert identifier this module owns. Refresh cancels by
/// this prefix, which is what guarantees stale alerts are swept.
pub const ALERT_ID_PREFIX: &str = "expiry-";

const SECS_PER_DAY: i64 = 86_400;

/// User-configured alerting knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// How many days before expiration to warn, e.g. `[1, 3, 7]`.
    pub warning_offsets_days: Vec<i64>,
    /// Clock time (UTC) at which future-dated alerts fire.
    pub reminder_time: NaiveTime,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            warning_offsets_days: vec![1, 3],
            reminder_time: NaiveTime::from_hms_opt(9, 0, 0).expect("valid constant time"),
        }
    }
}

/// What a scheduled alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Item expires in `days_before` days.
    Warning { days_before: i64 },
    /// Item expires today.
    ExpiresToday,
}

/// A single planned alert. The identifier encodes the item id and offset so
/// the same alert can be cancelled on the next refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirationAlert {
    pub id: String,
    pub item_id: String,
    pub item_name: String,
    pub kind: AlertKind,
    pub fire_at: DateTime<Utc>,
}

impl ExpirationAlert {
    fn warning(item: &InventoryItem, days_before: i64, fire_at: DateTime<Utc>) -> Self {
        Self {
            id: format!("{}{}-warn{}", ALERT_ID_PREFIX, item.id, days_before),
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            kind: AlertKind::Warning { days_before },
            fire_at,
        }
    }

    fn expires_today(item: &InventoryItem, fire_at: DateTime<Utc>) -> Self {
        Self {
            id: format!("{}{}-day", ALERT_ID_PREFIX, item.id),
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            kind: AlertKind::ExpiresToday,
            fire_at,
        }
    }
}

/// Platform alert facility: fire-and-forget registration keyed by
/// identifier.
#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    async fn schedule_at(&self, alert: &ExpirationAlert) -> Result<()>;
    async fn cancel(&self, id: &str) -> Result<()>;
    async fn list_scheduled(&self) -> Result<Vec<String>>;
}

/// Days until expiration, rounded up: an item expiring later today counts as
/// 0 days out, tomorrow as 1.
pub fn days_until_expiration(expires_on: chrono::NaiveDate, now: DateTime<Utc>) -> i64 {
    let expiry_midnight = expires_on
        .and_hms_opt(0, 0, 0)
        .expect("midnight always exists")
        .and_utc();
    let secs = (expiry_midnight - now).num_seconds();
    secs.div_euclid(SECS_PER_DAY) + i64::from(secs.rem_euclid(SECS_PER_DAY) > 0)
}

/// Plan the full alert set for the given inventory. Pure: no side effects,
/// deterministic for a fixed `now`.
pub fn plan_alerts(
    items: &[InventoryItem],
    config: &AlertConfig,
    now: DateTime<Utc>,
) -> Vec<ExpirationAlert> {
    let mut alerts = Vec::new();

    for item in items {
        let Some(expires_on) = item.expires_on else {
            continue;
        };
        let days_until = days_until_expiration(expires_on, now);

        for &offset in &config.warning_offsets_days {
            if days_until == offset {
                // Same-day catch-up: the warning window opens today, so fire
                // immediately instead of at the configured clock time.
                alerts.push(ExpirationAlert::warning(item, offset, now));
            } else if days_until > offset {
                let fire_at = (expires_on - Duration::days(offset))
                    .and_time(config.reminder_time)
                    .and_utc();
                if fire_at > now {
                    alerts.push(ExpirationAlert::warning(item, offset, fire_at));
                }
            }
        }

        if days_until >= 0 {
            let fire_at = expires_on.and_time(config.reminder_time).and_utc();
            if fire_at > now {
                alerts.push(ExpirationAlert::expires_today(item, fire_at));
            }
        }
    }

    alerts
}

/// Cancel every expiration alert currently registered, then schedule the
/// freshly planned set. Run whenever the inventory changes or on explicit
/// refresh. Returns the number of alerts scheduled.
pub async fn refresh(
    scheduler: &dyn NotificationScheduler,
    items: &[InventoryItem],
    config: &AlertConfig,
    now: DateTime<Utc>,
) -> Result<usize> {
    for id in scheduler.list_scheduled().await? {
        if id.starts_with(ALERT_ID_PREFIX) {
            scheduler.cancel(&id).await?;
        }
    }

    let alerts = plan_alerts(items, config, now);
    for alert in &alerts {
        scheduler.schedule_at(alert).await?;
    }
    debug!(count = alerts.len(), "expiration alerts scheduled");
    Ok(alerts.len())
}
