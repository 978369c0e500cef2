use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::any::AnyRow;
use sqlx::{Any, AnyPool, QueryBuilder, Row};

use crate::slot::model::{Slot, SlotId, SlotPatch};
use crate::slot::repository::SlotRepository;
use crate::time::{from_millis, to_millis};

const SLOT_COLUMNS: &str = r#"
  id, status, draft_status, product_id, is_active,
  reserved_by, reservation_end_ms,
  start_ms, end_ms,
  view_count
"#;

/// SQLx-backed implementation of SlotRepository.
/// Responsible only for persistence and row mapping.
pub struct SqlxSlotRepository {
    pool: AnyPool,
}

impl SqlxSlotRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SlotRepository for SqlxSlotRepository {
    async fn fetch_by_id(&self, slot_id: SlotId) -> anyhow::Result<Option<Slot>> {
        let row = sqlx::query(&format!("SELECT {SLOT_COLUMNS} FROM slots WHERE id = ?;"))
            .bind(slot_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(row_to_slot(&r)?)),
            None => Ok(None),
        }
    }

    async fn fetch_many(&self, slot_ids: &[SlotId]) -> anyhow::Result<Vec<Slot>> {
        if slot_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Any> =
            QueryBuilder::new(format!("SELECT {SLOT_COLUMNS} FROM slots WHERE id IN ("));
        let mut ids = qb.separated(", ");
        for id in slot_ids {
            ids.push_bind(*id);
        }
        qb.push(") ORDER BY id;");

        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            match row_to_slot(&r) {
                Ok(s) => out.push(s),
                Err(e) => {
                    // poison-row resilience: skip but don't fail the read
                    tracing::warn!(error = %e, "skipping malformed slot row");
                }
            }
        }

        Ok(out)
    }

    async fn update(&self, slot_id: SlotId, patch: &SlotPatch) -> anyhow::Result<Option<Slot>> {
        if patch.is_empty() {
            return self.fetch_by_id(slot_id).await;
        }

        let mut qb: QueryBuilder<Any> = QueryBuilder::new("UPDATE slots SET ");
        let mut sets = qb.separated(", ");

        if let Some(v) = patch.status {
            sets.push("status = ").push_bind_unseparated(v.to_string());
        }
        if let Some(v) = patch.draft_status {
            sets.push("draft_status = ").push_bind_unseparated(v.to_string());
        }
        if let Some(v) = &patch.product_id {
            match v {
                Some(p) => sets.push("product_id = ").push_bind_unseparated(p.clone()),
                None => sets.push("product_id = NULL"),
            };
        }
        if let Some(v) = patch.is_active {
            sets.push("is_active = ").push_bind_unseparated(v as i64);
        }
        if let Some(v) = &patch.reserved_by {
            match v {
                Some(by) => sets.push("reserved_by = ").push_bind_unseparated(by.clone()),
                None => sets.push("reserved_by = NULL"),
            };
        }
        push_time(&mut sets, "reservation_end_ms", patch.reservation_end_time);
        push_time(&mut sets, "start_ms", patch.start_time);
        push_time(&mut sets, "end_ms", patch.end_time);

        qb.push(" WHERE id = ");
        qb.push_bind(slot_id);
        qb.push(";");

        let res = qb
            .build()
            .execute(&self.pool)
            .await
            .with_context(|| format!("update slot {slot_id}"))?;

        if res.rows_affected() == 0 {
            return Ok(None);
        }

        self.fetch_by_id(slot_id).await
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1;").execute(&self.pool).await?;
        Ok(())
    }
}

fn push_time(
    sets: &mut sqlx::query_builder::Separated<'_, '_, Any, &'static str>,
    column: &'static str,
    value: Option<Option<DateTime<Utc>>>,
) {
    match value {
        Some(Some(t)) => {
            sets.push(format!("{column} = "))
                .push_bind_unseparated(to_millis(t));
        }
        Some(None) => {
            sets.push(format!("{column} = NULL"));
        }
        None => {}
    }
}

/* =========================
Row mapping + conversions
========================= */

fn row_to_slot(r: &AnyRow) -> anyhow::Result<Slot> {
    let id: i64 = r.try_get("id")?;

    let status_str: String = r.try_get("status")?;
    let draft_str: String = r.try_get("draft_status")?;

    Ok(Slot {
        id,
        status: status_str
            .parse()
            .with_context(|| format!("slot {id}: invalid status"))?,
        draft_status: draft_str
            .parse()
            .with_context(|| format!("slot {id}: invalid draft_status"))?,
        product_id: r.try_get::<Option<String>, _>("product_id")?,
        is_active: i64_to_bool(r.try_get("is_active")?)?,
        reserved_by: r.try_get::<Option<String>, _>("reserved_by")?,
        reservation_end_time: opt_time(r.try_get("reservation_end_ms")?)?,
        start_time: opt_time(r.try_get("start_ms")?)?,
        end_time: opt_time(r.try_get("end_ms")?)?,
        view_count: r.try_get("view_count")?,
    })
}

fn opt_time(ms: Option<i64>) -> anyhow::Result<Option<DateTime<Utc>>> {
    ms.map(from_millis).transpose()
}

fn i64_to_bool(v: i64) -> anyhow::Result<bool> {
    match v {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(anyhow!("out of range for bool: {other}")),
    }
}
