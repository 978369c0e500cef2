use sqlx::AnyPool;

use crate::slot::model::SLOT_COUNT;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS slots (
  id BIGINT PRIMARY KEY,
  status TEXT NOT NULL DEFAULT 'empty',
  draft_status TEXT NOT NULL DEFAULT 'empty',
  product_id TEXT,
  is_active INTEGER NOT NULL DEFAULT 0 CHECK (is_active IN (0,1)),
  reserved_by TEXT,
  reservation_end_ms BIGINT,
  start_ms BIGINT,
  end_ms BIGINT,
  view_count BIGINT NOT NULL DEFAULT 0
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_slots_status ON slots(status);"#)
        .execute(pool)
        .await?;

    Ok(())
}

/// Insert the fixed slot rows `1..=SLOT_COUNT`. Existing rows are left alone, so this is
/// safe to run on every startup.
pub async fn seed_slots(pool: &AnyPool) -> anyhow::Result<u64> {
    let mut inserted = 0;

    for id in 1..=SLOT_COUNT {
        let res = sqlx::query(
            r#"
INSERT INTO slots (id, status, draft_status, is_active, view_count)
VALUES (?, 'empty', 'empty', 0, 0)
ON CONFLICT (id) DO NOTHING;
"#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        inserted += res.rows_affected();
    }

    if inserted > 0 {
        tracing::info!(inserted, "seeded slot rows");
    }

    Ok(inserted)
}
