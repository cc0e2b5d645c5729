use sqlx::SqliteConnection;
use tracing::debug;

use super::ContextItemRow;
use crate::models::{ArticleInput, ArticleRef, ContextSnapshot, ContextStats, MoveDirection};

/// SQL access for the `context_items` table.
///
/// Every function runs on a caller-supplied connection so that a store
/// operation can compose several statements inside one transaction.
pub struct Repository;

const SELECT_ITEMS: &str = r#"SELECT
        article_id,
        title,
        date,
        source,
        url,
        snippet,
        pinned,
        last_seen,
        pin_order
       FROM context_items"#;

impl Repository {
    pub async fn fetch_item(
        conn: &mut SqliteConnection,
        session_id: &str,
        article_id: &str,
    ) -> sqlx::Result<Option<ArticleRef>> {
        let row = sqlx::query_as::<_, ContextItemRow>(&format!(
            "{} WHERE session_id = ? AND article_id = ?",
            SELECT_ITEMS
        ))
        .bind(session_id)
        .bind(article_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(ArticleRef::from))
    }

    /// Listing order: pinned by rank, then tracked newest first.
    pub async fn list_items(
        conn: &mut SqliteConnection,
        session_id: &str,
        limit: Option<usize>,
    ) -> sqlx::Result<Vec<ArticleRef>> {
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.map(|l| l as i64).unwrap_or(-1);

        let rows = sqlx::query_as::<_, ContextItemRow>(&format!(
            r#"{}
               WHERE session_id = ?
               ORDER BY pinned DESC,
                        CASE WHEN pinned = 1 THEN pin_order ELSE 0 END ASC,
                        last_seen DESC,
                        article_id ASC
               LIMIT ?"#,
            SELECT_ITEMS
        ))
        .bind(session_id)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(ArticleRef::from).collect())
    }

    pub async fn snapshot(
        conn: &mut SqliteConnection,
        session_id: &str,
    ) -> sqlx::Result<ContextSnapshot> {
        let items = Self::list_items(conn, session_id, None).await?;
        Ok(ContextSnapshot::new(items))
    }

    pub async fn stats(conn: &mut SqliteConnection, session_id: &str) -> sqlx::Result<ContextStats> {
        let (pinned, total): (i64, i64) = sqlx::query_as(
            r#"SELECT COALESCE(SUM(pinned), 0), COUNT(*)
               FROM context_items
               WHERE session_id = ?"#,
        )
        .bind(session_id)
        .fetch_one(&mut *conn)
        .await?;

        let pinned = pinned.max(0) as usize;
        let total = total.max(0) as usize;
        Ok(ContextStats {
            pinned,
            tracked: total.saturating_sub(pinned),
            total,
        })
    }

    pub async fn insert_tracked(
        conn: &mut SqliteConnection,
        session_id: &str,
        article: &ArticleInput,
        last_seen: i64,
    ) -> sqlx::Result<()> {
        sqlx::query(
            r#"INSERT INTO context_items
               (session_id, article_id, title, date, source, url, snippet, pinned, last_seen, pin_order)
               VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, 0)"#,
        )
        .bind(session_id)
        .bind(&article.id)
        .bind(&article.title)
        .bind(&article.date)
        .bind(&article.source)
        .bind(&article.url)
        .bind(&article.snippet)
        .bind(last_seen)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Refresh descriptive fields and recency; pin state is left alone.
    pub async fn refresh_item(
        conn: &mut SqliteConnection,
        session_id: &str,
        article: &ArticleInput,
        last_seen: i64,
    ) -> sqlx::Result<()> {
        sqlx::query(
            r#"UPDATE context_items
               SET title = ?, date = ?, source = ?, url = ?, snippet = ?, last_seen = ?
               WHERE session_id = ? AND article_id = ?"#,
        )
        .bind(&article.title)
        .bind(&article.date)
        .bind(&article.source)
        .bind(&article.url)
        .bind(&article.snippet)
        .bind(last_seen)
        .bind(session_id)
        .bind(&article.id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Delete the least recently seen tracked rows beyond `max_tracked`.
    /// Returns the evicted article ids.
    pub async fn evict_tracked_over(
        conn: &mut SqliteConnection,
        session_id: &str,
        max_tracked: usize,
    ) -> sqlx::Result<Vec<String>> {
        let tracked: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM context_items WHERE session_id = ? AND pinned = 0",
        )
        .bind(session_id)
        .fetch_one(&mut *conn)
        .await?;

        let excess = tracked - max_tracked as i64;
        if excess <= 0 {
            return Ok(Vec::new());
        }

        let victims: Vec<String> = sqlx::query_scalar(
            r#"SELECT article_id FROM context_items
               WHERE session_id = ? AND pinned = 0
               ORDER BY last_seen ASC, article_id ASC
               LIMIT ?"#,
        )
        .bind(session_id)
        .bind(excess)
        .fetch_all(&mut *conn)
        .await?;

        for article_id in &victims {
            Self::delete_item(conn, session_id, article_id).await?;
        }

        debug!("Evicted {} tracked items from session {}", victims.len(), session_id);
        Ok(victims)
    }

    pub async fn max_pin_order(conn: &mut SqliteConnection, session_id: &str) -> sqlx::Result<i64> {
        sqlx::query_scalar(
            "SELECT COALESCE(MAX(pin_order), 0) FROM context_items WHERE session_id = ? AND pinned = 1",
        )
        .bind(session_id)
        .fetch_one(&mut *conn)
        .await
    }

    pub async fn set_pinned(
        conn: &mut SqliteConnection,
        session_id: &str,
        article_id: &str,
        pin_order: i64,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE context_items SET pinned = 1, pin_order = ? WHERE session_id = ? AND article_id = ?",
        )
        .bind(pin_order)
        .bind(session_id)
        .bind(article_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn set_tracked(
        conn: &mut SqliteConnection,
        session_id: &str,
        article_id: &str,
        last_seen: i64,
    ) -> sqlx::Result<()> {
        sqlx::query(
            r#"UPDATE context_items
               SET pinned = 0, pin_order = 0, last_seen = ?
               WHERE session_id = ? AND article_id = ?"#,
        )
        .bind(last_seen)
        .bind(session_id)
        .bind(article_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn set_pin_order(
        conn: &mut SqliteConnection,
        session_id: &str,
        article_id: &str,
        pin_order: i64,
    ) -> sqlx::Result<()> {
        sqlx::query("UPDATE context_items SET pin_order = ? WHERE session_id = ? AND article_id = ?")
            .bind(pin_order)
            .bind(session_id)
            .bind(article_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Renumber the pinned sequence to 1..=n keeping its current order.
    pub async fn compact_pin_orders(conn: &mut SqliteConnection, session_id: &str) -> sqlx::Result<()> {
        let pinned: Vec<(String, i64)> = sqlx::query_as(
            r#"SELECT article_id, pin_order FROM context_items
               WHERE session_id = ? AND pinned = 1
               ORDER BY pin_order ASC, article_id ASC"#,
        )
        .bind(session_id)
        .fetch_all(&mut *conn)
        .await?;

        for (rank, (article_id, pin_order)) in pinned.iter().enumerate() {
            let expected = rank as i64 + 1;
            if *pin_order != expected {
                Self::set_pin_order(conn, session_id, article_id, expected).await?;
            }
        }

        Ok(())
    }

    /// Adjacent pinned entry in the given direction, as `(article_id, pin_order)`.
    pub async fn pinned_neighbour(
        conn: &mut SqliteConnection,
        session_id: &str,
        pin_order: i64,
        direction: MoveDirection,
    ) -> sqlx::Result<Option<(String, i64)>> {
        let sql = match direction {
            MoveDirection::Up => {
                r#"SELECT article_id, pin_order FROM context_items
                   WHERE session_id = ? AND pinned = 1 AND pin_order < ?
                   ORDER BY pin_order DESC LIMIT 1"#
            }
            MoveDirection::Down => {
                r#"SELECT article_id, pin_order FROM context_items
                   WHERE session_id = ? AND pinned = 1 AND pin_order > ?
                   ORDER BY pin_order ASC LIMIT 1"#
            }
        };

        sqlx::query_as(sql)
            .bind(session_id)
            .bind(pin_order)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn delete_item(
        conn: &mut SqliteConnection,
        session_id: &str,
        article_id: &str,
    ) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM context_items WHERE session_id = ? AND article_id = ?")
            .bind(session_id)
            .bind(article_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_session(conn: &mut SqliteConnection, session_id: &str) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM context_items WHERE session_id = ?")
            .bind(session_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_tracked(conn: &mut SqliteConnection, session_id: &str) -> sqlx::Result<u64> {
        let result = sqlx::query("DELETE FROM context_items WHERE session_id = ? AND pinned = 0")
            .bind(session_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Remove every session whose newest activity is older than `cutoff_ms`.
    /// Returns `(sessions, rows)` removed.
    pub async fn purge_idle_sessions(
        conn: &mut SqliteConnection,
        cutoff_ms: i64,
    ) -> sqlx::Result<(u64, u64)> {
        let sessions: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM (
                   SELECT session_id FROM context_items
                   GROUP BY session_id
                   HAVING MAX(last_seen) < ?
               )"#,
        )
        .bind(cutoff_ms)
        .fetch_one(&mut *conn)
        .await?;

        if sessions == 0 {
            return Ok((0, 0));
        }

        let result = sqlx::query(
            r#"DELETE FROM context_items
               WHERE session_id IN (
                   SELECT session_id FROM context_items
                   GROUP BY session_id
                   HAVING MAX(last_seen) < ?
               )"#,
        )
        .bind(cutoff_ms)
        .execute(&mut *conn)
        .await?;

        Ok((sessions as u64, result.rows_affected()))
    }

    pub async fn max_last_seen(conn: &mut SqliteConnection) -> sqlx::Result<i64> {
        sqlx::query_scalar("SELECT COALESCE(MAX(last_seen), 0) FROM context_items")
            .fetch_one(&mut *conn)
            .await
    }
}
