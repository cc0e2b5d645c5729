use std::time::Duration;
use tracing::{debug, info};

use super::clock::MonotonicClock;
use super::export::{self, ExportPayload};
use super::locks::SessionLocks;
use crate::config::ContextConfig;
use crate::database::{DbPool, Repository};
use crate::models::{
    ArticleInput, ArticleRef, ContextSnapshot, ContextStats, ExportFormat, MoveDirection,
};
use crate::session::SessionId;
use crate::utils::error::ContextError;

/// Authoritative per-session article context.
///
/// Mutations on one session are serialized by its lock and each runs as a
/// single write transaction; the snapshot they return is read inside that
/// transaction. Reads go straight to the pool.
pub struct ContextStore {
    pool: DbPool,
    locks: SessionLocks,
    clock: MonotonicClock,
    config: ContextConfig,
}

impl ContextStore {
    pub async fn open(pool: DbPool, config: ContextConfig) -> Result<Self, ContextError> {
        let mut conn = pool.get_pool().acquire().await?;
        let floor = Repository::max_last_seen(&mut conn).await?;
        drop(conn);

        info!(
            "Context store ready: max_tracked={}, auto_clear_on_search={}",
            config.max_tracked, config.auto_clear_tracked_on_search
        );

        Ok(Self {
            pool,
            locks: SessionLocks::new(config.lock_timeout()),
            clock: MonotonicClock::starting_after(floor),
            config,
        })
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    fn max_tracked(&self) -> usize {
        self.config.max_tracked.max(1)
    }

    /// Upsert an article; new ids enter as tracked, then the cap is enforced.
    pub async fn track(
        &self,
        session: &SessionId,
        article: ArticleInput,
    ) -> Result<ContextSnapshot, ContextError> {
        let article = article.validate()?;
        let sid = session.as_str();

        let _guard = self.locks.acquire(session).await?;
        let mut tx = self.pool.begin_write().await?;

        let last_seen = self.clock.next();
        match Repository::fetch_item(&mut tx, sid, &article.id).await? {
            Some(_) => Repository::refresh_item(&mut tx, sid, &article, last_seen).await?,
            None => Repository::insert_tracked(&mut tx, sid, &article, last_seen).await?,
        }

        let evicted = Repository::evict_tracked_over(&mut tx, sid, self.max_tracked()).await?;
        let snapshot = Repository::snapshot(&mut tx, sid).await?;
        tx.commit().await?;

        if !evicted.is_empty() {
            info!("Session {}: evicted {:?} over tracked cap", sid, evicted);
        }
        debug!("Session {}: tracked {} ({} items)", sid, article.id, snapshot.stats.total);
        Ok(snapshot)
    }

    /// Append to the end of the pinned sequence. Already pinned is a no-op.
    pub async fn pin(&self, session: &SessionId, id: &str) -> Result<ContextSnapshot, ContextError> {
        let id = require_article_id(id)?;
        let sid = session.as_str();

        let _guard = self.locks.acquire(session).await?;
        let mut tx = self.pool.begin_write().await?;

        let item = Repository::fetch_item(&mut tx, sid, id)
            .await?
            .ok_or_else(|| not_in_context(id))?;

        if !item.pinned {
            let order = Repository::max_pin_order(&mut tx, sid).await? + 1;
            Repository::set_pinned(&mut tx, sid, id, order).await?;
            debug!("Session {}: pinned {} at {}", sid, id, order);
        }

        let snapshot = Repository::snapshot(&mut tx, sid).await?;
        tx.commit().await?;
        Ok(snapshot)
    }

    /// Move a pinned entry back to the head of the tracked sequence.
    /// Absent or already tracked ids are a no-op.
    pub async fn unpin(&self, session: &SessionId, id: &str) -> Result<ContextSnapshot, ContextError> {
        let id = require_article_id(id)?;
        let sid = session.as_str();

        let _guard = self.locks.acquire(session).await?;
        let mut tx = self.pool.begin_write().await?;

        let pinned = Repository::fetch_item(&mut tx, sid, id)
            .await?
            .is_some_and(|item| item.pinned);

        if pinned {
            let last_seen = self.clock.next();
            Repository::set_tracked(&mut tx, sid, id, last_seen).await?;
            Repository::compact_pin_orders(&mut tx, sid).await?;
            let evicted = Repository::evict_tracked_over(&mut tx, sid, self.max_tracked()).await?;
            if !evicted.is_empty() {
                info!("Session {}: evicted {:?} after unpin", sid, evicted);
            }
            debug!("Session {}: unpinned {}", sid, id);
        }

        let snapshot = Repository::snapshot(&mut tx, sid).await?;
        tx.commit().await?;
        Ok(snapshot)
    }

    /// Swap with the adjacent pinned entry; at the boundary nothing changes.
    pub async fn move_pinned(
        &self,
        session: &SessionId,
        id: &str,
        direction: MoveDirection,
    ) -> Result<ContextSnapshot, ContextError> {
        let id = require_article_id(id)?;
        let sid = session.as_str();

        let _guard = self.locks.acquire(session).await?;
        let mut tx = self.pool.begin_write().await?;

        let item = Repository::fetch_item(&mut tx, sid, id)
            .await?
            .filter(|item| item.pinned)
            .ok_or_else(|| ContextError::NotFound(format!("article {} is not pinned", id)))?;

        if let Some((neighbour, neighbour_order)) =
            Repository::pinned_neighbour(&mut tx, sid, item.pin_order, direction).await?
        {
            Repository::set_pin_order(&mut tx, sid, id, neighbour_order).await?;
            Repository::set_pin_order(&mut tx, sid, &neighbour, item.pin_order).await?;
            debug!("Session {}: moved {} {:?} past {}", sid, id, direction, neighbour);
        }

        let snapshot = Repository::snapshot(&mut tx, sid).await?;
        tx.commit().await?;
        Ok(snapshot)
    }

    pub async fn list(&self, session: &SessionId) -> Result<Vec<ArticleRef>, ContextError> {
        self.list_limited(session, None).await
    }

    pub(crate) async fn list_limited(
        &self,
        session: &SessionId,
        limit: Option<usize>,
    ) -> Result<Vec<ArticleRef>, ContextError> {
        let mut conn = self.pool.get_pool().acquire().await?;
        Ok(Repository::list_items(&mut conn, session.as_str(), limit).await?)
    }

    /// Listing and stats from one read.
    pub async fn snapshot(&self, session: &SessionId) -> Result<ContextSnapshot, ContextError> {
        Ok(ContextSnapshot::new(self.list(session).await?))
    }

    pub async fn stats(&self, session: &SessionId) -> Result<ContextStats, ContextError> {
        let mut conn = self.pool.get_pool().acquire().await?;
        Ok(Repository::stats(&mut conn, session.as_str()).await?)
    }

    pub async fn clear_all(&self, session: &SessionId) -> Result<ContextSnapshot, ContextError> {
        let sid = session.as_str();
        let guard = self.locks.acquire(session).await?;
        let mut tx = self.pool.begin_write().await?;

        let removed = Repository::delete_session(&mut tx, sid).await?;
        let snapshot = Repository::snapshot(&mut tx, sid).await?;
        tx.commit().await?;

        // The session no longer exists; its lock entry goes with it unless
        // another request is already queued on it
        drop(guard);
        self.locks.forget(session);

        info!("Session {}: cleared {} items", sid, removed);
        Ok(snapshot)
    }

    pub async fn clear_tracked(&self, session: &SessionId) -> Result<ContextSnapshot, ContextError> {
        let sid = session.as_str();
        let _guard = self.locks.acquire(session).await?;
        let mut tx = self.pool.begin_write().await?;

        let removed = Repository::delete_tracked(&mut tx, sid).await?;
        let snapshot = Repository::snapshot(&mut tx, sid).await?;
        tx.commit().await?;

        info!("Session {}: cleared {} tracked items", sid, removed);
        Ok(snapshot)
    }

    /// A new archive search started in this session.
    pub async fn begin_search(&self, session: &SessionId) -> Result<ContextSnapshot, ContextError> {
        if self.config.auto_clear_tracked_on_search {
            self.clear_tracked(session).await
        } else {
            self.snapshot(session).await
        }
    }

    pub async fn export(
        &self,
        session: &SessionId,
        format: ExportFormat,
    ) -> Result<ExportPayload, ContextError> {
        let items = self.list(session).await?;
        export::render(session, &items, format)
            .map_err(|e| ContextError::StorageUnavailable(format!("export failed: {}", e)))
    }

    /// Delete sessions with no activity for `idle_for`. Returns sessions removed.
    pub async fn purge_idle(&self, idle_for: Duration) -> Result<u64, ContextError> {
        let idle_ms = i64::try_from(idle_for.as_millis()).unwrap_or(i64::MAX);
        let cutoff = MonotonicClock::now_ms().saturating_sub(idle_ms);

        let mut tx = self.pool.begin_write().await?;
        let (sessions, rows) = Repository::purge_idle_sessions(&mut tx, cutoff).await?;
        tx.commit().await?;

        if sessions > 0 {
            info!("Purged {} idle sessions ({} items)", sessions, rows);
        }
        Ok(sessions)
    }

    /// Drop lock entries of sessions with no request in flight.
    pub fn release_idle_locks(&self) -> usize {
        self.locks.release_idle()
    }

    pub fn lock_entries(&self) -> usize {
        self.locks.len()
    }
}

fn require_article_id(id: &str) -> Result<&str, ContextError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ContextError::InvalidInput("article id is required".to_string()));
    }
    Ok(id)
}

fn not_in_context(id: &str) -> ContextError {
    ContextError::NotFound(format!("article {} is not in this session's context", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn store_with_cap(max_tracked: usize) -> ContextStore {
        let pool = DbPool::in_memory().await.unwrap();
        let config = ContextConfig {
            max_tracked,
            ..ContextConfig::default()
        };
        ContextStore::open(pool, config).await.unwrap()
    }

    fn sid(raw: &str) -> SessionId {
        SessionId::parse(raw).unwrap()
    }

    fn article(id: &str) -> ArticleInput {
        ArticleInput::new(id, format!("Article {}", id))
    }

    #[tokio::test]
    async fn test_scenario_eviction_then_pin_then_retrack() {
        let store = store_with_cap(2).await;
        let s = sid("scenario");

        for id in ["A", "B", "C"] {
            store.track(&s, article(id)).await.unwrap();
        }
        let snapshot = store.snapshot(&s).await.unwrap();
        assert_eq!(snapshot.ids(), vec!["C", "B"]);

        let snapshot = store.pin(&s, "B").await.unwrap();
        assert_eq!(snapshot.ids(), vec!["B", "C"]);
        assert!(snapshot.items[0].pinned);

        let snapshot = store.track(&s, article("A")).await.unwrap();
        assert_eq!(snapshot.ids(), vec!["B", "A", "C"]);
        assert_eq!(snapshot.stats, ContextStats { pinned: 1, tracked: 2, total: 3 });
    }

    #[tokio::test]
    async fn test_tracked_cap_holds_and_pinned_is_unbounded() {
        let store = store_with_cap(3).await;
        let s = sid("cap");

        for i in 0..5 {
            let id = format!("p{}", i);
            store.track(&s, article(&id)).await.unwrap();
            store.pin(&s, &id).await.unwrap();
        }
        for i in 0..20 {
            let snapshot = store.track(&s, article(&format!("t{}", i))).await.unwrap();
            assert!(snapshot.stats.tracked <= 3);
        }

        let stats = store.stats(&s).await.unwrap();
        assert_eq!(stats, ContextStats { pinned: 5, tracked: 3, total: 8 });

        let tracked: Vec<String> = store
            .list(&s)
            .await
            .unwrap()
            .into_iter()
            .filter(|item| !item.pinned)
            .map(|item| item.id)
            .collect();
        assert_eq!(tracked, vec!["t19", "t18", "t17"]);
    }

    #[tokio::test]
    async fn test_retrack_updates_in_place_and_bumps_last_seen() {
        let store = store_with_cap(50).await;
        let s = sid("retrack");

        let first = store.track(&s, article("X")).await.unwrap();
        let mut refreshed = article("X");
        refreshed.snippet = "Later edition".to_string();
        let second = store.track(&s, refreshed).await.unwrap();

        assert_eq!(second.stats.total, 1);
        assert!(second.items[0].last_seen > first.items[0].last_seen);
        assert_eq!(second.items[0].snippet, "Later edition");

        // identical payload again: still one row
        let third = store.track(&s, article("X")).await.unwrap();
        assert_eq!(third.stats.total, 1);
    }

    #[tokio::test]
    async fn test_retrack_of_pinned_refreshes_metadata_keeps_order() {
        let store = store_with_cap(50).await;
        let s = sid("pinned-refresh");

        for id in ["A", "B"] {
            store.track(&s, article(id)).await.unwrap();
            store.pin(&s, id).await.unwrap();
        }

        let mut newer = article("A");
        newer.title = "Corrected heading".to_string();
        let snapshot = store.track(&s, newer).await.unwrap();

        assert_eq!(snapshot.pinned_ids(), vec!["A", "B"]);
        assert_eq!(snapshot.items[0].title, "Corrected heading");
        assert_eq!(snapshot.items[0].pin_order, 1);
    }

    #[tokio::test]
    async fn test_pin_unknown_id_is_not_found() {
        let store = store_with_cap(50).await;
        let s = sid("pin-missing");

        let err = store.pin(&s, "nope").await.unwrap_err();
        assert!(matches!(err, ContextError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_pin_is_idempotent() {
        let store = store_with_cap(50).await;
        let s = sid("pin-twice");
        store.track(&s, article("A")).await.unwrap();

        let once = store.pin(&s, "A").await.unwrap();
        let twice = store.pin(&s, "A").await.unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.items[0].pin_order, 1);
    }

    #[tokio::test]
    async fn test_pin_unpin_pin_appends_to_end() {
        let store = store_with_cap(50).await;
        let s = sid("repin");

        for id in ["A", "B", "C"] {
            store.track(&s, article(id)).await.unwrap();
            store.pin(&s, id).await.unwrap();
        }

        let snapshot = store.unpin(&s, "A").await.unwrap();
        assert_eq!(snapshot.pinned_ids(), vec!["B", "C"]);
        let orders: Vec<i64> = snapshot
            .items
            .iter()
            .filter(|item| item.pinned)
            .map(|item| item.pin_order)
            .collect();
        assert_eq!(orders, vec![1, 2]);

        let snapshot = store.pin(&s, "A").await.unwrap();
        assert_eq!(snapshot.pinned_ids(), vec!["B", "C", "A"]);
        assert!(snapshot.items.iter().all(|item| item.pinned));
    }

    #[tokio::test]
    async fn test_unpin_goes_to_head_of_tracked() {
        let store = store_with_cap(50).await;
        let s = sid("unpin-head");

        store.track(&s, article("P")).await.unwrap();
        store.pin(&s, "P").await.unwrap();
        store.track(&s, article("T1")).await.unwrap();
        store.track(&s, article("T2")).await.unwrap();

        let snapshot = store.unpin(&s, "P").await.unwrap();
        assert_eq!(snapshot.ids(), vec!["P", "T2", "T1"]);
        assert_eq!(snapshot.stats.pinned, 0);
        assert_eq!(snapshot.items[0].pin_order, 0);
    }

    #[tokio::test]
    async fn test_unpin_respects_tracked_cap() {
        let store = store_with_cap(2).await;
        let s = sid("unpin-cap");

        store.track(&s, article("P")).await.unwrap();
        store.pin(&s, "P").await.unwrap();
        store.track(&s, article("T1")).await.unwrap();
        store.track(&s, article("T2")).await.unwrap();

        let snapshot = store.unpin(&s, "P").await.unwrap();
        assert_eq!(snapshot.ids(), vec!["P", "T2"]);
    }

    #[tokio::test]
    async fn test_unpin_absent_or_tracked_is_noop() {
        let store = store_with_cap(50).await;
        let s = sid("unpin-noop");
        store.track(&s, article("A")).await.unwrap();

        let before = store.snapshot(&s).await.unwrap();
        assert_eq!(store.unpin(&s, "A").await.unwrap(), before);
        assert_eq!(store.unpin(&s, "missing").await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_move_boundaries_and_inverse() {
        let store = store_with_cap(50).await;
        let s = sid("move");

        for id in ["A", "B", "C", "D"] {
            store.track(&s, article(id)).await.unwrap();
            store.pin(&s, id).await.unwrap();
        }
        let original = store.snapshot(&s).await.unwrap();

        let top = store.move_pinned(&s, "A", MoveDirection::Up).await.unwrap();
        assert_eq!(top, original);
        let bottom = store.move_pinned(&s, "D", MoveDirection::Down).await.unwrap();
        assert_eq!(bottom, original);

        let moved = store.move_pinned(&s, "B", MoveDirection::Down).await.unwrap();
        assert_eq!(moved.pinned_ids(), vec!["A", "C", "B", "D"]);
        let back = store.move_pinned(&s, "B", MoveDirection::Up).await.unwrap();
        assert_eq!(back.pinned_ids(), original.pinned_ids());

        let moved = store.move_pinned(&s, "C", MoveDirection::Up).await.unwrap();
        assert_eq!(moved.pinned_ids(), vec!["A", "C", "B", "D"]);
        let back = store.move_pinned(&s, "C", MoveDirection::Down).await.unwrap();
        assert_eq!(back.pinned_ids(), original.pinned_ids());
    }

    #[tokio::test]
    async fn test_move_requires_pinned_id() {
        let store = store_with_cap(50).await;
        let s = sid("move-missing");
        store.track(&s, article("T")).await.unwrap();

        for id in ["T", "nope"] {
            let err = store.move_pinned(&s, id, MoveDirection::Up).await.unwrap_err();
            assert!(matches!(err, ContextError::NotFound(_)));
        }
    }

    #[tokio::test]
    async fn test_clear_tracked_and_clear_all() {
        let store = store_with_cap(50).await;
        let s = sid("clear");

        for id in ["A", "B", "C"] {
            store.track(&s, article(id)).await.unwrap();
        }
        store.pin(&s, "B").await.unwrap();

        let snapshot = store.clear_tracked(&s).await.unwrap();
        assert_eq!(snapshot.stats, ContextStats { pinned: 1, tracked: 0, total: 1 });
        assert_eq!(snapshot.ids(), vec!["B"]);

        let snapshot = store.clear_all(&s).await.unwrap();
        assert_eq!(snapshot.stats, ContextStats::default());
        assert!(store.list(&s).await.unwrap().is_empty());
        assert_eq!(store.stats(&s).await.unwrap(), ContextStats::default());
    }

    #[tokio::test]
    async fn test_clear_all_drops_session_lock_entry() {
        let store = store_with_cap(50).await;

        for i in 0..500 {
            let s = sid(&format!("visitor-{}", i));
            store.track(&s, article("A")).await.unwrap();
            store.clear_all(&s).await.unwrap();
        }

        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM context_items")
            .fetch_one(store.pool.get_pool())
            .await
            .unwrap();
        assert_eq!(rows, 0);
        assert_eq!(store.lock_entries(), 0);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_state_unchanged() {
        let store = store_with_cap(1).await;
        let s = sid("rollback");

        store.track(&s, article("A")).await.unwrap();
        let before_items = store.list(&s).await.unwrap();
        let before_stats = store.stats(&s).await.unwrap();

        // Eviction of A fails after B has been inserted in the same transaction
        sqlx::query(
            r#"CREATE TRIGGER block_delete BEFORE DELETE ON context_items
               BEGIN SELECT RAISE(ABORT, 'delete blocked'); END"#,
        )
        .execute(store.pool.get_pool())
        .await
        .unwrap();

        let err = store.track(&s, article("B")).await.unwrap_err();
        assert!(matches!(err, ContextError::StorageUnavailable(_)));

        assert_eq!(store.list(&s).await.unwrap(), before_items);
        assert_eq!(store.stats(&s).await.unwrap(), before_stats);

        // the session stays usable once storage recovers
        sqlx::query("DROP TRIGGER block_delete")
            .execute(store.pool.get_pool())
            .await
            .unwrap();
        let snapshot = store.track(&s, article("B")).await.unwrap();
        assert_eq!(snapshot.ids(), vec!["B"]);
    }

    #[tokio::test]
    async fn test_unknown_session_reads_are_empty() {
        let store = store_with_cap(50).await;
        let s = sid("never-seen");

        assert!(store.list(&s).await.unwrap().is_empty());
        assert_eq!(store.stats(&s).await.unwrap(), ContextStats::default());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = store_with_cap(1).await;
        let a = sid("alpha");
        let b = sid("beta");

        store.track(&a, article("1")).await.unwrap();
        store.track(&b, article("1")).await.unwrap();
        store.track(&b, article("2")).await.unwrap();

        assert_eq!(store.snapshot(&a).await.unwrap().ids(), vec!["1"]);
        assert_eq!(store.snapshot(&b).await.unwrap().ids(), vec!["2"]);
    }

    #[tokio::test]
    async fn test_track_rejects_missing_article_id() {
        let store = store_with_cap(50).await;
        let err = store
            .track(&sid("bad"), ArticleInput::new("", "no id"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContextError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_begin_search_respects_toggle() {
        let pool = DbPool::in_memory().await.unwrap();
        let config = ContextConfig {
            auto_clear_tracked_on_search: true,
            ..ContextConfig::default()
        };
        let store = ContextStore::open(pool, config).await.unwrap();
        let s = sid("search");

        store.track(&s, article("A")).await.unwrap();
        store.track(&s, article("B")).await.unwrap();
        store.pin(&s, "A").await.unwrap();

        let snapshot = store.begin_search(&s).await.unwrap();
        assert_eq!(snapshot.ids(), vec!["A"]);

        let off = store_with_cap(50).await;
        off.track(&s, article("A")).await.unwrap();
        assert_eq!(off.begin_search(&s).await.unwrap().stats.total, 1);
    }

    #[tokio::test]
    async fn test_purge_idle_removes_only_stale_sessions() {
        let store = store_with_cap(50).await;
        let fresh = sid("fresh");
        let stale = sid("stale");

        store.track(&stale, article("old")).await.unwrap();
        sqlx::query("UPDATE context_items SET last_seen = 1 WHERE session_id = ?")
            .bind(stale.as_str())
            .execute(store.pool.get_pool())
            .await
            .unwrap();
        store.track(&fresh, article("new")).await.unwrap();

        // a ttl far past the epoch purges nothing
        let purged = store.purge_idle(Duration::from_secs(u64::MAX)).await.unwrap();
        assert_eq!(purged, 0);

        let purged = store.purge_idle(Duration::from_secs(3600)).await.unwrap();
        assert_eq!(purged, 1);
        assert!(store.list(&stale).await.unwrap().is_empty());
        assert_eq!(store.list(&fresh).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_tracks_never_exceed_cap() {
        let dir = tempfile::tempdir().unwrap();
        let config = crate::config::StorageConfig {
            url: format!("sqlite://{}", dir.path().join("context.db").display()),
            ..crate::config::StorageConfig::default()
        };
        let pool = DbPool::new(&config).await.unwrap();
        let store = Arc::new(
            ContextStore::open(
                pool,
                ContextConfig {
                    max_tracked: 5,
                    lock_timeout_ms: 10_000,
                    ..ContextConfig::default()
                },
            )
            .await
            .unwrap(),
        );

        let mut handles = Vec::new();
        for worker in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let shared = SessionId::parse("shared").unwrap();
                let own = SessionId::parse(&format!("own-{}", worker)).unwrap();
                for i in 0..10 {
                    let id = format!("w{}-{}", worker, i);
                    store.track(&shared, ArticleInput::new(&id, "x")).await.unwrap();
                    store.track(&own, ArticleInput::new(&id, "x")).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let shared = store.snapshot(&sid("shared")).await.unwrap();
        assert_eq!(shared.stats.tracked, 5);
        for worker in 0..8 {
            let own = store.stats(&sid(&format!("own-{}", worker))).await.unwrap();
            assert_eq!(own.tracked, 5);
        }

        let mut seen: Vec<i64> = shared.items.iter().map(|item| item.last_seen).collect();
        let len = seen.len();
        seen.dedup();
        assert_eq!(seen.len(), len);
    }

    #[tokio::test]
    async fn test_state_survives_reopen_and_clock_resumes() {
        let dir = tempfile::tempdir().unwrap();
        let config = crate::config::StorageConfig {
            url: format!("sqlite://{}", dir.path().join("context.db").display()),
            ..crate::config::StorageConfig::default()
        };
        let s = sid("durable");

        let last_seen = {
            let store = ContextStore::open(DbPool::new(&config).await.unwrap(), ContextConfig::default())
                .await
                .unwrap();
            store.track(&s, article("A")).await.unwrap();
            let snapshot = store.pin(&s, "A").await.unwrap();
            store.pool.close().await;
            snapshot.items[0].last_seen
        };

        let store = ContextStore::open(DbPool::new(&config).await.unwrap(), ContextConfig::default())
            .await
            .unwrap();
        let items = store.list(&s).await.unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].pinned);

        let snapshot = store.track(&s, article("A")).await.unwrap();
        assert!(snapshot.items[0].last_seen > last_seen);
    }
}
