//! Transient notice queue.
//!
//! Holds at most one active notice per [`NoticeKind`]. Transitions:
//!
//! - `push(kind, message)` replaces the notice of that kind and (re)starts
//!   its single-shot expiry timer.
//! - `expire(kind, id)` removes the notice only if it is still the one the
//!   timer was started for, so a late timer never removes a newer notice.
//! - `clear(kind)` removes the notice and cancels its timer.
//!
//! Dropping the queue cancels every pending timer.
//!
//! Timers run on the ambient tokio runtime. Outside a runtime a pushed
//! notice simply stays until it is cleared.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use tienda_core::{Notice, NoticeKind};

/// Default time a notice stays visible.
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(4);

/// The currently active notices, at most one per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoticeBoard {
    error: Option<Notice>,
    success: Option<Notice>,
}

impl NoticeBoard {
    /// The active notice of `kind`.
    #[must_use]
    pub const fn get(&self, kind: NoticeKind) -> Option<&Notice> {
        match kind {
            NoticeKind::Error => self.error.as_ref(),
            NoticeKind::Success => self.success.as_ref(),
        }
    }

    /// Active error notice, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&Notice> {
        self.error.as_ref()
    }

    /// Active success notice, if any.
    #[must_use]
    pub const fn success(&self) -> Option<&Notice> {
        self.success.as_ref()
    }

    /// All active notices, errors first.
    #[must_use]
    pub fn active(&self) -> Vec<&Notice> {
        NoticeKind::ALL
            .iter()
            .filter_map(|kind| self.get(*kind))
            .collect()
    }

    /// Whether no notice is active.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.error.is_none() && self.success.is_none()
    }

    const fn slot(&mut self, kind: NoticeKind) -> &mut Option<Notice> {
        match kind {
            NoticeKind::Error => &mut self.error,
            NoticeKind::Success => &mut self.success,
        }
    }
}

/// Auto-expiring notices with one timer handle per kind.
#[derive(Debug)]
pub struct NoticeQueue {
    board: Arc<watch::Sender<NoticeBoard>>,
    timers: Mutex<HashMap<NoticeKind, AbortHandle>>,
    next_id: AtomicU64,
    ttl: Duration,
}

impl Default for NoticeQueue {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_TTL)
    }
}

impl NoticeQueue {
    /// Create an empty queue whose notices expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let (board, _) = watch::channel(NoticeBoard::default());
        Self {
            board: Arc::new(board),
            timers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            ttl,
        }
    }

    /// How long notices stay visible.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Show `message`, replacing any notice of the same kind.
    ///
    /// Returns the id of the new notice.
    pub fn push(&self, kind: NoticeKind, message: impl Into<String>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let notice = Notice {
            id,
            kind,
            message: message.into(),
            created_at: Utc::now(),
        };
        debug!(?kind, id, message = %notice.message, "Notice pushed");

        self.board.send_modify(|board| *board.slot(kind) = Some(notice));
        self.restart_timer(kind, id);
        id
    }

    /// Remove the notice of `kind` if it is still notice `id`.
    ///
    /// Returns whether a notice was removed.
    pub fn expire(&self, kind: NoticeKind, id: u64) -> bool {
        expire_on(&self.board, kind, id)
    }

    /// Remove the notice of `kind` and cancel its timer.
    pub fn clear(&self, kind: NoticeKind) {
        if let Some(timer) = self.timers_mut().remove(&kind) {
            timer.abort();
        }
        self.board.send_if_modified(|board| board.slot(kind).take().is_some());
    }

    /// Remove every notice and cancel every timer.
    pub fn clear_all(&self) {
        for kind in NoticeKind::ALL {
            self.clear(kind);
        }
    }

    /// Snapshot of the active notices.
    #[must_use]
    pub fn board(&self) -> NoticeBoard {
        self.board.borrow().clone()
    }

    /// The active notice of `kind`.
    #[must_use]
    pub fn get(&self, kind: NoticeKind) -> Option<Notice> {
        self.board.borrow().get(kind).cloned()
    }

    /// Watch the active notices.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<NoticeBoard> {
        self.board.subscribe()
    }

    fn restart_timer(&self, kind: NoticeKind, id: u64) {
        let mut timers = self.timers_mut();
        if let Some(previous) = timers.remove(&kind) {
            previous.abort();
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(?kind, id, "No async runtime; notice will not auto-expire");
            return;
        };

        let board = Arc::clone(&self.board);
        let ttl = self.ttl;
        let task = runtime.spawn(async move {
            tokio::time::sleep(ttl).await;
            if expire_on(&board, kind, id) {
                debug!(?kind, id, "Notice expired");
            }
        });
        timers.insert(kind, task.abort_handle());
    }

    fn timers_mut(&self) -> std::sync::MutexGuard<'_, HashMap<NoticeKind, AbortHandle>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for NoticeQueue {
    fn drop(&mut self) {
        for (_, timer) in self.timers_mut().drain() {
            timer.abort();
        }
    }
}

fn expire_on(board: &watch::Sender<NoticeBoard>, kind: NoticeKind, id: u64) -> bool {
    board.send_if_modified(|board| {
        let slot = board.slot(kind);
        if slot.as_ref().is_some_and(|notice| notice.id == id) {
            *slot = None;
            true
        } else {
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(4);

    async fn advance(duration: Duration) {
        tokio::time::sleep(duration).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_notice_per_kind() {
        let queue = NoticeQueue::new(TTL);
        queue.push(NoticeKind::Error, "first error");
        queue.push(NoticeKind::Success, "saved");

        let board = queue.board();
        assert_eq!(board.active().len(), 2);

        queue.push(NoticeKind::Error, "second error");
        let board = queue.board();
        assert_eq!(board.active().len(), 2);
        assert_eq!(
            board.error().map(|n| n.message.as_str()),
            Some("second error")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_notice_expires_after_ttl() {
        let queue = NoticeQueue::new(TTL);
        queue.push(NoticeKind::Error, "boom");

        advance(TTL - Duration::from_millis(1)).await;
        assert!(queue.get(NoticeKind::Error).is_some());

        advance(Duration::from_millis(2)).await;
        assert!(queue.get(NoticeKind::Error).is_none());
        assert!(queue.board().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacing_restarts_timer() {
        let queue = NoticeQueue::new(TTL);
        queue.push(NoticeKind::Error, "first");

        advance(Duration::from_secs(3)).await;
        queue.push(NoticeKind::Error, "second");

        // The first timer would have fired here.
        advance(Duration::from_secs(2)).await;
        assert_eq!(
            queue.get(NoticeKind::Error).map(|n| n.message),
            Some("second".to_string())
        );

        advance(Duration::from_secs(2)).await;
        assert!(queue.get(NoticeKind::Error).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_expire_is_ignored() {
        let queue = NoticeQueue::new(TTL);
        let first = queue.push(NoticeKind::Success, "one");
        let second = queue.push(NoticeKind::Success, "two");

        assert!(!queue.expire(NoticeKind::Success, first));
        assert!(queue.get(NoticeKind::Success).is_some());
        assert!(queue.expire(NoticeKind::Success, second));
        assert!(queue.get(NoticeKind::Success).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_timer() {
        let queue = NoticeQueue::new(TTL);
        queue.push(NoticeKind::Error, "boom");
        queue.clear(NoticeKind::Error);
        assert!(queue.board().is_empty());
        assert!(queue.timers_mut().is_empty());

        queue.push(NoticeKind::Success, "ok");
        queue.clear_all();
        assert!(queue.board().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_expiry() {
        let queue = NoticeQueue::new(TTL);
        queue.push(NoticeKind::Error, "boom");
        let mut rx = queue.subscribe();
        assert!(!rx.has_changed().expect("sender alive"));

        advance(TTL + Duration::from_millis(1)).await;
        assert!(rx.has_changed().expect("sender alive"));
        assert!(rx.borrow_and_update().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timers() {
        let queue = NoticeQueue::new(TTL);
        let rx = queue.subscribe();
        queue.push(NoticeKind::Error, "boom");
        drop(queue);

        advance(TTL * 2).await;
        // The cancelled timer no longer holds the board, so it is gone.
        assert!(rx.has_changed().is_err());
    }

    #[test]
    fn test_push_without_runtime_keeps_notice() {
        let queue = NoticeQueue::default();
        queue.push(NoticeKind::Error, "boom");
        assert!(queue.get(NoticeKind::Error).is_some());
        assert_eq!(queue.ttl(), DEFAULT_NOTICE_TTL);
    }
}
