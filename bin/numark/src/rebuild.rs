//! Rebuild state machine for development mode.
//!
//! A [`Rebuilder`] is either idle or building. A request that arrives while a
//! build is running is dropped, not queued. Every finished build is reported
//! to live-reload clients.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use color_eyre::eyre::Result;
use numark_generator::BuildStats;
use tokio::sync::{broadcast, mpsc};

use crate::server::LiveReloadMessage;

/// Quiet period before a burst of file changes triggers a rebuild.
pub const DEBOUNCE: Duration = Duration::from_millis(100);

/// Something that can run a full site build.
pub trait SiteBuilder: Send + Sync + 'static {
    fn build(&self) -> Result<BuildStats>;
}

/// Result of a rebuild request.
#[derive(Debug)]
pub enum RebuildOutcome {
    Built(BuildStats),
    Failed(String),
    /// A build was already running.
    Skipped,
}

/// Owns the idle/building flag and the live-reload broadcast.
pub struct Rebuilder {
    site: Arc<dyn SiteBuilder>,
    building: AtomicBool,
    reload_tx: broadcast::Sender<LiveReloadMessage>,
}

impl std::fmt::Debug for Rebuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rebuilder")
            .field("building", &self.is_building())
            .finish_non_exhaustive()
    }
}

/// Resets the building flag, even if the rebuild future is dropped.
struct BuildingGuard<'a>(&'a AtomicBool);

impl Drop for BuildingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Rebuilder {
    pub fn new(site: Arc<dyn SiteBuilder>, reload_tx: broadcast::Sender<LiveReloadMessage>) -> Self {
        Self {
            site,
            building: AtomicBool::new(false),
            reload_tx,
        }
    }

    pub fn is_building(&self) -> bool {
        self.building.load(Ordering::Acquire)
    }

    /// Subscribe to build notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<LiveReloadMessage> {
        self.reload_tx.subscribe()
    }

    /// Run one full build on a blocking thread, then notify clients.
    pub async fn rebuild(&self) -> RebuildOutcome {
        if self
            .building
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("build in progress, dropping rebuild request");
            return RebuildOutcome::Skipped;
        }
        let _guard = BuildingGuard(&self.building);

        let site = Arc::clone(&self.site);
        let result = tokio::task::spawn_blocking(move || site.build()).await;

        let outcome = match result {
            Ok(Ok(stats)) => RebuildOutcome::Built(stats),
            Ok(Err(e)) => RebuildOutcome::Failed(format!("{e:#}")),
            Err(e) => RebuildOutcome::Failed(format!("build task failed: {e}")),
        };

        match &outcome {
            RebuildOutcome::Built(stats) => {
                tracing::info!(pages = stats.pages, duration_ms = stats.duration_ms, "rebuilt site");
                self.notify(LiveReloadMessage::Reload);
            }
            RebuildOutcome::Failed(message) => {
                tracing::error!(error = %message, "rebuild failed");
                self.notify(LiveReloadMessage::Error {
                    message: message.clone(),
                });
            }
            RebuildOutcome::Skipped => {}
        }

        outcome
    }

    fn notify(&self, message: LiveReloadMessage) {
        // No subscribers is not an error.
        let _ = self.reload_tx.send(message);
    }
}

/// Turn bursts of change events into single rebuild requests.
///
/// Each burst is closed by `quiet` without a new event; the rebuild then
/// runs in its own task so events keep draining while it builds.
pub async fn debounce(mut events: mpsc::Receiver<()>, quiet: Duration, rebuilder: Arc<Rebuilder>) {
    while events.recv().await.is_some() {
        let closed = loop {
            match tokio::time::timeout(quiet, events.recv()).await {
                Ok(Some(())) => {}
                Ok(None) => break true,
                Err(_) => break false,
            }
        };

        let rebuilder = Arc::clone(&rebuilder);
        tokio::spawn(async move {
            rebuilder.rebuild().await;
        });

        if closed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use color_eyre::eyre::eyre;

    use super::*;

    #[derive(Default)]
    struct FakeSite {
        builds: AtomicUsize,
        fail: bool,
        delay: Duration,
    }

    impl SiteBuilder for FakeSite {
        fn build(&self) -> Result<BuildStats> {
            std::thread::sleep(self.delay);
            self.builds.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(eyre!("template exploded"))
            } else {
                Ok(BuildStats {
                    pages: 3,
                    ..BuildStats::default()
                })
            }
        }
    }

    fn rebuilder(site: Arc<FakeSite>) -> Arc<Rebuilder> {
        let (tx, _) = broadcast::channel(16);
        Arc::new(Rebuilder::new(site, tx))
    }

    #[tokio::test]
    async fn test_successful_rebuild_broadcasts_reload() {
        let rebuilder = rebuilder(Arc::new(FakeSite::default()));
        let mut rx = rebuilder.subscribe();

        let outcome = rebuilder.rebuild().await;

        assert!(matches!(outcome, RebuildOutcome::Built(stats) if stats.pages == 3));
        assert_eq!(rx.recv().await.unwrap(), LiveReloadMessage::Reload);
        assert!(!rebuilder.is_building());
    }

    #[tokio::test]
    async fn test_failed_rebuild_broadcasts_error() {
        let rebuilder = rebuilder(Arc::new(FakeSite {
            fail: true,
            ..FakeSite::default()
        }));
        let mut rx = rebuilder.subscribe();

        let outcome = rebuilder.rebuild().await;

        assert!(matches!(outcome, RebuildOutcome::Failed(ref m) if m.contains("template exploded")));
        assert_eq!(
            rx.recv().await.unwrap(),
            LiveReloadMessage::Error {
                message: "template exploded".to_string()
            }
        );
        assert!(!rebuilder.is_building());
    }

    #[tokio::test]
    async fn test_request_while_building_is_dropped() {
        let site = Arc::new(FakeSite {
            delay: Duration::from_millis(200),
            ..FakeSite::default()
        });
        let rebuilder = rebuilder(Arc::clone(&site));

        let first = tokio::spawn({
            let rebuilder = Arc::clone(&rebuilder);
            async move { rebuilder.rebuild().await }
        });
        while !rebuilder.is_building() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert!(matches!(rebuilder.rebuild().await, RebuildOutcome::Skipped));
        assert!(matches!(first.await.unwrap(), RebuildOutcome::Built(_)));
        assert_eq!(site.builds.load(Ordering::SeqCst), 1);

        assert!(matches!(rebuilder.rebuild().await, RebuildOutcome::Built(_)));
        assert_eq!(site.builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_burst_of_events_triggers_one_rebuild() {
        let site = Arc::new(FakeSite::default());
        let rebuilder = rebuilder(Arc::clone(&site));
        let mut rx = rebuilder.subscribe();
        let (tx, events) = mpsc::channel(16);

        let task = tokio::spawn(debounce(events, Duration::from_millis(50), rebuilder));
        for _ in 0..5 {
            tx.send(()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(rx.recv().await.unwrap(), LiveReloadMessage::Reload);
        assert_eq!(site.builds.load(Ordering::SeqCst), 1);

        drop(tx);
        task.await.unwrap();
    }
}
