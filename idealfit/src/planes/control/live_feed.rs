use crate::domain::LiveStatus;
use crate::events::LiveEvent;
use crate::planes::control::live_versions::LiveVersions;
use crate::ports::Clock;
use futures::stream::{self, Stream, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Per-connection change notifications for one shop.
///
/// Each subscription polls the live version on its own timer and emits
/// `init` once, then `update` when the version moved since the last event or
/// `ping` when it did not. Bursts between two polls coalesce into a single
/// `update` carrying the latest version.
#[derive(Clone)]
pub struct LiveFeed {
    versions: LiveVersions,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    open: Arc<AtomicUsize>,
}

impl LiveFeed {
    pub fn new(versions: LiveVersions, clock: Arc<dyn Clock>, poll_interval: Duration) -> Self {
        Self {
            versions,
            clock,
            poll_interval,
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of subscriptions whose timer is still alive
    pub fn open_subscriptions(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Opens a subscription. The stream ends when `shutdown` fires or a version
    /// read fails; dropping it (client disconnect) stops its timer.
    pub fn subscribe(
        &self,
        shop: String,
        shutdown: CancellationToken,
    ) -> impl Stream<Item = LiveEvent> + Send + use<> {
        let id = Uuid::new_v4();
        let open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        info!(%id, shop, open, "live stream opened");

        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let subscription = Subscription {
            versions: self.versions.clone(),
            clock: self.clock.clone(),
            ticker,
            last_version: None,
            shutdown,
            guard: OpenGuard {
                open: self.open.clone(),
                id,
                shop,
            },
        };

        stream::unfold(subscription, |mut sub| async move {
            let event = sub.next_event().await?;
            Some((event, sub))
        })
        .fuse()
    }
}

struct Subscription {
    versions: LiveVersions,
    clock: Arc<dyn Clock>,
    ticker: Interval,
    last_version: Option<u64>,
    shutdown: CancellationToken,
    guard: OpenGuard,
}

impl Subscription {
    fn shop(&self) -> &str {
        &self.guard.shop
    }

    async fn next_event(&mut self) -> Option<LiveEvent> {
        if self.shutdown.is_cancelled() {
            return None;
        }

        let Some(last_version) = self.last_version else {
            let record = self.read().await?;
            self.last_version = Some(record.version);
            return Some(LiveEvent::Init(LiveStatus::new(self.shop(), record)));
        };

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                debug!(id = %self.guard.id, "live stream cancelled by shutdown");
                return None;
            }
            _ = self.ticker.tick() => {}
        }

        let record = self.read().await?;
        if record.version != last_version {
            self.last_version = Some(record.version);
            Some(LiveEvent::Update(LiveStatus::new(self.shop(), record)))
        } else {
            Some(LiveEvent::Ping {
                ts: self.clock.now_ms(),
            })
        }
    }

    async fn read(&self) -> Option<crate::domain::LiveVersion> {
        match self.versions.try_current(self.shop()).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(id = %self.guard.id, shop = self.shop(), error = %e, "live version read failed, closing stream");
                None
            }
        }
    }
}

/// Decrements the open-subscription count when the stream state is dropped
struct OpenGuard {
    open: Arc<AtomicUsize>,
    id: Uuid,
    shop: String,
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        let open = self.open.fetch_sub(1, Ordering::SeqCst) - 1;
        info!(id = %self.id, shop = %self.shop, open, "live stream closed");
    }
}
