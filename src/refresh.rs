use crate::aggregator::aggregate;
use crate::config::Config;
use crate::fixture::load_fixture;
use crate::models::{SourceData, ViewModel};
use crate::source::UpstreamClient;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Refreshed(Arc<ViewModel>),
    /// Another refresh was running; nothing was fetched.
    AlreadyRunning,
}

/// Owns the refresh cycle and the latest snapshot. Snapshots are replaced
/// whole, never edited.
pub struct Refresher {
    config: Config,
    upstream: Option<UpstreamClient>,
    in_progress: AtomicBool,
    snapshot: Mutex<Option<Arc<ViewModel>>>,
}

impl Refresher {
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let upstream = match &config.upstream_base_url {
            Some(base_url) => {
                let client = reqwest::Client::builder().timeout(config.fetch_timeout).build()?;
                Some(UpstreamClient::new(client, base_url, config.fetch_timeout, config.period_days))
            }
            None => None,
        };

        Ok(Self {
            config,
            upstream,
            in_progress: AtomicBool::new(false),
            snapshot: Mutex::new(None),
        })
    }

    pub async fn latest(&self) -> Option<Arc<ViewModel>> {
        self.snapshot.lock().await.clone()
    }

    /// Latest snapshot, refreshing first when there is none yet.
    pub async fn current(&self) -> Option<Arc<ViewModel>> {
        if let Some(view) = self.latest().await {
            return Some(view);
        }
        match self.refresh().await {
            RefreshOutcome::Refreshed(view) => Some(view),
            RefreshOutcome::AlreadyRunning => None,
        }
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("refresh already in progress, skipping");
            return RefreshOutcome::AlreadyRunning;
        }
        let _flag = InProgress(&self.in_progress);

        let today = Local::now().date_naive();
        let data = self.collect(today).await;
        let view = Arc::new(aggregate(today, &data, &self.config.aggregate_options()));

        *self.snapshot.lock().await = Some(Arc::clone(&view));
        info!(
            data_source = ?view.data_source,
            campaigns = view.campaigns.len(),
            "dashboard refreshed"
        );

        RefreshOutcome::Refreshed(view)
    }

    async fn collect(&self, today: NaiveDate) -> SourceData {
        let fallback_path = self.config.fallback_data_path.as_deref();
        let Some(upstream) = &self.upstream else {
            info!("no upstream configured, using fallback data");
            return load_fixture(fallback_path, today).await;
        };

        let results = upstream.fetch_all().await;
        let fixture = if results.is_complete() {
            SourceData::default()
        } else {
            load_fixture(fallback_path, today).await
        };
        results.into_source_data(fixture)
    }
}

/// Clears the in-progress flag when the refresh ends, however it ends.
struct InProgress<'a>(&'a AtomicBool);

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Refreshes immediately, then every `every`.
pub fn spawn_periodic(refresher: Arc<Refresher>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            refresher.refresh().await;
        }
    })
}
