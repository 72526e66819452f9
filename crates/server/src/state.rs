use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use relaymux_cluster::ClusterNode;
use relaymux_config::RelayConfig;
use relaymux_core::route::RouteConfig;
use relaymux_core::time_interval::TimeInterval;
use relaymux_core::types::RouteId;
use relaymux_dispatch::Dispatcher;
use relaymux_inhibit::InhibitionEngine;
use relaymux_nflog::NflogStore;
use relaymux_pipeline::{ClusterView, NotificationPipeline};
use relaymux_provider::AlertProvider;
use relaymux_silence::SilenceStore;
use relaymux_state::StateStore;
use tokio::sync::RwLock;

use crate::notifiers::{self, BoundIntegration};
use crate::persistence::SnapshotPaths;

/// Everything a request handler or the scheduler needs: the live stores,
/// the current config, and the derived routing/notifier tables built
/// from it.
///
/// Cloning an `AppState` is cheap -- every field is an `Arc`, so axum's
/// per-request `State` extractor and the background scheduler task share
/// the same underlying stores.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<AlertProvider>,
    pub dispatcher: Arc<Dispatcher>,
    pub silences: Arc<SilenceStore>,
    pub nflog: Arc<NflogStore>,
    pub inhibitor: Arc<RwLock<InhibitionEngine>>,
    pub store: Arc<dyn StateStore>,
    pub cluster: Arc<ClusterNode>,
    pub config: Arc<RwLock<RelayConfig>>,
    pub notifiers: Arc<RwLock<HashMap<String, Vec<BoundIntegration>>>>,
    pub route_configs: Arc<RwLock<HashMap<RouteId, RouteConfig>>>,
    pub started_at: DateTime<Utc>,
    /// Where to write periodic silence/notify-log snapshots. `None`
    /// disables durable persistence -- state then lives only for the
    /// process lifetime, same as before snapshotting existed.
    pub snapshot_paths: Option<SnapshotPaths>,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: RelayConfig,
        store: Arc<dyn StateStore>,
        silences: Arc<SilenceStore>,
        nflog: Arc<NflogStore>,
        cluster: Arc<ClusterNode>,
        snapshot_paths: Option<SnapshotPaths>,
    ) -> Self {
        let inhibitor = InhibitionEngine::new(config.inhibit_rules.clone());
        let notifiers = notifiers::build(&config);
        Self {
            provider: Arc::new(AlertProvider::default()),
            dispatcher: Arc::new(Dispatcher::new()),
            silences,
            nflog,
            inhibitor: Arc::new(RwLock::new(inhibitor)),
            store,
            cluster,
            config: Arc::new(RwLock::new(config)),
            notifiers: Arc::new(RwLock::new(notifiers)),
            route_configs: Arc::new(RwLock::new(HashMap::new())),
            started_at: Utc::now(),
            snapshot_paths,
        }
    }

    /// Swap in a freshly parsed and validated config, rebuilding the
    /// notifier table and inhibition rule set to match. Existing
    /// aggregation groups and notify-log history are left untouched --
    /// only in-flight routing and future flushes see the new document.
    pub async fn reload_config(&self, new_config: RelayConfig) {
        *self.inhibitor.write().await = InhibitionEngine::new(new_config.inhibit_rules.clone());
        *self.notifiers.write().await = notifiers::build(&new_config);
        self.route_configs.write().await.clear();
        *self.config.write().await = new_config;
    }

    pub async fn time_intervals(&self) -> HashMap<String, TimeInterval> {
        self.config
            .read()
            .await
            .time_intervals
            .iter()
            .map(|t| (t.name.clone(), t.clone()))
            .collect()
    }

    #[must_use]
    pub fn pipeline(&self) -> NotificationPipeline {
        let cluster: Arc<dyn ClusterView> = self.cluster.clone();
        NotificationPipeline::new(self.nflog.clone(), self.silences.clone(), cluster)
    }
}
