//! Aggregation groups: the dispatcher collects alerts assigned to the
//! same route and group key and batches them into timed notification
//! rounds, so related alerts don't each trigger a separate page.

pub mod error;
pub mod group;
pub mod manager;

pub use error::DispatchError;
pub use group::{AggregationGroup, GroupState};
pub use manager::Dispatcher;

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use relaymux_core::{Alert, GroupKey, Labels, RouteConfig, RouteId};
    use relaymux_state_memory::MemoryStateStore;

    use super::*;

    fn route() -> RouteConfig {
        RouteConfig {
            id: RouteId::new("0.1"),
            receiver: relaymux_core::ReceiverName::new("team-a"),
            group_by: vec!["alertname".into()],
            group_by_all: false,
            group_wait: std::time::Duration::from_secs(30),
            group_interval: std::time::Duration::from_secs(120),
            repeat_interval: std::time::Duration::from_secs(3600),
            mute_time_intervals: Vec::new(),
            active_time_intervals: Vec::new(),
        }
    }

    fn alert(name: &str) -> Alert {
        Alert::new(Labels::from_pairs([("alertname", name)]), Labels::new())
    }

    #[tokio::test]
    async fn new_group_arms_flush_timer_after_group_wait() {
        let dispatcher = Dispatcher::new();
        let state = MemoryStateStore::new();
        let route = route();
        let before = chrono::Utc::now();

        let (key, size, flush_at) = dispatcher
            .add_alert(&route, GroupKey::new("gk"), alert("HighCPU"), &state)
            .await
            .unwrap();

        assert_eq!(size, 1);
        assert!(flush_at > before + Duration::seconds(29));
        assert_eq!(dispatcher.active_group_count().await, 1);
        assert!(dispatcher.peek(&key).await.is_some());
    }

    #[tokio::test]
    async fn second_alert_does_not_push_out_existing_timer() {
        let dispatcher = Dispatcher::new();
        let state = MemoryStateStore::new();
        let route = route();

        let (key, _, first_flush_at) = dispatcher
            .add_alert(&route, GroupKey::new("gk"), alert("HighCPU"), &state)
            .await
            .unwrap();
        let (_, size, second_flush_at) = dispatcher
            .add_alert(&route, GroupKey::new("gk"), alert("HighMem"), &state)
            .await
            .unwrap();

        assert_eq!(size, 2);
        assert_eq!(first_flush_at, second_flush_at);
        assert_eq!(dispatcher.peek(&key).await.unwrap().size(), 2);
    }

    #[tokio::test]
    async fn flush_then_complete_rearms_with_group_interval() {
        let dispatcher = Dispatcher::new();
        let state = MemoryStateStore::new();
        let route = route();

        let (key, ..) = dispatcher
            .add_alert(&route, GroupKey::new("gk"), alert("HighCPU"), &state)
            .await
            .unwrap();

        assert!(dispatcher.begin_flush(&key).await.is_some());
        let second = dispatcher.begin_flush(&key).await;
        assert!(second.is_none(), "already flushing, second begin_flush should decline");

        dispatcher
            .complete_flush(&key, Duration::seconds(120), &[], &state)
            .await
            .unwrap();

        let group = dispatcher.peek(&key).await.unwrap();
        assert_eq!(group.state, GroupState::Pending);
        assert!(group.flush_at > chrono::Utc::now() + Duration::seconds(100));
    }

    #[tokio::test]
    async fn complete_flush_drops_group_once_all_alerts_resolved_and_reported() {
        let dispatcher = Dispatcher::new();
        let state = MemoryStateStore::new();
        let route = route();
        let mut resolved = alert("HighCPU");
        resolved.ends_at = Some(chrono::Utc::now() - Duration::seconds(1));
        let fingerprint = resolved.fingerprint();

        let (key, ..) = dispatcher
            .add_alert(&route, GroupKey::new("gk"), resolved, &state)
            .await
            .unwrap();
        dispatcher.begin_flush(&key).await;
        dispatcher
            .complete_flush(&key, Duration::seconds(120), &[fingerprint], &state)
            .await
            .unwrap();

        assert!(dispatcher.peek(&key).await.is_none());
        assert_eq!(dispatcher.active_group_count().await, 0);
    }

    #[tokio::test]
    async fn recover_repopulates_pending_index() {
        let state = MemoryStateStore::new();
        let route = route();
        let original = Dispatcher::new();
        original
            .add_alert(&route, GroupKey::new("gk"), alert("HighCPU"), &state)
            .await
            .unwrap();

        let recovered = Dispatcher::new();
        let count = recovered.recover(&state).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(recovered.active_group_count().await, 1);
    }
}
