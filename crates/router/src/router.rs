//! Router - route tree evaluation and dispatch

use std::sync::{Arc, RwLock};

use contracts::{Event, EventSink, RouteConfig};
use dispatcher::{ReceiverRegistry, SendOutcome, SinkKind};
use futures::future::join_all;
use observability::MetricsStore;
use tracing::{debug, info, instrument, warn};

use crate::error::RouterError;
use crate::route::Route;

/// Label of the root node in messages
pub const ROOT_LABEL: &str = "route";

/// What happened to one event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteOutcome {
    /// Receiver dispatches, duplicates included
    pub receivers: usize,
    /// Sink deliveries that succeeded
    pub delivered: usize,
    /// Sink deliveries that failed
    pub failed: usize,
}

/// Evaluates the route tree and hands events to the registry
pub struct Router<S = SinkKind> {
    route: RwLock<Arc<Route>>,
    registry: Arc<ReceiverRegistry<S>>,
    metrics: Arc<MetricsStore>,
}

impl<S> Router<S>
where
    S: EventSink + Sync + 'static,
{
    /// Arm a router over an already-populated registry
    ///
    /// # Errors
    /// `UnknownReceiver` when the tree names a receiver the registry lacks;
    /// compile errors for malformed predicates.
    pub fn new(
        config: &RouteConfig,
        registry: Arc<ReceiverRegistry<S>>,
        metrics: Arc<MetricsStore>,
    ) -> Result<Self, RouterError> {
        let route = Self::prepare(config, &registry)?;
        info!(
            receivers = route.references().len(),
            "Router armed"
        );
        Ok(Self {
            route: RwLock::new(Arc::new(route)),
            registry,
            metrics,
        })
    }

    fn prepare(config: &RouteConfig, registry: &ReceiverRegistry<S>) -> Result<Route, RouterError> {
        let route = Route::compile(config, ROOT_LABEL)?;
        if let Some((label, name)) = route
            .references()
            .into_iter()
            .find(|(_, name)| !registry.contains(name))
        {
            return Err(RouterError::UnknownReceiver {
                route: label.to_string(),
                name: name.to_string(),
            });
        }
        Ok(route)
    }

    /// Replace the route tree atomically
    ///
    /// The current tree stays in place when the new one is rejected. Events
    /// already being processed finish against the tree they started with.
    #[instrument(name = "router_reload", skip(self, config))]
    pub fn reload(&self, config: &RouteConfig) -> Result<(), RouterError> {
        let route = Arc::new(Self::prepare(config, &self.registry)?);
        let mut current = self.route.write().unwrap_or_else(|e| e.into_inner());
        *current = route;
        info!("Route tree reloaded");
        Ok(())
    }

    pub fn registry(&self) -> &Arc<ReceiverRegistry<S>> {
        &self.registry
    }

    fn current(&self) -> Arc<Route> {
        let guard = self.route.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Route one event and wait for every dispatch to finish
    ///
    /// Never fails: unevaluable predicates count as route errors, events no
    /// receiver wants count as discards, and sink failures stay inside the
    /// registry.
    #[instrument(
        name = "router_process_event",
        skip(self, event),
        fields(event = %event.identity())
    )]
    pub async fn process_event(&self, event: Arc<Event>) -> RouteOutcome {
        let route = self.current();
        let selection = route.select(&event);

        for path in &selection.errors {
            self.metrics.inc_route_errors();
            warn!(field = %path, event = %event.identity(), "Route predicate could not be evaluated");
        }

        if selection.receivers.is_empty() {
            debug!("No route matched, event discarded");
            self.metrics.inc_events_discarded();
            return RouteOutcome::default();
        }

        let sends = selection
            .receivers
            .iter()
            .map(|name| self.registry.send_event(name, &event));
        let outcomes: Vec<SendOutcome> = join_all(sends).await;

        outcomes.iter().fold(
            RouteOutcome {
                receivers: selection.receivers.len(),
                ..Default::default()
            },
            |mut acc, o| {
                acc.delivered += o.delivered;
                acc.failed += o.failed;
                acc
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{event, RecordingSink};
    use std::time::Duration;

    fn config(yaml: &str) -> RouteConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn setup(names: &[&str]) -> (Arc<ReceiverRegistry<RecordingSink>>, Arc<MetricsStore>, RecordingSink) {
        let metrics = Arc::new(MetricsStore::new("router_test_"));
        let sink = RecordingSink::default();
        let mut registry = ReceiverRegistry::new(Arc::clone(&metrics), Duration::from_secs(1));
        for name in names {
            registry.register(*name, sink.named(name)).unwrap();
        }
        (Arc::new(registry), metrics, sink)
    }

    const TWO_BRANCHES: &str = r#"
routes:
  - match: [{field: involvedObject.kind, value: Pod}]
    receivers: [R1]
  - receivers: [R2]
"#;

    #[tokio::test]
    async fn test_pod_reaches_both_service_only_r2() {
        let (registry, metrics, sink) = setup(&["R1", "R2"]);
        let router = Router::new(&config(TWO_BRANCHES), registry, Arc::clone(&metrics)).unwrap();

        let outcome = router.process_event(Arc::new(event("Pod", "default"))).await;
        assert_eq!(outcome.receivers, 2);
        let mut got = sink.take();
        got.sort();
        assert_eq!(got, vec!["R1", "R2"]);

        router.process_event(Arc::new(event("Service", "default"))).await;
        assert_eq!(sink.take(), vec!["R2"]);
        assert_eq!(metrics.snapshot().events_sent, 3);
    }

    #[tokio::test]
    async fn test_unknown_receiver_rejected() {
        let (registry, metrics, _) = setup(&["R1"]);
        let err = Router::new(&config(TWO_BRANCHES), registry, metrics)
            .err()
            .unwrap();
        assert!(
            matches!(err, RouterError::UnknownReceiver { ref route, ref name } if route == "route.routes[1]" && name == "R2")
        );
    }

    #[tokio::test]
    async fn test_unmatched_event_is_discard() {
        let (registry, metrics, sink) = setup(&["pods"]);
        let router = Router::new(
            &config("match: [{field: involvedObject.kind, value: Pod}]\nreceivers: [pods]"),
            registry,
            Arc::clone(&metrics),
        )
        .unwrap();

        let outcome = router.process_event(Arc::new(event("Node", "default"))).await;
        assert_eq!(outcome, RouteOutcome::default());
        assert!(sink.take().is_empty());
        assert_eq!(metrics.snapshot().events_discarded, 1);
        assert_eq!(metrics.snapshot().route_errors, 0);
    }

    #[tokio::test]
    async fn test_route_errors_distinct_from_discards() {
        let (registry, metrics, _) = setup(&["team"]);
        let router = Router::new(
            &config("match: [{field: involvedObject.labels.team, value: sre}]\nreceivers: [team]"),
            registry,
            Arc::clone(&metrics),
        )
        .unwrap();

        router.process_event(Arc::new(event("Pod", "default"))).await;
        let snap = metrics.snapshot();
        assert_eq!(snap.route_errors, 1);
        assert_eq!(snap.events_discarded, 1);
    }

    #[tokio::test]
    async fn test_reload_swaps_tree() {
        let (registry, metrics, sink) = setup(&["R1", "R2"]);
        let router = Router::new(&config("receivers: [R1]"), registry, metrics).unwrap();

        router.process_event(Arc::new(event("Pod", "default"))).await;
        assert_eq!(sink.take(), vec!["R1"]);

        assert!(router.reload(&config("receivers: [missing]")).is_err());
        router.process_event(Arc::new(event("Pod", "default"))).await;
        assert_eq!(sink.take(), vec!["R1"]);

        router.reload(&config("receivers: [R2]")).unwrap();
        router.process_event(Arc::new(event("Pod", "default"))).await;
        assert_eq!(sink.take(), vec!["R2"]);
    }
}
