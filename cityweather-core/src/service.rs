//! City weather lookup with observable outcome state.
//!
//! Every submission publishes [`LookupOutcome::Pending`] at call time and later
//! exactly one terminal outcome. Submissions are numbered; when lookups overlap,
//! only the newest one may publish its result, so a slow older response can
//! never overwrite a newer one.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    config::Config,
    error::LookupError,
    model::{LookupOutcome, WeatherQuery},
    provider::{OpenWeatherProvider, WeatherProvider},
};

#[derive(Debug)]
pub struct WeatherLookupService {
    provider: Arc<dyn WeatherProvider>,
    state: Arc<OutcomeState>,
}

impl WeatherLookupService {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        let (outcome, _) = watch::channel(LookupOutcome::Idle);

        Self {
            provider,
            state: Arc::new(OutcomeState {
                outcome,
                latest: AtomicU64::new(0),
            }),
        }
    }

    /// Service backed by OpenWeather, using the credential and endpoint from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(OpenWeatherProvider::from_config(config)))
    }

    /// Look up `query`, resolving to its terminal outcome.
    ///
    /// The shared outcome becomes `Pending` before this returns, not when the
    /// future is first polled. Dropping the future early settles it as a failure.
    pub fn lookup(
        &self,
        query: WeatherQuery,
    ) -> impl Future<Output = LookupOutcome> + Send + use<> {
        let pending = self.state.begin();
        run(Arc::clone(&self.provider), pending, query)
    }

    /// Start a lookup in the background on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn submit(&self, query: WeatherQuery) -> JoinHandle<LookupOutcome> {
        tokio::spawn(self.lookup(query))
    }

    /// Snapshot of the current outcome.
    pub fn outcome(&self) -> LookupOutcome {
        self.state.outcome.borrow().clone()
    }

    /// Receiver notified on every outcome transition.
    pub fn subscribe(&self) -> watch::Receiver<LookupOutcome> {
        self.state.outcome.subscribe()
    }
}

async fn run(
    provider: Arc<dyn WeatherProvider>,
    pending: PendingLookup,
    query: WeatherQuery,
) -> LookupOutcome {
    let outcome = match provider.current_weather(&query.city_name).await {
        Ok(report) => {
            debug!(city = %query.city_name, seq = pending.seq, "lookup succeeded");
            LookupOutcome::Success(report)
        }
        Err(err) => {
            let err = LookupError::from(err);
            warn!(city = %query.city_name, seq = pending.seq, reason = err.reason(), "lookup failed");
            LookupOutcome::Failure(err.user_message().to_string())
        }
    };

    pending.settle(&outcome);
    outcome
}

#[derive(Debug)]
struct OutcomeState {
    outcome: watch::Sender<LookupOutcome>,
    /// Sequence number of the newest submission.
    latest: AtomicU64,
}

impl OutcomeState {
    fn begin(self: &Arc<Self>) -> PendingLookup {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.outcome.send_replace(LookupOutcome::Pending);

        PendingLookup {
            state: Arc::clone(self),
            seq,
            settled: false,
        }
    }

    fn publish(&self, seq: u64, outcome: &LookupOutcome) {
        let published = self.outcome.send_if_modified(|current| {
            // Checked under the channel lock so a newer `begin` cannot interleave.
            if self.latest.load(Ordering::SeqCst) != seq {
                return false;
            }
            *current = outcome.clone();
            true
        });

        if !published {
            debug!(seq, "discarding stale lookup result");
        }
    }
}

/// A submitted lookup that has not produced a terminal outcome yet.
#[derive(Debug)]
struct PendingLookup {
    state: Arc<OutcomeState>,
    seq: u64,
    settled: bool,
}

impl PendingLookup {
    fn settle(mut self, outcome: &LookupOutcome) {
        self.state.publish(self.seq, outcome);
        self.settled = true;
    }
}

impl Drop for PendingLookup {
    fn drop(&mut self) {
        if !self.settled {
            debug!(seq = self.seq, "lookup abandoned before completion");
            self.state.publish(self.seq, &LookupOutcome::failed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LOOKUP_FAILED_MESSAGE, WeatherReport};
    use async_trait::async_trait;
    use std::{
        collections::HashMap,
        sync::atomic::AtomicUsize,
        time::Duration,
    };
    use tokio::sync::Notify;

    const KNOWN: &[&str] = &["London", "Paris", "Slow", "Fast", "Stuck"];

    /// In-memory provider; cities with a gate block until it is notified.
    #[derive(Debug, Default)]
    struct StubProvider {
        calls: AtomicUsize,
        gates: HashMap<String, Arc<Notify>>,
    }

    impl StubProvider {
        fn gated(cities: &[&str]) -> (Self, HashMap<String, Arc<Notify>>) {
            let gates: HashMap<_, _> = cities
                .iter()
                .map(|c| (c.to_string(), Arc::new(Notify::new())))
                .collect();
            let provider = Self { gates: gates.clone(), ..Self::default() };
            (provider, gates)
        }
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        async fn current_weather(&self, city: &str) -> anyhow::Result<WeatherReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(gate) = self.gates.get(city) {
                gate.notified().await;
            }

            if !KNOWN.contains(&city) {
                anyhow::bail!("OpenWeather request failed with status 404 Not Found");
            }

            Ok(report_for(city))
        }
    }

    fn report_for(city: &str) -> WeatherReport {
        WeatherReport {
            location_name: city.to_string(),
            country_code: "GB".into(),
            temperature_c: 18,
            feels_like_c: 18,
            humidity_pct: 70,
            wind_speed_mps: 3.1,
            pressure_hpa: 1012,
            condition: "clear sky".into(),
            icon_key: "01d".into(),
        }
    }

    fn service_with(provider: StubProvider) -> (WeatherLookupService, Arc<StubProvider>) {
        let provider = Arc::new(provider);
        (WeatherLookupService::new(provider.clone()), provider)
    }

    #[tokio::test]
    async fn starts_idle() {
        let (service, _) = service_with(StubProvider::default());
        assert_eq!(service.outcome(), LookupOutcome::Idle);
    }

    #[tokio::test]
    async fn pending_is_published_before_the_future_is_polled() {
        let (service, _) = service_with(StubProvider::default());

        let fut = service.lookup(WeatherQuery::new("London"));
        assert_eq!(service.outcome(), LookupOutcome::Pending);

        let outcome = fut.await;
        assert_eq!(outcome, LookupOutcome::Success(report_for("London")));
        assert_eq!(service.outcome(), outcome);
    }

    #[tokio::test]
    async fn unknown_city_yields_generic_failure() {
        let (service, _) = service_with(StubProvider::default());

        let outcome = service.lookup(WeatherQuery::new("Zzzznotacity")).await;

        assert_eq!(outcome, LookupOutcome::Failure(LOOKUP_FAILED_MESSAGE.to_string()));
        assert_eq!(service.outcome(), outcome);
    }

    #[tokio::test]
    async fn failure_is_cleared_by_next_submission() {
        let (service, _) = service_with(StubProvider::default());

        service.lookup(WeatherQuery::new("Zzzznotacity")).await;
        assert!(service.outcome().failure_message().is_some());

        let fut = service.lookup(WeatherQuery::new("Paris"));
        assert!(service.outcome().is_pending());
        fut.await;

        assert_eq!(service.outcome().report().map(|r| r.location_name.clone()), Some("Paris".into()));
    }

    #[tokio::test]
    async fn one_provider_call_per_submission() {
        let (service, provider) = service_with(StubProvider::default());

        service.lookup(WeatherQuery::new("London")).await;
        service.lookup(WeatherQuery::new("London")).await;
        service.lookup(WeatherQuery::new("")).await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn subscribers_observe_pending_then_terminal() {
        let (service, _) = service_with(StubProvider::default());
        let mut rx = service.subscribe();
        assert_eq!(*rx.borrow_and_update(), LookupOutcome::Idle);

        let fut = service.lookup(WeatherQuery::new("London"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), LookupOutcome::Pending);

        fut.await;
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_terminal());
    }

    #[tokio::test]
    async fn stale_response_does_not_overwrite_newer_one() {
        let (provider, gates) = StubProvider::gated(&["Slow", "Fast"]);
        let (service, _) = service_with(provider);

        let slow = service.submit(WeatherQuery::new("Slow"));
        let fast = service.submit(WeatherQuery::new("Fast"));
        assert!(service.outcome().is_pending());

        gates["Fast"].notify_one();
        let fast_outcome = fast.await.unwrap();
        assert_eq!(fast_outcome, LookupOutcome::Success(report_for("Fast")));
        assert_eq!(service.outcome(), fast_outcome);

        gates["Slow"].notify_one();
        let slow_outcome = slow.await.unwrap();

        // The older lookup still resolves for its own caller.
        assert_eq!(slow_outcome, LookupOutcome::Success(report_for("Slow")));
        assert_eq!(service.outcome(), fast_outcome);
    }

    #[tokio::test]
    async fn stale_response_is_ignored_while_newer_is_in_flight() {
        let (provider, gates) = StubProvider::gated(&["Slow", "Fast"]);
        let (service, _) = service_with(provider);

        let slow = service.submit(WeatherQuery::new("Slow"));
        let fast = service.submit(WeatherQuery::new("Fast"));

        gates["Slow"].notify_one();
        slow.await.unwrap();
        assert!(service.outcome().is_pending());

        gates["Fast"].notify_one();
        fast.await.unwrap();
        assert_eq!(service.outcome(), LookupOutcome::Success(report_for("Fast")));
    }

    #[tokio::test]
    async fn abandoned_lookup_does_not_stay_pending() {
        let (provider, _gates) = StubProvider::gated(&["Stuck"]);
        let (service, _) = service_with(provider);

        let res = tokio::time::timeout(
            Duration::from_millis(20),
            service.lookup(WeatherQuery::new("Stuck")),
        )
        .await;

        assert!(res.is_err(), "gated lookup should not complete");
        assert_eq!(service.outcome(), LookupOutcome::failed());
    }

    #[tokio::test]
    async fn unpolled_lookup_dropped_settles_as_failure() {
        let (service, provider) = service_with(StubProvider::default());

        drop(service.lookup(WeatherQuery::new("London")));

        assert_eq!(service.outcome(), LookupOutcome::failed());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }
}
