//! Verification report builder
//!
//! Feeds are fetched concurrently, but matches are appended in feed
//! declaration order and, within a feed, in the order the feed returned
//! them. Events reported by more than one feed appear once per feed.

use crate::matcher::is_relevant;
use claim_geo::Coordinate;
use disaster_feeds::{DisasterFeed, EventRecord, FeedError, FeedQuery, FeedSource};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub location: Coordinate,
    pub date: Option<String>,
    pub disaster_occurred: bool,
    pub disasters: Vec<EventRecord>,
}

/// A feed that contributed nothing because it failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedFailure {
    pub source: FeedSource,
    pub error: String,
    pub transient: bool,
}

#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub report: VerificationReport,
    pub failures: Vec<FeedFailure>,
}

pub struct DisasterVerifier {
    feeds: Vec<Arc<dyn DisasterFeed>>,
    retry_transient: u32,
    retry_backoff: Duration,
}

impl DisasterVerifier {
    pub fn new(feeds: Vec<Arc<dyn DisasterFeed>>) -> Self {
        Self {
            feeds,
            retry_transient: 0,
            retry_backoff: Duration::from_millis(500),
        }
    }

    /// Retry transient feed failures up to `retries` extra times
    pub fn with_retry_transient(mut self, retries: u32) -> Self {
        self.retry_transient = retries;
        self
    }

    /// Base delay between retries, multiplied by the attempt number
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn sources(&self) -> Vec<FeedSource> {
        self.feeds.iter().map(|f| f.source()).collect()
    }

    pub async fn verify_location_disaster(
        &self,
        coordinate: Coordinate,
        date: Option<&str>,
        radius_km: f64,
    ) -> VerificationReport {
        self.verify_with_diagnostics(coordinate, date, radius_km)
            .await
            .report
    }

    /// Verify and also report which feeds failed
    pub async fn verify_with_diagnostics(
        &self,
        coordinate: Coordinate,
        date: Option<&str>,
        radius_km: f64,
    ) -> VerificationOutcome {
        let query = FeedQuery {
            coordinate,
            date: date.map(str::to_string),
            radius_km,
        };

        info!(
            location = %coordinate,
            date = ?date,
            radius_km,
            feeds = self.feeds.len(),
            "Verifying location against disaster feeds"
        );

        let results = join_all(
            self.feeds
                .iter()
                .map(|feed| self.fetch_with_retry(feed.as_ref(), &query)),
        )
        .await;

        let mut disasters = Vec::new();
        let mut failures = Vec::new();

        for (feed, result) in self.feeds.iter().zip(results) {
            match result {
                Ok(events) => {
                    let received = events.len();
                    let before = disasters.len();
                    disasters.extend(
                        events
                            .into_iter()
                            .filter(|e| is_relevant(e, coordinate, date, radius_km)),
                    );
                    debug!(
                        feed = %feed.source(),
                        received,
                        matched = disasters.len() - before,
                        "Feed events matched"
                    );
                }
                Err(e) => {
                    warn!(feed = %feed.source(), error = %e, "Feed failed, contributing no events");
                    failures.push(FeedFailure {
                        source: feed.source(),
                        error: e.to_string(),
                        transient: e.is_transient(),
                    });
                }
            }
        }

        info!(
            matched = disasters.len(),
            failed_feeds = failures.len(),
            "Verification complete"
        );

        VerificationOutcome {
            report: VerificationReport {
                location: coordinate,
                date: query.date,
                disaster_occurred: !disasters.is_empty(),
                disasters,
            },
            failures,
        }
    }

    async fn fetch_with_retry(
        &self,
        feed: &dyn DisasterFeed,
        query: &FeedQuery,
    ) -> Result<Vec<EventRecord>, FeedError> {
        let mut attempt = 0;
        loop {
            match feed.fetch(query).await {
                Err(e) if e.is_transient() && attempt < self.retry_transient => {
                    attempt += 1;
                    warn!(feed = %feed.source(), attempt, error = %e, "Retrying transient feed failure");
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Feed returning scripted results, one per call; the last one repeats
    struct ScriptedFeed {
        source: FeedSource,
        script: Vec<Result<Vec<EventRecord>, FeedError>>,
        calls: AtomicU32,
    }

    impl ScriptedFeed {
        fn new(source: FeedSource, script: Vec<Result<Vec<EventRecord>, FeedError>>) -> Arc<Self> {
            Arc::new(Self {
                source,
                script,
                calls: AtomicU32::new(0),
            })
        }

        fn returning(source: FeedSource, events: Vec<EventRecord>) -> Arc<Self> {
            Self::new(source, vec![Ok(events)])
        }
    }

    #[async_trait]
    impl DisasterFeed for ScriptedFeed {
        fn source(&self) -> FeedSource {
            self.source
        }

        async fn fetch(&self, _query: &FeedQuery) -> disaster_feeds::Result<Vec<EventRecord>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            self.script[call.min(self.script.len() - 1)].clone()
        }
    }

    fn dyn_feeds(feeds: &[&Arc<ScriptedFeed>]) -> Vec<Arc<dyn DisasterFeed>> {
        feeds
            .iter()
            .map(|f| Arc::clone(f) as Arc<dyn DisasterFeed>)
            .collect()
    }

    fn event(source: FeedSource, title: &str, lat: f64, lon: f64, date: &str) -> EventRecord {
        EventRecord {
            source,
            category: "Floods".to_string(),
            title: title.to_string(),
            occurred_at: Some(date.to_string()),
            coordinates: Some(Coordinate::new(lat, lon).unwrap()),
            link: None,
        }
    }

    fn claim_site() -> Coordinate {
        Coordinate::new(19.0760, 72.8777).unwrap()
    }

    #[tokio::test]
    async fn test_no_feeds_means_no_disaster() {
        let verifier = DisasterVerifier::new(vec![]);
        let report = verifier
            .verify_location_disaster(claim_site(), Some("2024-11-07"), 50.0)
            .await;
        assert!(!report.disaster_occurred);
        assert!(report.disasters.is_empty());
        assert_eq!(report.date.as_deref(), Some("2024-11-07"));
    }

    #[tokio::test]
    async fn test_matches_follow_feed_declaration_order() {
        let eonet = ScriptedFeed::returning(
            FeedSource::NasaEonet,
            vec![
                event(FeedSource::NasaEonet, "near-a", 19.08, 72.88, "2024-11-05T00:00:00Z"),
                event(FeedSource::NasaEonet, "far", 28.6, 77.2, "2024-11-05T00:00:00Z"),
                event(FeedSource::NasaEonet, "near-b", 19.10, 72.90, "2024-11-06T00:00:00Z"),
            ],
        );
        let reliefweb = ScriptedFeed::returning(
            FeedSource::ReliefWeb,
            vec![event(FeedSource::ReliefWeb, "rw", 19.07, 72.87, "2024-11-01T00:00:00+00:00")],
        );

        let verifier = DisasterVerifier::new(dyn_feeds(&[&eonet, &reliefweb]));
        let report = verifier
            .verify_location_disaster(claim_site(), Some("2024-11-07"), 50.0)
            .await;

        let titles: Vec<&str> = report.disasters.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["near-a", "near-b", "rw"]);
        assert!(report.disaster_occurred);
    }

    #[tokio::test]
    async fn test_same_event_from_two_feeds_is_kept_twice() {
        let shared = |source| event(source, "Mumbai floods", 19.08, 72.88, "2024-11-05");
        let eonet = ScriptedFeed::returning(FeedSource::NasaEonet, vec![shared(FeedSource::NasaEonet)]);
        let ndma = ScriptedFeed::returning(FeedSource::Ndma, vec![shared(FeedSource::Ndma)]);
        let verifier = DisasterVerifier::new(dyn_feeds(&[&eonet, &ndma]));

        let report = verifier
            .verify_location_disaster(claim_site(), Some("2024-11-07"), 50.0)
            .await;
        assert_eq!(report.disasters.len(), 2);
    }

    #[tokio::test]
    async fn test_failing_feed_contributes_nothing_and_is_reported() {
        let broken = ScriptedFeed::new(
            FeedSource::ReliefWeb,
            vec![Err(FeedError::Status {
                feed: FeedSource::ReliefWeb,
                status: 503,
            })],
        );
        let eonet = ScriptedFeed::returning(
            FeedSource::NasaEonet,
            vec![event(FeedSource::NasaEonet, "ok", 19.08, 72.88, "2024-11-05")],
        );

        let verifier = DisasterVerifier::new(dyn_feeds(&[&eonet, &broken]));
        let outcome = verifier
            .verify_with_diagnostics(claim_site(), Some("2024-11-07"), 50.0)
            .await;

        assert_eq!(outcome.report.disasters.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].source, FeedSource::ReliefWeb);
        assert!(outcome.failures[0].transient);
    }

    #[tokio::test]
    async fn test_parse_failure_is_terminal() {
        let feed = ScriptedFeed::new(
            FeedSource::NasaEonet,
            vec![Err(FeedError::Parse("expected object".to_string()))],
        );
        let verifier = DisasterVerifier::new(dyn_feeds(&[&feed]))
            .with_retry_transient(3)
            .with_retry_backoff(Duration::ZERO);

        let outcome = verifier
            .verify_with_diagnostics(claim_site(), Some("2024-11-07"), 50.0)
            .await;
        assert!(!outcome.failures[0].transient);
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_retried_until_success() {
        let feed = ScriptedFeed::new(
            FeedSource::NasaEonet,
            vec![
                Err(FeedError::Transport("connection reset".to_string())),
                Ok(vec![event(FeedSource::NasaEonet, "late", 19.08, 72.88, "2024-11-05")]),
            ],
        );
        let verifier = DisasterVerifier::new(dyn_feeds(&[&feed]))
            .with_retry_transient(2)
            .with_retry_backoff(Duration::ZERO);

        let outcome = verifier
            .verify_with_diagnostics(claim_site(), Some("2024-11-07"), 50.0)
            .await;
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.report.disasters.len(), 1);
        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_retry_by_default() {
        let feed = ScriptedFeed::new(
            FeedSource::NasaEonet,
            vec![Err(FeedError::Transport("timed out".to_string()))],
        );
        let verifier = DisasterVerifier::new(dyn_feeds(&[&feed]));

        let outcome = verifier
            .verify_with_diagnostics(claim_site(), Some("2024-11-07"), 50.0)
            .await;
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_date_matches_nothing() {
        let feed = ScriptedFeed::returning(
            FeedSource::NasaEonet,
            vec![event(FeedSource::NasaEonet, "near", 19.08, 72.88, "2024-11-05")],
        );
        let verifier = DisasterVerifier::new(dyn_feeds(&[&feed]));

        let report = verifier
            .verify_location_disaster(claim_site(), None, 50.0)
            .await;
        assert!(!report.disaster_occurred);
        assert!(report.date.is_none());
    }

    #[tokio::test]
    async fn test_report_json_shape() {
        let feed = ScriptedFeed::returning(
            FeedSource::NasaEonet,
            vec![event(FeedSource::NasaEonet, "near", 19.08, 72.88, "2024-11-05")],
        );
        let verifier = DisasterVerifier::new(dyn_feeds(&[&feed]));
        let report = verifier
            .verify_location_disaster(claim_site(), Some("2024-11-07"), 50.0)
            .await;

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["location"]["latitude"], 19.0760);
        assert_eq!(json["date"], "2024-11-07");
        assert_eq!(json["disaster_occurred"], true);
        assert_eq!(json["disasters"][0]["source"], "NASA EONET");
        assert_eq!(json["disasters"][0]["type"], "Floods");
        assert_eq!(json["disasters"][0]["date"], "2024-11-05");
    }
}
