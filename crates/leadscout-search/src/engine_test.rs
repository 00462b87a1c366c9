use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use leadscout_core::{
    BoundingBox, FeatureOrigin, SourceId, TagPredicate, UpstreamError, CYCLE_DAYS,
};

use super::*;
use crate::enrich::SyntheticEnricher;
use crate::memory::{MemoryHistoryStore, MemoryQuotaLedger};

#[derive(Default)]
struct StubGeocoder {
    answers: HashMap<String, Vec<GeocodedPlace>>,
    failing: bool,
    calls: Mutex<Vec<String>>,
}

impl StubGeocoder {
    fn answer(mut self, query: &str, places: Vec<GeocodedPlace>) -> Self {
        self.answers.insert(query.to_string(), places);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn geocode(&self, query: &str) -> Result<Vec<GeocodedPlace>, UpstreamError> {
        self.calls.lock().unwrap().push(query.to_string());
        if self.failing {
            return Err(UpstreamError {
                service: "geocoder",
                message: "unexpected HTTP status 503".to_string(),
            });
        }
        Ok(self.answers.get(query).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct StubFeatures {
    features: Vec<RawFeature>,
    failing: bool,
    calls: Mutex<Vec<Vec<TagPredicate>>>,
}

impl StubFeatures {
    fn calls(&self) -> Vec<Vec<TagPredicate>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeatureSource for StubFeatures {
    async fn query_features(
        &self,
        _bbox: BoundingBox,
        predicates: &[TagPredicate],
    ) -> Result<Vec<RawFeature>, UpstreamError> {
        self.calls.lock().unwrap().push(predicates.to_vec());
        if self.failing {
            return Err(UpstreamError {
                service: "map features",
                message: "timed out".to_string(),
            });
        }
        Ok(self.features.clone())
    }
}

struct Harness {
    engine: SearchEngine,
    geocoder: Arc<StubGeocoder>,
    features: Arc<StubFeatures>,
    ledger: Arc<MemoryQuotaLedger>,
    history: Arc<MemoryHistoryStore>,
    user: Uuid,
}

async fn harness(geocoder: StubGeocoder, features: StubFeatures, quota: QuotaState) -> Harness {
    let geocoder = Arc::new(geocoder);
    let features = Arc::new(features);
    let ledger = Arc::new(MemoryQuotaLedger::new());
    let history = Arc::new(MemoryHistoryStore::new());
    let user = Uuid::new_v4();
    ledger.insert(user, quota).await;

    let engine = SearchEngine::new(
        Arc::clone(&geocoder) as Arc<dyn Geocoder>,
        Arc::clone(&features) as Arc<dyn FeatureSource>,
        Arc::clone(&ledger) as Arc<dyn QuotaLedger>,
        Arc::clone(&history) as Arc<dyn HistoryStore>,
        Arc::new(SyntheticEnricher::with_seed(3)),
    );
    Harness {
        engine,
        geocoder,
        features,
        ledger,
        history,
        user,
    }
}

fn quota(used: u32, limit: u32) -> QuotaState {
    QuotaState {
        plan_id: "free".to_string(),
        used_count: used,
        limit_count: limit,
        cycle_start: Utc::now() - Duration::days(2),
    }
}

fn request(service: &str, location: &str, criteria: &str, limit: u32) -> SearchRequest {
    SearchRequest {
        service: service.to_string(),
        location: location.to_string(),
        criteria: criteria.to_string(),
        requested_count: limit,
    }
}

fn place(id: u64, name: &str, bbox: Option<BoundingBox>) -> GeocodedPlace {
    GeocodedPlace {
        feature: RawFeature {
            source_id: SourceId::geocoder(id),
            display_name: name.to_string(),
            coordinates: None,
            category: "restaurant".to_string(),
            attributes: BTreeMap::new(),
        },
        bounding_box: bbox,
    }
}

fn restaurant(id: u64) -> RawFeature {
    RawFeature {
        source_id: SourceId::map_feature("node", id),
        display_name: format!("Restaurant {id}"),
        coordinates: None,
        category: "restaurant".to_string(),
        attributes: BTreeMap::from([("amenity".to_string(), "restaurant".to_string())]),
    }
}

fn chennai_box() -> Option<BoundingBox> {
    Some(BoundingBox {
        min_lat: 12.9,
        max_lat: 13.2,
        min_lon: 80.1,
        max_lon: 80.3,
    })
}

fn keyed(key: &str) -> RawFeature {
    RawFeature {
        source_id: SourceId {
            origin: FeatureOrigin::MapFeature,
            key: key.to_string(),
        },
        display_name: key.to_string(),
        coordinates: None,
        category: "business".to_string(),
        attributes: BTreeMap::new(),
    }
}

#[tokio::test]
async fn chennai_restaurants_fuse_both_sources_and_debit_returned_count() {
    let geocoder = StubGeocoder::default()
        .answer(
            "restaurant in Chennai",
            vec![place(1, "Saravana Bhavan, T. Nagar, Chennai", None)],
        )
        .answer("Chennai", vec![place(99, "Chennai, Tamil Nadu, India", chennai_box())]);
    let features = StubFeatures {
        features: (1..=6).map(restaurant).collect(),
        ..StubFeatures::default()
    };
    let h = harness(geocoder, features, quota(0, 10)).await;

    let outcome = h
        .engine
        .search(h.user, request("restaurant", "Chennai", "restaurant", 5))
        .await
        .expect("search succeeds");

    assert_eq!(outcome.leads.len(), 5);
    assert_eq!(outcome.leads[0].id, "geocoder:1");
    assert_eq!(outcome.leads[0].business_name, "Saravana Bhavan");
    assert_eq!(outcome.leads[1].id, "osm:node/1");
    assert_eq!(outcome.quota.used_count, 5);
    assert_eq!(h.ledger.quota_state(h.user).await.unwrap().used_count, 5);

    assert_eq!(h.geocoder.calls(), vec!["restaurant in Chennai", "Chennai"]);
    assert_eq!(
        h.features.calls(),
        vec![vec![TagPredicate::new(r#"["amenity"="restaurant"]"#)]]
    );

    outcome.history_task.await.expect("history task");
    let recent = h.history.recent(h.user, 10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].entry.query, "restaurant in Chennai");
    assert_eq!(recent[0].entry.result_count, 5);
}

#[tokio::test]
async fn enough_primary_results_skip_the_feature_pass() {
    let geocoder = StubGeocoder::default().answer(
        "cafes in Pune",
        (1..=4).map(|i| place(i, &format!("Cafe {i}, Koregaon Park, Pune"), None)).collect(),
    );
    let h = harness(geocoder, StubFeatures::default(), quota(0, 10)).await;

    let outcome = h
        .engine
        .search(h.user, request("", "Pune", "cafes", 3))
        .await
        .unwrap();

    assert_eq!(outcome.leads.len(), 3);
    assert_eq!(h.geocoder.calls(), vec!["cafes in Pune"]);
    assert!(h.features.calls().is_empty());
}

#[tokio::test]
async fn zero_leads_leave_usage_unchanged_and_are_still_recorded() {
    let h = harness(StubGeocoder::default(), StubFeatures::default(), quota(3, 10)).await;

    let outcome = h
        .engine
        .search(h.user, request("seo", "Atlantis", "", 5))
        .await
        .expect("no results is not an error");

    assert!(outcome.leads.is_empty());
    assert_eq!(outcome.quota.used_count, 3);
    assert_eq!(h.ledger.quota_state(h.user).await.unwrap().used_count, 3);
    // no location box means no feature query at all
    assert!(h.features.calls().is_empty());

    outcome.history_task.await.unwrap();
    let recent = h.history.recent(h.user, 10).await.unwrap();
    assert_eq!(recent[0].entry.result_count, 0);
}

#[tokio::test]
async fn debit_equals_leads_returned_not_requested() {
    let geocoder = StubGeocoder::default().answer(
        "bakery in Goa",
        (1..=4).map(|i| place(i, &format!("Bakery {i}, Panaji"), None)).collect(),
    );
    let h = harness(geocoder, StubFeatures::default(), quota(0, 10)).await;

    let outcome = h
        .engine
        .search(h.user, request("bakery", "Goa", "", 10))
        .await
        .unwrap();

    assert_eq!(outcome.leads.len(), 4);
    assert_eq!(outcome.quota.used_count, 4);
}

#[tokio::test]
async fn upstream_failures_degrade_to_empty_results() {
    let geocoder = StubGeocoder {
        failing: true,
        ..StubGeocoder::default()
    };
    let h = harness(geocoder, StubFeatures::default(), quota(0, 10)).await;

    let outcome = h
        .engine
        .search(h.user, request("gym", "Delhi", "", 5))
        .await
        .expect("degraded, not failed");
    assert!(outcome.leads.is_empty());
    assert_eq!(h.geocoder.calls().len(), 2);
}

#[tokio::test]
async fn failing_feature_source_keeps_primary_results() {
    let geocoder = StubGeocoder::default()
        .answer("gym in Delhi", vec![place(7, "Gold's Gym, Saket, Delhi", None)])
        .answer("Delhi", vec![place(8, "Delhi, India", chennai_box())]);
    let features = StubFeatures {
        failing: true,
        ..StubFeatures::default()
    };
    let h = harness(geocoder, features, quota(0, 10)).await;

    let outcome = h
        .engine
        .search(h.user, request("gym", "Delhi", "", 5))
        .await
        .unwrap();
    assert_eq!(outcome.leads.len(), 1);
    assert_eq!(outcome.quota.used_count, 1);
    assert_eq!(h.features.calls().len(), 1);
}

#[tokio::test]
async fn insufficient_credits_fail_before_any_lookup() {
    let h = harness(StubGeocoder::default(), StubFeatures::default(), quota(8, 10)).await;

    let err = h
        .engine
        .search(h.user, request("seo", "Pune", "", 5))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SearchError::Quota(QuotaError::InsufficientCredits {
            remaining: 2,
            requested: 5
        })
    ));
    assert!(h.geocoder.calls().is_empty());

    assert!(h
        .engine
        .search(h.user, request("seo", "Pune", "", 2))
        .await
        .is_ok());
}

#[tokio::test]
async fn expired_cycle_rejects_regardless_of_usage() {
    let expired = QuotaState {
        cycle_start: Utc::now() - Duration::days(CYCLE_DAYS + 1),
        ..quota(0, 150)
    };
    let h = harness(StubGeocoder::default(), StubFeatures::default(), expired).await;

    let err = h
        .engine
        .search(h.user, request("seo", "Pune", "", 1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SearchError::Quota(QuotaError::SubscriptionExpired { .. })
    ));
}

#[tokio::test]
async fn malformed_request_is_rejected() {
    let h = harness(StubGeocoder::default(), StubFeatures::default(), quota(0, 10)).await;

    let err = h
        .engine
        .search(h.user, request("seo", "  ", "", 5))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Malformed(RequestError::MissingLocation)));

    let err = h
        .engine
        .search(h.user, request("seo", "Pune", "", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Malformed(RequestError::ZeroLimit)));
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let h = harness(StubGeocoder::default(), StubFeatures::default(), quota(0, 10)).await;
    let stranger = Uuid::new_v4();
    let err = h
        .engine
        .search(stranger, request("seo", "Pune", "", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::UserNotFound(id) if id == stranger));
}

#[tokio::test]
async fn repeated_query_within_window_records_history_once() {
    let geocoder = StubGeocoder::default()
        .answer("cafe in Pune", vec![place(1, "Cafe Goodluck, Deccan, Pune", None)]);
    let h = harness(geocoder, StubFeatures::default(), quota(0, 10)).await;

    for _ in 0..2 {
        let outcome = h
            .engine
            .search(h.user, request("", "Pune", "cafe", 1))
            .await
            .unwrap();
        outcome.history_task.await.unwrap();
    }

    assert_eq!(h.history.len().await, 1);
    assert_eq!(h.ledger.quota_state(h.user).await.unwrap().used_count, 2);
}

#[test]
fn fusion_dedups_by_source_identity() {
    let merged = fuse_candidates(vec![keyed("A")], vec![keyed("A"), keyed("B")]);
    let keys: Vec<&str> = merged.iter().map(|f| f.source_id.key.as_str()).collect();
    assert_eq!(keys, vec!["A", "B"]);
}

#[test]
fn geocoder_and_map_ids_never_collide() {
    let geo = RawFeature {
        source_id: SourceId::geocoder(5),
        ..keyed("x")
    };
    let osm = RawFeature {
        source_id: SourceId::map_feature("node", 5),
        ..keyed("x")
    };
    assert_eq!(fuse_candidates(vec![geo], vec![osm]).len(), 2);
}

#[test]
fn default_options_match_documented_values() {
    let options = EngineOptions::default();
    assert_eq!(options.fusion_threshold, 3);
    assert_eq!(options.history_window, Duration::minutes(5));
}
