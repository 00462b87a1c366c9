//! Turns surviving candidates into [`Lead`]s.
//!
//! [`SyntheticEnricher`] fills website, rating, social, and confidence fields
//! with random placeholder values and marks every lead
//! [`EnrichmentProvenance::Synthetic`]. A real lookup integration replaces it
//! by implementing [`Enricher`].

use std::sync::{Mutex, PoisonError};

use leadscout_core::{
    EnrichmentProvenance, Lead, RawFeature, SearchRequest, SocialPresence, WebsiteStatus,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait Enricher: Send + Sync {
    /// Produces exactly one lead per candidate, in order.
    fn enrich(&self, candidates: &[RawFeature], request: &SearchRequest) -> Vec<Lead>;
}

/// Text before the first comma of a display name.
#[must_use]
pub fn business_name(display_name: &str) -> &str {
    display_name.split(',').next().unwrap_or_default().trim()
}

/// The second and third comma-separated segments, or `fallback` when absent.
#[must_use]
pub fn coarse_location(display_name: &str, fallback: &str) -> String {
    let joined = display_name
        .split(',')
        .skip(1)
        .take(2)
        .collect::<Vec<_>>()
        .join(",");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        fallback.trim().to_string()
    } else {
        trimmed.to_string()
    }
}

#[must_use]
pub fn match_reason(status: WebsiteStatus, name: &str, request: &SearchRequest) -> String {
    match status {
        WebsiteStatus::Missing => {
            format!("High potential lead. {name} is listed but has no linked website.")
        }
        WebsiteStatus::Outdated => format!(
            "Online presence detected but likely outdated. Pitch a modern refresh for {name}."
        ),
        WebsiteStatus::Good => format!(
            "{name} matches your target criteria \"{}\" in {}.",
            request.search_term(),
            request.location.trim()
        ),
    }
}

/// Placeholder enrichment from a pseudo-random source.
pub struct SyntheticEnricher {
    rng: Mutex<StdRng>,
}

impl Default for SyntheticEnricher {
    fn default() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }
}

impl SyntheticEnricher {
    /// Deterministic output for tests.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn synthesize(rng: &mut StdRng, candidate: &RawFeature, request: &SearchRequest) -> Lead {
        let name = business_name(&candidate.display_name).to_string();

        let website_status = if rng.random_bool(0.4) {
            WebsiteStatus::Missing
        } else if rng.random_bool(0.5) {
            WebsiteStatus::Outdated
        } else {
            WebsiteStatus::Good
        };
        let website = (website_status == WebsiteStatus::Good).then(|| {
            let slug: String = name
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase();
            format!("https://www.{slug}.com")
        });

        let rating = (rng.random_range(3.5..=5.0_f64) * 10.0).round() / 10.0;

        Lead {
            id: candidate.source_id.to_string(),
            location: coarse_location(&candidate.display_name, &request.location),
            website,
            website_status,
            rating,
            rating_count: rng.random_range(5..=304),
            social_presence: SocialPresence {
                maps: true,
                facebook: rng.random_bool(0.5),
                instagram: rng.random_bool(0.5),
            },
            match_reason: match_reason(website_status, &name, request),
            confidence: rng.random_range(0.85..=0.95),
            enrichment: EnrichmentProvenance::Synthetic,
            business_name: name,
        }
    }
}

impl Enricher for SyntheticEnricher {
    fn enrich(&self, candidates: &[RawFeature], request: &SearchRequest) -> Vec<Lead> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        candidates
            .iter()
            .map(|c| Self::synthesize(&mut rng, c, request))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use leadscout_core::SourceId;

    use super::*;

    fn candidate(id: u64, display_name: &str) -> RawFeature {
        RawFeature {
            source_id: SourceId::map_feature("node", id),
            display_name: display_name.to_string(),
            coordinates: None,
            category: "restaurant".to_string(),
            attributes: BTreeMap::new(),
        }
    }

    fn request() -> SearchRequest {
        SearchRequest {
            service: "web design".to_string(),
            location: "Chennai".to_string(),
            criteria: "restaurants".to_string(),
            requested_count: 10,
        }
    }

    #[test]
    fn name_is_text_before_first_comma() {
        assert_eq!(business_name("Saravana Bhavan, T. Nagar, Chennai"), "Saravana Bhavan");
        assert_eq!(business_name("Standalone"), "Standalone");
    }

    #[test]
    fn location_uses_next_two_segments_or_fallback() {
        assert_eq!(
            coarse_location("Saravana Bhavan, T. Nagar, Chennai, Tamil Nadu", "X"),
            "T. Nagar, Chennai"
        );
        assert_eq!(coarse_location("A2B, Adyar", "X"), "Adyar");
        assert_eq!(coarse_location("Sangeetha Veg", " Chennai "), "Chennai");
    }

    #[test]
    fn leads_keep_source_id_and_stay_within_ranges() {
        let enricher = SyntheticEnricher::with_seed(7);
        let candidates: Vec<RawFeature> = (0..200)
            .map(|i| candidate(i, "Murugan Idli Shop, Besant Nagar, Chennai"))
            .collect();
        let leads = enricher.enrich(&candidates, &request());

        assert_eq!(leads.len(), candidates.len());
        for (lead, raw) in leads.iter().zip(&candidates) {
            assert_eq!(lead.id, raw.source_id.to_string());
            assert!((0.85..=0.95).contains(&lead.confidence));
            assert!((3.5..=5.0).contains(&lead.rating));
            assert!((5..=304).contains(&lead.rating_count));
            assert!(lead.social_presence.maps);
            assert_eq!(lead.enrichment, EnrichmentProvenance::Synthetic);
            assert_eq!(lead.website.is_some(), lead.website_status == WebsiteStatus::Good);
        }
    }

    #[test]
    fn good_website_is_derived_from_name() {
        let enricher = SyntheticEnricher::with_seed(1);
        let candidates: Vec<RawFeature> = (0..50)
            .map(|i| candidate(i, "Hotel Saravana Bhavan, Chennai"))
            .collect();
        let leads = enricher.enrich(&candidates, &request());
        let good = leads
            .iter()
            .find(|l| l.website_status == WebsiteStatus::Good)
            .expect("50 draws produce at least one good website");
        assert_eq!(good.website.as_deref(), Some("https://www.hotelsaravanabhavan.com"));
        assert!(good.match_reason.contains("\"restaurants\" in Chennai"));
    }

    #[test]
    fn same_seed_gives_same_leads() {
        let candidates = vec![candidate(1, "A"), candidate(2, "B")];
        let a = SyntheticEnricher::with_seed(42).enrich(&candidates, &request());
        let b = SyntheticEnricher::with_seed(42).enrich(&candidates, &request());
        assert_eq!(a, b);
    }
}
