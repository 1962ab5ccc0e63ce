//! Element resolver with fallback chain orchestration

use async_trait::async_trait;
use surface_driver::{DriverError, SurfaceDriver};
use tracing::{debug, info};

use crate::errors::LocatorError;
use crate::keywords::KeywordTable;
use crate::strategies::{fallback_plan, tier_candidates, Target};
use crate::types::{Candidate, CandidateKind, Resolution};

/// Element resolver trait
#[async_trait]
pub trait ElementResolver: Send + Sync {
    /// Resolve `target` to a visible element of the requested kind
    async fn resolve(
        &self,
        surface: &dyn SurfaceDriver,
        target: &str,
        kind: CandidateKind,
    ) -> Result<Resolution, LocatorError>;

    /// Every query the resolver would try, in order
    fn fallback_plan(&self, target: &str, kind: CandidateKind) -> Vec<Candidate>;
}

/// Resolver walking the fixed per-kind tier order.
///
/// A tier wins as soon as one of its queries yields a visible element; later
/// tiers are never consulted and matches are not merged across tiers. Inside a
/// tier, queries run in term order and the first visible match in document
/// order is taken, so resolution is idempotent on an unchanged surface.
#[derive(Debug, Clone, Default)]
pub struct TieredResolver {
    keywords: KeywordTable,
}

impl TieredResolver {
    pub fn new(keywords: KeywordTable) -> Self {
        Self { keywords }
    }

    pub fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }
}

#[async_trait]
impl ElementResolver for TieredResolver {
    async fn resolve(
        &self,
        surface: &dyn SurfaceDriver,
        target: &str,
        kind: CandidateKind,
    ) -> Result<Resolution, LocatorError> {
        let parsed = Target::parse(target);
        if parsed.raw().is_empty() {
            return Err(LocatorError::InvalidTarget("empty target".to_string()));
        }

        let mut any_lookup_succeeded = false;
        let mut last_error: Option<DriverError> = None;

        for tier in kind.fallback_chain() {
            for candidate in tier_candidates(*tier, kind, &parsed, &self.keywords) {
                debug!(tier = %tier, query = %candidate.query, "trying locator tier");
                match surface.find_candidates(&candidate.query).await {
                    Ok(elements) => {
                        any_lookup_succeeded = true;
                        if let Some(element) = elements.into_iter().find(|e| e.visible) {
                            info!(
                                target = %parsed.raw(),
                                tier = %tier,
                                handle = %element.handle,
                                "resolved element"
                            );
                            return Ok(Resolution {
                                element,
                                tier: *tier,
                                query: candidate.query,
                            });
                        }
                    }
                    Err(err) => {
                        debug!(tier = %tier, query = %candidate.query, error = %err, "lookup failed");
                        last_error = Some(err);
                    }
                }
            }
        }

        match last_error {
            Some(err) if !any_lookup_succeeded => Err(LocatorError::Driver(err)),
            _ => Err(LocatorError::not_found(parsed.raw(), kind)),
        }
    }

    fn fallback_plan(&self, target: &str, kind: CandidateKind) -> Vec<Candidate> {
        fallback_plan(&Target::parse(target), kind, &self.keywords)
    }
}
