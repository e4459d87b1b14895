use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::entity::{Catalog, Entity};
use super::normalize::SuffixNormalizer;
use super::similarity::token_sort_ratio;
use crate::config::schema::ResolverConfig;

pub const DEFAULT_MIN_SCORE: f64 = 80.0;

/// Which strategy produced a match. Strategies are tried in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStrategy {
    ExactCode,
    ExactName,
    FuzzyName,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStrategy::ExactCode => write!(f, "exact-code"),
            MatchStrategy::ExactName => write!(f, "exact-name"),
            MatchStrategy::FuzzyName => write!(f, "fuzzy-name"),
        }
    }
}

/// A resolved entity with a 0-100 confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMatch {
    pub entity: Entity,
    pub score: f64,
    pub strategy: MatchStrategy,
}

impl EntityMatch {
    fn exact(entity: &Entity, strategy: MatchStrategy) -> Self {
        Self {
            entity: entity.clone(),
            score: 100.0,
            strategy,
        }
    }
}

/// Maps a free-text name (and optional code) onto one catalog entity.
///
/// Stateless per call; safe to share across threads.
pub struct EntityResolver {
    catalog: Arc<Catalog>,
    normalizer: SuffixNormalizer,
    min_score: f64,
}

impl EntityResolver {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            normalizer: SuffixNormalizer::default(),
            min_score: DEFAULT_MIN_SCORE,
        }
    }

    pub fn with_config(catalog: Arc<Catalog>, config: &ResolverConfig) -> Self {
        Self {
            catalog,
            normalizer: SuffixNormalizer::new(config.case_insensitive_suffixes),
            min_score: config.min_score,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    /// Resolves using the configured fuzzy threshold.
    pub fn resolve(&self, name: &str, code: Option<&str>) -> Option<EntityMatch> {
        self.resolve_with_threshold(name, code, self.min_score)
    }

    /// Exact code, then exact name, then best fuzzy name at or above
    /// `min_score`. `None` means no match, which is a normal outcome.
    pub fn resolve_with_threshold(
        &self,
        name: &str,
        code: Option<&str>,
        min_score: f64,
    ) -> Option<EntityMatch> {
        if let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) {
            if let Some(entity) = self.catalog.by_code(code) {
                debug!("Resolved code '{}' to {}", code, entity.id);
                return Some(EntityMatch::exact(entity, MatchStrategy::ExactCode));
            }
        }

        if let Some(entity) = self.catalog.by_name(name) {
            debug!("Resolved name '{}' exactly to {}", name, entity.id);
            return Some(EntityMatch::exact(entity, MatchStrategy::ExactName));
        }

        self.fuzzy_match(name, min_score)
    }

    /// Applies [`resolve`](Self::resolve) independently to each query,
    /// preserving input order.
    pub fn resolve_batch<N, C>(&self, queries: &[(N, Option<C>)]) -> Vec<Option<EntityMatch>>
    where
        N: AsRef<str>,
        C: AsRef<str>,
    {
        queries
            .iter()
            .map(|(name, code)| self.resolve(name.as_ref(), code.as_ref().map(AsRef::as_ref)))
            .collect()
    }

    fn fuzzy_match(&self, name: &str, min_score: f64) -> Option<EntityMatch> {
        let cleaned = self.normalizer.normalize(name);
        if cleaned.is_empty() {
            return None;
        }

        // Strictly-greater keeps the first entity in load order on ties.
        let mut best: Option<(usize, f64)> = None;
        for (index, entity) in self.catalog.entities().iter().enumerate() {
            let score = token_sort_ratio(&cleaned, &entity.name);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((index, score));
            }
        }

        let (index, score) = best?;
        if score < min_score {
            debug!(
                "Best fuzzy candidate for '{}' scored {:.1} (< {:.1})",
                cleaned, score, min_score
            );
            return None;
        }

        let entity = &self.catalog.entities()[index];
        debug!(
            "Resolved '{}' fuzzily to {} ({:.1})",
            cleaned, entity.id, score
        );
        Some(EntityMatch {
            entity: entity.clone(),
            score,
            strategy: MatchStrategy::FuzzyName,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::entity::DuplicateCodePolicy;

    fn entity(id: &str, code: &str, name: &str) -> Entity {
        Entity {
            id: id.to_string(),
            code: code.to_string(),
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            attributes: serde_json::Map::new(),
        }
    }

    fn resolver(entities: Vec<Entity>) -> EntityResolver {
        let catalog = Catalog::from_entities(entities, DuplicateCodePolicy::Reject).unwrap();
        EntityResolver::new(Arc::new(catalog))
    }

    fn sample() -> EntityResolver {
        resolver(vec![
            entity("1", "AAPL", "Apple"),
            entity("2", "MSFT", "Microsoft Corporation"),
            entity("3", "PLTR", "Palantir Technologies"),
            entity("4", "BAC", "Bank of America"),
        ])
    }

    #[test]
    fn test_exact_code_match() {
        let m = sample().resolve("whatever", Some("msft")).unwrap();
        assert_eq!(m.entity.id, "2");
        assert_eq!(m.strategy, MatchStrategy::ExactCode);
        assert_eq!(m.score, 100.0);
    }

    #[test]
    fn test_code_outranks_exact_name() {
        // Code "X" belongs to A while B is literally named "X".
        let resolver = resolver(vec![entity("A", "X", "Alpha"), entity("B", "Y", "X")]);
        let m = resolver.resolve("X", Some("X")).unwrap();
        assert_eq!(m.entity.id, "A");
        assert_eq!(m.strategy, MatchStrategy::ExactCode);
    }

    #[test]
    fn test_unknown_code_falls_through_to_name() {
        let m = sample().resolve("apple", Some("ZZZZ")).unwrap();
        assert_eq!(m.entity.id, "1");
        assert_eq!(m.strategy, MatchStrategy::ExactName);
    }

    #[test]
    fn test_suffix_stripped_before_fuzzy() {
        let m = sample().resolve("Apple, Inc.", None).unwrap();
        assert_eq!(m.entity.id, "1");
        assert_eq!(m.strategy, MatchStrategy::FuzzyName);
        assert!(m.score >= DEFAULT_MIN_SCORE);
    }

    #[test]
    fn test_fuzzy_token_order() {
        let m = sample().resolve("Technologies Palantir", None).unwrap();
        assert_eq!(m.entity.id, "3");
        assert_eq!(m.strategy, MatchStrategy::FuzzyName);
    }

    #[test]
    fn test_below_threshold_is_no_match() {
        assert!(sample().resolve("Zebra Dynamics", None).is_none());
    }

    #[test]
    fn test_custom_threshold() {
        let resolver = sample();
        let strict = resolver.resolve_with_threshold("Microsoft Corp", None, 99.0);
        assert!(strict.is_none());
        let loose = resolver
            .resolve_with_threshold("Microsoft Corp", None, 50.0)
            .unwrap();
        assert_eq!(loose.entity.id, "2");
    }

    #[test]
    fn test_fuzzy_tie_prefers_load_order() {
        let resolver = resolver(vec![
            entity("first", "", "Acme Widgets"),
            entity("second", "", "Widgets Acme"),
        ]);
        // Both sort to "Acme Widgets"; the doubled space skips the exact tier.
        let m = resolver.resolve("Acme  Widgets", None).unwrap();
        assert_eq!(m.entity.id, "first");
    }

    #[test]
    fn test_empty_name_without_code() {
        assert!(sample().resolve("", None).is_none());
        assert!(sample().resolve("   ", Some("  ")).is_none());
    }

    #[test]
    fn test_resolve_batch_preserves_order() {
        let resolver = sample();
        let queries = vec![
            ("Nothing Similar", None),
            ("Bank of America", Some("BAC")),
            ("Apple, Inc.", None),
        ];
        let results = resolver.resolve_batch(&queries);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_none());
        assert_eq!(results[1].as_ref().unwrap().entity.id, "4");
        assert_eq!(results[2].as_ref().unwrap().entity.id, "1");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let resolver = sample();
        let first = resolver.resolve("Palantir Tech", None);
        for _ in 0..10 {
            assert_eq!(resolver.resolve("Palantir Tech", None), first);
        }
    }
}
