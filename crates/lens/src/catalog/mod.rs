pub mod entity;
pub mod normalize;
pub mod resolver;
pub mod similarity;

pub use entity::{Catalog, DuplicateCodePolicy, Entity};
pub use normalize::{SuffixNormalizer, LEGAL_SUFFIXES};
pub use resolver::{EntityMatch, EntityResolver, MatchStrategy, DEFAULT_MIN_SCORE};
pub use similarity::token_sort_ratio;
