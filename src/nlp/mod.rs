//! The classifier bank and the similarity module.
//!
//! | Module | Produces | Backend |
//! |--------|----------|---------|
//! | [`fact_opinion`] | [`fact_opinion::FactOpinionReport`] | indicator phrases and regex patterns |
//! | [`sentiment`] | [`sentiment::SentimentReport`] | hosted classifier, word-list fallback |
//! | [`bias`] | [`bias::BiasReport`] | keyword counts plus sentiment |
//! | [`similarity`] | overlap and sentence-pair comparisons | [`embedding`] backends |

pub mod bias;
pub mod embedding;
pub mod fact_opinion;
pub mod sentiment;
pub mod similarity;
