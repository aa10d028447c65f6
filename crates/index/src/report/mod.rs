//! Report synthesis: grounded prose with citations over ranked articles.

mod citations;
mod synthesizer;
mod types;

pub use citations::{parse_citations, strip_sources_line};
pub use synthesizer::ReportSynthesizer;
pub use types::{Citation, Report, TrendingDigest};
