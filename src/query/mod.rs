//! クエリ処理
//!
//! 自然言語クエリから企業名・指標・期間を抽出し、日付を正規化して
//! エンティティ毎の結果に展開する。

pub mod error;
pub mod extractor;
pub mod normalizer;
pub mod prompt;
pub mod service;
pub mod types;

pub use error::ExtractionError;
pub use extractor::QueryExtractor;
pub use normalizer::{parse_date, ResultNormalizer, DATE_FORMAT, DEFAULT_RANGE_DAYS};
pub use prompt::{PromptTemplate, NO_CONTEXT_MARKER};
pub use service::{QueryService, DEFAULT_CONTEXT_WINDOW, EMPTY_QUERY_MESSAGE};
pub use types::{DateRange, Extraction, Interaction, MetricResult};
