//! Question selection: predicate building, sampling, and official exam quotas.

pub mod fetcher;
pub mod filters;
pub mod official;

pub use fetcher::{count_matching, fetch_newest, fetch_questions, random_offset, FetchMode};
pub use filters::{
  article_variants, build_filter, normalize_range, Condition, ExamSpecification, JuzFilter,
  QuestionFilter, SurahFilter, YearFilter,
};
pub use official::{build_official_structure, select_structure, StructureError};
