pub mod collection_ext;
pub mod error;
pub mod string_ext;

pub use collection_ext::{canonical_key, is_proper_subset, ordered_subsets, unique_ordered};
pub use error::{ErrorKind, PlannerError, PlannerResult};
pub use string_ext::{StringExt, is_identifier, quote_literal};
