pub mod itemset;
pub mod plan;

pub use itemset::*;
pub use plan::*;
