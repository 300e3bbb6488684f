// Test modules

pub mod common;
mod itemset_miner_test;
