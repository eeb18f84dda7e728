#[macro_use]
extern crate serde_derive;

pub mod config;
pub mod dataset;
pub mod dcg;
pub mod dupes;
pub mod error;
pub mod kernel;
pub mod linesearch;
pub mod ndcg;
pub mod objective;
pub mod sigmoid;
pub mod sort;

pub use config::{LambdaRankConfig, PruningStrategy};
pub use dataset::{Dataset, GainTable};
pub use error::{ConfigError, DataError};
pub use linesearch::{adjust_tree_outputs, GlobalMeanReducer, LeafPartitioning, LocalMeanReducer, TreeLeaves};
pub use ndcg::{
    Evaluator, FastNdcgTest, FastNdcgTestForTrainSet, NdcgTest, TestHistory, TestWindowWithTolerance,
};
pub use objective::LambdaRankObjective;
