mod config;
pub mod diversity;
mod engine;
mod topk;

pub use config::{ConfigError, MatcherKind, MinerConfig, SamplerKind};
pub use engine::{Miner, MiningOutcome, Termination};
pub use topk::TopK;
