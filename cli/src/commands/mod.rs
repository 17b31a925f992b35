//! CLI commands for motif.

pub mod detokenize;
pub mod induce;
pub mod rank;

pub use detokenize::DetokenizeCommand;
pub use induce::InduceCommand;
pub use rank::RankCommand;
