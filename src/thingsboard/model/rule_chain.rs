use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Rule engine a rule chain runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleChainType {
    #[default]
    Core,
    Edge,
}
