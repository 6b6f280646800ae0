//! Season-configurable stats over scouting submissions.

mod compiler;
mod config;
mod pipeline;

pub use compiler::{ScatterReport, StatsCompiler, StatsReport};
pub use config::{Accumulator, Call, Expr, GroupSpec, ScatterSpec, SeasonConfig, Stage};
