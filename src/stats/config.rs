//! Season stat definitions.
//!
//! Each season ships a JSON file describing how raw scouting entries turn
//! into a team report: a pipeline of stages for the per-team table, and an
//! optional scatter section for plotting one stat against another. The file
//! may be either a bare stage array or a `{"individual": ..., "scatter": ...}`
//! object.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// One pipeline stage, externally tagged: `{"filter": ...}`,
/// `{"add_fields": {...}}`, `{"group": {...}}`, `{"project": {...}}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Keep rows where the expression is truthy.
    Filter(Expr),
    /// Compute new fields on every row, keeping existing ones.
    AddFields(BTreeMap<String, Expr>),
    /// Collapse rows into one per distinct `by` value.
    Group(GroupSpec),
    /// Replace each row with exactly the listed fields.
    Project(BTreeMap<String, Expr>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupSpec {
    pub by: Expr,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Accumulator>,
}

/// Per-group reduction applied by a `group` stage.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accumulator {
    Sum(Expr),
    Avg(Expr),
    Min(Expr),
    Max(Expr),
    First(Expr),
    Last(Expr),
    Push(Expr),
    AddToSet(Expr),
    Count,
}

/// An expression over a row. Strings starting with `$` are field paths
/// (dot-separated); single-key objects are operator calls; everything else
/// is a literal. `{"literal": ...}` escapes a value that would otherwise
/// parse as a path or call.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expr {
    Call(Box<Call>),
    Lit(Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Call {
    Literal(Value),
    Cond(Box<(Expr, Expr, Expr)>),
    IfNull(Box<(Expr, Expr)>),
    Eq(Box<(Expr, Expr)>),
    Ne(Box<(Expr, Expr)>),
    Gt(Box<(Expr, Expr)>),
    Gte(Box<(Expr, Expr)>),
    Lt(Box<(Expr, Expr)>),
    Lte(Box<(Expr, Expr)>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Add(Vec<Expr>),
    Subtract(Box<(Expr, Expr)>),
    Multiply(Vec<Expr>),
    Divide(Box<(Expr, Expr)>),
    Concat(Vec<Expr>),
    Size(Box<Expr>),
}

/// Scatter plot section: free-form axis labels plus named datasets, each a
/// field path into the individual report rows.
#[derive(Debug, Clone, Deserialize)]
pub struct ScatterSpec {
    #[serde(default)]
    pub axes: Value,
    #[serde(default)]
    pub dataset: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonConfig {
    pub individual: Vec<Stage>,
    #[serde(default)]
    pub scatter: Option<ScatterSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SeasonConfigFile {
    Full(SeasonConfig),
    Stages(Vec<Stage>),
}

impl SeasonConfig {
    /// Load the definition for one season, `None` when the season has no
    /// file. Stats for an undefined season are simply empty, not an error.
    pub fn load(dir: &Path, year: i32) -> Result<Option<SeasonConfig>> {
        let path = dir.join(format!("{year}.json"));
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file: SeasonConfigFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(match file {
            SeasonConfigFile::Full(config) => config,
            SeasonConfigFile::Stages(individual) => SeasonConfig { individual, scatter: None },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stage_list_parses() {
        let stages: Vec<Stage> = serde_json::from_value(json!([
            {"filter": {"eq": ["$match_key", {"literal": "2020casj_qm1"}]}},
            {"add_fields": {"total": {"add": ["$auto_points", "$teleop_points"]}}},
            {"group": {"by": "$team", "avg_total": {"avg": "$total"}, "entries": "count"}},
            {"project": {"_team_number": "$_id", "avg_total": "$avg_total"}}
        ]))
        .unwrap();
        assert_eq!(stages.len(), 4);
        assert!(matches!(&stages[0], Stage::Filter(_)));
        let Stage::Group(spec) = &stages[2] else { panic!("expected group") };
        assert_eq!(spec.fields.len(), 2);
        assert!(matches!(spec.fields["entries"], Accumulator::Count));
    }

    #[test]
    fn bare_stage_array_becomes_full_config() {
        let file: SeasonConfigFile = serde_json::from_value(json!([
            {"group": {"by": "$team"}}
        ]))
        .unwrap();
        let SeasonConfigFile::Stages(stages) = file else { panic!("expected bare stages") };
        assert_eq!(stages.len(), 1);
    }

    #[test]
    fn scatter_section_parses() {
        let config: SeasonConfig = serde_json::from_value(json!({
            "individual": [{"group": {"by": "$team"}}],
            "scatter": {
                "axes": {"x": "auto", "y": "teleop"},
                "dataset": {"Auto": "avg_auto", "Teleop": "avg_teleop"}
            }
        }))
        .unwrap();
        let scatter = config.scatter.unwrap();
        assert_eq!(scatter.dataset["Auto"], "avg_auto");
        assert_eq!(scatter.axes["x"], "auto");
    }
}
