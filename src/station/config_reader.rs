use crate::station::*;

use paper_tally::builder::RulesBuilder;
use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ConstituencyConfig {
    pub name: String,
    #[serde(rename = "maxVotes")]
    pub max_votes: u32,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(rename = "electionName")]
    pub election_name: Option<String>,
    pub constituencies: Vec<ConstituencyConfig>,
    #[serde(rename = "ageBands")]
    pub age_bands: Vec<String>,
}

impl LayoutConfig {
    pub fn rules(&self) -> StationResult<ElectionRules> {
        let names: Vec<String> = self.constituencies.iter().map(|c| c.name.clone()).collect();
        let caps: Vec<(String, u32)> = self
            .constituencies
            .iter()
            .map(|c| (c.name.clone(), c.max_votes))
            .collect();
        RulesBuilder::from_parts(&names, &self.age_bands, &caps).context(TallySnafu {})
    }
}

pub fn read_layout(path: &str) -> StationResult<LayoutConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let config: LayoutConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_layout: {:?}", config);
    Ok(config)
}

/// The rules from the given configuration file, or the built-in layout.
pub fn load_rules(path: Option<&str>) -> StationResult<ElectionRules> {
    match path {
        Some(p) => {
            let config = read_layout(p)?;
            info!(
                "Election layout {:?}: {} constituencies, {} age bands",
                config.election_name.as_deref().unwrap_or(p),
                config.constituencies.len(),
                config.age_bands.len()
            );
            config.rules()
        }
        None => {
            info!("No configuration file provided, using the parish council layout");
            Ok(ElectionRules::parish_council())
        }
    }
}
