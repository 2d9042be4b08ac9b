use log::debug;
use std::collections::HashSet;

pub use crate::config::*;
use crate::layout::*;

/// A builder for the layout of an election.
///
/// This is the only place where an incomplete configuration is detected: a
/// successfully built [ElectionRules] always has a cap for every constituency.
///
/// ```
/// use paper_tally::builder::RulesBuilder;
/// # use paper_tally::TallyError;
///
/// let rules = RulesBuilder::new()
///     .constituency("North", 2)?
///     .constituency("South", 1)?
///     .age_band("18-40")?
///     .age_band("41+")?
///     .build()?;
///
/// assert_eq!(rules.index().all_cells().len(), 4);
/// # Ok::<(), TallyError>(())
/// ```
#[derive(Debug, Default)]
pub struct RulesBuilder {
    _constituencies: Vec<(String, u32)>,
    _age_bands: Vec<String>,
}

impl RulesBuilder {
    pub fn new() -> RulesBuilder {
        RulesBuilder::default()
    }

    /// Declares a constituency and the cap applied to each of its cells.
    pub fn constituency(mut self, name: &str, max_votes: u32) -> Result<RulesBuilder, TallyError> {
        let name = checked_name(name, "constituency")?;
        if self._constituencies.iter().any(|(n, _)| *n == name) {
            return ConfigurationSnafu {
                message: format!("constituency {:?} is declared twice", name),
            }
            .fail();
        }
        self._constituencies.push((name, max_votes));
        Ok(self)
    }

    pub fn age_band(mut self, name: &str) -> Result<RulesBuilder, TallyError> {
        let name = checked_name(name, "age band")?;
        if self._age_bands.contains(&name) {
            return ConfigurationSnafu {
                message: format!("age band {:?} is declared twice", name),
            }
            .fail();
        }
        self._age_bands.push(name);
        Ok(self)
    }

    pub fn build(self) -> Result<ElectionRules, TallyError> {
        if self._constituencies.is_empty() {
            return ConfigurationSnafu {
                message: "no constituency declared",
            }
            .fail();
        }
        if self._age_bands.is_empty() {
            return ConfigurationSnafu {
                message: "no age band declared",
            }
            .fail();
        }
        if self._constituencies.len() > u16::MAX as usize || self._age_bands.len() > u16::MAX as usize
        {
            return ConfigurationSnafu {
                message: "too many constituencies or age bands",
            }
            .fail();
        }
        debug!(
            "RulesBuilder::build: constituencies: {:?} age bands: {:?}",
            self._constituencies, self._age_bands
        );
        let (constituencies, caps): (Vec<String>, Vec<u32>) =
            self._constituencies.into_iter().unzip();
        Ok(ElectionRules {
            index: CategoryIndex {
                constituencies,
                age_bands: self._age_bands,
            },
            caps: CapTable { caps },
        })
    }

    /// Builds the rules from a list of constituency names, a list of age bands
    /// and a separate cap table keyed by constituency name.
    ///
    /// Every constituency needs a cap, and every cap must belong to a
    /// declared constituency.
    pub fn from_parts(
        constituencies: &[String],
        age_bands: &[String],
        caps: &[(String, u32)],
    ) -> Result<ElectionRules, TallyError> {
        let declared: HashSet<&String> = constituencies.iter().collect();
        if let Some((extra, _)) = caps.iter().find(|(n, _)| !declared.contains(n)) {
            return ConfigurationSnafu {
                message: format!("cap given for unknown constituency {:?}", extra),
            }
            .fail();
        }
        let mut builder = RulesBuilder::new();
        for name in constituencies {
            let cap = match caps.iter().find(|(n, _)| n == name) {
                Some((_, cap)) => *cap,
                None => {
                    return ConfigurationSnafu {
                        message: format!("constituency {:?} has no cap", name),
                    }
                    .fail();
                }
            };
            builder = builder.constituency(name, cap)?;
        }
        for name in age_bands {
            builder = builder.age_band(name)?;
        }
        builder.build()
    }
}

fn checked_name(name: &str, what: &str) -> Result<String, TallyError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return ConfigurationSnafu {
            message: format!("empty {} name", what),
        }
        .fail();
    }
    Ok(trimmed.to_string())
}
