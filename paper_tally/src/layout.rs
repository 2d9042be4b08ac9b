use crate::config::*;

/// The closed lists of constituencies and age bands of an election.
///
/// The order in which they were declared is the order used everywhere:
/// grouping candidates, feedback while filling a ballot, and the report.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CategoryIndex {
    pub(crate) constituencies: Vec<String>,
    pub(crate) age_bands: Vec<String>,
}

impl CategoryIndex {
    pub fn cell_of(&self, candidate: &Candidate) -> Cell {
        candidate.cell()
    }

    /// All the cells, constituency by constituency, then by age band.
    pub fn all_cells(&self) -> Vec<Cell> {
        let mut res: Vec<Cell> = Vec::with_capacity(self.constituencies.len() * self.age_bands.len());
        for constituency in self.constituencies() {
            for age_band in self.age_bands() {
                res.push(Cell {
                    constituency,
                    age_band,
                });
            }
        }
        res
    }

    pub fn constituencies(&self) -> impl Iterator<Item = Constituency> {
        (0..self.constituencies.len() as u16).map(Constituency)
    }

    pub fn age_bands(&self) -> impl Iterator<Item = AgeBand> {
        (0..self.age_bands.len() as u16).map(AgeBand)
    }

    /// Finds a constituency by its exact name.
    pub fn constituency(&self, name: &str) -> Option<Constituency> {
        self.constituencies
            .iter()
            .position(|n| n == name)
            .map(|idx| Constituency(idx as u16))
    }

    /// Finds an age band by its exact name.
    pub fn age_band(&self, name: &str) -> Option<AgeBand> {
        self.age_bands
            .iter()
            .position(|n| n == name)
            .map(|idx| AgeBand(idx as u16))
    }

    pub fn cell(&self, constituency: &str, age_band: &str) -> Option<Cell> {
        Some(Cell {
            constituency: self.constituency(constituency)?,
            age_band: self.age_band(age_band)?,
        })
    }

    pub fn constituency_name(&self, constituency: Constituency) -> &str {
        &self.constituencies[constituency.index()]
    }

    pub fn age_band_name(&self, age_band: AgeBand) -> &str {
        &self.age_bands[age_band.index()]
    }
}

/// Maximum number of candidates a valid ballot may mark in one cell,
/// indexed by constituency.
///
/// Complete by construction: [crate::builder::RulesBuilder] refuses to build a
/// table with a missing constituency.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CapTable {
    pub(crate) caps: Vec<u32>,
}

impl CapTable {
    pub fn cap_for(&self, constituency: Constituency) -> u32 {
        self.caps[constituency.index()]
    }
}

/// The layout of an election together with its caps.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ElectionRules {
    pub(crate) index: CategoryIndex,
    pub(crate) caps: CapTable,
}

impl ElectionRules {
    pub fn index(&self) -> &CategoryIndex {
        &self.index
    }

    pub fn caps(&self) -> &CapTable {
        &self.caps
    }

    /// The pastoral council election the system was first used for:
    /// three parishes with decreasing caps, three age bands.
    pub fn parish_council() -> ElectionRules {
        let constituencies = [("Santo Stefano", 3), ("San Pio X", 2), ("Immacolata ai Passi", 1)];
        let age_bands = ["18-35", "36-60", "61+"];
        ElectionRules {
            index: CategoryIndex {
                constituencies: constituencies.iter().map(|(n, _)| n.to_string()).collect(),
                age_bands: age_bands.iter().map(|s| s.to_string()).collect(),
            },
            caps: CapTable {
                caps: constituencies.iter().map(|(_, cap)| *cap).collect(),
            },
        }
    }
}

impl Default for ElectionRules {
    fn default() -> Self {
        ElectionRules::parish_council()
    }
}
