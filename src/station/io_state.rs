// Reading and writing the state file of a polling station.

use std::path::Path;

use crate::station::*;
use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: CandidateId,
    pub name: String,
    pub constituency: String,
    #[serde(rename = "ageBand")]
    pub age_band: String,
}

/// The content of the state file.
///
/// The totals are redundant with the ballots. They are only kept to detect a
/// state file that was modified by hand.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default)]
    pub candidates: Vec<CandidateRecord>,
    #[serde(default)]
    pub ballots: Vec<Ballot>,
    #[serde(default)]
    pub totals: Option<Totals>,
    /// The highest candidate id ever used, removed candidates included.
    #[serde(rename = "lastCandidateId", default)]
    pub last_candidate_id: Option<CandidateId>,
}

impl StateFile {
    pub fn from_station(registry: &CandidateList, rules: &ElectionRules, ledger: &TallyLedger) -> StateFile {
        let index = rules.index();
        let candidates = registry
            .list_candidates()
            .iter()
            .map(|c| CandidateRecord {
                id: c.id(),
                name: c.name().to_string(),
                constituency: index.constituency_name(c.cell().constituency).to_string(),
                age_band: index.age_band_name(c.cell().age_band).to_string(),
            })
            .collect();
        StateFile {
            candidates,
            ballots: ledger.ballots().to_vec(),
            totals: Some(ledger.totals().clone()),
            last_candidate_id: registry.last_id(),
        }
    }

    /// Rebuilds the registry and the ledger. The ballots are replayed and
    /// checked against the stored totals.
    ///
    /// Ids of removed candidates stay reserved, whether they come from the
    /// stored high-water mark or from the votes they still hold.
    pub fn into_station(self, rules: &ElectionRules) -> StationResult<(CandidateList, TallyLedger)> {
        let mut registry = CandidateList::new();
        for rec in self.candidates.iter() {
            let cell = resolve_cell(rules, &rec.constituency, &rec.age_band)?;
            let candidate = Candidate::new(rec.id, &rec.name, cell).context(TallySnafu {})?;
            registry.add(candidate).context(TallySnafu {})?;
        }
        let ledger = TallyLedger::restore(self.ballots, self.totals.as_ref()).context(TallySnafu {})?;
        if let Some(last) = self.last_candidate_id {
            registry.reserve(last);
        }
        for b in ledger.ballots() {
            for id in b.selection() {
                registry.reserve(*id);
            }
        }
        Ok((registry, ledger))
    }
}

pub fn resolve_cell(rules: &ElectionRules, constituency: &str, age_band: &str) -> StationResult<Cell> {
    let index = rules.index();
    let constituency = index
        .constituency(constituency)
        .context(UnknownConstituencySnafu { name: constituency })?;
    let age_band = index
        .age_band(age_band)
        .context(UnknownAgeBandSnafu { name: age_band })?;
    Ok(Cell {
        constituency,
        age_band,
    })
}

/// Reads the state file. A missing file is an empty station.
pub fn read_state(path: &str) -> StationResult<StateFile> {
    if !Path::new(path).exists() {
        info!("State file {:?} does not exist yet, starting empty", path);
        return Ok(StateFile::default());
    }
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let state: StateFile = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!(
        "read_state: {} candidates, {} ballots",
        state.candidates.len(),
        state.ballots.len()
    );
    Ok(state)
}

pub fn write_state(path: &str, state: &StateFile) -> StationResult<()> {
    let js = serde_json::to_string_pretty(state).context(SerializingJsonSnafu {})?;
    fs::write(path, js).context(WritingFileSnafu { path })?;
    debug!("write_state: wrote {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn station() -> (ElectionRules, CandidateList, TallyLedger) {
        let rules = ElectionRules::parish_council();
        let mut registry = CandidateList::new();
        let cell = resolve_cell(&rules, "San Pio X", "61+").unwrap();
        registry
            .add(Candidate::new(CandidateId(1), "Giulia", cell).unwrap())
            .unwrap();
        registry
            .add(Candidate::new(CandidateId(2), "Paolo", cell).unwrap())
            .unwrap();
        let mut ledger = TallyLedger::new();
        let s: Selection = [CandidateId(1), CandidateId(2)].into_iter().collect();
        ledger.commit_selection(&registry, &rules, &s).unwrap();
        ledger.commit_blank().unwrap();
        (rules, registry, ledger)
    }

    #[test]
    fn state_round_trip() {
        let (rules, registry, ledger) = station();
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let path = path.to_str().unwrap();

        write_state(path, &StateFile::from_station(&registry, &rules, &ledger)).unwrap();
        let (registry2, ledger2) = read_state(path).unwrap().into_station(&rules).unwrap();
        assert_eq!(registry2, registry);
        assert_eq!(ledger2.ballots(), ledger.ballots());
        assert_eq!(ledger2.totals(), ledger.totals());
    }

    #[test]
    fn ballots_use_the_documented_shape() {
        let (rules, registry, ledger) = station();
        let js = serde_json::to_value(StateFile::from_station(&registry, &rules, &ledger)).unwrap();
        let first = &js["ballots"][0];
        assert_eq!(first["id"], 1);
        assert_eq!(first["category"], "valid");
        assert_eq!(first["selectedCandidateIds"], serde_json::json!([1, 2]));
        assert!(first["timestamp"].is_string());
        assert_eq!(js["ballots"][1]["category"], "blank");
        assert_eq!(js["ballots"][1]["selectedCandidateIds"], serde_json::json!([]));
        assert_eq!(js["totals"]["1"], 1);
        assert_eq!(js["candidates"][0]["ageBand"], "61+");
    }

    #[test]
    fn tampered_totals_are_detected() {
        let (rules, registry, ledger) = station();
        let mut state = StateFile::from_station(&registry, &rules, &ledger);
        state.totals.as_mut().unwrap().insert(CandidateId(2), 5);
        assert!(matches!(
            state.into_station(&rules),
            Err(StationError::Tally {
                source: TallyError::TotalsMismatch { .. }
            })
        ));
    }

    #[test]
    fn removed_candidate_ids_stay_reserved() {
        let (rules, mut registry, ledger) = station();
        registry.remove(CandidateId(2));
        registry.remove(CandidateId(1));
        let state = StateFile::from_station(&registry, &rules, &ledger);
        assert_eq!(state.last_candidate_id, Some(CandidateId(2)));
        let (registry2, _) = state.clone().into_station(&rules).unwrap();
        assert_eq!(registry2.next_id().unwrap(), CandidateId(3));

        // Older files without the high-water mark: the ballots still hold the ids.
        let state = StateFile {
            last_candidate_id: None,
            ..state
        };
        let (registry3, _) = state.into_station(&rules).unwrap();
        assert_eq!(registry3.next_id().unwrap(), CandidateId(3));
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nothing.json");
        let state = read_state(path.to_str().unwrap()).unwrap();
        assert_eq!(state, StateFile::default());
    }

    #[test]
    fn unknown_constituency_in_state() {
        let rules = ElectionRules::parish_council();
        let state = StateFile {
            candidates: vec![CandidateRecord {
                id: CandidateId(1),
                name: "X".to_string(),
                constituency: "Elsewhere".to_string(),
                age_band: "18-35".to_string(),
            }],
            ..StateFile::default()
        };
        assert!(matches!(
            state.into_station(&rules),
            Err(StationError::UnknownConstituency { .. })
        ));
    }
}
