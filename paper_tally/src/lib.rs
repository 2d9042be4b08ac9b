/*!
Validation and tally engine for paper ballots in a multi-constituency election.

A ballot marks any number of candidates. Each candidate belongs to a cell (a
constituency and an age band), and each constituency caps how many candidates
may be marked in any one of its cells. A ballot that goes over a cap anywhere is
null as a whole; a ballot with nothing marked is blank; anything else is valid
and counts one vote for each marked candidate.

The main entry points:
- [classify] decides the category of an in-progress [Selection] without side effects
- [TallyLedger] records committed ballots, keeps the totals and undoes the last ballot
- [build_report] assembles the results, and [Report::to_csv] exports them

See the [manual] module for the file formats used by the `papertally` program.
 */
pub mod builder;
mod config;
mod layout;
mod ledger;
pub mod manual;
pub mod registry;
mod report;

use log::debug;
use std::collections::HashMap;

pub use crate::config::*;
pub use crate::layout::*;
pub use crate::ledger::*;
pub use crate::registry::{CandidateList, CandidateRegistry};
pub use crate::report::*;

/// Marks of one cell of a ballot, next to the cap of that cell.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct CellCount {
    pub cell: Cell,
    pub count: u32,
    pub cap: u32,
}

impl CellCount {
    pub fn is_over_cap(&self) -> bool {
        self.count > self.cap
    }
}

/// The result of [classify].
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Classification {
    pub category: Category,
    /// One entry per cell, in [CategoryIndex::all_cells] order.
    pub cell_counts: Vec<CellCount>,
    /// The marked candidates that are registered, in increasing id order.
    pub counted: Vec<CandidateId>,
}

impl Classification {
    pub fn count_for(&self, cell: Cell) -> u32 {
        self.cell_counts
            .iter()
            .find(|cc| cc.cell == cell)
            .map(|cc| cc.count)
            .unwrap_or(0)
    }

    pub fn total_marked(&self) -> usize {
        self.counted.len()
    }
}

/// Classifies a ballot.
///
/// Marks on ids that are not registered are ignored. A cell exactly at its cap
/// is fine; one mark more and the whole ballot is null, whatever the other
/// cells contain. The over-cap check comes before the blank check.
///
/// This function is pure: previewing a ballot and committing it give the same
/// answer.
pub fn classify<R: CandidateRegistry + ?Sized>(
    registry: &R,
    rules: &ElectionRules,
    selection: &Selection,
) -> Classification {
    let mut counts: HashMap<Cell, u32> = HashMap::new();
    let mut counted: Vec<CandidateId> = Vec::new();
    for id in selection.selected_ids() {
        match registry.candidate(id) {
            Some(candidate) => {
                *counts.entry(rules.index.cell_of(candidate)).or_insert(0) += 1;
                counted.push(id);
            }
            None => {
                debug!("classify: ignoring unknown candidate {}", id);
            }
        }
    }

    let cell_counts: Vec<CellCount> = rules
        .index
        .all_cells()
        .into_iter()
        .map(|cell| CellCount {
            cell,
            count: counts.get(&cell).copied().unwrap_or(0),
            cap: rules.caps.cap_for(cell.constituency),
        })
        .collect();

    let category = if cell_counts.iter().any(|cc| cc.is_over_cap()) {
        Category::Null
    } else if counted.is_empty() {
        Category::Blank
    } else {
        Category::Valid
    };
    debug!(
        "classify: {:?} with {} marks: {:?}",
        category,
        counted.len(),
        cell_counts
            .iter()
            .filter(|cc| cc.count > 0)
            .map(|cc| (cc.cell, cc.count, cc.cap))
            .collect::<Vec<_>>()
    );

    Classification {
        category,
        cell_counts,
        counted,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::builder::RulesBuilder;
    use crate::*;

    pub fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Caps A=3, B=2 with a single age band.
    pub fn two_constituencies() -> ElectionRules {
        RulesBuilder::new()
            .constituency("A", 3)
            .and_then(|b| b.constituency("B", 2))
            .and_then(|b| b.age_band("all"))
            .and_then(|b| b.build())
            .unwrap()
    }

    /// Candidates 1..=5 in A, 11..=13 in B.
    pub fn registry(rules: &ElectionRules) -> CandidateList {
        let a = rules.index().cell("A", "all").unwrap();
        let b = rules.index().cell("B", "all").unwrap();
        let mut reg = CandidateList::new();
        for i in 1..=5 {
            reg.add(Candidate::new(CandidateId(i), &format!("a{}", i), a).unwrap())
                .unwrap();
        }
        for i in 11..=13 {
            reg.add(Candidate::new(CandidateId(i), &format!("b{}", i), b).unwrap())
                .unwrap();
        }
        reg
    }

    pub fn sel(ids: &[u64]) -> Selection {
        ids.iter().map(|i| CandidateId(*i)).collect()
    }
}
