// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::Snafu;

/// Opaque identifier of a candidate, chosen by whoever registers the candidate.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub u64);

impl Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a committed ballot. Fresh for every commit of a ledger.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BallotId(pub u64);

impl Display for BallotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A constituency of the election.
///
/// Values can only be obtained from a [crate::CategoryIndex], so a constituency
/// always refers to an entry of the layout it came from.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct Constituency(pub(crate) u16);

impl Constituency {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An age band of the election. Same construction rules as [Constituency].
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct AgeBand(pub(crate) u16);

impl AgeBand {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A (constituency, age band) grouping.
///
/// Cells order by constituency first, then by age band, which is also the
/// enumeration order of [crate::CategoryIndex::all_cells].
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct Cell {
    pub constituency: Constituency,
    pub age_band: AgeBand,
}

/// A registered candidate.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Candidate {
    id: CandidateId,
    name: String,
    cell: Cell,
}

impl Candidate {
    /// Creates a candidate. The name is trimmed and must not be empty afterwards.
    pub fn new(id: CandidateId, name: &str, cell: Cell) -> Result<Candidate, TallyError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(TallyError::EmptyCandidateName { id });
        }
        Ok(Candidate {
            id,
            name: trimmed.to_string(),
            cell,
        })
    }

    pub fn id(&self) -> CandidateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cell(&self) -> Cell {
        self.cell
    }
}

/// The outcome of classifying a ballot.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Within every cap and at least one candidate selected.
    Valid,
    /// At least one cell over its cap. The whole ballot is discarded.
    Null,
    /// Nothing selected, or explicitly submitted as blank.
    Blank,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Valid, Category::Null, Category::Blank];
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Valid => "valid",
            Category::Null => "null",
            Category::Blank => "blank",
        };
        write!(f, "{}", s)
    }
}

/// The in-progress ballot: which candidates are currently marked.
///
/// Ids that are not (or no longer) registered may be marked; they are ignored
/// when the ballot is classified.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Selection {
    marks: BTreeMap<CandidateId, bool>,
}

impl Selection {
    pub fn new() -> Selection {
        Selection::default()
    }

    /// Flips the mark of a candidate and returns the new state.
    pub fn toggle(&mut self, id: CandidateId) -> bool {
        let mark = self.marks.entry(id).or_insert(false);
        *mark = !*mark;
        *mark
    }

    pub fn set(&mut self, id: CandidateId, selected: bool) {
        self.marks.insert(id, selected);
    }

    pub fn is_selected(&self, id: CandidateId) -> bool {
        self.marks.get(&id).copied().unwrap_or(false)
    }

    /// The marked ids, in increasing order.
    pub fn selected_ids(&self) -> impl Iterator<Item = CandidateId> + '_ {
        self.marks
            .iter()
            .filter(|(_, selected)| **selected)
            .map(|(id, _)| *id)
    }

    pub fn clear(&mut self) {
        self.marks.clear();
    }
}

impl FromIterator<CandidateId> for Selection {
    fn from_iter<I: IntoIterator<Item = CandidateId>>(iter: I) -> Self {
        Selection {
            marks: iter.into_iter().map(|id| (id, true)).collect(),
        }
    }
}

/// A committed ballot.
///
/// The selection is only kept for valid ballots: null and blank ballots do not
/// contribute to the totals.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    id: BallotId,
    timestamp: DateTime<Utc>,
    category: Category,
    #[serde(rename = "selectedCandidateIds", default)]
    selection: Vec<CandidateId>,
}

impl Ballot {
    pub(crate) fn new(
        id: BallotId,
        timestamp: DateTime<Utc>,
        category: Category,
        selection: Vec<CandidateId>,
    ) -> Ballot {
        let selection = match category {
            Category::Valid => selection,
            Category::Null | Category::Blank => Vec::new(),
        };
        Ballot {
            id,
            timestamp,
            category,
            selection,
        }
    }

    pub fn id(&self) -> BallotId {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// The candidates this ballot votes for. Always empty unless the ballot is valid.
    pub fn selection(&self) -> &[CandidateId] {
        &self.selection
    }
}

/// Per-candidate vote totals. Candidates without votes are absent.
pub type Totals = BTreeMap<CandidateId, u64>;

/// Number of ballots in each category.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub valid: u64,
    pub null: u64,
    pub blank: u64,
}

impl CategoryCounts {
    pub fn get(&self, category: Category) -> u64 {
        match category {
            Category::Valid => self.valid,
            Category::Null => self.null,
            Category::Blank => self.blank,
        }
    }

    pub fn total(&self) -> u64 {
        self.valid + self.null + self.blank
    }

    pub(crate) fn slot(&mut self, category: Category) -> &mut u64 {
        match category {
            Category::Valid => &mut self.valid,
            Category::Null => &mut self.null,
            Category::Blank => &mut self.blank,
        }
    }
}

/// Errors raised by the tally engine.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TallyError {
    /// Undo was requested on a ledger without ballots. Callers treat it as a no-op.
    #[snafu(display("there is no ballot to undo"))]
    EmptyLedger {},

    /// The election layout is incomplete or contradictory.
    #[snafu(display("invalid election configuration: {message}"))]
    Configuration { message: String },

    #[snafu(display("candidate {id} has an empty name"))]
    EmptyCandidateName { id: CandidateId },

    #[snafu(display("candidate {id} is already registered"))]
    DuplicateCandidate { id: CandidateId },

    #[snafu(display("no candidate id left after {last}"))]
    CandidateIdsExhausted { last: CandidateId },

    #[snafu(display("no ballot id left after {last}"))]
    BallotIdsExhausted { last: BallotId },

    #[snafu(display("ballot {id} cannot be restored: {message}"))]
    InconsistentBallot { id: BallotId, message: String },

    #[snafu(display(
        "stored total for candidate {candidate} is {stored} but replaying the ballots gives {replayed}"
    ))]
    TotalsMismatch {
        candidate: CandidateId,
        stored: u64,
        replayed: u64,
    },

    #[snafu(display("could not write the CSV export"))]
    CsvExport { source: csv::Error },
}
