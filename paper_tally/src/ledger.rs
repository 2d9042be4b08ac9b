use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use snafu::prelude::*;
use std::collections::BTreeSet;

use crate::config::*;
use crate::layout::ElectionRules;
use crate::registry::CandidateRegistry;

/// The committed ballots, in order, and the totals they add up to.
///
/// Ballots can only be appended, or removed from the end with [TallyLedger::undo_last].
/// Invariant: the totals are always the sum of the selections of the valid
/// ballots currently in the ledger.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyLedger {
    ballots: Vec<Ballot>,
    totals: Totals,
    next_id: u64,
}

impl Default for TallyLedger {
    fn default() -> Self {
        TallyLedger::new()
    }
}

impl TallyLedger {
    pub fn new() -> TallyLedger {
        TallyLedger {
            ballots: Vec::new(),
            totals: Totals::new(),
            next_id: 1,
        }
    }

    /// Classifies the selection and records the ballot.
    ///
    /// Only a valid ballot keeps its selection, and only a valid ballot changes
    /// the totals: one vote for each marked candidate that is registered.
    ///
    /// Fails only when the ledger has run out of ballot ids.
    pub fn commit_selection<R: CandidateRegistry + ?Sized>(
        &mut self,
        registry: &R,
        rules: &ElectionRules,
        selection: &Selection,
    ) -> Result<Ballot, TallyError> {
        let classification = crate::classify(registry, rules, selection);
        self.commit_at(
            classification.category,
            classification.counted,
            Utc::now(),
        )
    }

    /// Records a blank ballot, whatever is currently marked.
    pub fn commit_blank(&mut self) -> Result<Ballot, TallyError> {
        self.commit_at(Category::Blank, Vec::new(), Utc::now())
    }

    fn commit_at(
        &mut self,
        category: Category,
        selection: Vec<CandidateId>,
        timestamp: DateTime<Utc>,
    ) -> Result<Ballot, TallyError> {
        let id = BallotId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .context(BallotIdsExhaustedSnafu { last: id })?;
        let ballot = Ballot::new(id, timestamp, category, selection);
        if ballot.category() == Category::Valid {
            fold(&mut self.totals, ballot.selection());
        }
        info!(
            "Committed ballot {} ({}) with {} vote(s)",
            ballot.id(),
            ballot.category(),
            ballot.selection().len()
        );
        self.ballots.push(ballot.clone());
        Ok(ballot)
    }

    /// Removes the most recent ballot and takes back its votes.
    ///
    /// Fails with [TallyError::EmptyLedger] when there is nothing to undo.
    pub fn undo_last(&mut self) -> Result<Ballot, TallyError> {
        let ballot = self.ballots.pop().ok_or(TallyError::EmptyLedger {})?;
        if ballot.category() == Category::Valid {
            for id in ballot.selection() {
                match self.totals.get_mut(id) {
                    Some(count) if *count > 1 => *count -= 1,
                    Some(_) => {
                        self.totals.remove(id);
                    }
                    None => {
                        warn!(
                            "undo_last: ballot {} votes for {} which has no votes, keeping it at 0",
                            ballot.id(),
                            id
                        );
                    }
                }
            }
        }
        info!("Undid ballot {} ({})", ballot.id(), ballot.category());
        Ok(ballot)
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn votes_for(&self, id: CandidateId) -> u64 {
        self.totals.get(&id).copied().unwrap_or(0)
    }

    pub fn counts_by_category(&self) -> CategoryCounts {
        let mut counts = CategoryCounts::default();
        for b in self.ballots.iter() {
            *counts.slot(b.category()) += 1;
        }
        counts
    }

    pub fn ballots(&self) -> &[Ballot] {
        &self.ballots
    }

    pub fn is_empty(&self) -> bool {
        self.ballots.is_empty()
    }

    /// Recomputes the totals from scratch by folding the valid ballots in order.
    pub fn replayed_totals(&self) -> Totals {
        let mut totals = Totals::new();
        for b in self.ballots.iter() {
            if b.category() == Category::Valid {
                fold(&mut totals, b.selection());
            }
        }
        totals
    }

    /// Rebuilds a ledger from stored ballot records.
    ///
    /// The totals are always recomputed from the valid ballots. If totals were
    /// stored alongside the ballots, they must agree with the recomputed ones.
    pub fn restore(
        ballots: Vec<Ballot>,
        stored_totals: Option<&Totals>,
    ) -> Result<TallyLedger, TallyError> {
        let mut last_id: Option<BallotId> = None;
        for b in ballots.iter() {
            if let Some(prev) = last_id {
                if b.id() <= prev {
                    return InconsistentBallotSnafu {
                        id: b.id(),
                        message: format!("comes after ballot {}", prev),
                    }
                    .fail();
                }
            }
            last_id = Some(b.id());
            if b.category() != Category::Valid && !b.selection().is_empty() {
                return InconsistentBallotSnafu {
                    id: b.id(),
                    message: format!("a {} ballot cannot carry votes", b.category()),
                }
                .fail();
            }
            let distinct: BTreeSet<&CandidateId> = b.selection().iter().collect();
            if distinct.len() != b.selection().len() {
                return InconsistentBallotSnafu {
                    id: b.id(),
                    message: "votes twice for the same candidate",
                }
                .fail();
            }
        }

        let next_id = match last_id {
            None => 1,
            Some(last) => last.0.checked_add(1).context(InconsistentBallotSnafu {
                id: last,
                message: "no ballot id is left after it",
            })?,
        };
        let mut ledger = TallyLedger {
            next_id,
            ballots,
            totals: Totals::new(),
        };
        ledger.totals = ledger.replayed_totals();
        info!(
            "Restored {} ballots, {} candidates with votes",
            ledger.ballots.len(),
            ledger.totals.len()
        );

        if let Some(stored) = stored_totals {
            check_totals(stored, &ledger.totals)?;
            debug!("restore: stored totals match the replayed ballots");
        }
        Ok(ledger)
    }
}

fn fold(totals: &mut Totals, selection: &[CandidateId]) {
    for id in selection {
        *totals.entry(*id).or_insert(0) += 1;
    }
}

fn check_totals(stored: &Totals, replayed: &Totals) -> Result<(), TallyError> {
    let keys: BTreeSet<&CandidateId> = stored.keys().chain(replayed.keys()).collect();
    for candidate in keys {
        let s = stored.get(candidate).copied().unwrap_or(0);
        let r = replayed.get(candidate).copied().unwrap_or(0);
        if s != r {
            warn!(
                "check_totals: candidate {}: stored {} replayed {}",
                candidate, s, r
            );
            return TotalsMismatchSnafu {
                candidate: *candidate,
                stored: s,
                replayed: r,
            }
            .fail();
        }
    }
    Ok(())
}
