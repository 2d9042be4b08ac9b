use log::{debug, info};
use snafu::prelude::*;

use crate::config::*;

/// Read access to the registered candidates.
///
/// The engine never creates nor deletes candidates; it only resolves ids.
pub trait CandidateRegistry {
    /// All the candidates, in registration order.
    fn list_candidates(&self) -> &[Candidate];

    fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.list_candidates().iter().find(|c| c.id() == id)
    }

    fn candidate_exists(&self, id: CandidateId) -> bool {
        self.candidate(id).is_some()
    }
}

/// A simple registry that keeps candidates in memory, in insertion order.
///
/// The list remembers the highest id it has ever handed out or been told
/// about, so a removed candidate's id is never proposed again.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CandidateList {
    candidates: Vec<Candidate>,
    last_id: Option<CandidateId>,
}

impl CandidateList {
    pub fn new() -> CandidateList {
        CandidateList::default()
    }

    pub fn add(&mut self, candidate: Candidate) -> Result<(), TallyError> {
        if self.candidate_exists(candidate.id()) {
            return DuplicateCandidateSnafu { id: candidate.id() }.fail();
        }
        info!(
            "Registering candidate {}: {}",
            candidate.id(),
            candidate.name()
        );
        self.reserve(candidate.id());
        self.candidates.push(candidate);
        Ok(())
    }

    /// Marks an id as used, even if no registered candidate carries it.
    pub fn reserve(&mut self, id: CandidateId) {
        if self.last_id.map_or(true, |last| id > last) {
            self.last_id = Some(id);
        }
    }

    /// The highest id used so far, registered or not.
    pub fn last_id(&self) -> Option<CandidateId> {
        self.last_id
    }

    /// Removes a candidate. Ballots and totals that mention it are left untouched.
    pub fn remove(&mut self, id: CandidateId) -> Option<Candidate> {
        let pos = self.candidates.iter().position(|c| c.id() == id)?;
        let removed = self.candidates.remove(pos);
        debug!("CandidateList::remove: {:?}", removed);
        Some(removed)
    }

    /// The smallest id strictly above every id used so far, including the
    /// ids of removed candidates.
    pub fn next_id(&self) -> Result<CandidateId, TallyError> {
        match self.last_id {
            None => Ok(CandidateId(1)),
            Some(last) => last
                .0
                .checked_add(1)
                .map(CandidateId)
                .context(CandidateIdsExhaustedSnafu { last }),
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl CandidateRegistry for CandidateList {
    fn list_candidates(&self) -> &[Candidate] {
        &self.candidates
    }
}

impl FromIterator<Candidate> for CandidateList {
    /// Later duplicates of an id are dropped.
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        let mut res = CandidateList::new();
        for c in iter {
            if !res.candidate_exists(c.id()) {
                res.reserve(c.id());
                res.candidates.push(c);
            }
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ElectionRules;

    fn cell() -> Cell {
        ElectionRules::parish_council()
            .index()
            .cell("San Pio X", "36-60")
            .unwrap()
    }

    #[test]
    fn names_are_trimmed_and_required() {
        let c = Candidate::new(CandidateId(4), "  Maria Rossi ", cell()).unwrap();
        assert_eq!(c.name(), "Maria Rossi");
        let res = Candidate::new(CandidateId(5), " \t ", cell());
        assert!(matches!(res, Err(TallyError::EmptyCandidateName { .. })));
    }

    #[test]
    fn add_and_remove() {
        let mut reg = CandidateList::new();
        assert_eq!(reg.next_id().unwrap(), CandidateId(1));
        reg.add(Candidate::new(CandidateId(1), "Anna", cell()).unwrap())
            .unwrap();
        reg.add(Candidate::new(CandidateId(7), "Bruno", cell()).unwrap())
            .unwrap();
        let dup = reg.add(Candidate::new(CandidateId(7), "Carla", cell()).unwrap());
        assert!(matches!(dup, Err(TallyError::DuplicateCandidate { .. })));
        assert_eq!(reg.next_id().unwrap(), CandidateId(8));
        assert!(reg.candidate_exists(CandidateId(1)));

        let removed = reg.remove(CandidateId(1)).unwrap();
        assert_eq!(removed.name(), "Anna");
        assert!(!reg.candidate_exists(CandidateId(1)));
        assert_eq!(reg.remove(CandidateId(1)), None);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.list_candidates()[0].name(), "Bruno");
    }

    #[test]
    fn removed_ids_are_not_proposed_again() {
        let mut reg = CandidateList::new();
        reg.add(Candidate::new(CandidateId(1), "Anna", cell()).unwrap())
            .unwrap();
        reg.add(Candidate::new(CandidateId(2), "Bruno", cell()).unwrap())
            .unwrap();
        reg.remove(CandidateId(2));
        assert_eq!(reg.next_id().unwrap(), CandidateId(3));

        reg.reserve(CandidateId(10));
        reg.reserve(CandidateId(4));
        assert_eq!(reg.last_id(), Some(CandidateId(10)));
        assert_eq!(reg.next_id().unwrap(), CandidateId(11));
    }

    #[test]
    fn next_id_after_the_largest_id() {
        let mut reg = CandidateList::new();
        reg.add(Candidate::new(CandidateId(u64::MAX), "Last", cell()).unwrap())
            .unwrap();
        assert!(matches!(
            reg.next_id(),
            Err(TallyError::CandidateIdsExhausted { .. })
        ));
    }
}
