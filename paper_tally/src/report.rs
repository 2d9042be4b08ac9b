// The results of an election, as displayed and exported.

use log::debug;
use snafu::prelude::*;

use crate::config::*;
use crate::layout::ElectionRules;
use crate::ledger::TallyLedger;
use crate::registry::CandidateRegistry;

/// One line of the results.
#[derive(PartialEq, Debug, Clone)]
pub struct ReportRow {
    pub candidate: Candidate,
    pub cell: Cell,
    pub constituency: String,
    pub age_band: String,
    pub votes: u64,
    /// Share of the valid ballots that voted for this candidate, between 0 and 100.
    pub percentage: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Report {
    /// Grouped by cell in layout order, most voted first within a cell.
    pub rows: Vec<ReportRow>,
    pub counts: CategoryCounts,
}

/// Assembles the results of all registered candidates.
///
/// Within a cell, candidates with the same number of votes stay in
/// registration order. Candidates that were deleted do not appear, even if
/// they received votes.
pub fn build_report<R: CandidateRegistry + ?Sized>(
    rules: &ElectionRules,
    registry: &R,
    ledger: &TallyLedger,
) -> Report {
    let counts = ledger.counts_by_category();
    let index = rules.index();
    let mut rows: Vec<ReportRow> = Vec::with_capacity(registry.list_candidates().len());
    for cell in index.all_cells() {
        let mut cell_rows: Vec<ReportRow> = registry
            .list_candidates()
            .iter()
            .filter(|c| index.cell_of(c) == cell)
            .map(|c| {
                let votes = ledger.votes_for(c.id());
                ReportRow {
                    candidate: c.clone(),
                    cell,
                    constituency: index.constituency_name(cell.constituency).to_string(),
                    age_band: index.age_band_name(cell.age_band).to_string(),
                    votes,
                    percentage: percentage(votes, counts.valid),
                }
            })
            .collect();
        // Stable: ties keep the registration order.
        cell_rows.sort_by(|a, b| b.votes.cmp(&a.votes));
        rows.extend(cell_rows);
    }
    debug!(
        "build_report: {} rows, {} ballots",
        rows.len(),
        counts.total()
    );
    Report { rows, counts }
}

fn percentage(votes: u64, valid_ballots: u64) -> f64 {
    if valid_ballots == 0 {
        0.0
    } else {
        (votes as f64) * 100.0 / (valid_ballots as f64)
    }
}

impl Report {
    pub fn total_ballots(&self) -> u64 {
        self.counts.total()
    }

    /// The rows split by cell. Cells without candidates are skipped.
    pub fn by_cell(&self) -> Vec<(Cell, &[ReportRow])> {
        let mut res: Vec<(Cell, &[ReportRow])> = Vec::new();
        let mut start = 0;
        while start < self.rows.len() {
            let cell = self.rows[start].cell;
            let len = self.rows[start..]
                .iter()
                .take_while(|r| r.cell == cell)
                .count();
            res.push((cell, &self.rows[start..start + len]));
            start += len;
        }
        res
    }

    /// The CSV export: one line per candidate, then a summary of the ballots
    /// after an empty line.
    pub fn to_csv(&self) -> Result<String, TallyError> {
        let mut wtr = csv::WriterBuilder::new().from_writer(Vec::new());
        wtr.write_record(["Name", "Constituency", "AgeBand", "Votes"])
            .context(CsvExportSnafu)?;
        for r in self.rows.iter() {
            wtr.write_record([
                r.candidate.name(),
                r.constituency.as_str(),
                r.age_band.as_str(),
                r.votes.to_string().as_str(),
            ])
            .context(CsvExportSnafu)?;
        }
        let summary = [
            ("ValidBallots", self.counts.valid),
            ("NullBallots", self.counts.null),
            ("BlankBallots", self.counts.blank),
            ("TotalBallots", self.counts.total()),
        ];
        let mut out = into_string(wtr)?;
        out.push('\n');
        let mut wtr = csv::WriterBuilder::new().from_writer(Vec::new());
        for (label, n) in summary {
            wtr.write_record([label, n.to_string().as_str()])
                .context(CsvExportSnafu)?;
        }
        out.push_str(&into_string(wtr)?);
        Ok(out)
    }
}

fn into_string(wtr: csv::Writer<Vec<u8>>) -> Result<String, TallyError> {
    let data = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
        .context(CsvExportSnafu)?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::RulesBuilder;
    use crate::registry::CandidateList;
    use crate::test_support::*;

    #[test]
    fn summary_lines() {
        let rules = two_constituencies();
        let reg = registry(&rules);
        let mut ledger = TallyLedger::new();
        ledger.commit_selection(&reg, &rules, &sel(&[1, 2])).unwrap();
        ledger.commit_selection(&reg, &rules, &sel(&[2, 11])).unwrap();
        ledger.commit_selection(&reg, &rules, &sel(&[11, 12, 13])).unwrap();
        ledger.commit_blank().unwrap();

        let report = build_report(&rules, &reg, &ledger);
        assert_eq!(report.total_ballots(), 4);
        let csv = report.to_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Name,Constituency,AgeBand,Votes");
        assert_eq!(lines.len(), 1 + 8 + 1 + 4);
        assert_eq!(lines[9], "");
        assert_eq!(
            &lines[10..],
            &["ValidBallots,2", "NullBallots,1", "BlankBallots,1", "TotalBallots,4"]
        );
    }

    #[test]
    fn rows_are_grouped_then_sorted() {
        let rules = two_constituencies();
        let reg = registry(&rules);
        let mut ledger = TallyLedger::new();
        ledger.commit_selection(&reg, &rules, &sel(&[3, 12])).unwrap();
        ledger.commit_selection(&reg, &rules, &sel(&[3, 4])).unwrap();

        let report = build_report(&rules, &reg, &ledger);
        let names: Vec<&str> = report.rows.iter().map(|r| r.candidate.name()).collect();
        assert_eq!(
            names,
            vec!["a3", "a4", "a1", "a2", "a5", "b12", "b11", "b13"]
        );
        assert_eq!(report.rows[0].percentage, 100.0);
        assert_eq!(report.rows[1].percentage, 50.0);
        assert_eq!(report.rows[2].percentage, 0.0);

        let groups = report.by_cell();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].1.len(), 5);
        assert_eq!(groups[1].0, rules.index().cell("B", "all").unwrap());
    }

    #[test]
    fn no_valid_ballots_means_zero_percent() {
        let rules = two_constituencies();
        let reg = registry(&rules);
        let mut ledger = TallyLedger::new();
        ledger.commit_blank().unwrap();
        let report = build_report(&rules, &reg, &ledger);
        assert!(report.rows.iter().all(|r| r.percentage == 0.0 && r.votes == 0));
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        let rules = RulesBuilder::new()
            .constituency("Rome, centre", 1)
            .and_then(|b| b.age_band("18+"))
            .and_then(|b| b.build())
            .unwrap();
        let cell = rules.index().cell("Rome, centre", "18+").unwrap();
        let mut reg = CandidateList::new();
        reg.add(Candidate::new(CandidateId(1), "Rossi, Maria", cell).unwrap())
            .unwrap();
        let mut ledger = TallyLedger::new();
        ledger.commit_selection(&reg, &rules, &sel(&[1])).unwrap();
        let csv = build_report(&rules, &reg, &ledger).to_csv().unwrap();
        assert_eq!(
            csv.lines().nth(1),
            Some("\"Rossi, Maria\",\"Rome, centre\",18+,1")
        );
    }
}
