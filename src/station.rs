use log::{debug, info, warn};

use paper_tally::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use text_diff::print_diff;

use crate::args::{Args, CandidateCommand, Command};
use crate::station::config_reader::*;
use crate::station::io_state::*;

mod config_reader;
mod io_state;

const DEFAULT_STATE_PATH: &str = "papertally_state.json";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StationError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON content of {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the state"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("{source}"))]
    Tally { source: TallyError },
    #[snafu(display("Unknown constituency {name:?}"))]
    UnknownConstituency { name: String },
    #[snafu(display("Unknown age band {name:?}"))]
    UnknownAgeBand { name: String },
    #[snafu(display("No candidate with id {id}"))]
    UnknownCandidate { id: CandidateId },
    #[snafu(display("Id {id} belonged to a removed candidate who still has {votes} vote(s)"))]
    OrphanedCandidateId { id: CandidateId, votes: u64 },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type StationResult<T> = Result<T, StationError>;

/// Everything a polling station works with: the layout, the candidates and
/// the ballots recorded so far.
pub struct Station {
    pub rules: ElectionRules,
    pub registry: CandidateList,
    pub ledger: TallyLedger,
}

impl Station {
    pub fn open(config_path: Option<&str>, state_path: &str) -> StationResult<Station> {
        let rules = load_rules(config_path)?;
        let (registry, ledger) = read_state(state_path)?.into_station(&rules)?;
        Ok(Station {
            rules,
            registry,
            ledger,
        })
    }

    pub fn save(&self, state_path: &str) -> StationResult<()> {
        write_state(
            state_path,
            &StateFile::from_station(&self.registry, &self.rules, &self.ledger),
        )
    }

    fn cell_label(&self, cell: Cell) -> String {
        let index = self.rules.index();
        format!(
            "{} / {}",
            index.constituency_name(cell.constituency),
            index.age_band_name(cell.age_band)
        )
    }

    fn selection(&self, ids: &[u64]) -> Selection {
        let selection: Selection = ids.iter().map(|i| CandidateId(*i)).collect();
        for id in selection.selected_ids() {
            if !self.registry.candidate_exists(id) {
                warn!("No candidate with id {}, the mark is ignored", id);
            }
        }
        selection
    }

    fn add_candidate(
        &mut self,
        name: &str,
        constituency: &str,
        age_band: &str,
        id: Option<u64>,
    ) -> StationResult<()> {
        let cell = resolve_cell(&self.rules, constituency, age_band)?;
        let id = match id {
            Some(i) => CandidateId(i),
            None => self.registry.next_id().context(TallySnafu {})?,
        };
        let votes = self.ledger.votes_for(id);
        ensure!(
            votes == 0 || self.registry.candidate_exists(id),
            OrphanedCandidateIdSnafu { id, votes }
        );
        let candidate = Candidate::new(id, name, cell).context(TallySnafu {})?;
        let label = format!("{}: {} ({})", id, candidate.name(), self.cell_label(cell));
        self.registry.add(candidate).context(TallySnafu {})?;
        println!("Added candidate {}", label);
        Ok(())
    }

    fn remove_candidate(&mut self, id: u64) -> StationResult<()> {
        let id = CandidateId(id);
        let removed = self
            .registry
            .remove(id)
            .context(UnknownCandidateSnafu { id })?;
        if self.ledger.votes_for(id) > 0 {
            warn!(
                "Candidate {} already has {} vote(s), they stay in the ballots",
                id,
                self.ledger.votes_for(id)
            );
        }
        println!("Removed candidate {}: {}", id, removed.name());
        Ok(())
    }

    fn print_candidates(&self) {
        if self.registry.is_empty() {
            println!("No candidate registered.");
            return;
        }
        for cell in self.rules.index().all_cells() {
            let in_cell: Vec<&Candidate> = self
                .registry
                .list_candidates()
                .iter()
                .filter(|c| c.cell() == cell)
                .collect();
            if in_cell.is_empty() {
                continue;
            }
            println!("{}", self.cell_label(cell));
            for c in in_cell {
                println!("  {:>6} {}", c.id(), c.name());
            }
        }
    }

    fn print_classification(&self, classification: &Classification) {
        for cc in classification.cell_counts.iter() {
            let candidates_in_cell = self
                .registry
                .list_candidates()
                .iter()
                .any(|c| c.cell() == cc.cell);
            if cc.count == 0 && !candidates_in_cell {
                continue;
            }
            let flag = if cc.is_over_cap() { "  over the cap" } else { "" };
            println!(
                "  {:<40} {}/{}{}",
                self.cell_label(cc.cell),
                cc.count,
                cc.cap,
                flag
            );
        }
        println!("Ballot would be {}", classification.category);
    }

    fn print_ballots(&self) {
        for b in self.ledger.ballots() {
            let ids: Vec<String> = b.selection().iter().map(|id| id.to_string()).collect();
            println!(
                "{:>6} {} {:<5} {}",
                b.id().to_string(),
                b.timestamp().format("%Y-%m-%d %H:%M:%S"),
                b.category().to_string(),
                ids.join(" ")
            );
        }
        let counts = self.ledger.counts_by_category();
        println!(
            "{} ballot(s): {} valid, {} null, {} blank",
            counts.total(),
            counts.valid,
            counts.null,
            counts.blank
        );
    }

    fn print_report(&self, report: &Report) {
        let counts = &report.counts;
        println!(
            "Ballots: {} total, {} valid, {} null, {} blank",
            counts.total(),
            counts.valid,
            counts.null,
            counts.blank
        );
        for (cell, rows) in report.by_cell() {
            println!("{}", self.cell_label(cell));
            for r in rows {
                println!(
                    "  {:<30} {:>6} {:>6.1}%",
                    r.candidate.name(),
                    r.votes,
                    r.percentage
                );
            }
        }
    }
}

fn write_report(out: &str, csv: &str) -> StationResult<()> {
    if out == "stdout" {
        print!("{}", csv);
        return Ok(());
    }
    info!("Writing the results to {:?}", out);
    fs::write(out, csv).context(WritingFileSnafu { path: out })
}

fn check_reference(reference_path: &str, csv: &str) -> StationResult<()> {
    let reference =
        fs::read_to_string(reference_path).context(OpeningFileSnafu { path: reference_path })?;
    if reference != csv {
        warn!("Found differences with the reference results");
        print_diff(reference.as_str(), csv, "\n");
        whatever!(
            "Difference detected between the current results and the reference {}",
            reference_path
        )
    }
    info!("Results match the reference {:?}", reference_path);
    Ok(())
}

/// Runs one command against the state file and saves it if the command changed anything.
pub fn run(args: &Args) -> StationResult<()> {
    let state_path = args.state.as_deref().unwrap_or(DEFAULT_STATE_PATH);
    let mut station = Station::open(args.config.as_deref(), state_path)?;
    debug!("run: command {:?}", args.command);

    let changed = match &args.command {
        Command::Candidate(CandidateCommand::Add {
            name,
            constituency,
            age_band,
            id,
        }) => {
            station.add_candidate(name, constituency, age_band, *id)?;
            true
        }
        Command::Candidate(CandidateCommand::Remove { id }) => {
            station.remove_candidate(*id)?;
            true
        }
        Command::Candidates => {
            station.print_candidates();
            false
        }
        Command::Preview { ids } => {
            let selection = station.selection(ids);
            let classification = classify(&station.registry, &station.rules, &selection);
            station.print_classification(&classification);
            false
        }
        Command::Cast { ids } => {
            let selection = station.selection(ids);
            let ballot = station
                .ledger
                .commit_selection(&station.registry, &station.rules, &selection)
                .context(TallySnafu {})?;
            println!("Recorded ballot {} as {}", ballot.id(), ballot.category());
            true
        }
        Command::Blank => {
            let ballot = station.ledger.commit_blank().context(TallySnafu {})?;
            println!("Recorded ballot {} as {}", ballot.id(), ballot.category());
            true
        }
        Command::Undo => match station.ledger.undo_last() {
            Ok(ballot) => {
                println!("Removed ballot {} ({})", ballot.id(), ballot.category());
                true
            }
            Err(TallyError::EmptyLedger {}) => {
                warn!("There is no ballot to undo");
                println!("Nothing to undo.");
                false
            }
            Err(e) => return Err(e).context(TallySnafu {}),
        },
        Command::Ballots => {
            station.print_ballots();
            false
        }
        Command::Report { out, reference } => {
            let report = build_report(&station.rules, &station.registry, &station.ledger);
            let csv = report.to_csv().context(TallySnafu {})?;
            match out {
                Some(o) => write_report(o, &csv)?,
                None => station.print_report(&report),
            }
            if let Some(r) = reference {
                check_reference(r, &csv)?;
            }
            false
        }
        Command::Reset { yes } => {
            if !yes {
                whatever!("Refusing to delete all the candidates and ballots without --yes");
            }
            station.registry = CandidateList::new();
            station.ledger = TallyLedger::new();
            println!("All candidates and ballots deleted.");
            true
        }
    };

    if changed {
        station.save(state_path)?;
    }
    Ok(())
}
