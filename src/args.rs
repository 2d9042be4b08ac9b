use clap::{Parser, Subcommand};

/// Records paper ballots at a polling station and keeps the running tally.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the constituencies, their caps and the age bands.
    /// If not provided, the built-in parish council layout is used.
    #[clap(short, long, value_parser, global = true)]
    pub config: Option<String>,

    /// (file path, default papertally_state.json) The file holding the candidates and the ballots.
    /// It is created on the first change.
    #[clap(short, long, value_parser, global = true)]
    pub state: Option<String>,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Registers or removes a candidate.
    #[clap(subcommand)]
    Candidate(CandidateCommand),

    /// Lists the registered candidates, grouped by constituency and age band.
    Candidates,

    /// Shows how a ballot marking the given candidate ids would be counted, without recording it.
    Preview {
        #[clap(value_parser)]
        ids: Vec<u64>,
    },

    /// Records a ballot marking the given candidate ids. No ids records a blank ballot.
    Cast {
        #[clap(value_parser)]
        ids: Vec<u64>,
    },

    /// Records a blank ballot.
    Blank,

    /// Removes the last recorded ballot.
    Undo,

    /// Lists the recorded ballots.
    Ballots,

    /// Shows the results.
    Report {
        /// (file path or 'stdout', optional) Writes the results in CSV format to the given location.
        #[clap(short, long, value_parser)]
        out: Option<String>,

        /// (file path, optional) A reference CSV export. If provided, the current results
        /// are compared to it and any difference is an error.
        #[clap(short, long, value_parser)]
        reference: Option<String>,
    },

    /// Deletes all the candidates and ballots.
    Reset {
        /// Confirms the reset. Nothing is deleted without it.
        #[clap(long, takes_value = false)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum CandidateCommand {
    /// Registers a new candidate.
    Add {
        #[clap(long, value_parser)]
        name: String,
        #[clap(long, value_parser)]
        constituency: String,
        #[clap(long, value_parser)]
        age_band: String,
        /// (optional) The id of the candidate. By default, the next free id.
        #[clap(long, value_parser)]
        id: Option<u64>,
    },
    /// Removes a candidate. Votes already counted for this candidate are kept.
    Remove {
        #[clap(long, value_parser)]
        id: u64,
    },
}
