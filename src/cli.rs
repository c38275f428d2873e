//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::data::filter::{Choice, FilterSelections, ALL};
use crate::data::schema::{SEVERITY, STATE, WEATHER_CONDITION};

/// Command-line arguments for accident-explorer
#[derive(Clone, Parser, Debug)]
#[command(
    name = "accident-explorer",
    version,
    about = "Fetch, filter and aggregate traffic-accident records"
)]
pub struct Args {
    /// Read configuration from this file instead of the user config directory
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding the downloaded archive and extracted table
    #[arg(long = "cache-dir", global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Remote archive URL (overrides dataset.url)
    #[arg(long, global = true, value_name = "URL")]
    pub url: Option<String>,

    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long, global = true, action)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Subcommand, Debug)]
pub enum Command {
    /// Make sure the dataset is cached locally and print its path
    Fetch,
    /// List the dataset's columns
    Columns,
    /// Print the choices for every filter selector
    Options,
    /// Filter the dataset and print every derived view
    Query(QueryArgs),
    /// Count accidents starting in the given hour (0-23)
    Hour {
        #[arg(allow_negative_numbers = true)]
        hour: i64,
    },
    /// Show what is present in the cache
    Status,
    /// Remove the cached archive and extracted table
    Clear,
    /// Write a default config file and exit
    GenerateConfig {
        /// Overwrite an existing config file
        #[arg(long, action)]
        force: bool,
    },
}

#[derive(Clone, ClapArgs, Debug, Default)]
pub struct QueryArgs {
    /// State to keep (e.g. CA)
    #[arg(long)]
    pub state: Option<String>,

    /// Severity to keep (1-4)
    #[arg(long)]
    pub severity: Option<String>,

    /// Weather condition to keep, or "All"
    #[arg(long)]
    pub weather: Option<String>,

    /// Hour for the hour-of-day views (defaults to query.default_hour)
    #[arg(long)]
    pub hour: Option<i64>,

    /// Entries kept in frequency-ordered distributions (defaults to query.top_k)
    #[arg(long = "top-k", value_name = "N")]
    pub top_k: Option<usize>,

    /// Pretty-print the JSON output
    #[arg(long, action)]
    pub pretty: bool,
}

impl QueryArgs {
    /// Selector state for the given flags. An omitted flag leaves the column
    /// unconstrained.
    pub fn selections(&self) -> FilterSelections {
        [
            (STATE, &self.state),
            (SEVERITY, &self.severity),
            (WEATHER_CONDITION, &self.weather),
        ]
        .into_iter()
        .map(|(column, raw)| {
            let choice = Choice::parse(raw.as_deref().unwrap_or(ALL));
            (column.to_string(), choice)
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Value;

    #[test]
    fn query_flags_parse_into_selections() {
        let args = Args::parse_from([
            "accident-explorer",
            "--cache-dir",
            "/tmp/x",
            "query",
            "--state",
            "CA",
            "--weather",
            "All",
            "--top-k",
            "3",
        ]);
        assert_eq!(args.cache_dir, Some(PathBuf::from("/tmp/x")));
        let Command::Query(q) = args.command else {
            panic!("expected query subcommand");
        };
        assert_eq!(q.top_k, Some(3));

        let sel = q.selections();
        assert_eq!(sel[STATE], Choice::Only(Value::from("CA")));
        assert_eq!(sel[SEVERITY], Choice::All);
        assert_eq!(sel[WEATHER_CONDITION], Choice::All);
    }

    #[test]
    fn hour_accepts_out_of_range_values() {
        let args = Args::parse_from(["accident-explorer", "hour", "25"]);
        assert!(matches!(args.command, Command::Hour { hour: 25 }));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::parse_from(["accident-explorer", "status", "--verbose"]);
        assert!(args.verbose);
    }
}
