use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log at debug level (RUST_LOG still takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Create names from a CSV file, deduplicating on their clean names.
    Names(NamesArgs),
    /// Print the clean name and surrogate flag of a single name string.
    Clean {
        /// Raw name string.
        name: String,
    },
    /// Build one bounded CSV export from the data search backend.
    Export(ExportArgs),
}

#[derive(Args, Debug, PartialEq)]
pub struct NamesArgs {
    /// Path to the input CSV file.
    #[arg(short, long, value_name = "FILE")]
    pub input_file: PathBuf,

    /// Path to the per-record TSV status report.
    #[arg(short, long, value_name = "FILE")]
    pub output_file: PathBuf,

    /// Column holding the name strings.
    #[arg(long, default_value = "name")]
    pub column: String,

    /// Optional column holding curated canonical forms.
    #[arg(long)]
    pub canonical_column: Option<String>,
}

#[derive(Args, Debug, PartialEq)]
pub struct ExportArgs {
    /// Data search endpoint.
    #[arg(long, value_name = "URL")]
    pub search_url: String,

    /// Free-text query.
    #[arg(short, long)]
    pub query: Option<String>,

    /// URI of the attribute to export.
    #[arg(short, long)]
    pub attribute: String,

    /// Human label of the attribute, used in the file name.
    #[arg(long)]
    pub attribute_name: Option<String>,

    #[arg(long)]
    pub from: Option<String>,

    #[arg(long)]
    pub to: Option<String>,

    #[arg(long)]
    pub sort: Option<String>,

    /// ISO 639-1 language of the requester.
    #[arg(short, long, default_value = "en")]
    pub language: String,

    /// Requesting user; no notification is sent without one.
    #[arg(long)]
    pub user_id: Option<u64>,

    /// User recorded as the author of notifications.
    #[arg(long, default_value_t = 0)]
    pub sender_id: u64,

    /// Directory the CSV file is written to.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Public base URL the output directory is served from.
    #[arg(long, value_name = "URL", default_value = "")]
    pub download_base_url: String,

    /// Rows fetched from the search backend.
    #[arg(long, default_value_t = 500)]
    pub limit: usize,

    /// Messaging backend; messages are only logged when unset.
    #[arg(long, value_name = "URL")]
    pub messaging_url: Option<String>,

    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    #[arg(long, default_value_t = 3)]
    pub max_delivery_attempts: u32,
}

// Basic tests for CLI parsing
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_names_mode() {
        let args = vec![
            "taxa-kit",
            "names",
            "-i",
            "input.csv",
            "-o",
            "report.tsv",
            "--canonical-column",
            "canonical",
        ];
        let cli = Cli::parse_from(args);
        match cli.command {
            Command::Names(names) => {
                assert_eq!(names.input_file, PathBuf::from("input.csv"));
                assert_eq!(names.output_file, PathBuf::from("report.tsv"));
                assert_eq!(names.column, "name");
                assert_eq!(names.canonical_column.as_deref(), Some("canonical"));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_clean_mode() {
        let cli = Cli::parse_from(["taxa-kit", "-v", "clean", "Canis lupus"]);
        assert!(cli.verbose);
        assert_eq!(
            cli.command,
            Command::Clean {
                name: "Canis lupus".to_string()
            }
        );
    }

    #[test]
    fn test_cli_export_defaults() {
        let args = vec![
            "taxa-kit",
            "export",
            "--search-url",
            "http://localhost:3000/data_search",
            "-a",
            "http://eol.org/schema/terms/BodyMass",
            "-q",
            "wolf",
        ];
        let cli = Cli::parse_from(args);
        let Command::Export(export) = cli.command else {
            panic!("expected export command");
        };
        assert_eq!(export.limit, 500);
        assert_eq!(export.language, "en");
        assert_eq!(export.max_delivery_attempts, 3);
        assert_eq!(export.timeout_secs, 30);
        assert_eq!(export.output_dir, PathBuf::from("."));
        assert_eq!(export.query.as_deref(), Some("wolf"));
        assert!(export.user_id.is_none());
        assert!(export.messaging_url.is_none());
    }

    #[test]
    fn test_cli_names_missing_output() {
        // The output report is required.
        let args = vec!["taxa-kit", "names", "-i", "input.csv"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
