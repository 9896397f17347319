use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use taxa_kit::cli::{Cli, Command, ExportArgs, NamesArgs};
use taxa_kit::csv_handler::{
    ColumnConfig, NameReport, NameStatus, load_and_validate_csv, write_status_report,
};
use taxa_kit::error::{CrateError, Result, ValidationError};
use taxa_kit::export::notifier::{HttpMessenger, LogMessenger, Messenger};
use taxa_kit::export::{
    DataSearchFile, ExportQuery, ExportSettings, ExportUser, HttpSearchBackend,
    NotificationQueue, RetryPolicy,
};
use taxa_kit::taxon::{NameRegistry, NewName, is_surrogate_or_hybrid, prepare_clean_name};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    if let Err(e) = env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env() // RUST_LOG overrides the default level
        .format_target(false)
        .format_timestamp_secs()
        .try_init()
    {
        eprintln!("Logger already initialized: {}", e);
    }

    let start_time = Instant::now();
    let outcome = match cli.command {
        Command::Names(args) => run_names(args),
        Command::Clean { name } => {
            println!("clean_name: {}", prepare_clean_name(&name));
            println!(
                "surrogate_or_hybrid: {}",
                if is_surrogate_or_hybrid(&name) { "yes" } else { "no" }
            );
            Ok(())
        }
        Command::Export(args) => run_export(args).await,
    };

    info!("Total execution time: {:.2?}", start_time.elapsed());
    outcome
}

fn run_names(args: NamesArgs) -> Result<()> {
    info!("Input file: {:?}", args.input_file);
    info!("Loading and validating CSV...");
    let columns = ColumnConfig {
        name: args.column.clone(),
        canonical_form: args.canonical_column.clone(),
    };
    let records = match load_and_validate_csv(&args.input_file, &columns) {
        Ok(records) => {
            info!("Successfully loaded and validated {} records.", records.len());
            records
        }
        Err(e) => {
            error!("Failed to load or validate CSV: {}", e);
            return Err(e);
        }
    };

    if records.is_empty() {
        info!("Input CSV is empty or contains no valid records. Exiting.");
        return Ok(());
    }

    let registry = NameRegistry::new();
    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );

    let mut reports = Vec::with_capacity(records.len());
    for record in records {
        pb.set_message(record.name.clone());
        let mut new_name = NewName::new(record.name.clone());
        if let Some(canonical) = &record.canonical_form {
            new_name = new_name.with_canonical_form(canonical.clone());
        }

        let surrogate_or_hybrid = is_surrogate_or_hybrid(&record.name);
        let report = match registry.create_name(new_name) {
            Ok(name) => NameReport {
                row: record.row,
                clean_name: name.clean_name.clone(),
                canonical_form: name.canonical().to_string(),
                canonical_verified: name.canonical_verified,
                surrogate_or_hybrid,
                status: NameStatus::Created { name_id: name.id },
                name: record.name,
            },
            Err(CrateError::Validation(ValidationError::DuplicateCleanName {
                clean_name,
                existing_id,
            })) => {
                let canonical_form = registry
                    .get(existing_id)
                    .map(|existing| existing.canonical().to_string())
                    .unwrap_or_default();
                pb.println(format!(
                    "Row {}: '{}' duplicates name {}",
                    record.row, record.name, existing_id
                ));
                NameReport {
                    row: record.row,
                    clean_name,
                    canonical_form,
                    canonical_verified: false,
                    surrogate_or_hybrid,
                    status: NameStatus::Duplicate { existing_id },
                    name: record.name,
                }
            }
            Err(e) => {
                warn!("Row {}: rejected '{}': {}", record.row, record.name, e);
                NameReport {
                    row: record.row,
                    clean_name: prepare_clean_name(&record.name),
                    canonical_form: String::new(),
                    canonical_verified: false,
                    surrogate_or_hybrid,
                    status: NameStatus::Rejected {
                        reason: e.to_string(),
                    },
                    name: record.name,
                }
            }
        };
        reports.push(report);
        pb.inc(1);
    }
    pb.finish_with_message("Name processing complete.");

    write_status_report(&reports, &args.output_file)?;

    let created = reports
        .iter()
        .filter(|r| matches!(r.status, NameStatus::Created { .. }))
        .count();
    let duplicates = reports
        .iter()
        .filter(|r| matches!(r.status, NameStatus::Duplicate { .. }))
        .count();
    let rejected = reports.len() - created - duplicates;
    let surrogates = reports.iter().filter(|r| r.surrogate_or_hybrid).count();

    println!("\n--- Summary Report ---");
    println!("Total CSV records read: {}", reports.len());
    println!("Names created: {}", created);
    println!("Duplicates of an existing clean name: {}", duplicates);
    println!("Rejected: {}", rejected);
    println!("Canonical forms: {}", registry.canonical_form_count());
    println!("Surrogate or hybrid names: {}", surrogates);
    println!(
        "Per-record status report saved to: {}",
        args.output_file.display()
    );
    Ok(())
}

async fn run_export(args: ExportArgs) -> Result<()> {
    let timeout = Duration::from_secs(args.timeout_secs);
    let backend = HttpSearchBackend::new(&args.search_url, timeout)?;
    let messenger: Arc<dyn Messenger> = match &args.messaging_url {
        Some(url) => Arc::new(HttpMessenger::new(url, timeout)?),
        None => {
            info!("No messaging backend configured; notifications will only be logged.");
            Arc::new(LogMessenger)
        }
    };
    let queue = NotificationQueue::start(
        messenger,
        RetryPolicy {
            max_attempts: args.max_delivery_attempts,
            ..Default::default()
        },
    );

    let query = ExportQuery {
        query_string: args.query,
        attribute_uri: args.attribute,
        attribute_name: args.attribute_name,
        from: args.from,
        to: args.to,
        sort: args.sort,
        language: args.language.clone(),
    };
    let user = args.user_id.map(|id| ExportUser {
        id,
        language: args.language.clone(),
    });
    let settings = ExportSettings {
        output_dir: args.output_dir,
        download_base_url: args.download_base_url,
        limit: args.limit,
        sender_id: args.sender_id,
    };

    let mut file = DataSearchFile::new(query, user, settings);
    info!("Building export {}", file.filename());
    let build = file.build(&backend, &queue).await;
    let report = queue.shutdown().await;

    let state = match build {
        Ok(state) => state,
        Err(e) => {
            error!("Export failed: {}", e);
            return Err(e);
        }
    };

    println!("\n--- Export Report ---");
    println!("State: {:?}", state);
    println!("File: {}", file.path().display());
    println!("Download: {}", file.download_path());
    println!("Notifications delivered: {}", report.delivered);
    if !report.failed.is_empty() {
        println!("Notifications failed: {}", report.failed.len());
        for failure in &report.failed {
            println!(
                "- user {} after {} attempt(s): {}",
                failure.message.recipient, failure.attempts, failure.reason
            );
        }
    }
    Ok(())
}
