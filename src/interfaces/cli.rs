use crate::application::use_cases::generate::GenerateTestCasesUseCase;
use crate::application::use_cases::record_formatter::RecordFormatter;
use crate::domain::error::{AppError, Result};
use crate::domain::generation::{GenerationRequest, Priority};
use crate::domain::history::{HistoryEntry, HistoryFilter};
use crate::domain::llm_config::BackendKind;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::history::HistoryLedger;
use crate::infrastructure::llm_clients::{build_backend, select_backend};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "casegen",
    version,
    about = "Generate QA test cases from ticket acceptance criteria"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate test cases for one ticket and merge them into a spreadsheet.
    Generate(GenerateArgs),
    /// Browse or prune the generation history.
    #[command(subcommand)]
    History(HistoryCommand),
    /// Inspect configured backends.
    #[command(subcommand)]
    Backend(BackendCommand),
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Ticket id, e.g. BULK-001.
    #[arg(long, alias = "jira")]
    pub ticket: String,
    /// High, Medium, Low or any custom label.
    #[arg(long)]
    pub priority: String,
    /// Acceptance criteria text.
    #[arg(long, required_unless_present = "criteria_file", conflicts_with = "criteria_file")]
    pub criteria: Option<String>,
    /// Read acceptance criteria from a file.
    #[arg(long, value_name = "PATH")]
    pub criteria_file: Option<PathBuf>,
    /// groq, ollama or gemini. Defaults to DEFAULT_AI_PROVIDER.
    #[arg(long)]
    pub provider: Option<String>,
    /// Template spreadsheet. Defaults to TEMPLATE_PATH.
    #[arg(long)]
    pub template: Option<PathBuf>,
    /// Output spreadsheet (.xlsx or .csv).
    #[arg(long)]
    pub output: Option<PathBuf>,
    #[arg(long, default_value = "Web Application")]
    pub component: String,
    #[arg(long, default_value = "1.0")]
    pub release: String,
    #[arg(long, default_value = "Functional")]
    pub test_type: String,
    /// Do not record this run in the history ledger.
    #[arg(long)]
    pub no_history: bool,
    /// Print the outcome as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// List entries, newest first.
    List {
        /// Match ticket id or acceptance criteria (case-insensitive).
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show a single entry.
    Show {
        id: u64,
        #[arg(long)]
        json: bool,
    },
    /// Delete a single entry. The generated file is left on disk.
    Delete { id: u64 },
    /// Aggregate statistics.
    Stats {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum BackendCommand {
    /// Construct a backend and list the models it serves.
    Check {
        /// Check one provider instead of all of them.
        #[arg(long)]
        provider: Option<String>,
    },
}

/// Runs one command. `Ok(false)` means the command ran but reported failure.
pub async fn dispatch(cli: Cli, config: &AppConfig) -> Result<bool> {
    match cli.command {
        Command::Generate(args) => generate(args, config).await,
        Command::History(command) => history(command, config),
        Command::Backend(BackendCommand::Check { provider }) => check_backends(provider, config).await,
    }
}

/// `{output_dir}/{ticket}_testcases_{YYYYmmdd_HHMMSS}.xlsx`
pub fn default_output_path(output_dir: &Path, ticket_id: &str) -> PathBuf {
    let ticket = ticket_id.trim().replace(['/', '\\'], "_");
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    output_dir.join(format!("{}_testcases_{}.xlsx", ticket, stamp))
}

async fn generate(args: GenerateArgs, config: &AppConfig) -> Result<bool> {
    let criteria = match (&args.criteria, &args.criteria_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => fs::read_to_string(path).map_err(|e| {
            AppError::IoError(format!("Failed to read criteria file {}: {}", path.display(), e))
        })?,
        (None, None) => String::new(),
    };

    let request = GenerationRequest::new(&args.ticket, Priority::from(args.priority.as_str()), criteria)
        .with_component(args.component)
        .with_release(args.release)
        .with_test_type(args.test_type);

    let backend = match &args.provider {
        Some(selector) => select_backend(config, selector)?,
        None => build_backend(config.backend_settings(config.default_backend()?))?,
    };
    let ledger = if args.no_history {
        None
    } else {
        Some(HistoryLedger::open(&config.history_file)?)
    };

    let template = args.template.unwrap_or_else(|| config.template_path.clone());
    let output = args
        .output
        .unwrap_or_else(|| default_output_path(&config.output_dir, &request.ticket_id));

    let use_case = GenerateTestCasesUseCase::new(
        backend,
        RecordFormatter::new(config.formatter_defaults()),
        ledger,
        config.request_timeout(),
    );
    let outcome = use_case.execute(&request, &template, &output).await?;

    if args.json {
        print_json(&outcome)?;
    } else if outcome.success {
        println!(
            "Generated {} test case(s) for {} with {}",
            outcome.records.len(),
            request.ticket_id,
            outcome.backend
        );
        if let Some(reason) = &outcome.fallback {
            println!("Backend answer was unusable ({}); wrote a fallback test case", reason);
        }
        println!("Output file: {}", outcome.output_path.display());
    } else {
        println!("Failed to generate test cases");
    }
    Ok(outcome.success)
}

fn history(command: HistoryCommand, config: &AppConfig) -> Result<bool> {
    let ledger = HistoryLedger::open(&config.history_file)?;
    match command {
        HistoryCommand::List {
            search,
            provider,
            json,
        } => {
            let entries = ledger.search(&HistoryFilter {
                query: search,
                provider,
            });
            if json {
                print_json(&entries)?;
            } else if entries.is_empty() {
                println!("No history entries");
            } else {
                for entry in &entries {
                    println!("{}", summary_line(entry));
                }
            }
            Ok(true)
        }
        HistoryCommand::Show { id, json } => {
            let entry = ledger.require(id)?;
            if json {
                print_json(&entry)?;
            } else {
                print_entry(&entry);
            }
            Ok(true)
        }
        HistoryCommand::Delete { id } => {
            if ledger.delete(id)? {
                println!("Deleted history entry {}", id);
                Ok(true)
            } else {
                println!("History entry {} not found", id);
                Ok(false)
            }
        }
        HistoryCommand::Stats { json } => {
            let stats = ledger.stats();
            if json {
                print_json(&stats)?;
            } else {
                println!("Total entries:  {}", stats.total_entries);
                println!("Files on disk:  {}", stats.total_files);
                println!("Total size:     {} bytes", stats.total_size);
                println!("Providers used: {}", stats.providers_used.join(", "));
                if let Some(entry) = &stats.most_recent {
                    println!("Most recent:    {}", summary_line(entry));
                }
            }
            Ok(true)
        }
    }
}

async fn check_backends(provider: Option<String>, config: &AppConfig) -> Result<bool> {
    let kinds = match provider {
        Some(selector) => vec![selector.parse::<BackendKind>()?],
        None => BackendKind::ALL.to_vec(),
    };

    let mut all_ok = true;
    for kind in kinds {
        let backend = match build_backend(config.backend_settings(kind)) {
            Ok(backend) => backend,
            Err(err) => {
                println!("{}: not configured ({})", kind, err);
                all_ok = false;
                continue;
            }
        };
        match backend.list_models(config.health_timeout()).await {
            Ok(models) if models.is_empty() => println!("{}: reachable, no models listed", kind),
            Ok(models) => println!("{}: reachable, models: {}", kind, models.join(", ")),
            Err(err) => {
                println!("{}: unreachable ({})", kind, err);
                all_ok = false;
            }
        }
    }
    Ok(all_ok)
}

fn summary_line(entry: &HistoryEntry) -> String {
    format!(
        "#{:<4} {:<26} {:<14} {:<7} {}",
        entry.id, entry.created_date, entry.ticket_id, entry.provider, entry.file_name
    )
}

fn print_entry(entry: &HistoryEntry) {
    println!("Id:                  {}", entry.id);
    println!("Ticket:              {}", entry.ticket_id);
    println!("Priority:            {}", entry.priority);
    println!("Provider:            {}", entry.provider);
    println!("Component:           {}", entry.component);
    println!("Test type:           {}", entry.test_type);
    println!("Created:             {}", entry.created_date);
    println!("File:                {} ({} bytes)", entry.file_path, entry.file_size);
    println!("Acceptance criteria:\n{}", entry.acceptance_criteria);
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
