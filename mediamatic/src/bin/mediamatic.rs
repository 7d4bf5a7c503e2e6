//! Media-matic CLI - run engagement analyses from the terminal
//!
//! Usage:
//!   mediamatic [--config <file>] <command>
//!
//! Example:
//!   mediamatic analyze "Which post type drove the most shares?"
//!   mediamatic template content_performance --prompt "Focus on reels"
//!   mediamatic metrics --period last_30_days --csv metrics.csv --metrics likes,views
//!   mediamatic chat

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use mediamatic::analysis::AnalysisSettings;
use mediamatic::metrics::{self, Metric, Period};
use mediamatic::templates::AnalysisTemplate;
use mediamatic::{AnalysisError, AnalysisService, DashboardConfig, HistoryEntry, HistoryLedger, LangflowClient};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "mediamatic")]
#[command(about = "Social-media engagement analysis via a hosted Langflow flow", long_about = None)]
struct Cli {
    /// Config file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Show debug logs
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single prompt
    Analyze {
        prompt: String,
    },
    /// Run an analysis template
    Template {
        /// Template id or name (see `templates`)
        name: String,
        /// Replace the template's default prompt
        #[arg(short, long)]
        prompt: Option<String>,
    },
    /// List analysis templates
    Templates,
    /// Print or export mock engagement metrics
    Metrics {
        /// last_7_days, last_30_days or last_90_days
        #[arg(short, long, default_value = "last_7_days")]
        period: String,
        /// Write CSV to this file instead of printing a summary
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Comma separated metrics to export (default: all)
        #[arg(short, long)]
        metrics: Option<String>,
    },
    /// Interactive analysis session
    Chat,
}

fn build_service(config_path: &Path) -> Result<AnalysisService> {
    let config = DashboardConfig::load(config_path)?;
    let client = LangflowClient::from_config(&config.flow)?;
    Ok(AnalysisService::new(
        Arc::new(client),
        Arc::new(HistoryLedger::new()),
        AnalysisSettings::from_config(&config.flow),
    )
    .with_display_limit(config.history_display_limit))
}

fn print_result(heading: &str, entry: &HistoryEntry) {
    eprintln!("{}", format!("✅ {}", heading).green());
    println!();
    println!("{}", entry.response);
    println!();
}

fn print_failure(err: &AnalysisError) {
    match err {
        AnalysisError::EmptyPrompt => eprintln!("{}", "⚠️  Please enter a message".yellow()),
        AnalysisError::Flow(detail) => {
            eprintln!("{}", "❌ Analysis failed. Please try again.".red());
            eprintln!("{}", detail.dimmed());
        }
        other => eprintln!("{}", other.to_string().red()),
    }
}

fn print_history(service: &AnalysisService) {
    let entries = service.recent_history();
    if entries.is_empty() {
        println!("No previous analyses in this session");
        return;
    }

    println!("{}", "📜 Previous Analyses".bold());
    for entry in entries {
        println!("{}", format!("┌─ {}", entry.title()).cyan());
        println!("{} {}", "│".cyan(), "Prompt:".dimmed());
        for line in entry.prompt.lines() {
            println!("{}   {}", "│".cyan(), line);
        }
        println!("{} {}", "│".cyan(), "Response:".dimmed());
        for line in entry.response.lines() {
            println!("{}   {}", "│".cyan(), line);
        }
        println!("{}", "└─".cyan());
    }
}

fn print_templates() {
    for template in AnalysisTemplate::ALL {
        println!("{} ({})", template.name().bold(), template.id().dimmed());
        println!("  {}", template.description());
        println!("  {}", template.prompt().dimmed());
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /help              - Show this help");
    println!("  /history           - Show recent analyses");
    println!("  /template <name>   - Run an analysis template");
    println!("  /templates         - List analysis templates");
    println!("  /exit              - Exit the session");
    println!("Anything else is sent as an analysis prompt, exactly as typed.");
}

/// One line typed into the chat session
#[derive(Debug, PartialEq)]
enum ChatInput<'a> {
    Skip,
    Exit,
    Help,
    History,
    Templates,
    Template(&'a str),
    Unknown(&'a str),
    Prompt(&'a str),
}

fn parse_chat_line(line: &str) -> ChatInput<'_> {
    if line.is_empty() {
        return ChatInput::Skip;
    }

    let Some(command) = line.trim().strip_prefix('/') else {
        return ChatInput::Prompt(line);
    };

    match command.split_once(char::is_whitespace) {
        Some(("template", name)) if !name.trim().is_empty() => ChatInput::Template(name.trim()),
        _ => match command {
            "exit" | "quit" => ChatInput::Exit,
            "help" => ChatInput::Help,
            "history" => ChatInput::History,
            "templates" => ChatInput::Templates,
            other => ChatInput::Unknown(other),
        },
    }
}

async fn chat(service: &AnalysisService) -> Result<()> {
    println!("{}", "Media-matic - Interactive Analysis".green());
    println!("Type '/help' for commands, '/exit' to quit\n");

    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline(&format!("{} ", "💭".yellow())) {
            Ok(line) => {
                let input = parse_chat_line(&line);
                if input != ChatInput::Skip {
                    rl.add_history_entry(line.as_str())?;
                }

                let result = match input {
                    ChatInput::Skip => continue,
                    ChatInput::Exit => break,
                    ChatInput::Help => {
                        print_help();
                        continue;
                    }
                    ChatInput::History => {
                        print_history(service);
                        continue;
                    }
                    ChatInput::Templates => {
                        print_templates();
                        continue;
                    }
                    ChatInput::Unknown(command) => {
                        eprintln!("{}", format!("Unknown command: /{}", command).yellow());
                        continue;
                    }
                    ChatInput::Template(name) => {
                        eprintln!("{}", "🤔 Analyzing your content...".dimmed());
                        service.run_template_named(name, None).await
                    }
                    ChatInput::Prompt(prompt) => {
                        eprintln!("{}", "🤔 Analyzing your content...".dimmed());
                        service.analyze(prompt).await
                    }
                };

                match result {
                    Ok(entry) => print_result("Analysis complete!", &entry),
                    Err(e) => print_failure(&e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Use '/exit' to quit");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn export_metrics(period: &str, csv: Option<PathBuf>, selected: Option<String>) -> Result<()> {
    let period = Period::from_name(period);
    let rows = metrics::generate(period);

    if let Some(path) = csv {
        let selected = match selected.as_deref() {
            Some(list) => Metric::parse_list(list)?,
            None => Metric::ALL.to_vec(),
        };
        let file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        metrics::write_selected_csv(&rows, &selected, file)?;
        eprintln!("{} {} rows to {}", "Wrote".green(), rows.len(), path.display());
        return Ok(());
    }

    let summary = metrics::summarize(&rows);
    println!("{}", format!("📊 Last {} days ({} rows)", period.days(), summary.rows).bold());
    println!(
        "  {:<14} {:>10} {:>10} {:>10} {:>10}",
        "", "Likes", "Comments", "Shares", "Views"
    );
    for (post_type, totals) in &summary.by_post_type {
        println!(
            "  {:<14} {:>10} {:>10} {:>10} {:>10}",
            post_type.label(),
            totals.likes,
            totals.comments,
            totals.shares,
            totals.views
        );
    }
    let t = &summary.totals;
    println!(
        "  {:<14} {:>10} {:>10} {:>10} {:>10}",
        "Total",
        t.likes,
        t.comments,
        t.shares,
        t.views
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Templates => print_templates(),
        Commands::Metrics { period, csv, metrics } => export_metrics(&period, csv, metrics)?,
        Commands::Analyze { prompt } => {
            let service = build_service(&cli.config)?;
            match service.analyze(&prompt).await {
                Ok(entry) => print_result("Analysis complete!", &entry),
                Err(e) => {
                    print_failure(&e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Template { name, prompt } => {
            let service = build_service(&cli.config)?;
            match service.run_template_named(&name, prompt.as_deref()).await {
                Ok(entry) => print_result("Template analysis complete!", &entry),
                Err(e) => {
                    print_failure(&e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Chat => {
            let service = build_service(&cli.config)?;
            chat(&service).await?;
        }
    }

    Ok(())
}
