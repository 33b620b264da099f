use anyhow::Result;
use clap::Parser;
use deskpilot_app::config::DEFAULT_CONFIG_FILE;
use deskpilot_app::{Config, Deskpilot, PlannerMode};
use deskpilot_core::{Intent, RunReport, StepStatus};
use deskpilot_tools::layout::validate_folder;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "deskpilot", version, about = "Organize, compress and act on a working folder")]
struct Cli {
    /// YAML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Workspace folder (asked for interactively when absent)
    #[arg(long)]
    folder: Option<PathBuf>,

    /// Run a single request and exit
    #[arg(long)]
    request: Option<String>,

    #[arg(long, value_enum, default_value_t = PlannerMode::Oracle)]
    planner: PlannerMode,

    /// Skip the confirmation prompt
    #[arg(long)]
    yes: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(&cli.config)?;
    if let Err(e) = config.validate() {
        eprintln!("❌ Invalid configuration: {}", e);
        return Err(e);
    }

    let app = Deskpilot::from_config(&config)?;
    println!("Deskpilot ready ({} capabilities)", app.registry().len());
    println!("Model: {}", config.model());
    println!();

    if let Some(request) = &cli.request {
        return handle_request(&app, &cli, request).await;
    }

    loop {
        let request = prompt("What would you like me to do? (type 'exit' to quit)")?;
        if request.is_empty() {
            continue;
        }
        if matches!(request.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }
        if let Err(e) = handle_request(&app, &cli, &request).await {
            error!("Request failed: {:#}", e);
            eprintln!("❌ {:#}", e);
        }
        println!();
    }
    Ok(())
}

async fn handle_request(app: &Deskpilot, cli: &Cli, request: &str) -> Result<()> {
    let intent = app.interpret(request).await?;
    print_intent(&intent);

    if !cli.yes && !confirm("Do you want to proceed with these tasks?")? {
        println!("Cancelled.");
        return Ok(());
    }

    let folder = match &cli.folder {
        Some(folder) => validate_folder(folder)?,
        None => ask_folder()?,
    };

    let report = app.run(&intent, &folder, cli.planner).await?;
    print_report(&report);
    Ok(())
}

fn print_intent(intent: &Intent) {
    println!("I understood these tasks:");
    for (i, task) in intent.tasks().iter().enumerate() {
        println!("  {}. {}", i + 1, task.summary());
    }
}

fn print_report(report: &RunReport) {
    println!();
    for step in &report.steps {
        let marker = match step.status {
            StepStatus::Completed => "✅",
            StepStatus::Failed => "❌",
            StepStatus::Skipped => "⏭️ ",
            StepStatus::Pending => "  ",
        };
        match &step.detail {
            Some(detail) => println!("{} {}. {} ({})", marker, step.ordinal, step.operation, detail),
            None => println!("{} {}. {}", marker, step.ordinal, step.operation),
        }
    }
    println!(
        "Run {:?}: {} completed, {} failed, {} skipped",
        report.state,
        report.count(StepStatus::Completed),
        report.count(StepStatus::Failed),
        report.count(StepStatus::Skipped)
    );
}

fn prompt(question: &str) -> Result<String> {
    print!("{}\n> ", question);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok("exit".to_string());
    }
    Ok(line.trim().to_string())
}

fn confirm(question: &str) -> Result<bool> {
    let answer = prompt(&format!("{} (y/n)", question))?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}

fn ask_folder() -> Result<PathBuf> {
    loop {
        let answer = prompt("Enter the folder path")?;
        if answer == "exit" {
            anyhow::bail!("No folder given");
        }
        match validate_folder(Path::new(&answer)) {
            Ok(folder) => return Ok(folder),
            Err(e) => eprintln!("❌ {}", e),
        }
    }
}
