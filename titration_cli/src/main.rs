use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use titration_core::regimen::load_regimen_or_default;
use titration_core::*;

#[derive(Parser)]
#[command(name = "titrate")]
#[command(about = "Medication titration calendar generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory (holds the delay file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the calendar file (default)
    Generate {
        /// First day of the first step (YYYY-MM-DD); prompted for if not configured
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Output file
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Output format (ics, csv)
        #[arg(long)]
        format: Option<ExportFormat>,

        /// Regimen file (TOML) to use instead of the configured one
        #[arg(long)]
        regimen: Option<PathBuf>,

        /// Do not apply recorded delays
        #[arg(long)]
        ignore_delays: bool,
    },

    /// Print the day-by-day schedule without writing anything
    Preview {
        /// First day of the first step (YYYY-MM-DD); prompted for if not configured
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Regimen file (TOML) to use instead of the configured one
        #[arg(long)]
        regimen: Option<PathBuf>,

        /// Do not apply recorded delays
        #[arg(long)]
        ignore_delays: bool,
    },

    /// Record, clear or show schedule delays
    Delay {
        #[command(subcommand)]
        action: DelayAction,
    },
}

#[derive(Subcommand)]
enum DelayAction {
    /// Hold a step for extra days before moving on
    Set {
        /// Step id
        #[arg(long)]
        step: StepId,

        /// Extra days (0 removes the delay)
        #[arg(long)]
        days: i32,
    },

    /// Remove the delay of one step, or all delays
    Clear {
        /// Step id; clears every delay when omitted
        #[arg(long)]
        step: Option<StepId>,
    },

    /// List recorded delays
    Show,
}

fn main() -> Result<()> {
    // Initialize logging
    titration_core::logging::init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }

    match cli.command {
        Some(Commands::Generate {
            start_date,
            output,
            format,
            regimen,
            ignore_delays,
        }) => cmd_generate(&config, start_date, output, format, regimen, ignore_delays),
        Some(Commands::Preview {
            start_date,
            regimen,
            ignore_delays,
        }) => cmd_preview(&config, start_date, regimen, ignore_delays),
        Some(Commands::Delay { action }) => cmd_delay(&config, action),
        None => {
            // Default to "generate" command
            cmd_generate(&config, None, None, None, None, false)
        }
    }
}

/// Load the regimen and apply recorded delays
fn load_schedule(config: &Config, regimen: Option<PathBuf>, ignore_delays: bool) -> Result<Schedule> {
    let regimen_path = regimen.or_else(|| config.schedule.regimen_path.clone());
    let schedule = load_regimen_or_default(regimen_path.as_deref())?;

    if ignore_delays {
        return Ok(schedule);
    }

    let delays = DelayState::load(&config.delays_path())?;
    if !delays.is_empty() {
        tracing::info!("Applying {} recorded delays", delays.delays.len());
    }
    Ok(schedule.with_delays(&delays))
}

fn resolve_start_date(config: &Config, start_date: Option<NaiveDate>) -> Result<NaiveDate> {
    match start_date.or(config.schedule.start_date) {
        Some(date) => Ok(date),
        None => prompt_start_date(),
    }
}

fn expand_schedule(config: &Config, schedule: &Schedule, start: NaiveDate) -> Result<Vec<DayEntry>> {
    let expander = Expander::new(
        config.schedule.mixture_volume.clone(),
        config.schedule.substance.clone(),
    );
    let entries = expander.expand(schedule, start)?;
    if entries.is_empty() {
        return Err(Error::Config("Regimen has no days to schedule".into()));
    }
    Ok(entries)
}

fn cmd_generate(
    config: &Config,
    start_date: Option<NaiveDate>,
    output: Option<PathBuf>,
    format: Option<ExportFormat>,
    regimen: Option<PathBuf>,
    ignore_delays: bool,
) -> Result<()> {
    let schedule = load_schedule(config, regimen, ignore_delays)?;
    let start = resolve_start_date(config, start_date)?;
    let format = format.unwrap_or(config.export.format);
    let output = output.unwrap_or_else(|| default_output(config, format));

    let entries = expand_schedule(config, &schedule, start)?;
    display_progress(&schedule);

    let mut sink: Box<dyn DaySink> = match format {
        ExportFormat::Ics => Box::new(IcsSink::new(&output, config.export.calendar_name.clone())),
        ExportFormat::Csv => Box::new(CsvSink::new(&output)),
    };
    sink.consume(&entries)?;

    display_summary(&entries, &output, format);
    Ok(())
}

fn cmd_preview(
    config: &Config,
    start_date: Option<NaiveDate>,
    regimen: Option<PathBuf>,
    ignore_delays: bool,
) -> Result<()> {
    let schedule = load_schedule(config, regimen, ignore_delays)?;
    let start = resolve_start_date(config, start_date)?;
    let entries = expand_schedule(config, &schedule, start)?;

    for entry in &entries {
        println!("{}  {}", entry.date.format("%Y-%m-%d"), entry.title);
    }
    println!();
    println!(
        "{} days, {} to {}",
        entries.len(),
        entries[0].date.format("%Y-%m-%d"),
        entries[entries.len() - 1].date.format("%Y-%m-%d")
    );
    Ok(())
}

fn cmd_delay(config: &Config, action: DelayAction) -> Result<()> {
    let delays_path = config.delays_path();

    match action {
        DelayAction::Set { step, days } => {
            let schedule = load_schedule(config, None, true)?;
            let step_name = schedule
                .step(step)
                .map(|s| s.name.clone())
                .ok_or_else(|| Error::Config(format!("Regimen has no step {}", step)))?;

            DelayState::update(&delays_path, |state| state.set(step, days))?;

            if days == 0 {
                println!("✓ Removed delay for step {} ({})", step, step_name);
            } else {
                println!(
                    "✓ Step {} ({}) will be held for {} extra days",
                    step, step_name, days
                );
            }
        }

        DelayAction::Clear { step: Some(step) } => {
            let mut removed = false;
            DelayState::update(&delays_path, |state| {
                removed = state.clear(step);
                Ok(())
            })?;
            if removed {
                println!("✓ Removed delay for step {}", step);
            } else {
                println!("No delay recorded for step {}", step);
            }
        }

        DelayAction::Clear { step: None } => {
            DelayState::update(&delays_path, |state| {
                state.clear_all();
                Ok(())
            })?;
            println!("✓ Cleared all delays");
        }

        DelayAction::Show => {
            let state = DelayState::load(&delays_path)?;
            if state.is_empty() {
                println!("No delays recorded.");
            } else {
                for (step, days) in &state.delays {
                    println!("  Step {}: +{} days", step, days);
                }
            }
        }
    }

    Ok(())
}

/// Configured output path, with its extension matched to the format when the
/// format was overridden
fn default_output(config: &Config, format: ExportFormat) -> PathBuf {
    if format == config.export.format {
        config.export.output.clone()
    } else {
        config.export.output.with_extension(format.to_string())
    }
}

fn display_progress(schedule: &Schedule) {
    for node in &schedule.nodes {
        match node {
            Node::Step(step) => {
                print!(
                    "Step {}: {} for {} days",
                    step.id, step.name, step.intended_length
                );
                if step.delay_length > 0 {
                    print!(" (+{} delay days)", step.delay_length);
                }
                println!();
            }
            Node::Transition(transition) => {
                let name = schedule
                    .step(transition.to)
                    .map(|s| s.name.as_str())
                    .unwrap_or("?");
                println!(
                    "Transition to Step {} ({}) for {} days: {}ml to {}ml",
                    transition.to,
                    name,
                    transition.day_count().unwrap_or(0),
                    transition.ml_start_number,
                    transition.ml_end_number
                );
            }
        }
    }
}

fn display_summary(entries: &[DayEntry], output: &Path, format: ExportFormat) {
    let first = &entries[0];
    let last = &entries[entries.len() - 1];

    println!("{}", "-".repeat(30));
    println!("✓ Created '{}'", output.display());
    println!("The schedule starts on {}.", first.date.format("%Y-%m-%d"));
    println!(
        "The last scheduled medication day is {}.",
        last.date.format("%Y-%m-%d")
    );
    if format == ExportFormat::Ics {
        println!(
            "You can now import this file into your calendar application \
             (Google Calendar, Outlook, Apple Calendar, etc.)."
        );
    }
}

fn prompt_start_date() -> Result<NaiveDate> {
    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        print!("Enter the start date for the first step (YYYY-MM-DD): ");
        io::stdout().flush()?;

        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            return Err(Error::Date("No start date provided".into()));
        }

        match NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d") {
            Ok(date) => return Ok(date),
            Err(e) => println!(
                "Invalid date format. Please use YYYY-MM-DD (e.g., 2025-07-15). Error: {}",
                e
            ),
        }
    }
}
