mod commands;
mod file_store;
mod lookup;
mod reports;
mod simulate;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use streakdex_core::{
    Frequency, HabitPatch, MetadataLookup, NewHabit, OfflineLookup, ProgressEngine, Rarity,
    RewardCatalog, SystemClock, parse_day,
};

use commands::Engine;
use file_store::JsonFileStore;
use lookup::{DEFAULT_API_BASE, HttpMetadataLookup, StoreCachedLookup};
use reports::ReportFormat;
use simulate::{SimulationPlan, run_simulation};

#[derive(Debug, Parser)]
#[command(name = "streakdex", version)]
#[command(about = "Track habits, build streaks and collect rewards from the command line")]
struct Args {
    /// Directory holding the saved state and metadata cache
    #[arg(long, global = true, default_value = ".streakdex")]
    data_dir: PathBuf,

    /// Pretend today is this day (YYYY-MM-DD)
    #[arg(long, global = true, value_parser = parse_day_arg)]
    today: Option<NaiveDate>,

    /// Never contact the metadata API; rewards keep placeholder names
    #[arg(long, global = true)]
    offline: bool,

    /// Base URL of the creature metadata API
    #[arg(long, global = true, default_value = DEFAULT_API_BASE)]
    api: String,

    /// JSON file overriding the reward catalog
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Output report format
    #[arg(long, global = true, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a habit
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_frequency, default_value = "daily")]
        frequency: Frequency,
        /// Completions needed per day
        #[arg(long, default_value_t = 1)]
        goal: u32,
    },
    /// Change fields of an existing habit
    Edit {
        /// Habit id or unique id prefix
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        #[arg(long, value_parser = parse_frequency)]
        frequency: Option<Frequency>,
        #[arg(long)]
        goal: Option<u32>,
    },
    /// Hide a habit from the active list, keeping its history
    Archive { id: String },
    /// Record one completion for today
    Complete { id: String },
    /// List habits with today's progress
    List {
        /// Include archived habits
        #[arg(long)]
        all: bool,
    },
    /// Show one habit with its recent history
    Show { id: String },
    /// Summarize XP and the reward collection
    Stats,
    /// List earned rewards in the order they were earned
    Rewards {
        #[arg(long, value_parser = parse_rarity)]
        rarity: Option<Rarity>,
    },
    /// Show an earned reward's name, artwork and earn date
    Reward {
        /// Reward item id
        id: u32,
    },
    /// Delete every habit, completion and reward
    Reset {
        #[arg(long)]
        yes: bool,
    },
    /// Run a seeded, in-memory simulation of many days
    Simulate {
        #[arg(long, default_value_t = 30)]
        days: u32,
        #[arg(long, default_value_t = 1)]
        habits: u32,
        #[arg(long, default_value_t = 1)]
        goal: u32,
        /// Probability of skipping a habit on a given day
        #[arg(long, value_parser = parse_miss_rate, default_value_t = 0.0)]
        miss_rate: f64,
        #[arg(long, default_value_t = 1337)]
        seed: u64,
    },
}

fn parse_day_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_day(raw).ok_or_else(|| format!("expected YYYY-MM-DD, got {raw:?}"))
}

fn parse_frequency(raw: &str) -> Result<Frequency, String> {
    raw.parse()
        .map_err(|()| format!("unknown frequency {raw:?} (daily, weekly)"))
}

fn parse_rarity(raw: &str) -> Result<Rarity, String> {
    raw.parse()
        .map_err(|()| format!("unknown rarity {raw:?} (common, rare, legendary)"))
}

fn parse_miss_rate(raw: &str) -> Result<f64, String> {
    let rate: f64 = raw.parse().map_err(|err| format!("{err}"))?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("miss rate must be between 0 and 1, got {rate}"))
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn load_catalog(path: Option<&Path>) -> Result<RewardCatalog> {
    let Some(path) = path else {
        return Ok(RewardCatalog::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading catalog {}", path.display()))?;
    RewardCatalog::from_json(&raw).with_context(|| format!("invalid catalog {}", path.display()))
}

fn build_lookup(offline: bool, api: &str, store: &JsonFileStore) -> Result<Box<dyn MetadataLookup>> {
    if offline {
        return Ok(Box::new(OfflineLookup));
    }
    let http = HttpMetadataLookup::new(api).context("building HTTP client")?;
    Ok(Box::new(StoreCachedLookup::new(http, store.clone())))
}

fn open_engine(args: &Args, catalog: RewardCatalog) -> Engine {
    let clock = args.today.map_or_else(SystemClock::new, SystemClock::pinned);
    let mut engine =
        ProgressEngine::new(JsonFileStore::new(&args.data_dir), clock).with_catalog(catalog);
    engine.load_state();
    engine
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let catalog = load_catalog(args.catalog.as_deref())?;
    let format = args.report;

    if let Command::Simulate {
        days,
        habits,
        goal,
        miss_rate,
        seed,
    } = args.command
    {
        if habits == 0 {
            bail!("simulate needs at least one habit");
        }
        let start = args.today.unwrap_or_else(|| Local::now().date_naive());
        let plan = SimulationPlan {
            days,
            habits,
            goal,
            miss_rate,
            seed,
            start,
        };
        return reports::print_simulation(format, &run_simulation(&plan, catalog));
    }

    let mut engine = open_engine(&args, catalog);
    match args.command {
        Command::Add {
            title,
            description,
            frequency,
            goal,
        } => {
            let mut data = NewHabit::new(title)
                .with_frequency(frequency)
                .with_goal(goal);
            data.description = description;
            commands::add(&mut engine, format, data)
        }
        Command::Edit {
            id,
            title,
            description,
            clear_description,
            frequency,
            goal,
        } => {
            let patch = HabitPatch {
                title,
                description: if clear_description {
                    Some(None)
                } else {
                    description.map(Some)
                },
                frequency,
                goal_per_period: goal,
                archived: None,
            };
            commands::edit(&mut engine, format, &id, patch)
        }
        Command::Archive { id } => commands::archive(&mut engine, format, &id),
        Command::Complete { id } => {
            let lookup = build_lookup(args.offline, &args.api, engine.store())?;
            commands::complete(&mut engine, format, &id, lookup.as_ref()).await
        }
        Command::List { all } => commands::list(&engine, format, all),
        Command::Show { id } => commands::show(&engine, format, &id),
        Command::Stats => commands::stats(&engine, format),
        Command::Rewards { rarity } => commands::rewards(&engine, format, rarity),
        Command::Reward { id } => {
            let lookup = build_lookup(args.offline, &args.api, engine.store())?;
            commands::reward(&mut engine, format, id, lookup.as_ref()).await
        }
        Command::Reset { yes } => commands::reset(&mut engine, format, yes),
        Command::Simulate { .. } => Ok(()),
    }
}
