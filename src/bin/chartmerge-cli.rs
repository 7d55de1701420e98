use chartmerge::{insights, trigger, JobConfig, MergeJob, PublishOutcome, TriggerEvent};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chartmerge-cli")]
#[command(about = "Merge weekly Spotify chart CSVs per country and publish the results", long_about = None)]
#[command(version)]
struct Cli {
    /// Repository working tree
    #[arg(short, long, default_value = ".", env = "CHARTMERGE_REPO")]
    repo: PathBuf,

    /// Config file (defaults to <repo>/chartmerge.toml if present)
    #[arg(short, long, env = "CHARTMERGE_CONFIG")]
    config: Option<PathBuf>,

    /// Push token filled into publish.remote_url (unused without it; defaults to publish.token_env)
    #[arg(long, env = "GH_PAT", hide_env_values = true)]
    token: Option<String>,

    /// Print reports as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the whole job: merge, insights (if enabled) and publish
    Run {
        /// What triggered the run
        #[arg(short, long, value_enum, default_value_t = Event::Dispatch)]
        event: Event,

        /// Paths changed by the push (for --event push)
        #[arg(long = "changed", num_args = 1..)]
        changed: Vec<String>,

        /// Skip the commit and push
        #[arg(long)]
        no_publish: bool,

        /// Run the insights step regardless of config
        #[arg(long)]
        insights: bool,
    },
    /// Merge chart exports and write analyses only
    Merge,
    /// Write insight summaries from the final data folder
    Insights,
    /// Commit and push the output folders
    Publish,
    /// Check whether a push touching these paths would start the job
    CheckTrigger {
        /// Changed paths
        paths: Vec<String>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Event {
    Push,
    Dispatch,
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "chartmerge=debug,chartmerge_cli=debug"
    } else {
        "chartmerge=info,chartmerge_cli=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> chartmerge::Result<JobConfig> {
    match &cli.config {
        Some(path) => {
            let mut config = JobConfig::load(path)?;
            config.repo_dir = cli.repo.clone();
            Ok(config)
        }
        None => JobConfig::discover(&cli.repo),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_publish(outcome: &PublishOutcome) {
    match outcome {
        PublishOutcome::Committed { commit, branch } => {
            println!("✅ Pushed {} to {}", commit, branch)
        }
        PublishOutcome::NothingToCommit => println!("No changes to commit"),
        PublishOutcome::Skipped => println!("Publishing disabled"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = load_config(&cli)?;

    match &cli.command {
        Commands::Run {
            event,
            changed,
            no_publish,
            insights,
        } => {
            if *no_publish {
                config.publish.enabled = false;
            }
            if *insights {
                config.insights.enabled = true;
            }

            let event = match event {
                Event::Push => TriggerEvent::Push {
                    changed_paths: changed.clone(),
                },
                Event::Dispatch => TriggerEvent::Dispatch,
            };

            let mut job = MergeJob::new(config)?;
            if let Some(token) = &cli.token {
                job.publisher_mut().set_token(token);
            }
            let report = job.run(&event).await?;

            if cli.json {
                return print_json(&report);
            }
            if !report.triggered {
                println!("No changed path matches the trigger filters; nothing to do");
                return Ok(());
            }
            for step in &report.steps {
                println!("✅ {}: {}", step.step, step.message);
            }
        }
        Commands::Merge => {
            let job = MergeJob::new(config)?;
            let merger = job.merger();
            if !cli.json {
                println!("Merging {}...", merger.input_dir().display());
            }
            let report = merger.run()?;

            if cli.json {
                return print_json(&report);
            }
            for country in &report.countries {
                println!(
                    "   {}: {} files, {} rows",
                    country.country, country.files, country.rows
                );
            }
            println!(
                "✅ Merged {} files into {}",
                report.total_files(),
                merger.final_dir().display()
            );
            if !report.failed.is_empty() {
                println!("   Skipped files:");
                for (path, err) in &report.failed {
                    println!("   - {}: {}", path.display(), err);
                }
            }
        }
        Commands::Insights => {
            let report = insights::generate(
                config.resolve(&config.paths.final_dir),
                config.resolve(&config.paths.insights),
            )?;

            if cli.json {
                return print_json(&report);
            }
            if report.sections.is_empty() {
                println!("No insight inputs found");
            }
            for path in &report.written {
                println!("✅ Wrote {}", path.display());
            }
        }
        Commands::Publish => {
            let mut job = MergeJob::new(config)?;
            if let Some(token) = &cli.token {
                job.publisher_mut().set_token(token);
            }
            let outcome = job.publisher().publish().await?;

            if cli.json {
                return print_json(&outcome);
            }
            print_publish(&outcome);
        }
        Commands::CheckTrigger { paths } => {
            let filter = config.trigger.filter()?;
            let event = TriggerEvent::Push {
                changed_paths: paths.clone(),
            };
            let runs = trigger::should_run(&event, &filter);

            if cli.json {
                return print_json(&serde_json::json!({ "triggered": runs }));
            }
            let patterns: Vec<&str> = filter.patterns().collect();
            if runs {
                println!("✅ Triggered (filters: {})", patterns.join(", "));
            } else {
                println!("Not triggered (filters: {})", patterns.join(", "));
            }
        }
    }

    Ok(())
}
