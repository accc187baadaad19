// src/bin/agentgym.rs
//
// Command-line harness around the AgentGym framework library.

use agentgym_framework::prelude::*;
use agentgym_framework::utilities::observability::init_observability;
use agentgym_framework::utilities::observability::logging::{
    init_logging_from_file, init_logging_from_params,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "agentgym", version, about = "Train agents on simulated scenarios")]
struct Cli {
    /// Framework config file. Created with defaults if it does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// log4rs YAML or JSON file. Overrides the config's logging section.
    #[arg(long, global = true)]
    log_config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train on a scenario until all episodes are done or Ctrl-C is pressed.
    Train {
        scenario: String,

        #[arg(short, long)]
        episodes: Option<u64>,

        #[arg(long)]
        learning_rate: Option<f64>,

        #[arg(short, long)]
        batch_size: Option<u32>,

        #[arg(short = 'g', long)]
        discount_factor: Option<f64>,

        /// Checkpoint every N episodes, 0 to disable.
        #[arg(short, long)]
        checkpoint_interval: Option<u64>,

        /// langchain, autogen or crewai.
        #[arg(short, long)]
        framework: Option<String>,

        /// Random seed. Drawn at random when omitted.
        #[arg(short, long)]
        seed: Option<u64>,

        /// Directory results and checkpoints are written to.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Log at debug level.
        #[arg(short, long)]
        verbose: bool,
    },
    /// List the available scenarios.
    Scenarios {
        #[arg(short, long)]
        detailed: bool,
    },
    /// Print version and environment information.
    Info,
}

struct TrainArgs {
    scenario: String,
    episodes: Option<u64>,
    learning_rate: Option<f64>,
    batch_size: Option<u32>,
    discount_factor: Option<f64>,
    checkpoint_interval: Option<u64>,
    framework: Option<String>,
    seed: Option<u64>,
    output_dir: Option<PathBuf>,
}

/// Session defaults from the framework config, then CLI overrides.
fn build_training_config(
    loader: &FrameworkConfigLoader,
    args: TrainArgs,
) -> Result<TrainingConfig, String> {
    let mut config = loader.training_config(args.scenario);
    if let Some(episodes) = args.episodes {
        config.episodes = episodes;
    }
    if let Some(learning_rate) = args.learning_rate {
        config.learning_rate = learning_rate;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(discount_factor) = args.discount_factor {
        config.discount_factor = discount_factor;
    }
    if let Some(interval) = args.checkpoint_interval {
        config.checkpoint_interval = interval;
    }
    if let Some(name) = args.framework {
        config.framework = Framework::from_str(&name)
            .ok_or_else(|| format!("unknown framework '{name}'"))?;
    }
    config.seed = args.seed;
    Ok(config)
}

fn print_result(result: &TrainingResult) {
    let metrics = &result.metrics;
    println!("\nTraining {}", result.status);
    if let Some(reason) = &result.failure_reason {
        println!("  Reason: {reason}");
    }
    println!("  Episodes completed: {}", metrics.episodes_completed);
    println!("  Tool reliability:   {:.1}%", metrics.accuracy * 100.0);
    println!("  Mean reward:        {:.3}", metrics.mean_reward);
    println!("  Average cost:       {:.0}", metrics.avg_cost);
    println!("  Average latency:    {:.1}s", metrics.avg_latency);
    println!("  Cost reduction:     {:.1}%", metrics.cost_reduction * 100.0);
    println!("  Time savings:       {:.1}%", metrics.time_savings * 100.0);
    match metrics.convergence_episode {
        Some(episode) => println!("  Converged at:       episode {episode}"),
        None => println!("  Converged at:       not yet"),
    }
    if metrics.meets_target(DEFAULT_TARGET_RELIABILITY) {
        println!(
            "  Reached the {:.0}% reliability target",
            DEFAULT_TARGET_RELIABILITY * 100.0
        );
    }

    if !result.criteria_met.is_empty() {
        println!("\nSuccess criteria:");
        for (name, met) in &result.criteria_met {
            let mark = if *met { "met" } else { "not met" };
            match (result.success_criteria.get(name), metrics.metric(name)) {
                (Some(criterion), Some(value)) => println!(
                    "  {name}: {value:.3} (target {:?} {:.3}) {mark}",
                    criterion.direction, criterion.target
                ),
                _ => println!("  {name}: {mark}"),
            }
        }
    }
    println!("\nArtifact: {}", result.artifact_ref);
}

async fn train(loader: FrameworkConfigLoader, args: TrainArgs) -> Result<(), String> {
    let mut loader = loader;
    if let Some(dir) = &args.output_dir {
        loader.result_output.enabled = true;
        loader.result_output.directory = dir.clone();
    }
    let config = build_training_config(&loader, args)?;

    let registry = Arc::new(ScenarioRegistry::with_builtins());
    let manager = SessionManager::from_config(&loader, registry);
    let id = manager.create(config).map_err(|e| e.to_string())?;
    let session = manager.session(id).map_err(|e| e.to_string())?;

    let config = session.config();
    println!("Session {id}");
    println!("  Scenario:        {}", config.scenario);
    println!("  Framework:       {}", config.framework);
    println!("  Episodes:        {}", config.episodes);
    println!("  Learning rate:   {}", config.learning_rate);
    println!("  Batch size:      {}", config.batch_size);
    println!("  Discount factor: {}", config.discount_factor);
    println!("  Seed:            {}", config.seed.unwrap_or_default());

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = session.snapshot();
                if snapshot.state.is_terminal() {
                    break;
                }
                log::info!(
                    "{}/{} episodes ({:.0}%), accuracy {:.3}, mean reward {:.3}",
                    snapshot.metrics.episodes_completed,
                    snapshot.episodes_target,
                    snapshot.progress() * 100.0,
                    snapshot.metrics.accuracy,
                    snapshot.metrics.mean_reward
                );
            }
            result = session.wait() => {
                result.map_err(|e| e.to_string())?;
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nInterrupted, stopping session...");
                break;
            }
        }
    }

    let result = manager.stop(id).await.map_err(|e| e.to_string())?;
    print_result(&result);
    if loader.result_output.enabled {
        println!(
            "Result written to {}",
            loader.result_output.directory.join(format!("{id}.json")).display()
        );
    }
    Ok(())
}

fn list_scenarios(detailed: bool) {
    let registry = ScenarioRegistry::with_builtins();
    println!("Available scenarios:");
    for metadata in registry.list() {
        if detailed {
            println!("\n  {} ({})", metadata.name, metadata.difficulty);
            println!("    {}", metadata.description);
            if let Ok(scenario) = registry.load(&metadata.name) {
                for (name, criterion) in scenario.success_criteria() {
                    println!(
                        "    - {name}: {:?} {:.2}",
                        criterion.direction, criterion.target
                    );
                }
            }
        } else {
            println!("  {:<20} {}", metadata.name, metadata.difficulty);
        }
    }
}

fn print_info(loader: &FrameworkConfigLoader) {
    println!("AgentGym {}", env!("CARGO_PKG_VERSION"));
    match loader.get_config_path() {
        Some(path) => println!("  Config:   {}", path.display()),
        None => println!("  Config:   built-in defaults"),
    }
    let output = loader.get_result_output();
    if output.enabled {
        println!("  Results:  {}", output.directory.display());
    } else {
        println!("  Results:  disabled");
    }
    println!("  Log level: {}", loader.get_logging_params().level_filter());
    println!(
        "  Scenarios: {}",
        ScenarioRegistry::with_builtins().names().join(", ")
    );
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let loader = FrameworkConfigLoader::new_config(cli.config.clone());

    let initialized = match (&cli.log_config, &cli.command) {
        (Some(path), _) => init_logging_from_file(path),
        (None, Command::Train { verbose, .. }) => {
            let mut logging = loader.get_logging_params().clone();
            if *verbose {
                logging.level = "debug".to_string();
            }
            init_logging_from_params(&logging)
        }
        (None, _) => {
            init_observability();
            Ok(())
        }
    };
    if let Err(e) = initialized {
        eprintln!("Failed to initialize logging: {e}");
    }

    let outcome = match cli.command {
        Command::Train {
            scenario,
            episodes,
            learning_rate,
            batch_size,
            discount_factor,
            checkpoint_interval,
            framework,
            seed,
            output_dir,
            verbose: _,
        } => {
            let args = TrainArgs {
                scenario,
                episodes,
                learning_rate,
                batch_size,
                discount_factor,
                checkpoint_interval,
                framework,
                seed,
                output_dir,
            };
            train(loader, args).await
        }
        Command::Scenarios { detailed } => {
            list_scenarios(detailed);
            Ok(())
        }
        Command::Info => {
            print_info(&loader);
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
