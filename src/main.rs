//! hitman-sat CLI: run a mission on a world file, or solve a DIMACS file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use hitman_sat::{
    backend::{self, SatBackend},
    config::{BackendKind, Config},
    io,
    mission::run_mission,
    sim::{GridReferee, World},
};

#[derive(Parser)]
#[command(name = "hitman-sat", version, about = "SAT-backed stealth mission agent")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// External solver command; selects the external backend.
    #[arg(long, global = true)]
    solver: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Explore a simulated world, then carry out the mission.
    Run {
        /// World file.
        world: PathBuf,
    },

    /// Solve a DIMACS CNF file and print the result.
    Solve {
        /// CNF file.
        cnf: PathBuf,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(command) = &cli.solver {
        config.solver.backend = BackendKind::External;
        config.solver.command = command.clone();
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let mut backend = backend::from_config(&config.solver);

    match cli.command {
        Commands::Run { world } => {
            let world = World::load(&world)?;
            let mut referee = GridReferee::new(world);
            let report = run_mission(&mut referee, &mut *backend, &config)?;

            println!(
                "exploration: {} steps, map accepted: {}",
                report.explore_steps, report.map_accepted
            );
            println!("phase 1 score: {}", report.phase1.score);
            println!(
                "phase 2 score: {} ({} rounds, goal reached: {})",
                report.phase2.score, report.rounds, report.phase2.goal_reached
            );
            let history: Vec<&str> = report.phase2.history.iter().map(|p| p.name()).collect();
            println!("phase 2 actions: {}", history.join(" "));
            println!("total score: {}", report.total_score());
        }
        Commands::Solve { cnf } => {
            let mut input = std::fs::File::open(&cnf)
                .with_context(|| format!("failed to open {}", cnf.display()))?;
            let problem = io::read_problem(&mut input)?;
            tracing::info!(
                vars = problem.var_count,
                clauses = problem.clauses.len(),
                "problem read"
            );
            let solution = backend.solve(&problem)?;
            io::write_solution(&mut std::io::stdout(), &solution)?;
        }
    }
    Ok(())
}
