use std::path::PathBuf;

use clap::Parser;
use mobcap::{AppConfig, run_simulation};
use mobcap_core::ScanMode;
use mobcap_creature::Category;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of ticks to simulate (20 ticks = one second of game time)
    #[arg(long, default_value = "6000")]
    ticks: u64,

    /// Number of worlds
    #[arg(long)]
    worlds: Option<usize>,

    /// Creatures per world before the first tick
    #[arg(long)]
    creatures: Option<usize>,

    /// Number of players
    #[arg(long)]
    players: Option<usize>,

    /// Classify despawn candidates on a worker thread
    #[arg(long)]
    async_scan: bool,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Configuration file (RON); defaults to ./mobcap.ron if present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as RON and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(worlds) = args.worlds {
        config.simulation.worlds = worlds;
    }
    if let Some(creatures) = args.creatures {
        config.simulation.creatures_per_world = creatures;
    }
    if let Some(players) = args.players {
        config.simulation.players = players;
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if args.async_scan {
        config.population.scan.mode = ScanMode::Async;
    }

    if args.print_config {
        println!("{}", config.population.to_ron_string()?);
        return Ok(());
    }

    log::info!(
        "Simulating {} ticks: {} worlds, {} creatures each, {} players, seed {}",
        args.ticks,
        config.simulation.worlds,
        config.simulation.creatures_per_world,
        config.simulation.players,
        config.simulation.seed
    );

    let summary = run_simulation(&config, args.ticks);

    let stats = &summary.stats;
    println!("Ticks:            {}", stats.ticks);
    println!("Spawned:          {}", stats.spawned);
    println!(
        "Denied:           {} capacity, {} no player, {} breeding",
        stats.denied_capacity, stats.denied_no_player, stats.denied_breeding
    );
    println!("Died:             {}", stats.died);
    println!(
        "Scans:            {} ({} removed)",
        stats.scans, stats.removed_by_scans
    );
    for (world, population, census) in &summary.worlds {
        println!("World '{}':", world);
        for category in Category::ALL {
            println!(
                "  {:<14} {:>6} living, {:>6} counted",
                category.name(),
                population[category.index()],
                census[category.index()]
            );
        }
    }
    println!("Elapsed:          {:.1} ms", summary.elapsed_ms);

    Ok(())
}
