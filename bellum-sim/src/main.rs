use anyhow::Result;
use bellum_sim::{run, RunReport, Scenario};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the scenario file
    scenario: PathBuf,

    /// Append battles to this journal instead of resolving in memory
    #[arg(long)]
    journal: Option<PathBuf>,

    /// Leaderboard entries to print
    #[arg(long, default_value_t = 10)]
    limit: usize,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = std::str::FromStr::from_str(&args.log_level).unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    let scenario = Scenario::load(&args.scenario)?;
    log::info!(
        "loaded scenario {}: {} players, {} villages, {} wars, {} attacks",
        args.scenario.display(),
        scenario.players.len(),
        scenario.villages.len(),
        scenario.wars.len(),
        scenario.attacks.len()
    );

    let report = run(&scenario, args.journal.as_deref(), args.limit)?;
    print_report(&report);

    Ok(())
}

fn print_report(report: &RunReport) {
    println!("battles recorded: {}", report.battles.len());
    for battle in &report.battles {
        println!(
            "  battle {}: player {} -> village {} at {}: {}, loot {}",
            battle.id,
            battle.attacker_id,
            battle.village_id,
            battle.occurred_at,
            battle.result,
            battle.loot.total()
        );
    }

    for war in &report.wars {
        println!(
            "war {}: {} battles, {}V/{}D/{} draws, score {}",
            war.war_id,
            war.battles,
            war.attacker_victories,
            war.defender_victories,
            war.draws,
            war.score
        );
    }

    println!("leaderboard:");
    for (rank, entry) in report.leaderboard.iter().enumerate() {
        println!(
            "  {}. player {}: {}/{}/{} (W/L/D), rate {}, loot {}",
            rank + 1,
            entry.player_id,
            entry.victories,
            entry.defeats,
            entry.draws,
            entry.win_rate,
            entry.total_loot_gained
        );
    }
}
