//! Ballistics Lab: weapon upgrade composer and projectile effect resolver. CLI.

use ballistics_lab::config::{load_scenario, load_upgrade_table, load_weapon};
use ballistics_lab::effect::{apply_upgrade_bundle, EffectKind, UpgradeTable};
use ballistics_lab::report::{write_html_report, write_json_report, StatSummary};
use ballistics_lab::scheduler::Simulation;
use ballistics_lab::stats::StatBlock;
use ballistics_lab::util::init_logging;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ballistics-lab")]
#[command(about = "Weapon Upgrade Composer and Projectile Effect Resolver (Stat Folding + Arena Micro-Simulator)")]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every upgrade effect kind with what it modifies.
    Catalog {
        #[arg(long)]
        json: bool,
    },
    /// Fold a weapon's bundles into its base stats and print the resolved totals.
    Stats {
        #[arg(long, value_name = "TOML")]
        weapon: PathBuf,
        #[arg(long, value_name = "PATH", help = "Upgrade table (.toml or .json)")]
        table: Option<PathBuf>,
        #[arg(long = "bundle", value_name = "NAME", help = "Extra bundle to apply after the weapon's own")]
        bundles: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Roll bundles from an upgrade table with a seeded RNG.
    Roll {
        #[arg(long, value_name = "PATH")]
        table: PathBuf,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 1)]
        count: u32,
        #[arg(long, value_name = "TOML", help = "Apply the rolled bundles to this weapon and print its totals")]
        weapon: Option<PathBuf>,
    },
    /// Run a scenario through the arena simulator and write JSON/HTML reports.
    Simulate {
        #[arg(long, value_name = "TOML")]
        scenario: PathBuf,
        #[arg(long, value_name = "DIR", default_value = "out")]
        out: PathBuf,
        #[arg(long, help = "Override the scenario's RNG seed")]
        seed: Option<u64>,
    },
}

fn main() -> Result<(), String> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Catalog { json } => run_catalog(json),
        Commands::Stats {
            weapon,
            table,
            bundles,
            json,
        } => run_stats(weapon, table, bundles, json),
        Commands::Roll {
            table,
            seed,
            count,
            weapon,
        } => run_roll(table, seed, count, weapon),
        Commands::Simulate {
            scenario,
            out,
            seed,
        } => run_simulate(scenario, out, seed),
    }
}

/// Wire name of an effect kind, as written in upgrade tables.
fn kind_name(kind: EffectKind) -> Result<String, String> {
    let v = serde_json::to_value(kind).map_err(|e| e.to_string())?;
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("effect kind {:?} has no string form", kind))
}

fn run_catalog(json: bool) -> Result<(), String> {
    if json {
        let entries = EffectKind::ALL
            .iter()
            .map(|&k| {
                Ok(serde_json::json!({
                    "kind": kind_name(k)?,
                    "unlock": k.is_unlock(),
                    "description": k.describe(),
                }))
            })
            .collect::<Result<Vec<_>, String>>()?;
        let out = serde_json::to_string_pretty(&entries).map_err(|e| e.to_string())?;
        println!("{}", out);
        return Ok(());
    }
    for &k in EffectKind::ALL.iter() {
        let tag = if k.is_unlock() { "unlock" } else { "" };
        println!("{:<26} {:<7} {}", kind_name(k)?, tag, k.describe());
    }
    Ok(())
}

fn load_table(path: Option<&Path>) -> Result<Option<UpgradeTable>, String> {
    path.map(|p| load_upgrade_table(p).map_err(|e| e.to_string()))
        .transpose()
}

fn run_stats(
    weapon: PathBuf,
    table: Option<PathBuf>,
    extra: Vec<String>,
    json: bool,
) -> Result<(), String> {
    let cfg = load_weapon(&weapon).map_err(|e| e.to_string())?;
    let table = load_table(table.as_deref())?;
    let stats = cfg
        .build_stats_with(table.as_ref(), extra.as_slice())
        .map_err(|e| e.to_string())?;
    let summary = StatSummary::from_stats(&stats);
    if json {
        let out = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
        println!("{}", out);
    } else {
        println!("Weapon: {}", cfg.name);
        let applied: Vec<&str> = cfg
            .bundles
            .iter()
            .chain(extra.iter())
            .map(String::as_str)
            .collect();
        if !applied.is_empty() {
            println!("Bundles: {}", applied.join(", "));
        }
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(s: &StatSummary) {
    println!("  damage={:.2}  crit={:.0}% x{:.2}  expected_hit={:.2}", s.damage, s.crit_chance * 100.0, s.crit_damage_multiplier, s.expected_hit_damage);
    println!("  fire_rate={:.2}/s  magazine={}  reload={:.2}s", s.fire_rate, s.magazine, s.reload_time);
    println!("  velocity={:.1}  lifetime={:.2}s  pellets={}  spread={:.1}deg", s.bullet_velocity, s.projectile_lifetime, s.bullets_per_shot, s.bullet_spread);
    println!("  piercing={}  bounces={}", s.piercing, s.bounces);
    let flags: Vec<&str> = [
        (s.explosive, "explosive"),
        (s.homing, "homing"),
        (s.burn, "burn"),
        (s.poison, "poison"),
        (s.freeze, "freeze"),
        (s.shock, "shock"),
    ]
    .iter()
    .filter(|(on, _)| *on)
    .map(|(_, name)| *name)
    .collect();
    if flags.is_empty() {
        println!("  effects: none");
    } else {
        println!("  effects: {}", flags.join(", "));
    }
}

fn run_roll(table: PathBuf, seed: u64, count: u32, weapon: Option<PathBuf>) -> Result<(), String> {
    let table = load_upgrade_table(&table).map_err(|e| e.to_string())?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut stats = match &weapon {
        Some(path) => Some(
            load_weapon(path)
                .and_then(|cfg| cfg.build_stats(Some(&table)))
                .map_err(|e| e.to_string())?,
        ),
        None => None,
    };
    for i in 0..count {
        let bundle = table
            .roll(&mut rng)
            .ok_or_else(|| "upgrade table has no rollable bundles".to_string())?;
        println!("{:>3}. [tier {}] {}", i + 1, bundle.tier, bundle.name);
        if let Some(s) = stats.as_mut() {
            apply_upgrade_bundle(bundle, s);
        }
    }
    if let Some(s) = stats {
        println!();
        print_summary(&StatSummary::from_stats(&s));
    }
    Ok(())
}

fn run_simulate(scenario_path: PathBuf, out: PathBuf, seed: Option<u64>) -> Result<(), String> {
    let mut scenario = load_scenario(&scenario_path).map_err(|e| e.to_string())?;
    if let Some(seed) = seed {
        scenario.simulation.seed = seed;
    }
    let table_path = scenario.upgrade_table.as_ref().map(|p| {
        if p.is_absolute() {
            p.clone()
        } else {
            scenario_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(p)
        }
    });
    let table = load_table(table_path.as_deref())?;
    let stats: StatBlock = scenario
        .weapon
        .build_stats(table.as_ref())
        .map_err(|e| e.to_string())?;
    tracing::info!(
        weapon = %scenario.weapon.name,
        targets = scenario.targets.len(),
        shots = scenario.shots.len(),
        "running scenario"
    );

    let report = Simulation::from_scenario(&scenario, stats).run();

    fs::create_dir_all(&out).map_err(|e| e.to_string())?;
    let json_path = out.join("report.json");
    write_json_report(&report, &json_path)?;
    let html_path = out.join("report.html");
    write_html_report(&report, &html_path)?;

    let t = &report.totals;
    println!(
        "{}: {} shot(s), {} hit(s), {} kill(s), damage hit={:.1} explosion={:.1} chain={:.1} dot={:.1}",
        report.run.weapon,
        t.shots_fired,
        t.hits,
        t.kills,
        t.hit_damage,
        t.explosion_damage,
        t.chain_damage,
        t.dot_damage
    );
    tracing::info!("wrote {} and {}", json_path.display(), html_path.display());
    Ok(())
}
