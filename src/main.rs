//! EcoLearn Carbon Calculator
//!
//! Estimates a household's yearly carbon footprint and keeps a history of
//! saved calculations with the eco-points they earned.

mod calculator;
mod db;
mod inputs;
mod models;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::inputs::BatchReport;
use crate::models::{FootprintInputs, FootprintResult, PointsAward};

#[derive(Parser)]
#[command(name = "ecolearn-calculator")]
#[command(about = "Carbon footprint calculator for EcoLearn")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, default_value = "ecolearn.db")]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate a carbon footprint
    Calc {
        /// Profile file with one `category.field = value` per line
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Extra field updates applied after the profile (e.g. "transport.carMiles=100")
        #[arg(short, long = "set", value_name = "CATEGORY.FIELD=VALUE")]
        set: Vec<String>,

        /// Save the result for this user and award eco-points
        #[arg(short, long)]
        user: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Also print the inputs that were used
        #[arg(short, long)]
        verbose: bool,
    },

    /// Calculate every *.profile file in a directory
    Batch {
        /// Directory to scan (recursively)
        dir: PathBuf,

        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List saved calculations
    History {
        /// Only show this user's calculations
        #[arg(short, long)]
        user: Option<String>,

        /// Maximum number of calculations to list
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Delete all saved calculations (for --user if given) instead of listing them
        #[arg(long)]
        clear: bool,
    },

    /// Show a saved calculation in full
    Show {
        /// Calculation ID
        id: i64,
    },

    /// Show a user's eco-points and level
    Points {
        /// User name
        user: String,
    },

    /// Initialize empty database with schema
    Init,

    /// Save sample household calculations for the "demo" user
    LoadSample,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Calc {
            profile,
            set,
            user,
            json,
            verbose,
        } => {
            let mut inputs = match &profile {
                Some(path) => inputs::load_profile(path)?,
                None => FootprintInputs::default(),
            };
            inputs::apply_assignments(&mut inputs, &set).context("invalid --set")?;

            let result = calculator::calculate_footprint(&inputs);
            print!("{}", render_calc(&inputs, &result, json, verbose)?);

            if let Some(name) = user {
                let (id, award) = db::save_calculation(&conn, &name, &inputs, &result)?;
                let notice = render_award(&name, id, &award);
                // Keep stdout parseable in JSON mode
                if json {
                    eprint!("{}", notice);
                } else {
                    print!("{}", notice);
                }
            }
        }

        Commands::Batch { dir, json } => {
            let report = inputs::calculate_directory(&dir)?;
            print!("{}", render_batch(&report, &dir, json)?);

            for (path, error) in &report.errors {
                eprintln!("  Error in {}: {}", path.display(), error);
            }
            if json {
                eprintln!("{}", report);
            } else {
                println!("{}", report);
            }
        }

        Commands::History { user, limit, clear } => {
            if clear {
                let deleted = db::clear_history(&conn, user.as_deref())?;
                println!("Deleted {} saved calculations.", deleted);
                return Ok(());
            }

            let saved = db::list_calculations(&conn, user.as_deref(), limit)?;
            if saved.is_empty() {
                println!("No saved calculations. Run 'calc --user NAME' or 'load-sample' first.");
            } else {
                println!(
                    "{:>5}  {:<16} {:<20} {:>12} {:>8}",
                    "ID", "User", "Saved", "kg CO₂/yr", "% global"
                );
                println!("{}", "-".repeat(66));
                for s in saved {
                    println!(
                        "{:>5}  {:<16} {:<20} {:>12.2} {:>7}%",
                        s.id,
                        s.user_name,
                        s.created_at.format("%Y-%m-%d %H:%M"),
                        s.total,
                        s.percentage
                    );
                }
            }
        }

        Commands::Show { id } => match db::get_calculation(&conn, id)? {
            Some(saved) => {
                println!("Calculation #{}", saved.id);
                println!("  User: {}", saved.user_name);
                println!("  Saved: {}", saved.created_at.to_rfc3339());
                println!("  Inputs:");
                for line in inputs::to_profile(&saved.inputs).lines() {
                    println!("    {}", line);
                }
                println!();
                println!("{}", saved.result());
            }
            None => println!("Calculation #{} not found", id),
        },

        Commands::Points { user } => match db::get_user(&conn, &user)? {
            Some(u) => println!("{}: {} eco-points, level {}", u.name, u.points, u.level),
            None => println!("User '{}' has no eco-points yet", user),
        },

        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            let count = load_sample_data(&conn)?;
            println!("Loaded {} sample calculations for user '{}'", count, SAMPLE_USER);
        }
    }

    Ok(())
}

/// Calculation output for stdout: the JSON result, or the text report
fn render_calc(
    inputs: &FootprintInputs,
    result: &FootprintResult,
    json: bool,
    verbose: bool,
) -> Result<String> {
    if json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(result)?));
    }

    let mut output = String::new();
    if verbose {
        output.push_str("Inputs:\n");
        output.push_str(&inputs::to_profile(inputs));
        output.push('\n');
    }
    output.push_str(&format!("{}\n", result));
    Ok(output)
}

fn render_award(name: &str, id: i64, award: &PointsAward) -> String {
    let mut output = format!(
        "Saved as calculation #{}. +{} eco-points earned! {} now has {} points.\n",
        id, award.awarded, name, award.points
    );
    if award.leveled_up {
        output.push_str(&format!("Level up! {} is now level {}.\n", name, award.level));
    }
    output
}

/// Batch output for stdout: a JSON array, or a table of totals
fn render_batch(report: &BatchReport, dir: &Path, json: bool) -> Result<String> {
    if json {
        let rows: Vec<_> = report
            .results
            .iter()
            .map(|(path, result)| {
                serde_json::json!({
                    "profile": path.display().to_string(),
                    "result": result,
                })
            })
            .collect();
        return Ok(format!("{}\n", serde_json::to_string_pretty(&rows)?));
    }

    let mut output = String::new();
    if !report.results.is_empty() {
        output.push_str(&format!("{:<40} {:>12} {:>8}\n", "Profile", "kg CO₂/yr", "% global"));
        output.push_str(&format!("{}\n", "-".repeat(62)));
        for (path, result) in &report.results {
            let name = path.strip_prefix(dir).unwrap_or(path);
            output.push_str(&format!(
                "{:<40} {:>12.2} {:>7}%\n",
                name.display(),
                result.total,
                result.comparison.percentage
            ));
        }
        output.push('\n');
    }
    Ok(output)
}

const SAMPLE_USER: &str = "demo";

/// Sample households, from car-free to high-consumption
const SAMPLE_PROFILES: [(&str, &str); 4] = [
    (
        "city-cyclist",
        r#"
        transport.publicTransportHours = 4
        energy.electricityBill = 40
        energy.homeSize = small
        energy.renewableEnergy = yes
        food.dietType = vegan
        food.localFood = often
        food.foodWaste = low
        waste.recycling = always
        waste.composting = yes
        lifestyle.shopping = minimal
        lifestyle.secondHand = often
        "#,
    ),
    (
        "suburban-family",
        r#"
        transport.carMiles = 150
        transport.carType = average
        transport.flightMiles = 2000
        energy.electricityBill = 120
        energy.gasBill = 80
        energy.homeSize = medium
        food.dietType = medium-meat
        food.localFood = sometimes
        waste.recycling = sometimes
        lifestyle.shopping = moderate
        "#,
    ),
    (
        "rural-commuter",
        r#"
        transport.carMiles = 300
        transport.carType = suv
        energy.electricityBill = 150
        energy.gasBill = 120
        energy.homeSize = large
        energy.renewableEnergy = no
        food.dietType = high-meat
        food.foodWaste = high
        waste.recycling = rarely
        lifestyle.shopping = frequent
        "#,
    ),
    (
        "frequent-flyer",
        r#"
        transport.carMiles = 60
        transport.carType = hybrid
        transport.flightMiles = 25000
        energy.electricityBill = 90
        energy.homeSize = very-large
        food.dietType = low-meat
        lifestyle.shopping = excessive
        lifestyle.secondHand = sometimes
        "#,
    ),
];

/// Save the sample households as calculations for the demo user
fn load_sample_data(conn: &Connection) -> Result<usize> {
    db::clear_history(conn, Some(SAMPLE_USER))?;

    for (name, profile) in SAMPLE_PROFILES {
        let inputs = inputs::parse_profile(profile)
            .with_context(|| format!("sample profile '{}' is invalid", name))?;
        let result = calculator::calculate_footprint(&inputs);
        db::save_calculation(conn, SAMPLE_USER, &inputs, &result)?;
        println!("  {:<16} {:>10.2} kg CO₂/yr", name, result.total);
    }

    Ok(SAMPLE_PROFILES.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn set_flags_parse_in_order() {
        let cli = Cli::try_parse_from([
            "ecolearn-calculator",
            "calc",
            "--set",
            "transport.carMiles=100",
            "-s",
            "food.dietType=vegan",
            "--user",
            "sam",
        ])
        .unwrap();

        match cli.command {
            Commands::Calc { set, user, .. } => {
                assert_eq!(set, ["transport.carMiles=100", "food.dietType=vegan"]);
                assert_eq!(user.as_deref(), Some("sam"));
            }
            _ => panic!("expected calc"),
        }
    }

    #[test]
    fn json_calc_output_is_a_single_document() {
        let mut answers = FootprintInputs::default();
        inputs::apply_assignments(&mut answers, &["food.dietType=vegan"]).unwrap();
        let result = calculator::calculate_footprint(&answers);

        let out = render_calc(&answers, &result, true, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["breakdown"]["food"], 600.0);
        assert_eq!(value["comparison"]["percentage"], 27);
        assert!(!out.contains("Inputs:"));
    }

    #[test]
    fn json_batch_output_is_a_single_document() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.profile"), "food.dietType = vegan\n").unwrap();
        std::fs::write(dir.path().join("bad.profile"), "garden.trees = 3\n").unwrap();

        let report = inputs::calculate_directory(dir.path()).unwrap();
        let out = render_batch(&report, dir.path(), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();

        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0]["profile"].as_str().unwrap().ends_with("a.profile"));
        assert_eq!(rows[0]["result"]["total"], 1300.0);
    }

    #[test]
    fn text_batch_output_lists_relative_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.profile"), "food.dietType = vegan\n").unwrap();

        let report = inputs::calculate_directory(dir.path()).unwrap();
        let out = render_batch(&report, dir.path(), false).unwrap();
        assert!(out.starts_with("Profile"));
        assert!(out.contains("a.profile"));
        assert!(out.contains("1300.00"));
    }

    #[test]
    fn award_notice_mentions_level_up() {
        let award = PointsAward {
            awarded: 20,
            points: 200,
            level: 2,
            leveled_up: true,
        };
        let notice = render_award("sam", 7, &award);
        assert!(notice.starts_with("Saved as calculation #7. +20 eco-points earned!"));
        assert!(notice.contains("Level up! sam is now level 2."));
    }

    #[test]
    fn sample_profiles_load_for_demo_user() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();

        assert_eq!(load_sample_data(&conn).unwrap(), SAMPLE_PROFILES.len());
        assert_eq!(load_sample_data(&conn).unwrap(), SAMPLE_PROFILES.len());

        let saved = db::list_calculations(&conn, Some(SAMPLE_USER), 100).unwrap();
        assert_eq!(saved.len(), SAMPLE_PROFILES.len());

        let demo = db::get_user(&conn, SAMPLE_USER).unwrap().unwrap();
        assert_eq!(
            demo.points,
            2 * SAMPLE_PROFILES.len() as i64 * db::CALCULATION_REWARD_POINTS
        );
    }
}
