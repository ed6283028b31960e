//! Field updates and profile files
//!
//! Inputs are built up one field at a time, the same way the calculator form
//! sends them. A profile is a text file of such updates, one per line:
//!
//! ```text
//! # weekly commute
//! transport.carMiles = 120
//! transport.carType = hybrid
//! energy.homeSize = very-large
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::calculator;
use crate::models::{
    CarType, Category, DietType, FoodWaste, FootprintInputs, FootprintResult, Frequency,
    HomeSize, Recycling, RenewableEnergy, Shopping,
};

pub const PROFILE_EXTENSION: &str = "profile";

#[derive(Debug, Error)]
pub enum InputError {
    #[error("unknown category '{0}' (expected transport, energy, food, waste or lifestyle)")]
    UnknownCategory(String),

    #[error("unknown field '{field}' in {category}")]
    UnknownField { category: Category, field: String },

    #[error("expected 'category.field=value', got '{0}'")]
    InvalidAssignment(String),

    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<InputError>,
    },

    #[error("bad assignment pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Blank, unparseable and non-finite numbers all count as unset
fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_yes_no(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

/// `carMiles`, `car_miles` and `car-miles` all name the same field
fn normalize_field(field: &str) -> String {
    field
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl FootprintInputs {
    /// Overwrite one field from its raw form value
    ///
    /// Only the field name can be wrong; a bad value just leaves the field unset.
    pub fn set_field(
        &mut self,
        category: Category,
        field: &str,
        value: &str,
    ) -> Result<(), InputError> {
        let key = normalize_field(field);

        match (category, key.as_str()) {
            (Category::Transport, "carmiles") => self.transport.car_miles = parse_number(value),
            (Category::Transport, "cartype") => self.transport.car_type = CarType::from_value(value),
            (Category::Transport, "flightmiles") => {
                self.transport.flight_miles = parse_number(value)
            }
            (Category::Transport, "publictransporthours") => {
                self.transport.public_transport_hours = parse_number(value)
            }

            (Category::Energy, "electricitybill") => {
                self.energy.electricity_bill = parse_number(value)
            }
            (Category::Energy, "gasbill") => self.energy.gas_bill = parse_number(value),
            (Category::Energy, "homesize") => self.energy.home_size = HomeSize::from_value(value),
            (Category::Energy, "renewableenergy") => {
                self.energy.renewable_energy = RenewableEnergy::from_value(value)
            }

            (Category::Food, "diettype") => self.food.diet_type = DietType::from_value(value),
            (Category::Food, "localfood") => self.food.local_food = Frequency::from_value(value),
            (Category::Food, "foodwaste") => self.food.food_waste = FoodWaste::from_value(value),

            (Category::Waste, "recycling") => self.waste.recycling = Recycling::from_value(value),
            (Category::Waste, "composting") => self.waste.composting = parse_yes_no(value),

            (Category::Lifestyle, "shopping") => {
                self.lifestyle.shopping = Shopping::from_value(value)
            }
            (Category::Lifestyle, "secondhand") => {
                self.lifestyle.second_hand = Frequency::from_value(value)
            }

            _ => {
                return Err(InputError::UnknownField {
                    category,
                    field: field.to_string(),
                });
            }
        }

        debug!(%category, field, value, "field updated");
        Ok(())
    }
}

fn assignment_regex() -> Result<Regex, InputError> {
    Ok(Regex::new(r"^\s*([A-Za-z]+)\s*\.\s*([A-Za-z][\w-]*)\s*=\s*(.*?)\s*$")?)
}

fn apply_with(re: &Regex, inputs: &mut FootprintInputs, text: &str) -> Result<(), InputError> {
    let cap = re
        .captures(text)
        .ok_or_else(|| InputError::InvalidAssignment(text.trim().to_string()))?;

    let category = Category::from_name(&cap[1])
        .ok_or_else(|| InputError::UnknownCategory(cap[1].to_string()))?;

    inputs.set_field(category, &cap[2], &cap[3])
}

/// Apply `category.field=value` updates in order
pub fn apply_assignments<S: AsRef<str>>(
    inputs: &mut FootprintInputs,
    assignments: &[S],
) -> Result<(), InputError> {
    let re = assignment_regex()?;
    for text in assignments {
        apply_with(&re, inputs, text.as_ref())?;
    }
    Ok(())
}

/// Apply every assignment in a profile on top of existing inputs
pub fn apply_profile(inputs: &mut FootprintInputs, content: &str) -> Result<(), InputError> {
    let re = assignment_regex()?;

    for (idx, raw_line) in content.lines().enumerate() {
        let line = raw_line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        apply_with(&re, inputs, line).map_err(|e| InputError::Line {
            line: idx + 1,
            source: Box::new(e),
        })?;
    }

    Ok(())
}

pub fn parse_profile(content: &str) -> Result<FootprintInputs, InputError> {
    let mut inputs = FootprintInputs::default();
    apply_profile(&mut inputs, content)?;
    Ok(inputs)
}

/// Read and parse a single profile file
pub fn load_profile(path: &Path) -> Result<FootprintInputs> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    parse_profile(&content).with_context(|| format!("Invalid profile {}", path.display()))
}

/// Write the set fields back out as profile lines
pub fn to_profile(inputs: &FootprintInputs) -> String {
    let mut lines: Vec<(&str, &str, String)> = Vec::new();

    let t = &inputs.transport;
    if let Some(v) = t.car_miles {
        lines.push(("transport", "carMiles", v.to_string()));
    }
    if let Some(v) = t.car_type {
        lines.push(("transport", "carType", v.as_str().to_string()));
    }
    if let Some(v) = t.flight_miles {
        lines.push(("transport", "flightMiles", v.to_string()));
    }
    if let Some(v) = t.public_transport_hours {
        lines.push(("transport", "publicTransportHours", v.to_string()));
    }

    let e = &inputs.energy;
    if let Some(v) = e.electricity_bill {
        lines.push(("energy", "electricityBill", v.to_string()));
    }
    if let Some(v) = e.gas_bill {
        lines.push(("energy", "gasBill", v.to_string()));
    }
    if let Some(v) = e.home_size {
        lines.push(("energy", "homeSize", v.as_str().to_string()));
    }
    if let Some(v) = e.renewable_energy {
        lines.push(("energy", "renewableEnergy", v.as_str().to_string()));
    }

    let f = &inputs.food;
    if let Some(v) = f.diet_type {
        lines.push(("food", "dietType", v.as_str().to_string()));
    }
    if let Some(v) = f.local_food {
        lines.push(("food", "localFood", v.as_str().to_string()));
    }
    if let Some(v) = f.food_waste {
        lines.push(("food", "foodWaste", v.as_str().to_string()));
    }

    let w = &inputs.waste;
    if let Some(v) = w.recycling {
        lines.push(("waste", "recycling", v.as_str().to_string()));
    }
    if let Some(v) = w.composting {
        lines.push(("waste", "composting", if v { "yes" } else { "no" }.to_string()));
    }

    let l = &inputs.lifestyle;
    if let Some(v) = l.shopping {
        lines.push(("lifestyle", "shopping", v.as_str().to_string()));
    }
    if let Some(v) = l.second_hand {
        lines.push(("lifestyle", "secondHand", v.as_str().to_string()));
    }

    lines
        .iter()
        .map(|(category, field, value)| format!("{}.{} = {}\n", category, field, value))
        .collect()
}

/// Find all profile files under a directory, sorted by path
pub fn find_profile_files(dir: &Path) -> Result<Vec<PathBuf>> {
    ensure!(dir.is_dir(), "{} is not a directory", dir.display());

    let mut profiles: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == PROFILE_EXTENSION))
        .collect();

    profiles.sort();
    Ok(profiles)
}

/// Calculate every profile under a directory
///
/// A profile that cannot be read or parsed is counted and skipped.
pub fn calculate_directory(dir: &Path) -> Result<BatchReport> {
    let mut report = BatchReport::default();

    for path in find_profile_files(dir)? {
        match load_profile(&path) {
            Ok(inputs) => {
                let result = calculator::calculate_footprint(&inputs);
                report.results.push((path, result));
            }
            Err(e) => {
                let message = format!("{e:#}");
                warn!(path = %path.display(), error = %message, "skipping profile");
                report.errors.push((path, message));
            }
        }
    }

    Ok(report)
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<(PathBuf, FootprintResult)>,
    pub errors: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn average_total(&self) -> Option<f64> {
        if self.results.is_empty() {
            return None;
        }
        let sum: f64 = self.results.iter().map(|(_, r)| r.total).sum();
        Some(calculator::round2(sum / self.results.len() as f64))
    }
}

impl std::fmt::Display for BatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Calculated {} profiles. Errors: {}",
            self.results.len(),
            self.errors.len()
        )?;
        if let Some(avg) = self.average_total() {
            write!(f, ". Average footprint: {:.2} kg CO₂/year", avg)?;
        }
        Ok(())
    }
}
