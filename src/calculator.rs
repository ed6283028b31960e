//! Carbon footprint calculator logic
//!
//! Turns raw category answers into yearly kg CO2 per category, compares the total
//! against reference averages and picks recommendations from a fixed rule table.
//! Everything here is pure: no I/O, no shared state.

use tracing::{debug, warn};

use crate::models::{
    CarType, Category, ComparisonBand, ComparisonResult, DietType, EmissionBreakdown,
    EnergyInputs, FoodInputs, FoodWaste, FootprintInputs, FootprintResult, Frequency, HomeSize,
    Impact, LifestyleInputs, Recommendation, Recycling, RenewableEnergy, Shopping,
    TransportInputs, WasteInputs,
};

/// kg CO2 per person per year
pub const GLOBAL_AVERAGE_KG: f64 = 4800.0;
pub const US_AVERAGE_KG: f64 = 16000.0;

pub const MAX_RECOMMENDATIONS: usize = 6;

/// Largest category magnitude kept as computed. Five of these still sum and
/// round to a finite total.
pub const MAX_CATEGORY_KG: f64 = 1e15;

const WEEKS_PER_YEAR: f64 = 52.0;
const MONTHS_PER_YEAR: f64 = 12.0;

const FLIGHT_KG_PER_MILE: f64 = 0.5;
const PUBLIC_TRANSPORT_KG_PER_HOUR: f64 = 2.0;

const DOLLARS_PER_KWH: f64 = 0.12;
const DOLLARS_PER_THERM: f64 = 1.2;
const GAS_KG_PER_THERM: f64 = 5.3;

const BASE_WASTE_KG: f64 = 200.0;

/// Calculate the full footprint for a set of inputs
///
/// Never fails: unset fields contribute nothing or fall back to their default.
/// Negative numbers are used as given.
pub fn calculate_footprint(inputs: &FootprintInputs) -> FootprintResult {
    let breakdown = EmissionBreakdown {
        transport: settle(
            Category::Transport,
            transport_emissions(&inputs.transport),
            || transport_emissions(&TransportInputs::default()),
        ),
        energy: settle(
            Category::Energy,
            energy_emissions(&inputs.energy),
            || energy_emissions(&EnergyInputs::default()),
        ),
        food: settle(
            Category::Food,
            food_emissions(&inputs.food),
            || food_emissions(&FoodInputs::default()),
        ),
        waste: settle(
            Category::Waste,
            waste_emissions(&inputs.waste),
            || waste_emissions(&WasteInputs::default()),
        ),
        lifestyle: settle(
            Category::Lifestyle,
            lifestyle_emissions(&inputs.lifestyle),
            || lifestyle_emissions(&LifestyleInputs::default()),
        ),
    };

    for (category, value) in breakdown.entries() {
        debug!(%category, kg = value, "category emissions");
    }

    FootprintResult::from_breakdown(breakdown)
}

impl FootprintResult {
    /// Build the total, comparison and recommendations for a breakdown
    pub fn from_breakdown(breakdown: EmissionBreakdown) -> Self {
        let total = round2(
            breakdown.transport
                + breakdown.energy
                + breakdown.food
                + breakdown.waste
                + breakdown.lifestyle,
        );

        FootprintResult {
            total,
            breakdown,
            comparison: compare_to_averages(total),
            recommendations: recommendations_for(&breakdown),
        }
    }
}

/// Round a category value, or fall back to the category's unset value when it
/// overflowed or lies beyond `MAX_CATEGORY_KG`
fn settle(category: Category, raw: f64, unset: impl FnOnce() -> f64) -> f64 {
    if raw.is_finite() && raw.abs() <= MAX_CATEGORY_KG {
        return round2(raw);
    }

    warn!(%category, raw, "category value out of range, using unset value");
    round2(unset())
}

/// Round half toward positive infinity, to 2 decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

fn car_factor(car_type: CarType) -> f64 {
    match car_type {
        CarType::Small => 0.3,
        CarType::Average => 0.4,
        CarType::Large => 0.5,
        CarType::Suv => 0.6,
        CarType::Electric => 0.1,
        CarType::Hybrid => 0.2,
    }
}

pub fn transport_emissions(data: &TransportInputs) -> f64 {
    let mut emissions = 0.0;

    if let Some(miles) = data.car_miles {
        let car_type = data.car_type.unwrap_or(CarType::Average);
        emissions += miles * WEEKS_PER_YEAR * car_factor(car_type);
    }

    if let Some(miles) = data.flight_miles {
        emissions += miles * FLIGHT_KG_PER_MILE;
    }

    if let Some(hours) = data.public_transport_hours {
        emissions += hours * WEEKS_PER_YEAR * PUBLIC_TRANSPORT_KG_PER_HOUR;
    }

    emissions
}

fn home_size_factor(size: HomeSize) -> f64 {
    match size {
        HomeSize::Small => 0.8,
        HomeSize::Medium => 1.0,
        HomeSize::Large => 1.3,
        HomeSize::VeryLarge => 1.6,
    }
}

pub fn energy_emissions(data: &EnergyInputs) -> f64 {
    let mut emissions = 0.0;

    if let Some(bill) = data.electricity_bill {
        let kwh_per_year = (bill * MONTHS_PER_YEAR) / DOLLARS_PER_KWH;
        let kg_per_kwh = match data.renewable_energy {
            Some(RenewableEnergy::Yes) => 0.2,
            _ => 0.5,
        };
        emissions += kwh_per_year * kg_per_kwh;
    }

    if let Some(bill) = data.gas_bill {
        let therms_per_year = (bill * MONTHS_PER_YEAR) / DOLLARS_PER_THERM;
        emissions += therms_per_year * GAS_KG_PER_THERM;
    }

    // Scales the combined subtotal, and only when a size was given
    if let Some(size) = data.home_size {
        emissions *= home_size_factor(size);
    }

    emissions
}

fn diet_emissions(diet: Option<DietType>) -> f64 {
    match diet {
        Some(DietType::HighMeat) => 2000.0,
        Some(DietType::MediumMeat) | None => 1500.0,
        Some(DietType::LowMeat) => 1000.0,
        Some(DietType::Vegetarian) => 800.0,
        Some(DietType::Vegan) => 600.0,
    }
}

pub fn food_emissions(data: &FoodInputs) -> f64 {
    let mut emissions = diet_emissions(data.diet_type);

    match data.local_food {
        Some(Frequency::Often) => emissions *= 0.9,
        Some(Frequency::Sometimes) => emissions *= 0.95,
        _ => {}
    }

    match data.food_waste {
        Some(FoodWaste::High) => emissions *= 1.2,
        Some(FoodWaste::Low) => emissions *= 0.9,
        _ => {}
    }

    emissions
}

pub fn waste_emissions(data: &WasteInputs) -> f64 {
    let mut emissions = BASE_WASTE_KG;

    match data.recycling {
        Some(Recycling::Always) => emissions *= 0.7,
        Some(Recycling::Sometimes) => emissions *= 0.85,
        _ => {}
    }

    if data.composting == Some(true) {
        emissions *= 0.8;
    }

    emissions
}

fn shopping_emissions(shopping: Option<Shopping>) -> f64 {
    match shopping {
        Some(Shopping::Minimal) => 200.0,
        Some(Shopping::Moderate) | None => 500.0,
        Some(Shopping::Frequent) => 800.0,
        Some(Shopping::Excessive) => 1200.0,
    }
}

pub fn lifestyle_emissions(data: &LifestyleInputs) -> f64 {
    let mut emissions = shopping_emissions(data.shopping);

    match data.second_hand {
        Some(Frequency::Often) => emissions *= 0.8,
        Some(Frequency::Sometimes) => emissions *= 0.9,
        _ => {}
    }

    emissions
}

/// Place a yearly total against the global and US averages
pub fn compare_to_averages(total: f64) -> ComparisonResult {
    let band = if total < GLOBAL_AVERAGE_KG * 0.5 {
        ComparisonBand::Excellent
    } else if total < GLOBAL_AVERAGE_KG {
        ComparisonBand::Good
    } else if total < US_AVERAGE_KG {
        ComparisonBand::BelowUsAverage
    } else {
        ComparisonBand::AboveAverage
    };

    let text = match band {
        ComparisonBand::Excellent => {
            "Excellent! Your footprint is significantly below the global average."
        }
        ComparisonBand::Good => "Good! Your footprint is below the global average.",
        ComparisonBand::BelowUsAverage => {
            "Your footprint is above global average but below the US average."
        }
        ComparisonBand::AboveAverage => {
            "Your footprint is above average. There's room for improvement!"
        }
    };

    ComparisonResult {
        band,
        text,
        global_average: GLOBAL_AVERAGE_KG,
        us_average: US_AVERAGE_KG,
        percentage: (total / GLOBAL_AVERAGE_KG * 100.0 + 0.5).floor() as i64,
    }
}

/// Category rules, in evaluation order: (category, trigger above, recommendation)
const CATEGORY_RULES: [(Category, f64, Recommendation); 5] = [
    (
        Category::Transport,
        2000.0,
        Recommendation {
            category: "Transport",
            icon: "🚗",
            title: "Reduce Vehicle Emissions",
            description: "Consider carpooling, public transport, or switching to an electric/hybrid vehicle.",
            impact: Impact::High,
            savings: "500-2000 kg CO₂/year",
        },
    ),
    (
        Category::Energy,
        3000.0,
        Recommendation {
            category: "Energy",
            icon: "⚡",
            title: "Improve Home Energy Efficiency",
            description: "Switch to LED bulbs, improve insulation, and consider renewable energy sources.",
            impact: Impact::High,
            savings: "300-1500 kg CO₂/year",
        },
    ),
    (
        Category::Food,
        1500.0,
        Recommendation {
            category: "Food",
            icon: "🥗",
            title: "Adopt a More Plant-Based Diet",
            description: "Reduce meat consumption and choose locally sourced, seasonal foods.",
            impact: Impact::Medium,
            savings: "200-800 kg CO₂/year",
        },
    ),
    (
        Category::Waste,
        250.0,
        Recommendation {
            category: "Waste",
            icon: "♻️",
            title: "Improve Waste Management",
            description: "Increase recycling, start composting, and reduce single-use items.",
            impact: Impact::Medium,
            savings: "50-200 kg CO₂/year",
        },
    ),
    (
        Category::Lifestyle,
        600.0,
        Recommendation {
            category: "Lifestyle",
            icon: "🛍️",
            title: "Conscious Consumption",
            description: "Buy less, choose quality over quantity, and shop second-hand when possible.",
            impact: Impact::Medium,
            savings: "100-400 kg CO₂/year",
        },
    ),
];

const GENERAL_RECOMMENDATION: Recommendation = Recommendation {
    category: "General",
    icon: "🌱",
    title: "Plant Trees or Support Reforestation",
    description: "Trees absorb CO₂ from the atmosphere. Plant trees or support reforestation projects.",
    impact: Impact::LongTerm,
    savings: "20-50 kg CO₂/tree/year",
};

/// Pick recommendations for a breakdown
///
/// One entry per category above its trigger, then the general entry, capped at
/// `MAX_RECOMMENDATIONS`.
pub fn recommendations_for(breakdown: &EmissionBreakdown) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> = CATEGORY_RULES
        .iter()
        .filter(|(category, trigger, _)| breakdown.get(*category) > *trigger)
        .map(|(_, _, rec)| rec.clone())
        .collect();

    recommendations.push(GENERAL_RECOMMENDATION);
    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}

impl std::fmt::Display for FootprintResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Carbon Footprint ===")?;
        writeln!(f, "Total: {:.2} kg CO₂ per year", self.total)?;
        writeln!(f, "{}", self.comparison.text)?;
        writeln!(f)?;

        writeln!(f, "Compared to:")?;
        writeln!(f, "  Global average: {:.0} kg", self.comparison.global_average)?;
        writeln!(f, "  US average:     {:.0} kg", self.comparison.us_average)?;
        writeln!(f, "  You:            {}% of global average", self.comparison.percentage)?;
        writeln!(f)?;

        writeln!(f, "Breakdown:")?;
        for (category, value) in self.breakdown.entries() {
            let share = if self.total == 0.0 {
                0
            } else {
                (value / self.total * 100.0 + 0.5).floor() as i64
            };
            writeln!(f, "  {:<10} {:>10.2} kg ({}% of total)", category, value, share)?;
        }
        writeln!(f)?;

        writeln!(f, "Recommendations:")?;
        for rec in &self.recommendations {
            writeln!(f, "  {} {} [{}]", rec.icon, rec.title, rec.category)?;
            writeln!(f, "      {}", rec.description)?;
            writeln!(f, "      Impact: {} | Potential savings: {}", rec.impact, rec.savings)?;
        }

        Ok(())
    }
}
