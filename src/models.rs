//! Data models for footprint inputs and results

use serde::{Deserialize, Serialize};

/// One of the five emission domains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Transport,
    Energy,
    Food,
    Waste,
    Lifestyle,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Transport,
        Category::Energy,
        Category::Food,
        Category::Waste,
        Category::Lifestyle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Transport => "transport",
            Category::Energy => "energy",
            Category::Food => "food",
            Category::Waste => "waste",
            Category::Lifestyle => "lifestyle",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Closed enumeration parsed from the raw form values. Unknown values yield `None`,
/// which the calculator treats exactly like an unset field.
macro_rules! raw_enum {
    ($name:ident { $($variant:ident => $raw:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $raw)] $variant),+
        }

        impl $name {
            pub fn from_value(value: &str) -> Option<Self> {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($raw => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $raw),+
                }
            }
        }
    };
}

raw_enum!(CarType {
    Small => "small",
    Average => "average",
    Large => "large",
    Suv => "suv",
    Electric => "electric",
    Hybrid => "hybrid",
});

raw_enum!(HomeSize {
    Small => "small",
    Medium => "medium",
    Large => "large",
    VeryLarge => "very-large",
});

raw_enum!(RenewableEnergy {
    Yes => "yes",
    Partial => "some",
    No => "no",
});

raw_enum!(DietType {
    HighMeat => "high-meat",
    MediumMeat => "medium-meat",
    LowMeat => "low-meat",
    Vegetarian => "vegetarian",
    Vegan => "vegan",
});

raw_enum!(Frequency {
    Often => "often",
    Sometimes => "sometimes",
    Rarely => "rarely",
});

raw_enum!(FoodWaste {
    Low => "low",
    Medium => "medium",
    High => "high",
});

raw_enum!(Recycling {
    Always => "always",
    Sometimes => "sometimes",
    Rarely => "rarely",
});

raw_enum!(Shopping {
    Minimal => "minimal",
    Moderate => "moderate",
    Frequent => "frequent",
    Excessive => "excessive",
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportInputs {
    pub car_miles: Option<f64>, // per week
    pub car_type: Option<CarType>,
    pub flight_miles: Option<f64>, // per year
    pub public_transport_hours: Option<f64>, // per week
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyInputs {
    pub electricity_bill: Option<f64>, // monthly, dollars
    pub gas_bill: Option<f64>,         // monthly, dollars
    pub home_size: Option<HomeSize>,
    pub renewable_energy: Option<RenewableEnergy>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodInputs {
    pub diet_type: Option<DietType>,
    pub local_food: Option<Frequency>,
    pub food_waste: Option<FoodWaste>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteInputs {
    pub recycling: Option<Recycling>,
    pub composting: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifestyleInputs {
    pub shopping: Option<Shopping>,
    pub second_hand: Option<Frequency>,
}

/// Raw answers for all five categories. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FootprintInputs {
    pub transport: TransportInputs,
    pub energy: EnergyInputs,
    pub food: FoodInputs,
    pub waste: WasteInputs,
    pub lifestyle: LifestyleInputs,
}

/// Yearly kg CO2 per category, each rounded to 2 decimals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionBreakdown {
    pub transport: f64,
    pub energy: f64,
    pub food: f64,
    pub waste: f64,
    pub lifestyle: f64,
}

impl EmissionBreakdown {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Transport => self.transport,
            Category::Energy => self.energy,
            Category::Food => self.food,
            Category::Waste => self.waste,
            Category::Lifestyle => self.lifestyle,
        }
    }

    pub fn entries(&self) -> [(Category, f64); 5] {
        Category::ALL.map(|c| (c, self.get(c)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonBand {
    Excellent,
    Good,
    BelowUsAverage,
    AboveAverage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub band: ComparisonBand,
    pub text: &'static str,
    pub global_average: f64,
    pub us_average: f64,
    pub percentage: i64, // of the global average
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Impact {
    High,
    Medium,
    #[serde(rename = "Long-term")]
    LongTerm,
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Impact::High => "High",
            Impact::Medium => "Medium",
            Impact::LongTerm => "Long-term",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub category: &'static str,
    pub icon: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub impact: Impact,
    pub savings: &'static str,
}

/// Result of a footprint calculation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FootprintResult {
    pub total: f64,
    pub breakdown: EmissionBreakdown,
    pub comparison: ComparisonResult,
    pub recommendations: Vec<Recommendation>,
}

/// An eco-points account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub name: String,
    pub points: i64,
    pub level: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointsAward {
    pub awarded: i64,
    pub points: i64,
    pub level: i64,
    pub leveled_up: bool,
}

/// A calculation stored in the history table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedCalculation {
    pub id: i64,
    pub user_name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub total: f64,
    pub breakdown: EmissionBreakdown,
    pub percentage: i64,
    pub comparison: String,
    pub inputs: FootprintInputs,
}
