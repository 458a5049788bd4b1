use crate::models::{Coordinates, PlaceItem};
use serde::{Deserialize, Serialize};
use time::Date;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub region: String,
    pub start_date: Date,
    pub end_date: Date,
}

impl Plan {
    pub fn new(region: impl Into<String>, start_date: Date, end_date: Date) -> Result<Self, String> {
        let plan = Plan {
            region: region.into(),
            start_date,
            end_date,
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.region.trim().is_empty() {
            return Err("region must not be empty".to_string());
        }
        if self.start_date > self.end_date {
            return Err(format!(
                "startDate {} is after endDate {}",
                self.start_date, self.end_date
            ));
        }
        Ok(())
    }

    /// Every calendar day from start to end, inclusive
    pub fn date_range(&self) -> Vec<Date> {
        let mut dates = Vec::new();
        let mut current = self.start_date;
        while current <= self.end_date {
            dates.push(current);
            match current.next_day() {
                Some(next) => current = next,
                None => break,
            }
        }
        dates
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayPlan {
    pub date: Date,
    pub places: Vec<PlaceItem>,
}

/// How the planner session was opened.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SessionMode {
    /// New trip; finishing means registering it
    #[default]
    Create,
    /// Editing a saved trip; finishing means saving it back
    Edit {
        #[serde(rename = "travelId")]
        travel_id: i64,
    },
    /// Read-only look at a saved trip
    View {
        #[serde(rename = "travelId")]
        travel_id: i64,
    },
}

impl SessionMode {
    pub fn is_read_only(&self) -> bool {
        matches!(self, SessionMode::View { .. })
    }

    pub fn travel_id(&self) -> Option<i64> {
        match self {
            SessionMode::Create => None,
            SessionMode::Edit { travel_id } | SessionMode::View { travel_id } => Some(*travel_id),
        }
    }
}

/// A stop of a saved trip as the backend returns it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExistingPlace {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub move_time: Option<u32>,
    #[serde(default)]
    pub location: Option<Coordinates>,
    #[serde(default)]
    pub place_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExistingDay {
    pub date: Date,
    #[serde(default)]
    pub places: Vec<ExistingPlace>,
}

/// Everything the itinerary builder is handed when a session starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    #[serde(flatten)]
    pub mode: SessionMode,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub plan: Option<Plan>,
    #[serde(default)]
    pub days: Vec<ExistingDay>,
}
