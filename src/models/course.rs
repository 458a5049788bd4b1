use crate::models::{DayPlan, Plan};
use serde::{Deserialize, Serialize};
use time::Date;

/// One stop of a persisted itinerary (`/v1/travel/{id}/course`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TravelCourse {
    pub name: String,
    pub address: String,
    pub description: String,
    pub course_date: Date,
    pub move_time: u32,
}

/// `POST /v1/travel` body
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateTravelRequest {
    pub area: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub start_date: Date,
    pub end_date: Date,
}

impl CreateTravelRequest {
    pub fn from_plan(plan: &Plan) -> Self {
        CreateTravelRequest {
            area: plan.region.clone(),
            title: String::new(),
            thumbnail: None,
            start_date: plan.start_date,
            end_date: plan.end_date,
        }
    }
}

/// `PUT /v1/travel/{id}` body: metadata plus the full course list
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTravelRequest {
    pub area: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub start_date: Date,
    pub end_date: Date,
    pub courses: Vec<TravelCourse>,
}

/// Flatten day plans into course records: only days with places, ascending by
/// date, stops in itinerary order.
pub fn build_courses(days: &[DayPlan]) -> Vec<TravelCourse> {
    let mut ordered: Vec<&DayPlan> = days.iter().filter(|d| !d.places.is_empty()).collect();
    ordered.sort_by_key(|d| d.date);

    ordered
        .into_iter()
        .flat_map(|day| {
            day.places.iter().map(move |place| TravelCourse {
                name: place.name.clone(),
                address: strip_country_prefix(&place.address),
                description: place.description.clone(),
                course_date: day.date,
                move_time: place.travel_duration,
            })
        })
        .collect()
}

const COUNTRY_PREFIX: &str = "대한민국";

/// Provider addresses start with the country ("대한민국 부산광역시 ..."); the
/// backend stores them without it. Addresses loaded back from the backend
/// are already stripped and pass through unchanged.
fn strip_country_prefix(address: &str) -> String {
    let trimmed = address.trim();
    match trimmed.strip_prefix(COUNTRY_PREFIX) {
        Some(rest) if rest.is_empty() || rest.starts_with(' ') => rest.trim_start().to_string(),
        _ => trimmed.to_string(),
    }
}

/// "45분", "2시간", "1시간 5분"
pub fn format_travel_minutes(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{}분", minutes);
    }
    let hours = minutes / 60;
    let remaining = minutes % 60;
    if remaining > 0 {
        format!("{}시간 {}분", hours, remaining)
    } else {
        format!("{}시간", hours)
    }
}
