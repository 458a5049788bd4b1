use crate::constants::{NEW_PLACE_HIGHLIGHT_MS, REGISTER_ITINERARY_FAILED, SAVE_ITINERARY_FAILED};
use crate::error::{AppError, Result};
use crate::models::course::{build_courses, CreateTravelRequest, UpdateTravelRequest};
use crate::models::{
    format_travel_minutes, Coordinates, DayPlan, EstimateQuality, PlaceId, PlaceItem, Plan, SelectedPlace,
    SessionContext, SessionMode, TransportMode, TravelCourse,
};
use crate::services::backend::BackendApi;
use crate::services::travel_time::{TravelEstimate, TravelTimeEstimator};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use time::Date;
use tokio::time::Instant;

fn apply_estimate(item: &mut PlaceItem, estimate: TravelEstimate) {
    if estimate.is_unavailable() {
        tracing::warn!(place = %item.name, "No travel time for this leg");
    }
    item.travel_duration = estimate.duration;
    item.travel_duration_text = estimate.duration_text;
    item.travel_estimate = estimate.quality;
}

/// Single source of truth for the plan, the per-day stops and the transport
/// mode of one planning session.
///
/// Every mutation that needs a travel estimate computes it first and commits
/// the list change together with the estimate, so no snapshot ever shows a
/// stop with a missing or stale-for-its-neighbour duration.
pub struct ItineraryStore {
    estimator: Arc<TravelTimeEstimator>,
    mode: SessionMode,
    title: String,
    thumbnail: Option<String>,
    plan: Option<Plan>,
    days: BTreeMap<Date, Vec<PlaceItem>>,
    transport_mode: TransportMode,
    current_day_index: usize,
    highlight: Option<(PlaceId, Instant)>,
}

impl ItineraryStore {
    pub fn new(estimator: Arc<TravelTimeEstimator>) -> Self {
        ItineraryStore {
            estimator,
            mode: SessionMode::Create,
            title: String::new(),
            thumbnail: None,
            plan: None,
            days: BTreeMap::new(),
            transport_mode: TransportMode::default(),
            current_day_index: 0,
            highlight: None,
        }
    }

    /// Start a session from an explicit context (new trip, edit or view of a
    /// saved one). Replaces whatever the store held.
    pub fn initialize(&mut self, context: SessionContext) {
        self.reset();
        self.mode = context.mode;
        self.title = context.title;
        self.thumbnail = context.thumbnail;
        self.plan = context.plan;

        for day in context.days {
            if day.places.is_empty() {
                continue;
            }
            let entry = self.days.entry(day.date).or_default();
            for existing in day.places {
                let id = unique_id(entry);
                let travel_duration = if entry.is_empty() {
                    0
                } else {
                    existing.move_time.unwrap_or(0)
                };
                entry.push(PlaceItem {
                    id,
                    name: existing.name,
                    address: existing.address,
                    location: existing.location,
                    travel_duration,
                    travel_duration_text: if travel_duration > 0 {
                        format!("{}분", travel_duration)
                    } else {
                        String::new()
                    },
                    travel_estimate: EstimateQuality::Computed,
                    server_place_id: existing.place_id,
                    description: existing.description.unwrap_or_default(),
                });
            }
        }

        tracing::info!(
            mode = ?self.mode,
            days = self.days.len(),
            "Itinerary session initialized"
        );
    }

    /// Tear the session down to an empty Create session.
    pub fn reset(&mut self) {
        self.mode = SessionMode::Create;
        self.title.clear();
        self.thumbnail = None;
        self.plan = None;
        self.days.clear();
        self.transport_mode = TransportMode::default();
        self.current_day_index = 0;
        self.highlight = None;
    }

    /// Full replace of the plan. Stops on days outside the new range are dropped.
    pub fn set_plan(&mut self, plan: Plan) -> Result<()> {
        if self.mode.is_read_only() {
            return Err(AppError::Conflict("Session is read-only".to_string()));
        }
        plan.validate().map_err(AppError::InvalidRequest)?;

        let before = self.days.len();
        self.days.retain(|date, _| plan.contains(*date));
        if self.days.len() != before {
            tracing::info!(
                dropped = before - self.days.len(),
                "Dropped days outside the new plan range"
            );
        }

        tracing::info!(
            region = %plan.region,
            start = %plan.start_date,
            end = %plan.end_date,
            "Plan set"
        );
        self.plan = Some(plan);
        let last = self.date_range().len().saturating_sub(1);
        self.current_day_index = self.current_day_index.min(last);
        Ok(())
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn session_mode(&self) -> SessionMode {
        self.mode
    }

    pub fn transport_mode(&self) -> TransportMode {
        self.transport_mode
    }

    pub fn date_range(&self) -> Vec<Date> {
        self.plan.as_ref().map(Plan::date_range).unwrap_or_default()
    }

    pub fn current_date(&self) -> Option<Date> {
        self.date_range().get(self.current_day_index).copied()
    }

    /// Move the displayed day, clamped to the plan's day axis
    pub fn set_current_day(&mut self, index: usize) -> Option<Date> {
        let range = self.date_range();
        if range.is_empty() {
            return None;
        }
        self.current_day_index = index.min(range.len() - 1);
        range.get(self.current_day_index).copied()
    }

    pub fn places(&self, date: Date) -> &[PlaceItem] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn day_plans(&self) -> Vec<DayPlan> {
        self.days
            .iter()
            .map(|(date, places)| DayPlan {
                date: *date,
                places: places.clone(),
            })
            .collect()
    }

    /// Append a resolved place to `current_date`.
    ///
    /// Silently does nothing when there is no current date, the place has no
    /// coordinate, the date is outside the plan or the session is read-only.
    pub async fn add_place(
        &mut self,
        current_date: Option<Date>,
        place: &SelectedPlace,
    ) -> Option<PlaceId> {
        let (date, location) = match (current_date, place.location) {
            (Some(date), Some(location)) => (date, location),
            _ => return None,
        };
        if self.mode.is_read_only() {
            tracing::debug!("Ignoring add in a read-only session");
            return None;
        }
        match &self.plan {
            Some(plan) if plan.contains(date) => {}
            _ => {
                tracing::debug!(%date, "Ignoring add outside the plan");
                return None;
            }
        }

        let existing = self.places(date);
        let id = unique_id(existing);
        let mut item = PlaceItem {
            id: id.clone(),
            name: place.name.clone(),
            address: place.address.clone(),
            location: Some(location),
            travel_duration: 0,
            travel_duration_text: String::new(),
            travel_estimate: EstimateQuality::Computed,
            server_place_id: place.place_id,
            description: String::new(),
        };

        if let Some(last) = existing.last() {
            let estimate = self
                .estimator
                .estimate(last.location.as_ref(), item.location.as_ref(), self.transport_mode)
                .await;
            if let Some(estimate) = estimate {
                apply_estimate(&mut item, estimate);
            }
        }

        tracing::info!(
            %date,
            place = %item.name,
            travel_minutes = item.travel_duration,
            "Place added"
        );
        self.days.entry(date).or_default().push(item);
        self.highlight = Some((id.clone(), Instant::now()));
        Some(id)
    }

    pub async fn add_place_to_current_day(&mut self, place: &SelectedPlace) -> Option<PlaceId> {
        let date = self.current_date();
        self.add_place(date, place).await
    }

    /// Remove one stop and repair only the leg that crossed the gap.
    /// Returns false when the day or the id is unknown.
    pub async fn delete_place(&mut self, date: Date, place_id: &PlaceId) -> bool {
        if self.mode.is_read_only() {
            tracing::debug!("Ignoring delete in a read-only session");
            return false;
        }
        let Some(current) = self.days.get(&date) else {
            return false;
        };
        let Some(index) = current.iter().position(|p| &p.id == place_id) else {
            return false;
        };

        let mut places = current.clone();
        let removed = places.remove(index);

        if places.len() <= 1 {
            places.iter_mut().for_each(PlaceItem::clear_travel_time);
        } else if index == 0 {
            places[0].clear_travel_time();
        } else if index < places.len() {
            let estimate = self
                .estimator
                .estimate(
                    places[index - 1].location.as_ref(),
                    places[index].location.as_ref(),
                    self.transport_mode,
                )
                .await;
            if let Some(estimate) = estimate {
                apply_estimate(&mut places[index], estimate);
            }
        }

        tracing::info!(%date, place = %removed.name, remaining = places.len(), "Place deleted");
        if places.is_empty() {
            self.days.remove(&date);
        } else {
            self.days.insert(date, places);
        }
        true
    }

    /// Remove every stop of one day. Returns how many were removed.
    pub fn reset_day(&mut self, date: Date) -> usize {
        if self.mode.is_read_only() {
            return 0;
        }
        let removed = self.days.remove(&date).map(|p| p.len()).unwrap_or(0);
        if removed > 0 {
            tracing::info!(%date, removed, "Day reset");
        }
        removed
    }

    /// Recompute every leg under the current transport mode.
    pub async fn recalculate_all_travel_times(&mut self) {
        let mode = self.transport_mode;
        let mut days = self.days.clone();
        self.recompute(&mut days, mode).await;
        self.days = days;
    }

    /// Recompute every leg under `mode`, then commit the legs and the mode
    /// together.
    pub async fn set_transport_mode(&mut self, mode: TransportMode) {
        let mut days = self.days.clone();
        self.recompute(&mut days, mode).await;
        self.days = days;
        self.transport_mode = mode;
        tracing::info!(%mode, "Transport mode changed");
    }

    /// Day by day, stop by stop; each estimate is awaited before the next
    /// one starts.
    async fn recompute(&self, days: &mut BTreeMap<Date, Vec<PlaceItem>>, mode: TransportMode) {
        tracing::debug!(%mode, days = days.len(), "Recalculating travel times");
        for places in days.values_mut() {
            if let Some(first) = places.first_mut() {
                first.clear_travel_time();
            }
            for i in 1..places.len() {
                let estimate = self
                    .estimator
                    .estimate(
                        places[i - 1].location.as_ref(),
                        places[i].location.as_ref(),
                        mode,
                    )
                    .await;
                if let Some(estimate) = estimate {
                    apply_estimate(&mut places[i], estimate);
                }
            }
        }
    }

    /// The freshly added stop, while its entrance marker is still live
    pub fn highlighted_place(&self, now: Instant) -> Option<&PlaceId> {
        match &self.highlight {
            Some((id, added_at))
                if now.saturating_duration_since(*added_at)
                    < Duration::from_millis(NEW_PLACE_HIGHLIGHT_MS) =>
            {
                Some(id)
            }
            _ => None,
        }
    }

    pub fn courses(&self) -> Vec<TravelCourse> {
        build_courses(&self.day_plans())
    }

    /// Register a new trip: create the travel shell, then its course list.
    /// The session ends on success.
    pub async fn register_itinerary(&mut self, backend: &dyn BackendApi) -> Result<i64> {
        if self.mode != SessionMode::Create {
            return Err(AppError::Conflict(
                "Only a new trip can be registered".to_string(),
            ));
        }
        let plan = self
            .plan
            .clone()
            .ok_or_else(|| AppError::InvalidRequest("No travel plan has been set".to_string()))?;
        let courses = self.courses();

        let travel_id = backend
            .create_travel(&CreateTravelRequest::from_plan(&plan))
            .await
            .map_err(|e| AppError::user_facing(REGISTER_ITINERARY_FAILED, e))?;
        backend
            .register_courses(travel_id, &courses)
            .await
            .map_err(|e| AppError::user_facing(REGISTER_ITINERARY_FAILED, e))?;

        tracing::info!(travel_id, courses = courses.len(), "Itinerary registered");
        self.reset();
        Ok(travel_id)
    }

    /// Write the edited trip back and end the session.
    pub async fn save_and_exit(&mut self, backend: &dyn BackendApi) -> Result<i64> {
        let SessionMode::Edit { travel_id } = self.mode else {
            return Err(AppError::Conflict(
                "Only a trip opened for editing can be saved".to_string(),
            ));
        };
        let plan = self
            .plan
            .clone()
            .ok_or_else(|| AppError::InvalidRequest("No travel plan has been set".to_string()))?;

        let request = UpdateTravelRequest {
            area: plan.region,
            title: self.title.clone(),
            thumbnail: self.thumbnail.clone(),
            start_date: plan.start_date,
            end_date: plan.end_date,
            courses: self.courses(),
        };
        backend
            .update_travel(travel_id, &request)
            .await
            .map_err(|e| AppError::user_facing(SAVE_ITINERARY_FAILED, e))?;

        tracing::info!(travel_id, courses = request.courses.len(), "Itinerary saved");
        self.reset();
        Ok(travel_id)
    }

    /// Derived view state for rendering; recomputed on every call.
    pub fn view(&self, now: Instant) -> ItineraryView {
        ItineraryView::derive(self, now)
    }
}

/// A fresh id that no stop of `places` already carries.
fn unique_id(places: &[PlaceItem]) -> PlaceId {
    loop {
        let id = PlaceId::generate();
        if places.iter().all(|p| p.id != id) {
            return id;
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryMarker {
    /// 1-based position in the day
    pub order: usize,
    #[serde(flatten)]
    pub place: PlaceItem,
    pub is_new: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryView {
    pub session: SessionMode,
    pub title: String,
    pub plan: Option<Plan>,
    pub date_range: Vec<Date>,
    pub current_day_index: usize,
    pub current_date: Option<Date>,
    pub transport_mode: TransportMode,
    pub markers: Vec<ItineraryMarker>,
    pub path: Vec<Coordinates>,
    pub total_travel_minutes: u32,
    pub total_travel_text: String,
    /// Some leg of the day has no estimate; the total leaves it out
    pub total_travel_incomplete: bool,
    pub days: Vec<DayPlan>,
}

impl ItineraryView {
    pub fn derive(store: &ItineraryStore, now: Instant) -> Self {
        let current_date = store.current_date();
        let places = current_date.map(|d| store.places(d)).unwrap_or(&[]);
        let highlighted = store.highlighted_place(now);

        let markers = places
            .iter()
            .enumerate()
            .map(|(i, place)| ItineraryMarker {
                order: i + 1,
                place: place.clone(),
                is_new: highlighted == Some(&place.id),
            })
            .collect();

        let path = places.iter().filter_map(|p| p.location).collect();

        let total_travel_minutes = if places.len() <= 1 {
            0
        } else {
            places.iter().map(|p| p.travel_duration).sum()
        };
        let total_travel_incomplete =
            places.len() > 1 && places.iter().any(PlaceItem::travel_time_unavailable);

        ItineraryView {
            session: store.mode,
            title: store.title.clone(),
            plan: store.plan.clone(),
            date_range: store.date_range(),
            current_day_index: store.current_day_index,
            current_date,
            transport_mode: store.transport_mode,
            markers,
            path,
            total_travel_minutes,
            total_travel_text: format_travel_minutes(total_travel_minutes),
            total_travel_incomplete,
            days: store.day_plans(),
        }
    }
}
