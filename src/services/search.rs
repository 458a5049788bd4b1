use crate::config::ReconcilerConfig;
use crate::constants::{REGISTER_PLACE_FAILED, SEARCH_RESULT_ZOOM};
use crate::error::{AppError, Result};
use crate::models::place::RegisterPlaceRequest;
use crate::models::{Coordinates, MapPin, SearchCandidate, SelectedPlace};
use crate::services::backend::BackendApi;
use crate::services::google_maps::GeocodeResult;
use serde::Serialize;

/// What the map should do after a search resolved to a coordinate.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MapCommand {
    PanTo { center: Coordinates, zoom: u8 },
}

/// Handle for one in-flight geocoder call. Only the newest ticket may
/// complete; older ones are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeocodeTicket(u64);

/// Version of the selection an async completion was started against.
/// Every change to the selection moves the version on, so a completion
/// holding an older ticket must not touch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionTicket(u64);

/// What registering the current selection requires.
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    /// The selection is already a backend place
    Registered(i64),
    /// Post `request`, then attach the id with `ticket`
    Required {
        ticket: SelectionTicket,
        request: RegisterPlaceRequest,
    },
}

/// Next step after a search action was submitted.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchStep {
    /// The coordinate is known; pan and wait for the next viewport settle
    Pan(MapCommand),
    /// No geometry yet; geocode `query` and hand the result back with the ticket
    Geocode { ticket: GeocodeTicket, query: String },
    /// Nothing to do (empty query)
    Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    Idle,
    GeocodePending {
        ticket: GeocodeTicket,
        name: String,
        photos: Vec<String>,
    },
    AwaitingViewportPins {
        pending: SelectedPlace,
        /// Settles that began at or before this generation cannot consume it
        armed_at: u64,
    },
}

/// Outcome of matching a pending search result against a pin set.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// An existing pin is the searched place; its detail should be shown
    Matched(MapPin),
    /// Nothing matched, or the pin fetch failed
    Unmatched(SelectedPlace),
}

/// Find the registered pin that `target` refers to.
///
/// Exact match first (both axes within the tolerance), then the nearest pin
/// by great-circle distance if it lies within the radius.
pub fn match_pin<'a>(
    target: &Coordinates,
    pins: &'a [MapPin],
    config: &ReconcilerConfig,
) -> Option<&'a MapPin> {
    if let Some(exact) = pins
        .iter()
        .find(|pin| target.matches_within(&pin.coordinates(), config.exact_match_tolerance_deg))
    {
        return Some(exact);
    }

    pins.iter()
        .map(|pin| (pin, target.distance_meters_to(&pin.coordinates())))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .filter(|(_, meters)| *meters <= config.nearest_match_radius_m)
        .map(|(pin, _)| pin)
}

/// Turns autocomplete picks and free-text searches into a selected place,
/// deferring the pin/unregistered decision until the viewport has been
/// refreshed around the result.
pub struct PlaceSearchReconciler {
    config: ReconcilerConfig,
    state: SearchState,
    selection: Option<SelectedPlace>,
    selection_version: u64,
    next_ticket: u64,
}

impl PlaceSearchReconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        PlaceSearchReconciler {
            config,
            state: SearchState::Idle,
            selection: None,
            selection_version: 0,
            next_ticket: 0,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn selection(&self) -> Option<&SelectedPlace> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, selection: Option<SelectedPlace>) {
        self.selection = selection;
        self.selection_version += 1;
    }

    /// Invalidate every in-flight completion and hand out the ticket for the
    /// one about to start.
    pub fn supersede_selection(&mut self) -> SelectionTicket {
        self.selection_version += 1;
        SelectionTicket(self.selection_version)
    }

    pub fn is_current(&self, ticket: SelectionTicket) -> bool {
        ticket.0 == self.selection_version
    }

    /// Replace the selection on behalf of the completion holding `ticket`.
    /// Returns false, leaving the selection alone, if the ticket is stale.
    pub fn complete_selection(&mut self, ticket: SelectionTicket, selection: Option<SelectedPlace>) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(ticket = ticket.0, latest = self.selection_version, "Dropping stale selection update");
            return false;
        }
        self.set_selection(selection);
        true
    }

    /// Forget the pending search and the selection. Tickets keep counting so
    /// completions from before the reset stay stale.
    pub fn reset(&mut self) {
        self.state = SearchState::Idle;
        self.set_selection(None);
    }

    /// The settle generation the pending search was armed at, if one is waiting
    pub fn armed_generation(&self) -> Option<u64> {
        match &self.state {
            SearchState::AwaitingViewportPins { armed_at, .. } => Some(*armed_at),
            _ => None,
        }
    }

    /// An autocomplete suggestion was picked. `settle_generation` is the
    /// newest viewport settle that has begun so far.
    pub fn select_candidate(
        &mut self,
        candidate: SearchCandidate,
        settle_generation: u64,
    ) -> SearchStep {
        match candidate.location {
            Some(location) => {
                self.supersede_selection();
                let place = SelectedPlace {
                    name: candidate.name,
                    address: candidate.address,
                    location: Some(location),
                    photos: candidate.photos,
                    ..Default::default()
                };
                SearchStep::Pan(self.resolve(place, location, settle_generation))
            }
            None => self.start_geocode(candidate.name, candidate.photos),
        }
    }

    /// Free-text search with no autocomplete geometry
    pub fn begin_text_search(&mut self, query: &str) -> SearchStep {
        self.start_geocode(query.to_string(), Vec::new())
    }

    fn start_geocode(&mut self, query: String, photos: Vec<String>) -> SearchStep {
        let query = query.trim().to_string();
        if query.is_empty() {
            return SearchStep::Ignored;
        }
        self.supersede_selection();
        self.next_ticket += 1;
        let ticket = GeocodeTicket(self.next_ticket);
        tracing::debug!(%query, ticket = ticket.0, "Geocoding search text");
        self.state = SearchState::GeocodePending {
            ticket,
            name: query.clone(),
            photos,
        };
        SearchStep::Geocode { ticket, query }
    }

    /// Feed the geocoder's answer back. Stale tickets are dropped; an error
    /// or an empty answer ends the search idle.
    pub fn complete_text_search(
        &mut self,
        ticket: GeocodeTicket,
        result: Result<Option<GeocodeResult>>,
        settle_generation: u64,
    ) -> Option<MapCommand> {
        let (name, photos) = match &self.state {
            SearchState::GeocodePending {
                ticket: current,
                name,
                photos,
            } if *current == ticket => (name.clone(), photos.clone()),
            _ => {
                tracing::debug!(ticket = ticket.0, "Dropping stale geocoder response");
                return None;
            }
        };

        match result {
            Ok(Some(found)) => {
                let location = found.location;
                let place = SelectedPlace {
                    name,
                    address: found.formatted_address,
                    location: Some(found.location),
                    photos,
                    ..Default::default()
                };
                Some(self.resolve(place, location, settle_generation))
            }
            Ok(None) => {
                tracing::info!(query = %name, "Geocoder found nothing");
                self.state = SearchState::Idle;
                None
            }
            Err(e) => {
                tracing::warn!(query = %name, "Geocoding failed: {}", e);
                self.state = SearchState::Idle;
                None
            }
        }
    }

    fn resolve(
        &mut self,
        place: SelectedPlace,
        center: Coordinates,
        settle_generation: u64,
    ) -> MapCommand {
        tracing::debug!(name = %place.name, armed_at = settle_generation, "Search resolved, awaiting pins");
        self.state = SearchState::AwaitingViewportPins {
            pending: place,
            armed_at: settle_generation,
        };
        MapCommand::PanTo {
            center,
            zoom: SEARCH_RESULT_ZOOM,
        }
    }

    /// Hand over the pending result if the settle with `settle_generation`
    /// is allowed to consume it. Clears the pending state when it does.
    pub fn take_pending(&mut self, settle_generation: u64) -> Option<SelectedPlace> {
        match &self.state {
            SearchState::AwaitingViewportPins { armed_at, .. } if settle_generation > *armed_at => {}
            _ => return None,
        }
        match std::mem::replace(&mut self.state, SearchState::Idle) {
            SearchState::AwaitingViewportPins { pending, .. } => Some(pending),
            _ => None,
        }
    }

    /// Decide between an existing pin and a plain marker. `pins` is `None`
    /// when the fetch failed.
    pub fn reconcile(&self, pending: SelectedPlace, pins: Option<&[MapPin]>) -> Reconciliation {
        let matched = match (pending.location.as_ref(), pins) {
            (Some(target), Some(pins)) => match_pin(target, pins, &self.config),
            _ => None,
        };
        match matched {
            Some(pin) => {
                tracing::debug!(place_id = pin.place_id, "Search result matches a registered pin");
                Reconciliation::Matched(pin.clone())
            }
            None => Reconciliation::Unmatched(pending),
        }
    }

    /// Work out whether the current selection still needs registering.
    pub fn registration(&self) -> Result<Registration> {
        let selection = self
            .selection
            .as_ref()
            .ok_or_else(|| AppError::InvalidRequest("No place is selected".to_string()))?;
        if let Some(place_id) = selection.place_id {
            return Ok(Registration::Registered(place_id));
        }
        let location = selection
            .location
            .ok_or_else(|| AppError::InvalidRequest("Selected place has no location".to_string()))?;

        Ok(Registration::Required {
            ticket: SelectionTicket(self.selection_version),
            request: RegisterPlaceRequest {
                name: selection.name.clone(),
                address: selection.address.clone(),
                latitude: location.lat,
                longitude: location.lng,
                img_urls: selection.photos.clone(),
            },
        })
    }

    /// Attach a freshly registered id to the selection it was requested for.
    /// Returns false if the selection changed while the request was out.
    pub fn attach_place_id(&mut self, ticket: SelectionTicket, place_id: i64) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(place_id, "Selection changed during registration, id not attached");
            return false;
        }
        match self.selection.as_mut() {
            Some(selection) => {
                tracing::info!(place_id, name = %selection.name, "Place registered");
                selection.place_id = Some(place_id);
                true
            }
            None => false,
        }
    }

    /// Register the current selection as a backend place and attach the id.
    /// Already registered selections return their id unchanged.
    pub async fn register_selection(&mut self, backend: &dyn BackendApi) -> Result<i64> {
        let (ticket, request) = match self.registration()? {
            Registration::Registered(place_id) => return Ok(place_id),
            Registration::Required { ticket, request } => (ticket, request),
        };
        let place_id = backend
            .register_place(&request)
            .await
            .map_err(|e| AppError::user_facing(REGISTER_PLACE_FAILED, e))?;
        self.attach_place_id(ticket, place_id);
        Ok(place_id)
    }
}
