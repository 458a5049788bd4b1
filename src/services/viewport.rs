use crate::config::ReconcilerConfig;
use crate::constants::DEFAULT_MAP_CENTER;
use crate::error::Result;
use crate::models::{Coordinates, MapPin, PlaceDetail, SearchCandidate, SelectedPlace, ViewportBounds};
use crate::services::backend::BackendApi;
use crate::services::google_maps::{GeocodeResult, Geocoder};
use crate::services::search::{
    GeocodeTicket, MapCommand, PlaceSearchReconciler, Reconciliation, SearchStep, SelectionTicket,
};

/// Handle for one viewport settle whose pin fetch is in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettleTicket {
    generation: u64,
    bounds: ViewportBounds,
}

impl SettleTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn bounds(&self) -> &ViewportBounds {
        &self.bounds
    }
}

/// A pending search matched a pin; its detail still has to be fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct PinMatch {
    pub pin: MapPin,
    /// Shown as a plain marker if the detail fetch fails
    pub fallback: SelectedPlace,
    pub ticket: SelectionTicket,
}

/// Result of looking up a clicked pin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PinClick {
    /// The pin is already the selection
    AlreadySelected,
    /// Fetch this place's detail
    Fetch { place_id: i64, ticket: SelectionTicket },
}

/// Holds the pin cache for the visible map area and drives search
/// reconciliation off viewport settles.
///
/// Settles are split into `begin_settle` / `complete_settle` so the pin fetch
/// can run without holding the session; `on_viewport_settle` chains them for
/// callers that own the controller exclusively.
pub struct MapViewportController {
    pins: Vec<MapPin>,
    bounds: Option<ViewportBounds>,
    /// Bumped on every settle; only the newest settle may apply its pins
    generation: u64,
    reconciler: PlaceSearchReconciler,
}

impl MapViewportController {
    pub fn new(config: ReconcilerConfig) -> Self {
        MapViewportController {
            pins: Vec::new(),
            bounds: None,
            generation: 0,
            reconciler: PlaceSearchReconciler::new(config),
        }
    }

    pub fn pins(&self) -> &[MapPin] {
        &self.pins
    }

    pub fn bounds(&self) -> Option<&ViewportBounds> {
        self.bounds.as_ref()
    }

    pub fn center(&self) -> Coordinates {
        self.bounds.map(|b| b.center()).unwrap_or(Coordinates {
            lat: DEFAULT_MAP_CENTER.0,
            lng: DEFAULT_MAP_CENTER.1,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn reconciler(&self) -> &PlaceSearchReconciler {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut PlaceSearchReconciler {
        &mut self.reconciler
    }

    pub fn selection(&self) -> Option<&SelectedPlace> {
        self.reconciler.selection()
    }

    /// Drop pins, bounds, pending searches and the selection
    pub fn reset(&mut self) {
        self.pins.clear();
        self.bounds = None;
        self.reconciler.reset();
    }

    pub fn begin_settle(&mut self, bounds: ViewportBounds) -> SettleTicket {
        self.generation += 1;
        self.bounds = Some(bounds);
        tracing::debug!(
            generation = self.generation,
            min_lat = bounds.min_lat,
            max_lat = bounds.max_lat,
            min_lng = bounds.min_lng,
            max_lng = bounds.max_lng,
            "Viewport settled"
        );
        SettleTicket {
            generation: self.generation,
            bounds,
        }
    }

    /// Apply a finished pin fetch.
    ///
    /// A settle that has been overtaken by a newer one is dropped. Otherwise
    /// the cache is replaced (cleared on failure) and, if a search was armed
    /// before this settle began, it is reconciled against the new pins.
    pub fn complete_settle(
        &mut self,
        ticket: SettleTicket,
        fetched: Result<Vec<MapPin>>,
    ) -> Option<PinMatch> {
        if ticket.generation != self.generation {
            tracing::debug!(
                generation = ticket.generation,
                latest = self.generation,
                "Dropping pins of a superseded viewport"
            );
            return None;
        }

        let fetch_ok = match fetched {
            Ok(pins) => {
                tracing::debug!(count = pins.len(), "Pins loaded");
                self.pins = pins;
                true
            }
            Err(e) => {
                tracing::warn!("Failed to load pins: {}", e);
                self.pins.clear();
                false
            }
        };

        let pending = self.reconciler.take_pending(ticket.generation)?;
        let pins = fetch_ok.then_some(self.pins.as_slice());
        match self.reconciler.reconcile(pending.clone(), pins) {
            Reconciliation::Matched(pin) => Some(PinMatch {
                pin,
                fallback: pending,
                ticket: self.reconciler.supersede_selection(),
            }),
            Reconciliation::Unmatched(place) => {
                tracing::debug!(name = %place.name, "Showing search result as unregistered place");
                self.reconciler.set_selection(Some(place));
                None
            }
        }
    }

    /// Show the matched pin's detail, or the plain search result if the
    /// detail could not be loaded. Dropped if the selection moved on while
    /// the detail was loading.
    pub fn complete_pin_match(&mut self, matched: PinMatch, detail: Result<PlaceDetail>) {
        if !self.reconciler.is_current(matched.ticket) {
            tracing::debug!(place_id = matched.pin.place_id, "Dropping detail of a superseded search");
            return;
        }
        let selection = match detail {
            Ok(detail) => SelectedPlace::from_detail(detail, matched.pin.coordinates()),
            Err(e) => {
                tracing::warn!(place_id = matched.pin.place_id, "Failed to load place detail: {}", e);
                matched.fallback
            }
        };
        self.reconciler.complete_selection(matched.ticket, Some(selection));
    }

    /// Settle, fetch and reconcile in one go.
    pub async fn on_viewport_settle(&mut self, bounds: ViewportBounds, backend: &dyn BackendApi) {
        let ticket = self.begin_settle(bounds);
        let fetched = backend.fetch_pins(ticket.bounds()).await;
        if let Some(matched) = self.complete_settle(ticket, fetched) {
            let detail = backend.fetch_place(matched.pin.place_id).await;
            self.complete_pin_match(matched, detail);
        }
    }

    pub fn select_candidate(&mut self, candidate: SearchCandidate) -> SearchStep {
        self.reconciler.select_candidate(candidate, self.generation)
    }

    pub fn begin_text_search(&mut self, query: &str) -> SearchStep {
        self.reconciler.begin_text_search(query)
    }

    pub fn complete_text_search(
        &mut self,
        ticket: GeocodeTicket,
        result: Result<Option<GeocodeResult>>,
    ) -> Option<MapCommand> {
        self.reconciler
            .complete_text_search(ticket, result, self.generation)
    }

    /// Free-text search end to end; returns where to pan, if anywhere.
    pub async fn search_text(&mut self, query: &str, geocoder: &dyn Geocoder) -> Option<MapCommand> {
        match self.begin_text_search(query) {
            SearchStep::Geocode { ticket, query } => {
                let result = geocoder.geocode(&query).await;
                self.complete_text_search(ticket, result)
            }
            SearchStep::Pan(command) => Some(command),
            SearchStep::Ignored => None,
        }
    }

    /// A pin marker was clicked.
    pub fn begin_pin_click(&mut self, place_id: i64) -> PinClick {
        match self.selection() {
            Some(selected) if selected.place_id == Some(place_id) => PinClick::AlreadySelected,
            _ => PinClick::Fetch {
                place_id,
                ticket: self.reconciler.supersede_selection(),
            },
        }
    }

    /// Show the clicked pin's detail. On failure the selection is cleared.
    /// A click overtaken by a newer click or search changes nothing.
    pub fn complete_pin_click(
        &mut self,
        place_id: i64,
        ticket: SelectionTicket,
        detail: Result<PlaceDetail>,
    ) {
        if !self.reconciler.is_current(ticket) {
            tracing::debug!(place_id, "Dropping detail of a superseded pin click");
            return;
        }
        let cached = self
            .pins
            .iter()
            .find(|pin| pin.place_id == place_id)
            .map(MapPin::coordinates);

        let selection = match detail {
            Ok(detail) => {
                let location = cached.or_else(|| match (detail.latitude, detail.longitude) {
                    (Some(lat), Some(lng)) => Coordinates::new(lat, lng).ok(),
                    _ => None,
                });
                match location {
                    Some(location) => Some(SelectedPlace::from_detail(detail, location)),
                    None => {
                        tracing::warn!(place_id, "Place detail has no usable location");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(place_id, "Failed to load place detail: {}", e);
                None
            }
        };
        self.reconciler.complete_selection(ticket, selection);
    }

    pub async fn select_pin(&mut self, place_id: i64, backend: &dyn BackendApi) {
        if let PinClick::Fetch { place_id, ticket } = self.begin_pin_click(place_id) {
            let detail = backend.fetch_place(place_id).await;
            self.complete_pin_click(place_id, ticket, detail);
        }
    }
}
