use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::batch::ResolutionSnapshot;
use crate::config::AppConfig;
use crate::model::{Coordinate, Region};
use crate::viewport::compute_bounds;

/// Emitted toward navigation when the user picks a mapped property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertySelected {
    pub property_id: String,
}

pub trait NavigationSink: Send + Sync {
    fn property_selected(&self, event: PropertySelected);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MapState {
    NoProperties,
    Loading { resolved: usize, total: usize },
    NothingMapped { total: usize },
    Ready { resolved: usize, total: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct MapMarker {
    pub property_id: String,
    pub title: String,
    pub coordinate: Coordinate,
    pub color: &'static str,
}

/// Presentation model handed to the rendering layer.
pub struct MapView {
    snapshot: ResolutionSnapshot,
    padding: f64,
    min_span: f64,
    navigation: Option<Arc<dyn NavigationSink>>,
}

impl MapView {
    pub fn new(snapshot: ResolutionSnapshot, config: &AppConfig) -> Self {
        Self {
            snapshot,
            padding: config.viewport_padding,
            min_span: config.viewport_min_span,
            navigation: None,
        }
    }

    pub fn with_navigation(mut self, navigation: Arc<dyn NavigationSink>) -> Self {
        self.navigation = Some(navigation);
        self
    }

    pub fn snapshot(&self) -> &ResolutionSnapshot {
        &self.snapshot
    }

    pub fn state(&self) -> MapState {
        let total = self.snapshot.total;
        let resolved = self.snapshot.resolved();
        if self.snapshot.loading {
            MapState::Loading { resolved, total }
        } else if total == 0 {
            MapState::NoProperties
        } else if resolved == 0 {
            MapState::NothingMapped { total }
        } else {
            MapState::Ready { resolved, total }
        }
    }

    pub fn region(&self) -> Option<Region> {
        let coordinates: Vec<Coordinate> = self
            .snapshot
            .locations
            .iter()
            .map(|location| location.coordinate)
            .collect();
        compute_bounds(&coordinates, self.padding, self.min_span)
    }

    pub fn coverage_label(&self) -> String {
        format!(
            "{}/{} mapped",
            self.snapshot.resolved(),
            self.snapshot.total
        )
    }

    pub fn markers(&self) -> Vec<MapMarker> {
        self.snapshot
            .locations
            .iter()
            .map(|location| MapMarker {
                property_id: location.property.id.clone(),
                title: location.property.address.clone(),
                coordinate: location.coordinate,
                color: location.marker_color(),
            })
            .collect()
    }

    /// Forwards a selection for a mapped property. Unknown ids are ignored.
    pub fn select(&self, property_id: &str) -> bool {
        let known = self
            .snapshot
            .locations
            .iter()
            .any(|location| location.property_id() == property_id);
        if !known {
            debug!(property_id, "ignoring selection of unmapped property");
            return false;
        }
        if let Some(navigation) = &self.navigation {
            navigation.property_selected(PropertySelected {
                property_id: property_id.to_string(),
            });
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::model::fixtures::property;
    use crate::model::{PropertyStatus, ResolvedLocation, DEFAULT_MARKER_COLOR};

    #[derive(Default)]
    struct RecordingNavigation {
        events: Mutex<Vec<PropertySelected>>,
    }

    impl NavigationSink for RecordingNavigation {
        fn property_selected(&self, event: PropertySelected) {
            self.events.lock().push(event);
        }
    }

    fn snapshot(total: usize, located: &[(&str, f64, f64)], loading: bool) -> ResolutionSnapshot {
        ResolutionSnapshot {
            generation: 1,
            total,
            locations: located
                .iter()
                .map(|(id, lat, lng)| ResolvedLocation {
                    property: property(id, "123 Main St"),
                    coordinate: Coordinate::new(*lat, *lng),
                })
                .collect(),
            loading,
        }
    }

    #[test]
    fn distinguishes_empty_input_from_nothing_mapped() {
        let config = AppConfig::default();
        assert_eq!(
            MapView::new(snapshot(0, &[], false), &config).state(),
            MapState::NoProperties
        );
        assert_eq!(
            MapView::new(snapshot(4, &[], false), &config).state(),
            MapState::NothingMapped { total: 4 }
        );
        assert_eq!(
            MapView::new(snapshot(4, &[], true), &config).state(),
            MapState::Loading {
                resolved: 0,
                total: 4
            }
        );
    }

    #[test]
    fn frames_resolved_locations() {
        let config = AppConfig::default();
        let view = MapView::new(
            snapshot(10, &[("a", 38.0, -100.0), ("b", 40.0, -96.0)], false),
            &config,
        );
        assert_eq!(view.coverage_label(), "2/10 mapped");
        assert_eq!(
            view.state(),
            MapState::Ready {
                resolved: 2,
                total: 10
            }
        );
        let region = view.region().unwrap();
        assert!(region.contains(Coordinate::new(38.0, -100.0)));
        assert!(region.contains(Coordinate::new(40.0, -96.0)));
        assert!(MapView::new(snapshot(1, &[], false), &config)
            .region()
            .is_none());
    }

    #[test]
    fn markers_use_status_colors() {
        let config = AppConfig::default();
        let view = MapView::new(snapshot(1, &[("a", 1.0, 2.0)], false), &config);
        let markers = view.markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].color, PropertyStatus::Interested.marker_color());
        assert_eq!(markers[0].title, "123 Main St");
    }

    #[test]
    fn unrecognized_status_gets_default_marker_color() {
        let config = AppConfig::default();
        let mut snapshot = snapshot(1, &[("a", 1.0, 2.0)], false);
        snapshot.locations[0].property.status = PropertyStatus::Unknown;
        let markers = MapView::new(snapshot, &config).markers();
        assert_eq!(markers[0].color, DEFAULT_MARKER_COLOR);
    }

    #[test]
    fn forwards_selection_of_mapped_properties_only() {
        let config = AppConfig::default();
        let navigation = Arc::new(RecordingNavigation::default());
        let view = MapView::new(snapshot(2, &[("a", 1.0, 2.0)], false), &config)
            .with_navigation(navigation.clone());

        assert!(view.select("a"));
        assert!(!view.select("missing"));
        assert_eq!(
            *navigation.events.lock(),
            vec![PropertySelected {
                property_id: "a".into()
            }]
        );
    }
}
