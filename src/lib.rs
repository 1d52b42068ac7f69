mod batch;
mod cache;
mod config;
mod diagnostics;
mod errors;
mod geocode;
mod map;
mod model;
mod rate_limit;
mod viewport;

use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use batch::{
    BatchResolver, ResolutionEvent, ResolutionObserver, ResolutionOutcome, ResolutionProgress,
    ResolutionSnapshot, ResolverState, RunSummary,
};
pub use cache::{AddressCache, CacheLookup};
pub use config::{AppConfig, PublicAppConfig, DEFAULT_GEOCODER_ENDPOINT};
pub use diagnostics::{Diagnostics, GeocodeDiagnostic};
pub use errors::{AppError, AppResult, GeocodeError};
pub use geocode::{parse_first_candidate, Geocoder, NominatimClient};
pub use map::{MapMarker, MapState, MapView, NavigationSink, PropertySelected};
pub use model::{
    marker_color_for_tag, AddressKey, Coordinate, Property, PropertyStatus, Region,
    ResolvedLocation, DEFAULT_MARKER_COLOR,
};
pub use rate_limit::RateLimiter;
pub use viewport::compute_bounds;

/// Process-level entry point wiring configuration, cache and resolver together.
pub struct PropertyLocator {
    config: AppConfig,
    resolver: Arc<BatchResolver>,
}

#[derive(Debug, Serialize)]
pub struct LocatorReport {
    pub state: MapState,
    pub coverage: String,
    pub region: Option<Region>,
    pub markers: Vec<MapMarker>,
    pub summary: RunSummary,
    pub config: PublicAppConfig,
}

impl PropertyLocator {
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        let resolver = BatchResolver::from_config(&config, AddressCache::new())?;
        Ok(Self {
            config,
            resolver: Arc::new(resolver),
        })
    }

    pub fn with_resolver(config: AppConfig, resolver: Arc<BatchResolver>) -> Self {
        Self { config, resolver }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn resolver(&self) -> Arc<BatchResolver> {
        Arc::clone(&self.resolver)
    }

    pub async fn refresh(
        &self,
        properties: &[Property],
        observer: Option<ResolutionObserver>,
    ) -> ResolutionOutcome {
        self.resolver.resolve_all(properties, observer).await
    }

    pub fn map_view(&self) -> MapView {
        MapView::new(self.resolver.snapshot(), &self.config)
    }

    /// Resolves once and summarizes the committed map for display or export.
    pub async fn report(&self, properties: &[Property]) -> LocatorReport {
        let outcome = self.refresh(properties, None).await;
        let view = self.map_view();
        LocatorReport {
            state: view.state(),
            coverage: view.coverage_label(),
            region: view.region(),
            markers: view.markers(),
            summary: outcome.summary,
            config: self.config.public_profile(),
        }
    }
}

pub fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,property_locator=debug"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    });
}
