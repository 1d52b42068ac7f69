use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Marker color used when the store hands us a status tag we do not recognize.
pub const DEFAULT_MARKER_COLOR: &str = "#6b7280";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    Interested,
    Toured,
    OfferMade,
    UnderContract,
    Rejected,
    Purchased,
    /// Any tag this build does not recognize. Never produced by [`PropertyStatus::parse`].
    #[serde(other)]
    Unknown,
}

impl PropertyStatus {
    pub const ALL: [PropertyStatus; 6] = [
        PropertyStatus::Interested,
        PropertyStatus::Toured,
        PropertyStatus::OfferMade,
        PropertyStatus::UnderContract,
        PropertyStatus::Rejected,
        PropertyStatus::Purchased,
    ];

    pub fn as_tag(&self) -> &'static str {
        match self {
            PropertyStatus::Interested => "interested",
            PropertyStatus::Toured => "toured",
            PropertyStatus::OfferMade => "offer_made",
            PropertyStatus::UnderContract => "under_contract",
            PropertyStatus::Rejected => "rejected",
            PropertyStatus::Purchased => "purchased",
            PropertyStatus::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "interested" => Ok(PropertyStatus::Interested),
            "toured" => Ok(PropertyStatus::Toured),
            "offer_made" => Ok(PropertyStatus::OfferMade),
            "under_contract" => Ok(PropertyStatus::UnderContract),
            "rejected" => Ok(PropertyStatus::Rejected),
            "purchased" => Ok(PropertyStatus::Purchased),
            _ => Err(AppError::Config(format!("invalid property status: {value}"))),
        }
    }

    pub fn marker_color(&self) -> &'static str {
        match self {
            PropertyStatus::Interested => "#3b82f6",
            PropertyStatus::Toured => "#8b5cf6",
            PropertyStatus::OfferMade => "#f59e0b",
            PropertyStatus::UnderContract => "#10b981",
            PropertyStatus::Rejected => "#ef4444",
            PropertyStatus::Purchased => "#059669",
            PropertyStatus::Unknown => DEFAULT_MARKER_COLOR,
        }
    }
}

/// Resolves a raw status tag to a marker color, falling back to [`DEFAULT_MARKER_COLOR`].
pub fn marker_color_for_tag(tag: &str) -> &'static str {
    PropertyStatus::parse(tag)
        .map(|status| status.marker_color())
        .unwrap_or(DEFAULT_MARKER_COLOR)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: f32,
    #[serde(default)]
    pub square_feet: u32,
    pub status: PropertyStatus,
}

impl Property {
    pub fn address_key(&self) -> AddressKey {
        AddressKey::new(&self.address, &self.city, &self.state, &self.zip)
    }
}

/// Cache key for one lookup target, rendered as `address, city, state zip`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AddressKey(String);

impl AddressKey {
    pub fn new(address: &str, city: &str, state: &str, zip: &str) -> Self {
        Self(format!(
            "{}, {}, {} {}",
            address.trim(),
            city.trim(),
            state.trim(),
            zip.trim()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AddressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A property paired with the coordinate its address resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLocation {
    #[serde(flatten)]
    pub property: Property,
    pub coordinate: Coordinate,
}

impl ResolvedLocation {
    pub fn property_id(&self) -> &str {
        &self.property.id
    }

    pub fn marker_color(&self) -> &'static str {
        self.property.status.marker_color()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
    pub center: Coordinate,
    pub latitude_span: f64,
    pub longitude_span: f64,
}

impl Region {
    pub fn south_west(&self) -> Coordinate {
        Coordinate::new(
            self.center.latitude - self.latitude_span / 2.0,
            self.center.longitude - self.longitude_span / 2.0,
        )
    }

    pub fn north_east(&self) -> Coordinate {
        Coordinate::new(
            self.center.latitude + self.latitude_span / 2.0,
            self.center.longitude + self.longitude_span / 2.0,
        )
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        let sw = self.south_west();
        let ne = self.north_east();
        (sw.latitude..=ne.latitude).contains(&point.latitude)
            && (sw.longitude..=ne.longitude).contains(&point.longitude)
    }
}
