//! Sample cadastral lookups used across the test suites

#![allow(dead_code)]

/// A lookup request with its expected validity.
#[derive(Debug, Clone)]
pub struct QueryFixture {
    pub cadastral_number: &'static str,
    pub latitude: f64,
    pub longitude: f64,
    pub description: &'static str,
}

impl QueryFixture {
    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({
            "cadastral_number": self.cadastral_number,
            "latitude": self.latitude,
            "longitude": self.longitude,
        })
    }
}

pub const VALID_QUERIES: &[QueryFixture] = &[
    QueryFixture {
        cadastral_number: "77:01:0001001:1234",
        latitude: 55.7558,
        longitude: 37.6173,
        description: "Moscow city centre parcel",
    },
    QueryFixture {
        cadastral_number: "78:34:0004281:10",
        latitude: 59.9343,
        longitude: 30.3351,
        description: "Saint Petersburg parcel",
    },
    QueryFixture {
        cadastral_number: "50:21:0110114:1",
        latitude: 0.0,
        longitude: 0.0,
        description: "Zero coordinates are valid",
    },
    QueryFixture {
        cadastral_number: "pole",
        latitude: -90.0,
        longitude: 180.0,
        description: "Inclusive coordinate bounds",
    },
];

pub const INVALID_QUERIES: &[QueryFixture] = &[
    QueryFixture {
        cadastral_number: "77:01:0001001:1234",
        latitude: 91.0,
        longitude: 37.6173,
        description: "Latitude above 90",
    },
    QueryFixture {
        cadastral_number: "77:01:0001001:1234",
        latitude: 55.0,
        longitude: -180.01,
        description: "Longitude below -180",
    },
    QueryFixture {
        cadastral_number: "   ",
        latitude: 55.0,
        longitude: 37.0,
        description: "Blank cadastral number",
    },
];
