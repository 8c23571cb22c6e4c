use serde::{Deserialize, Serialize};

/// Body posted to the external resolver. Carries only the lookup input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub cadastral_number: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Resolver answer: whether the parcel matched and how long it took, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub result: bool,
    pub delay: f64,
}
