use axum::Json;
use serde_json::{json, Value};

/// GET /swagger: Machine-readable index of the public routes.
pub async fn index() -> Json<Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "routes": [
            { "method": "GET",  "path": "/api/v1/ping", "auth": false },
            { "method": "POST", "path": "/api/v1/login", "auth": false },
            { "method": "POST", "path": "/api/v1/register", "auth": false },
            { "method": "POST", "path": "/api/v1/query", "auth": true,
              "body": { "cadastral_number": "string", "latitude": "number", "longitude": "number" } },
            { "method": "GET",  "path": "/api/v1/query/{id}", "auth": true },
            { "method": "GET",  "path": "/api/v1/history", "auth": true,
              "query": { "page": "integer", "limit": "integer" } },
            { "method": "GET",  "path": "/api/v1/history/{cadastral_number}", "auth": true },
            { "method": "POST", "path": "/api/result", "auth": false },
            { "method": "GET",  "path": "/health", "auth": false },
            { "method": "GET",  "path": "/metrics", "auth": false }
        ]
    }))
}
