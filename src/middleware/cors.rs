use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::AppConfig;

pub fn build_cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        tracing::warn!("no valid CORS origins configured, denying cross-origin requests");
        AllowOrigin::list(Vec::new())
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
}

#[cfg(test)]
mod tests {
    use super::build_cors_layer;
    use crate::config::AppConfig;

    #[test]
    fn builds_with_configured_origins() {
        let mut config = AppConfig::from_env();
        config.cors_origins = vec!["http://localhost:3000".to_string()];
        let _layer = build_cors_layer(&config);
    }
}
