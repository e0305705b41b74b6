//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the webp-convert HTTP API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the webp-convert HTTP API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "webp-convert HTTP API",
        version = "0.1.0",
        description = "Converts uploaded images to WebP with cwebp, one file or a zip archive per request",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        // Conversion
        crate::api::routes::convert,

        // System
        crate::api::routes::get_capabilities,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::types::Capabilities,
        crate::config::FailurePolicy,
        crate::options::EncodeOptions,
        crate::options::Resize,
    )),
    tags(
        (name = "convert", description = "Image conversion - Upload images, download WebP files or archives"),
        (name = "system", description = "System endpoints - Health checks, capabilities, OpenAPI spec"),
    )
)]
pub struct ApiDoc;
