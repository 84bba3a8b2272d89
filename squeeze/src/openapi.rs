//! OpenAPI documentation, served as JSON at `/api-docs/openapi.json` and rendered at `/docs`.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Squeeze API",
        description = "Upload an image, get back a JPEG re-encoded at the requested quality together with the size savings."
    ),
    paths(api::handlers::root::welcome, api::handlers::compress::compress_image),
    components(schemas(api::models::compress::CompressResponse)),
    tags(
        (name = "info", description = "Service information"),
        (name = "compress", description = "Image compression"),
    )
)]
pub struct ApiDoc;
