//! OpenAPI documentation for the HTTP API, served at `/openapi.json` with a Scalar UI at `/docs`.

use utoipa::OpenApi;

use crate::api::models::copy::{CopyRequest, CopyResponse};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "blobcopy",
        description = "Start server-side blob copies into Azure storage accounts"
    ),
    paths(crate::api::handlers::copy::copy_blob),
    components(schemas(CopyRequest, CopyResponse)),
    tags(
        (name = "copy", description = "Server-side blob copies"),
    )
)]
pub struct ApiDoc;
