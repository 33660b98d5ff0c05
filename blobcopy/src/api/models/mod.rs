//! API request and response data models.
//!
//! These structures define the public JSON contract. Field names follow the camelCase
//! convention callers already use (`destFilename`, `sourceUrl`, ...). All models are
//! annotated with `utoipa` so they show up in the generated OpenAPI document.

pub mod copy;
