//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! - **Root** (`/`): Welcome payload, also served for unknown paths
//! - **Compress** (`/api/compress`): Upload an image and get a JPEG back
//! - **Download** (`/download/*`): Compressed artifacts, served from the output directory
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`, available at `/docs` when
//! the server is running.

pub mod handlers;
pub mod models;
