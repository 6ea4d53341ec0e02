pub(crate) use crate::error::WordImageError;
pub(crate) use crate::outputs::{list_output_files, sanitize_filename};
pub(crate) use crate::web::AppState;
pub(crate) use askama::Template;
pub(crate) use askama_web::WebTemplate;
pub(crate) use axum::Json;
pub(crate) use axum::extract::{Form, Path, Request, State};
pub(crate) use axum::response::{IntoResponse, Response};
pub(crate) use serde::Deserialize;
pub(crate) use tracing::{debug, info, warn};
