//! `GET /health` and `POST /predict` over axum.

mod schema;
mod server;

pub use schema::{FieldError, PredictionRequest, PredictionResponse};
pub use server::{create_router, ApiError, ApiServer, ApiServerHandle, ApiState};
