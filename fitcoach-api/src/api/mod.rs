//! HTTP API handlers for fitcoach-api

pub mod evaluations;
pub mod facts;
pub mod health;
pub mod relationships;
pub mod sse;
pub mod strength;
pub mod tracking;
pub mod users;

pub use evaluations::evaluation_routes;
pub use facts::fact_routes;
pub use health::health_routes;
pub use relationships::relationship_routes;
pub use sse::sse_routes;
pub use strength::strength_routes;
pub use tracking::tracking_routes;
pub use users::user_routes;
