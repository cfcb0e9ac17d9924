//! HTTP API handlers

pub mod assignments;
pub mod events;
pub mod health;
pub mod submissions;

pub use assignments::assignment_routes;
pub use events::event_stream;
pub use health::health_routes;
pub use submissions::submission_routes;
