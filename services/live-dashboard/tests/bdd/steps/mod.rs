//! BDD step definitions for the live dashboard service

pub mod dashboard_steps;
pub mod session_steps;
pub mod view_steps;
