//! acaflow
//!
//! Event relay, protocol-state dispatch and command controllers for a
//! credential-exchange agent, built around an ordered plugin bus.

pub mod agent;
pub mod app;
pub mod controller;
pub mod core;
pub mod driver;
pub mod handler;
pub mod protocol;
pub mod relay;

pub mod prelude;

pub use app::AcaFlow;
pub use acaflow_protocol as wire;
