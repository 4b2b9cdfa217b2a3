//! HTTP front end: server wiring, routing, sessions and page rendering.

pub mod app;
pub mod context;
pub mod middleware;
