//! SapperHub backend: training-plan generation with a Gemini backend and an
//! offline template fallback, served over a small JSON API next to the SPA.

pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod gemini;
pub mod generator;
pub mod logic;
pub mod prompt;
pub mod protocol;
pub mod routes;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod template;
pub mod topics;
pub mod util;
