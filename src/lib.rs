//! Intake questionnaire frontend.
//!
//! Server-rendered multi-step intake: landing page, one page per question
//! (single-select, multi-select, free-text, slider), and a review page that
//! submits the answers to the results service and shows the recommended
//! program. In-progress answers persist per browser session.

pub mod backend;
pub mod config;
pub mod domain;
pub mod error;
pub mod input;
pub mod navigator;
pub mod protocol;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;
pub mod submission;
pub mod telemetry;
pub mod views;
