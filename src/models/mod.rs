//! Data models for the form builder application.
//!
//! These models match the frontend TypeScript interfaces exactly for seamless interoperability.

mod form;

pub use form::*;
