//! # FitCoach Common Library
//!
//! Shared code for the FitCoach service:
//! - Database schema, migrations and models
//! - Accounts, teacher-student relationships and fact records
//! - Student evaluation aggregates and their synchronization
//! - Event types (CoachEvent) and the event bus
//! - Workout tracking, one-rep-max and personal records
//! - Configuration loading

pub mod accounts;
pub mod config;
pub mod db;
pub mod error;
pub mod evaluation;
pub mod events;
pub mod facts;
pub mod relationships;
pub mod strength;
pub mod sync;
pub mod tracking;
pub mod uuid_utils;

pub use error::{Error, Result};
