//! Domain modules for the planner.
//!
//! # Modules
//!
//! - [`calendar`]: Calendar page assembly
//! - [`courses`]: Course normalization and class grouping
//! - [`datetime`]: Wall-clock reinterpretation and ISO parsing
//! - [`helpers`]: View template helpers and relative time
//! - [`holidays`]: Holiday fetching and summer-holiday lookup
//! - [`school_year`]: Current school year resolution
//! - [`upload`]: Homework submission file upload
//! - [`videoconference`]: Videoconference UI state for events

pub mod calendar;
pub mod courses;
pub mod datetime;
pub mod helpers;
pub mod holidays;
pub mod school_year;
pub mod upload;
pub mod videoconference;

pub use courses::UNASSIGNED;
pub use holidays::HOLIDAY_COLOR;
