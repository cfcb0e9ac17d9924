//! Database operations for submissions, feedback, and assignments.
//!
//! Pool creation and schema initialization live in `qari_common::db`;
//! these modules hold the query layer on top of that schema.

pub mod assignments;
pub mod feedback;
pub mod submissions;
