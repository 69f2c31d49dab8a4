//! Table scheduler for board game conventions.
//!
//! Given a game catalog, the attendees (what they own, what they want to
//! play, when they are around), and the convention's session plan, this crate
//! builds a mixed integer program whose solution seats every attending player
//! at exactly one table per session, maximizing satisfied interests first and
//! the popularity of the chosen table sizes second.

pub mod catalog;
pub mod error;
pub mod params;
pub mod schedule;
pub mod solver;
pub mod types;

pub use catalog::Catalog;
pub use error::{Diagnosis, ScheduleError};
pub use solver::solve;
pub use types::{GameRecord, Player, Schedule, Session, SharedGame, SolveOptions};

use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Reads and parses one of the JSON input files, tagging any failure with the
/// offending path.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ScheduleError> {
    let buf = fs::read_to_string(path).map_err(|source| ScheduleError::InputRead {
        path: path.display().to_string(),
        source,
    })?;

    serde_json::from_str(&buf).map_err(|source| ScheduleError::InputParse {
        path: path.display().to_string(),
        source,
    })
}
