use std::fmt;
use thiserror::Error;

/// Errors surfaced by loading inputs or running a solve. All of these are
/// terminal for the run.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("failed to read {path}: {source}")]
    InputRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    InputParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("inconsistent input: {0}")]
    InputConsistency(String),
    #[error("no feasible schedule exists\n{0}")]
    Infeasible(Diagnosis),
    #[error("solver failure: {0}")]
    Solver(good_lp::ResolutionError),
}

/// Per-session capacity report attached to an infeasibility result, so the
/// caller can see which sessions cannot seat everyone who shows up.
#[derive(Debug, Clone, Default)]
pub struct Diagnosis {
    pub sessions: Vec<SessionDiagnosis>,
}

#[derive(Debug, Clone)]
pub struct SessionDiagnosis {
    pub session: String,
    /// Players attending this session.
    pub attending: usize,
    /// Games that are both owned by an attendee and short enough to fit.
    pub playable_games: usize,
    /// Upper bound on seats: effective table count times the largest
    /// effective max-players among playable games.
    pub capacity: u64,
}

impl SessionDiagnosis {
    pub fn over_subscribed(&self) -> bool {
        (self.attending as u64) > self.capacity
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in &self.sessions {
            if s.attending == 0 {
                writeln!(f, "  session {}: no attendees", s.session)?;
            } else if s.playable_games == 0 {
                writeln!(
                    f,
                    "  session {}: {} attending but no playable games",
                    s.session, s.attending
                )?;
            } else if s.over_subscribed() {
                writeln!(
                    f,
                    "  session {}: over-subscribed, {} attending but capacity {} across {} playable game(s)",
                    s.session, s.attending, s.capacity, s.playable_games
                )?;
            } else {
                writeln!(
                    f,
                    "  session {}: {} attending, capacity {} across {} playable game(s)",
                    s.session, s.attending, s.capacity, s.playable_games
                )?;
            }
        }
        Ok(())
    }
}
