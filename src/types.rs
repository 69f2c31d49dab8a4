use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// A raw entry from the game catalog (`games.json`), as produced by the BGG
/// ingestion step. The `name` field is the short id used everywhere else;
/// `id` and `owned` are BGG bookkeeping the scheduler ignores.
#[derive(Debug, Clone, Deserialize)]
pub struct GameRecord {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    pub min_players: u32,
    pub max_players: u32,
    pub min_playtime: u32,
    pub max_playtime: u32,
    /// Stringified player-count -> weight in [0, 1].
    #[serde(default)]
    pub popularity: BTreeMap<String, f64>,
    #[serde(default)]
    pub owned: i64,
}

/// An attendee. A record without a `sessions` key attends every session.
#[derive(Debug, Clone, Deserialize)]
pub struct Player {
    pub name: String,
    #[serde(default)]
    pub owns: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub sessions: Option<Vec<usize>>,
}

impl Player {
    pub fn owns_game(&self, game: &str) -> bool {
        self.owns.iter().any(|g| g == game)
    }

    pub fn interested_in(&self, game: &str) -> bool {
        self.interests.iter().any(|g| g == game)
    }

    /// The session indices this player attends, with the missing-key default
    /// of "all of them" resolved.
    pub fn attended_sessions(&self, session_count: usize) -> Vec<usize> {
        match &self.sessions {
            Some(sessions) => sessions.clone(),
            None => (0..session_count).collect(),
        }
    }
}

/// One contiguous block of convention time. `length` is minutes; it is parsed
/// signed so a negative value surfaces as a consistency error, not a parse
/// error.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub name: String,
    pub length: i64,
}

/// Cap on the total number of tables of one game across the convention,
/// for games with a limited number of physical copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedGame {
    pub name: String,
    pub cap: u32,
}

/// Parses the CLI form `GAME` or `GAME:CAP`; the cap defaults to 1.
impl FromStr for SharedGame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None => Ok(SharedGame {
                name: s.to_string(),
                cap: 1,
            }),
            Some((name, cap)) => {
                let cap = cap
                    .parse::<u32>()
                    .map_err(|_| format!("invalid shared-game cap `{cap}`"))?;
                Ok(SharedGame {
                    name: name.to_string(),
                    cap,
                })
            }
        }
    }
}

/// Knobs that shape the solve beyond the three input files.
#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    /// Maximum number of tables running in any single session. `None` means
    /// unbounded.
    pub table_limit: Option<u32>,
    pub shared: Vec<SharedGame>,
}

/// A single seat at a table. `owner` marks that this player brought the copy
/// being played.
#[derive(Debug, Clone, Serialize)]
pub struct Seat {
    pub player: String,
    pub owner: bool,
}

/// One game instance within one session.
#[derive(Debug, Clone, Serialize)]
pub struct Table {
    pub game: String,
    pub seats: Vec<Seat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSchedule {
    pub session: String,
    pub tables: Vec<Table>,
}

/// The solved assignment, one entry per session in input order.
#[derive(Debug, Clone, Serialize)]
pub struct Schedule {
    pub sessions: Vec<SessionSchedule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_game_parses_bare_name_with_default_cap() {
        let shared: SharedGame = "1830".parse().expect("bare name should parse");
        assert_eq!(
            shared,
            SharedGame {
                name: "1830".to_string(),
                cap: 1
            }
        );
    }

    #[test]
    fn shared_game_parses_explicit_cap() {
        let shared: SharedGame = "1830:3".parse().expect("name:cap should parse");
        assert_eq!(
            shared,
            SharedGame {
                name: "1830".to_string(),
                cap: 3
            }
        );
    }

    #[test]
    fn shared_game_rejects_non_numeric_cap() {
        assert!("1830:many".parse::<SharedGame>().is_err());
    }

    #[test]
    fn player_without_sessions_key_attends_everything() {
        let player = Player {
            name: "Alice".to_string(),
            owns: vec![],
            interests: vec![],
            sessions: None,
        };

        assert_eq!(player.attended_sessions(3), vec![0, 1, 2]);
    }
}
