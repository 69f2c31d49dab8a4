use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{GameRecord, Player};

/// A game's scheduling-relevant parameters after normalization.
#[derive(Debug, Clone)]
pub struct GameParams {
    pub min_players: u32,
    pub max_players: u32,
    pub min_playtime: u32,
    pub max_playtime: u32,
    /// Player-count -> weight in [0, 1]. Counts absent from the curve weigh 0.
    pub popularity: BTreeMap<u32, f64>,
}

// Stand-in stats for games the catalog has never heard of: a typical
// four-hour, 3-4 player game with no preference between the two counts.
const DEFAULT_MIN_PLAYERS: u32 = 3;
const DEFAULT_MAX_PLAYERS: u32 = 4;
const DEFAULT_PLAYTIME: u32 = 240;

/// The normalized game catalog. Every game referenced by any player resolves
/// here; games missing from the raw records get defaulted entries.
#[derive(Debug, Clone)]
pub struct Catalog {
    games: BTreeMap<String, GameParams>,
}

impl Catalog {
    /// Normalizes raw catalog records and synthesizes defaults for every game
    /// referenced in a player's `owns` or `interests` but absent from the
    /// records. Unknown games are not an error.
    pub fn normalize(records: Vec<GameRecord>, players: &[Player]) -> Catalog {
        let mut games = BTreeMap::new();

        for record in records {
            let name = record.name.clone();
            games.insert(name, normalize_record(record));
        }

        let referenced: BTreeSet<&str> = players
            .iter()
            .flat_map(|p| p.owns.iter().chain(p.interests.iter()))
            .map(String::as_str)
            .collect();

        for name in referenced {
            if !games.contains_key(name) {
                debug!("game {name} missing from catalog, using defaults");
                games.insert(name.to_string(), default_params());
            }
        }

        Catalog { games }
    }

    /// Looks up a game. Panics on names that were never referenced; the
    /// normalizer guarantees every referenced name resolves.
    pub fn get(&self, name: &str) -> &GameParams {
        &self.games[name]
    }

    /// The popularity weight of playing `name` with `count` players.
    pub fn popularity(&self, name: &str, count: u32) -> f64 {
        self.games
            .get(name)
            .and_then(|g| g.popularity.get(&count))
            .copied()
            .unwrap_or(0.0)
    }
}

fn normalize_record(record: GameRecord) -> GameParams {
    let mut popularity = BTreeMap::new();

    for (count, weight) in &record.popularity {
        match count.parse::<u32>() {
            Ok(count) => {
                popularity.insert(count, *weight);
            }
            Err(_) => {
                warn!(
                    "game {}: ignoring non-integer popularity count `{count}`",
                    record.name
                );
            }
        }
    }

    GameParams {
        min_players: record.min_players,
        max_players: record.max_players,
        min_playtime: record.min_playtime,
        // Some catalog entries carry max < min; treat the longer one as max.
        max_playtime: record.max_playtime.max(record.min_playtime),
        popularity,
    }
}

fn default_params() -> GameParams {
    let popularity = (DEFAULT_MIN_PLAYERS..=DEFAULT_MAX_PLAYERS)
        .map(|count| (count, 1.0))
        .collect();

    GameParams {
        min_players: DEFAULT_MIN_PLAYERS,
        max_players: DEFAULT_MAX_PLAYERS,
        min_playtime: DEFAULT_PLAYTIME,
        max_playtime: DEFAULT_PLAYTIME,
        popularity,
    }
}
