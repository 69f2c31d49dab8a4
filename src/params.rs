use crate::catalog::GameParams;

/// Effective player-count bounds for one game inside one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableBounds {
    pub min: u32,
    pub max: u32,
}

/// Whether the game can be played at all within the session: its shortest
/// playtime has to fit the block.
pub fn fits(game: &GameParams, session_length: i64) -> bool {
    i64::from(game.min_playtime) <= session_length
}

/// Player-count bounds for a game within a session, or `None` when the game
/// does not fit.
///
/// The max scales with session length: a game quoted at `min_players` in
/// `min_playtime` up to `max_players` in `max_playtime` gets its count capped
/// by linear interpolation over the session length, floored. Longer runtimes
/// are partly driven by player count, so a short session cannot take the
/// biggest table of a long game. The min is not scaled.
pub fn table_bounds(game: &GameParams, session_length: i64) -> Option<TableBounds> {
    if !fits(game, session_length) {
        return None;
    }

    Some(TableBounds {
        min: game.min_players,
        max: effective_max_players(game, session_length),
    })
}

fn effective_max_players(game: &GameParams, session_length: i64) -> u32 {
    let min_t = i64::from(game.min_playtime);
    let max_t = i64::from(game.max_playtime);

    if session_length >= max_t {
        return game.max_players;
    }
    if session_length <= min_t {
        return game.min_players;
    }

    let player_span = f64::from(game.max_players - game.min_players);
    let time_fraction = (session_length - min_t) as f64 / (max_t - min_t) as f64;
    let scaled = (f64::from(game.min_players) + player_span * time_fraction).floor() as u32;

    scaled.clamp(game.min_players, game.max_players)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn game(min_p: u32, max_p: u32, min_t: u32, max_t: u32) -> GameParams {
        GameParams {
            min_players: min_p,
            max_players: max_p,
            min_playtime: min_t,
            max_playtime: max_t,
            popularity: BTreeMap::new(),
        }
    }

    #[test]
    fn long_games_do_not_fit_short_sessions() {
        let long = game(3, 6, 300, 420);

        assert!(!fits(&long, 180));
        assert!(fits(&long, 360));
        assert_eq!(table_bounds(&long, 180), None);
    }

    #[test]
    fn max_players_interpolates_with_session_length() {
        // 3 players in 3h up to 6 players in 6h; a 4h block seats
        // floor(3 + 3 * 60/180) = 4.
        let z = game(3, 6, 180, 360);

        assert_eq!(
            table_bounds(&z, 240),
            Some(TableBounds { min: 3, max: 4 })
        );
    }

    #[test]
    fn sessions_at_least_max_playtime_seat_the_full_count() {
        let z = game(3, 6, 180, 360);

        assert_eq!(table_bounds(&z, 360).unwrap().max, 6);
        assert_eq!(table_bounds(&z, 720).unwrap().max, 6);
    }

    #[test]
    fn sessions_at_min_playtime_seat_only_the_minimum() {
        let z = game(3, 6, 180, 360);

        assert_eq!(table_bounds(&z, 180).unwrap().max, 3);
    }

    #[test]
    fn fixed_playtime_games_always_seat_the_full_count() {
        // min == max playtime would divide by zero if interpolated.
        let fixed = game(3, 4, 240, 240);

        assert_eq!(table_bounds(&fixed, 240).unwrap().max, 4);
        assert_eq!(table_bounds(&fixed, 300).unwrap().max, 4);
    }

    #[test]
    fn the_minimum_never_scales() {
        let z = game(3, 6, 180, 360);

        for length in [180, 240, 300, 360, 720] {
            assert_eq!(table_bounds(&z, length).unwrap().min, 3);
        }
    }
}
