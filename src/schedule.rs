use good_lp::Solution as LpSolution;
use std::collections::BTreeMap;
use std::fmt;

use crate::solver::ProblemSpace;
use crate::types::{Player, Schedule, Seat, Session, SessionSchedule, Table};

/// Reads the solved seat variables back into a schedule: per session, the
/// tables that actually run and who sits where. Tables come out ordered by
/// game name and players in input order, so reruns over the same input print
/// identically.
pub(crate) fn extract(
    solution: &impl LpSolution,
    space: &ProblemSpace,
    seats: &BTreeMap<(usize, usize, usize), good_lp::Variable>,
) -> Schedule {
    let sessions = space
        .sessions
        .iter()
        .enumerate()
        .map(|(i, session)| {
            let tables = space.session_games[i]
                .iter()
                .filter_map(|&g| {
                    let game = &space.games[g];

                    let seated: Vec<Seat> = space.session_players[i]
                        .iter()
                        .filter_map(|&p| {
                            let seat = seats.get(&(i, p, g))?;
                            (solution.value(*seat) > 0.5).then(|| Seat {
                                player: space.players[p].name.clone(),
                                owner: space.players[p].owns_game(game),
                            })
                        })
                        .collect();

                    (!seated.is_empty()).then(|| Table {
                        game: game.clone(),
                        seats: seated,
                    })
                })
                .collect();

            SessionSchedule {
                session: session.name.clone(),
                tables,
            }
        })
        .collect();

    Schedule { sessions }
}

/// The degenerate schedule for a convention nobody attends.
pub(crate) fn empty(sessions: &[Session]) -> Schedule {
    Schedule {
        sessions: sessions
            .iter()
            .map(|session| SessionSchedule {
                session: session.name.clone(),
                tables: Vec::new(),
            })
            .collect(),
    }
}

impl Schedule {
    /// How many seats went to a player interested in that table's game.
    pub fn satisfied_interests(&self, players: &[Player]) -> usize {
        let by_name: BTreeMap<&str, &Player> =
            players.iter().map(|p| (p.name.as_str(), p)).collect();

        self.sessions
            .iter()
            .flat_map(|s| &s.tables)
            .flat_map(|t| t.seats.iter().map(move |seat| (t, seat)))
            .filter(|(table, seat)| {
                by_name
                    .get(seat.player.as_str())
                    .is_some_and(|p| p.interested_in(&table.game))
            })
            .count()
    }
}

/// An upper bound on satisfiable interests: per player, the number of
/// interests anyone owns a copy of, capped by the sessions they attend.
pub fn plausible_interests(players: &[Player], session_count: usize) -> usize {
    let owned: Vec<&str> = players
        .iter()
        .flat_map(|p| p.owns.iter())
        .map(String::as_str)
        .collect();

    players
        .iter()
        .map(|p| {
            let ownable = p
                .interests
                .iter()
                .filter(|g| owned.contains(&g.as_str()))
                .count();
            ownable.min(p.attended_sessions(session_count).len())
        })
        .sum()
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for session in &self.sessions {
            writeln!(f, "==== Session {} ====", session.session)?;

            for table in &session.tables {
                writeln!(f, "## {} ##", table.game)?;

                for seat in &table.seats {
                    if seat.owner {
                        writeln!(f, "{}*", seat.player)?;
                    } else {
                        writeln!(f, "{}", seat.player)?;
                    }
                }

                writeln!(f)?;
            }

            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule_with_one_table() -> Schedule {
        Schedule {
            sessions: vec![SessionSchedule {
                session: "Friday Eve".to_string(),
                tables: vec![Table {
                    game: "1830".to_string(),
                    seats: vec![
                        Seat {
                            player: "Alice".to_string(),
                            owner: true,
                        },
                        Seat {
                            player: "Bob".to_string(),
                            owner: false,
                        },
                    ],
                }],
            }],
        }
    }

    #[test]
    fn owners_are_starred_in_the_printout() {
        let rendered = schedule_with_one_table().to_string();

        assert!(rendered.contains("==== Session Friday Eve ===="));
        assert!(rendered.contains("## 1830 ##"));
        assert!(rendered.contains("Alice*\n"));
        assert!(rendered.contains("Bob\n"));
        assert!(!rendered.contains("Bob*"));
    }

    #[test]
    fn satisfied_interests_counts_seats_at_wanted_games() {
        let players = vec![
            Player {
                name: "Alice".to_string(),
                owns: vec!["1830".to_string()],
                interests: vec!["1830".to_string()],
                sessions: None,
            },
            Player {
                name: "Bob".to_string(),
                owns: vec![],
                interests: vec!["1817".to_string()],
                sessions: None,
            },
        ];

        assert_eq!(schedule_with_one_table().satisfied_interests(&players), 1);
    }

    #[test]
    fn plausible_interests_requires_an_owner_and_a_session() {
        let players = vec![
            Player {
                name: "Alice".to_string(),
                owns: vec!["1830".to_string()],
                // 1846 is owned by nobody, so only 1830 is plausible.
                interests: vec!["1830".to_string(), "1846".to_string()],
                sessions: None,
            },
            Player {
                name: "Bob".to_string(),
                owns: vec![],
                // Two plausible interests but only one attended session.
                interests: vec!["1830".to_string(), "1817".to_string()],
                sessions: Some(vec![0]),
            },
            Player {
                name: "Carol".to_string(),
                owns: vec!["1817".to_string()],
                interests: vec![],
                sessions: None,
            },
        ];

        assert_eq!(plausible_interests(&players, 2), 2);
    }
}
