use good_lp::solvers::coin_cbc::coin_cbc;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, SolverModel, Variable, constraint, variable,
    variables,
};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::Catalog;
use crate::error::{Diagnosis, ScheduleError, SessionDiagnosis};
use crate::params::{self, TableBounds};
use crate::schedule;
use crate::types::{Player, Schedule, Session, SharedGame, SolveOptions};

// Interest satisfaction is the primary objective; the popularity reward is a
// tiebreak and must never add up to a whole interest unit.
const INTEREST_WEIGHT: f64 = 1.0;
const DEFAULT_POPULARITY_WEIGHT: f64 = 0.01;
const POPULARITY_BUDGET: f64 = 0.99;

/// The pruned variable space: which players and games are live in each
/// session, and the effective player-count bounds per (session, game) pair.
/// Everything downstream (variables, constraints, extraction) iterates this.
pub(crate) struct ProblemSpace<'a> {
    pub players: &'a [Player],
    pub sessions: &'a [Session],
    pub catalog: &'a Catalog,
    /// Distinct owned game names, sorted. Game indices below point here.
    pub games: Vec<String>,
    /// Per player, the sessions they attend (deduplicated, ascending).
    pub attends: Vec<Vec<usize>>,
    /// Per session, the players attending it, in input order.
    pub session_players: Vec<Vec<usize>>,
    /// Per session, the games both owned by an attendee and fitting the
    /// session length, ascending by game index.
    pub session_games: Vec<Vec<usize>>,
    pub bounds: BTreeMap<(usize, usize), TableBounds>,
}

impl<'a> ProblemSpace<'a> {
    pub fn build(
        catalog: &'a Catalog,
        players: &'a [Player],
        sessions: &'a [Session],
    ) -> Result<Self, ScheduleError> {
        for (i, session) in sessions.iter().enumerate() {
            if session.length <= 0 {
                return Err(ScheduleError::InputConsistency(format!(
                    "session {i} ({}) has non-positive length {}",
                    session.name, session.length
                )));
            }
        }

        let mut attends = Vec::with_capacity(players.len());
        let mut session_players = vec![Vec::new(); sessions.len()];

        for (p, player) in players.iter().enumerate() {
            let attended: BTreeSet<usize> =
                player.attended_sessions(sessions.len()).into_iter().collect();

            for &i in &attended {
                if i >= sessions.len() {
                    return Err(ScheduleError::InputConsistency(format!(
                        "player {} attends session {i} but only {} sessions exist",
                        player.name,
                        sessions.len()
                    )));
                }
                session_players[i].push(p);
            }

            attends.push(attended.into_iter().collect());
        }

        let games: Vec<String> = players
            .iter()
            .flat_map(|p| p.owns.iter().cloned())
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect();

        // A game is live in a session only when an attendee owns a copy and
        // its shortest playtime fits the block.
        let mut session_games = vec![Vec::new(); sessions.len()];
        let mut bounds = BTreeMap::new();

        for (i, session) in sessions.iter().enumerate() {
            for (g, name) in games.iter().enumerate() {
                let owner_present = session_players[i]
                    .iter()
                    .any(|&p| players[p].owns_game(name));
                if !owner_present {
                    continue;
                }

                if let Some(b) = params::table_bounds(catalog.get(name), session.length) {
                    session_games[i].push(g);
                    bounds.insert((i, g), b);
                }
            }
        }

        let space = ProblemSpace {
            players,
            sessions,
            catalog,
            games,
            attends,
            session_players,
            session_games,
            bounds,
        };
        space.warn_unreachable_interests();

        Ok(space)
    }

    /// An interest no attending owner can ever serve is not an error, the
    /// player simply cannot play that game.
    fn warn_unreachable_interests(&self) {
        for (p, player) in self.players.iter().enumerate() {
            for interest in &player.interests {
                let reachable = self.attends[p].iter().any(|&i| {
                    self.session_players[i]
                        .iter()
                        .any(|&q| self.players[q].owns_game(interest))
                });

                if !reachable {
                    warn!(
                        "player {} is interested in {interest}, but nobody attending their sessions owns it",
                        player.name
                    );
                }
            }
        }
    }
}

// Decision variable maps, all keyed by indices into the ProblemSpace.
// seats:  X[session, player, game] = 1 iff the player plays that game there.
// tables: Y[session, game]         = 1 iff the game runs as a table there.
// counts: C[session, game][k]      = 1 iff the table seats exactly k players.
type SeatVariableMap = BTreeMap<(usize, usize, usize), Variable>;
type TableVariableMap = BTreeMap<(usize, usize), Variable>;
type CountVariableMap = BTreeMap<(usize, usize), Vec<(u32, Variable)>>;

/// Builds and solves the MIP for one convention. The schedule satisfies every
/// hard constraint; among feasible schedules it maximizes satisfied interests
/// first and the popularity of the chosen table sizes second.
pub fn solve(
    catalog: &Catalog,
    players: &[Player],
    sessions: &[Session],
    options: &SolveOptions,
) -> Result<Schedule, ScheduleError> {
    let space = ProblemSpace::build(catalog, players, sessions)?;

    // A session with attendees but nothing playable can never satisfy the
    // one-table-per-player constraint; report it without invoking the solver.
    let hopeless = space
        .session_players
        .iter()
        .zip(&space.session_games)
        .any(|(attending, playable)| !attending.is_empty() && playable.is_empty());
    if hopeless {
        return Err(ScheduleError::Infeasible(diagnose(&space, options)));
    }

    let (vars, seats, tables, counts) = init_variables(&space);

    if seats.is_empty() {
        return Ok(schedule::empty(space.sessions));
    }

    info!(
        "built model: {} seat, {} table, {} count variables over {} sessions, {} players, {} games",
        seats.len(),
        tables.len(),
        counts.values().map(Vec::len).sum::<usize>(),
        space.sessions.len(),
        space.players.len(),
        space.games.len()
    );

    let lambda = popularity_priority_weight(&space);
    let objective = build_objective(&space, &seats, &counts, lambda);

    let model = vars.maximise(objective).using(coin_cbc);
    let model = constrain_one_table_per_attended_session(model, &space, &seats);
    let model = constrain_each_game_played_at_most_once(model, &space, &seats);
    let model = constrain_table_sizes(model, &space, &seats, &tables, &counts);
    let model = constrain_table_limit_per_session(model, &space, &tables, options.table_limit);
    let model = constrain_shared_game_caps(model, &space, &tables, &options.shared);

    match model.solve() {
        Ok(solution) => {
            info!("optimal schedule found");
            Ok(schedule::extract(&solution, &space, &seats))
        }
        Err(ResolutionError::Infeasible) => Err(ScheduleError::Infeasible(diagnose(&space, options))),
        Err(other) => Err(ScheduleError::Solver(other)),
    }
}

fn init_variables(
    space: &ProblemSpace,
) -> (
    ProblemVariables,
    SeatVariableMap,
    TableVariableMap,
    CountVariableMap,
) {
    let mut vars = variables!();
    let mut seats = BTreeMap::new();
    let mut tables = BTreeMap::new();
    let mut counts = BTreeMap::new();

    for i in 0..space.sessions.len() {
        for &g in &space.session_games[i] {
            tables.insert((i, g), vars.add(variable().binary()));

            // One selector per feasible table size. Exactly one fires when
            // the table runs; none fire when it does not. Together with the
            // seat-sum link below this enforces activation and both count
            // bounds without separate constraints.
            let b = space.bounds[&(i, g)];
            let selectors: Vec<(u32, Variable)> = (b.min..=b.max)
                .map(|k| (k, vars.add(variable().binary())))
                .collect();
            counts.insert((i, g), selectors);

            for &p in &space.session_players[i] {
                seats.insert((i, p, g), vars.add(variable().binary()));
            }
        }
    }

    (vars, seats, tables, counts)
}

/// Scales the popularity term so that its total can never reach one interest
/// unit, keeping the objective lexicographic: interests first, table-size
/// popularity as tiebreak.
fn popularity_priority_weight(space: &ProblemSpace) -> f64 {
    let max_popularity_sum: f64 = space
        .bounds
        .iter()
        .map(|(&(_, g), b)| {
            (b.min..=b.max)
                .map(|k| space.catalog.popularity(&space.games[g], k))
                .fold(0.0, f64::max)
        })
        .sum();

    if max_popularity_sum <= 0.0 {
        return DEFAULT_POPULARITY_WEIGHT;
    }

    (POPULARITY_BUDGET / max_popularity_sum).min(DEFAULT_POPULARITY_WEIGHT)
}

fn build_objective(
    space: &ProblemSpace,
    seats: &SeatVariableMap,
    counts: &CountVariableMap,
    lambda: f64,
) -> Expression {
    debug!("popularity tiebreak weight: {lambda}");

    let interests = seats.iter().fold(
        Expression::from(0.0),
        |sum, (&(_, p, g), &seat)| {
            if space.players[p].interested_in(&space.games[g]) {
                sum + seat * INTEREST_WEIGHT
            } else {
                sum
            }
        },
    );

    counts.iter().fold(interests, |sum, (&(_, g), selectors)| {
        selectors.iter().fold(sum, |sum, &(k, selector)| {
            let weight = space.catalog.popularity(&space.games[g], k);
            if weight == 0.0 {
                sum
            } else {
                sum + selector * (lambda * weight)
            }
        })
    })
}

/// Every attending player sits at exactly one table in that session: nobody
/// plays two games at once, and nobody sits out.
fn constrain_one_table_per_attended_session<M: SolverModel>(
    model: M,
    space: &ProblemSpace,
    seats: &SeatVariableMap,
) -> M {
    space
        .session_players
        .iter()
        .enumerate()
        .fold(model, |m, (i, attending)| {
            attending.iter().fold(m, |m, &p| {
                let total = space.session_games[i]
                    .iter()
                    .fold(Expression::from(0.0), |sum, &g| sum + seats[&(i, p, g)]);
                m.with(total.eq(1.0))
            })
        })
}

/// Nobody plays the same game in two different sessions. Only emitted when a
/// player could actually meet the game more than once.
fn constrain_each_game_played_at_most_once<M: SolverModel>(
    model: M,
    space: &ProblemSpace,
    seats: &SeatVariableMap,
) -> M {
    (0..space.players.len()).fold(model, |m, p| {
        (0..space.games.len()).fold(m, |m, g| {
            let opportunities: Vec<Variable> = space.attends[p]
                .iter()
                .filter_map(|&i| seats.get(&(i, p, g)).copied())
                .collect();

            if opportunities.len() < 2 {
                return m;
            }

            let total = opportunities
                .iter()
                .fold(Expression::from(0.0), |sum, &seat| sum + seat);
            m.with(total.leq(1.0))
        })
    })
}

/// Ties seats, tables, and size selectors together per (session, game):
///
///   sum_k C[i,g,k] == Y[i,g]        exactly one size when the table runs
///   sum_p X[i,p,g] == sum_k k*C     the seated count is the selected size
///
/// An inactive table forces zero seats; an active one forces a seat count
/// within the effective bounds.
fn constrain_table_sizes<M: SolverModel>(
    model: M,
    space: &ProblemSpace,
    seats: &SeatVariableMap,
    tables: &TableVariableMap,
    counts: &CountVariableMap,
) -> M {
    counts.iter().fold(model, |m, (&(i, g), selectors)| {
        let table = tables[&(i, g)];

        let selected = selectors
            .iter()
            .fold(Expression::from(0.0), |sum, &(_, selector)| sum + selector);
        let m = m.with(constraint!(selected == table));

        let seated = space.session_players[i]
            .iter()
            .fold(Expression::from(0.0), |sum, &p| sum + seats[&(i, p, g)]);
        let size = selectors
            .iter()
            .fold(Expression::from(0.0), |sum, &(k, selector)| {
                sum + selector * f64::from(k)
            });
        m.with(constraint!(seated == size))
    })
}

fn constrain_table_limit_per_session<M: SolverModel>(
    model: M,
    space: &ProblemSpace,
    tables: &TableVariableMap,
    table_limit: Option<u32>,
) -> M {
    let Some(limit) = table_limit else {
        return model;
    };

    space
        .session_games
        .iter()
        .enumerate()
        .fold(model, |m, (i, playable)| {
            if playable.is_empty() {
                return m;
            }

            let running = playable
                .iter()
                .fold(Expression::from(0.0), |sum, &g| sum + tables[&(i, g)]);
            m.with(running.leq(f64::from(limit)))
        })
}

/// Games with a limited number of physical copies get their total table count
/// capped across the whole convention.
fn constrain_shared_game_caps<M: SolverModel>(
    model: M,
    space: &ProblemSpace,
    tables: &TableVariableMap,
    shared: &[SharedGame],
) -> M {
    shared.iter().fold(model, |m, declaration| {
        let Ok(g) = space.games.binary_search(&declaration.name) else {
            debug!(
                "shared game {} is not owned by any player, no cap needed",
                declaration.name
            );
            return m;
        };

        let running: Vec<Variable> = (0..space.sessions.len())
            .filter_map(|i| tables.get(&(i, g)).copied())
            .collect();
        if running.is_empty() {
            return m;
        }

        let total = running
            .iter()
            .fold(Expression::from(0.0), |sum, &table| sum + table);
        m.with(total.leq(f64::from(declaration.cap)))
    })
}

/// Estimates why no schedule exists: for each session, compare the number of
/// attendees against the most seats the session could possibly offer (table
/// limit times the largest effective max-players among playable games).
fn diagnose(space: &ProblemSpace, options: &SolveOptions) -> Diagnosis {
    let sessions = space
        .sessions
        .iter()
        .enumerate()
        .map(|(i, session)| {
            let attending = space.session_players[i].len();
            let playable_games = space.session_games[i].len();
            let widest_table = space.session_games[i]
                .iter()
                .map(|&g| space.bounds[&(i, g)].max)
                .max()
                .unwrap_or(0);
            let table_count = match options.table_limit {
                Some(limit) => (limit as usize).min(playable_games),
                None => playable_games,
            };

            SessionDiagnosis {
                session: session.name.clone(),
                attending,
                playable_games,
                capacity: table_count as u64 * u64::from(widest_table),
            }
        })
        .collect();

    Diagnosis { sessions }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GameRecord;

    fn game(name: &str, min_p: u32, max_p: u32, min_t: u32, max_t: u32) -> GameRecord {
        GameRecord {
            id: 0,
            name: name.to_string(),
            full_name: String::new(),
            min_players: min_p,
            max_players: max_p,
            min_playtime: min_t,
            max_playtime: max_t,
            popularity: BTreeMap::new(),
            owned: 0,
        }
    }

    fn player(name: &str, owns: &[&str], interests: &[&str], attends: &[usize]) -> Player {
        Player {
            name: name.to_string(),
            owns: owns.iter().map(|g| g.to_string()).collect(),
            interests: interests.iter().map(|g| g.to_string()).collect(),
            sessions: Some(attends.to_vec()),
        }
    }

    fn session(name: &str, length: i64) -> Session {
        Session {
            name: name.to_string(),
            length,
        }
    }

    #[test]
    fn out_of_range_session_index_is_a_consistency_error() {
        let catalog = Catalog::normalize(vec![], &[]);
        let players = [player("Alice", &["1830"], &[], &[2])];
        let sessions = [session("Friday", 240)];

        let result = ProblemSpace::build(&catalog, &players, &sessions);

        assert!(matches!(result, Err(ScheduleError::InputConsistency(_))));
    }

    #[test]
    fn non_positive_session_length_is_a_consistency_error() {
        let catalog = Catalog::normalize(vec![], &[]);
        let sessions = [session("Friday", -60)];

        let result = ProblemSpace::build(&catalog, &[], &sessions);

        assert!(matches!(result, Err(ScheduleError::InputConsistency(_))));
    }

    #[test]
    fn games_without_an_attending_owner_are_pruned() {
        let records = vec![game("1830", 3, 6, 180, 300), game("1817", 3, 6, 180, 300)];
        let players = [
            player("Alice", &["1830"], &[], &[0]),
            player("Bob", &["1817"], &[], &[1]),
        ];
        let sessions = [session("Friday", 300), session("Saturday", 300)];
        let catalog = Catalog::normalize(records, &players);

        let space = ProblemSpace::build(&catalog, &players, &sessions).expect("consistent input");

        // games is sorted: ["1817", "1830"]
        assert_eq!(space.session_games[0], vec![1]);
        assert_eq!(space.session_games[1], vec![0]);
    }

    #[test]
    fn games_longer_than_the_session_are_pruned() {
        let records = vec![game("marathon", 3, 6, 300, 420), game("filler", 3, 6, 60, 120)];
        let players = [player("Alice", &["marathon", "filler"], &[], &[0, 1])];
        let sessions = [session("Friday Eve", 180), session("Saturday", 360)];
        let catalog = Catalog::normalize(records, &players);

        let space = ProblemSpace::build(&catalog, &players, &sessions).expect("consistent input");

        // games is sorted: ["filler", "marathon"]
        assert_eq!(space.session_games[0], vec![0]);
        assert_eq!(space.session_games[1], vec![0, 1]);
    }

    #[test]
    fn popularity_tiebreak_never_outweighs_one_interest() {
        let mut records = vec![game("1830", 3, 6, 180, 300)];
        for k in 3..=6 {
            records[0].popularity.insert(k.to_string(), 1.0);
        }
        let players = [
            player("Alice", &["1830"], &[], &[0]),
            player("Bob", &[], &[], &[0]),
            player("Carol", &[], &[], &[0]),
        ];
        let sessions = [session("Friday", 300)];
        let catalog = Catalog::normalize(records, &players);
        let space = ProblemSpace::build(&catalog, &players, &sessions).expect("consistent input");

        let lambda = popularity_priority_weight(&space);

        // One active (session, game) pair whose best weight is 1.0.
        assert!(lambda * 1.0 < 1.0);
        assert!(lambda > 0.0);
    }
}
