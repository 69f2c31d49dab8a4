use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;

use gamesched::schedule::plausible_interests;
use gamesched::{
    Catalog, GameRecord, Player, ScheduleError, Session, SharedGame, SolveOptions, read_json,
    solve,
};

/// Assigns convention attendees to game tables, one game per player per
/// session, maximizing satisfied interests.
#[derive(Parser, Debug)]
#[command(name = "gamesched")]
#[command(about = "MIP-based table scheduler for board game conventions", long_about = None)]
struct Cli {
    /// Players JSON file
    #[arg(long, default_value = "data/players.sample.json")]
    players: PathBuf,

    /// Sessions JSON file
    #[arg(long, default_value = "data/sessions.sample.json")]
    sessions: PathBuf,

    /// Game catalog JSON file
    #[arg(long, default_value = "games.json")]
    games: PathBuf,

    /// Maximum number of tables per session (default: unbounded)
    #[arg(long, value_name = "N")]
    table_limit: Option<u32>,

    /// Declare a game with limited physical copies as GAME or GAME:CAP;
    /// repeatable, the cap defaults to 1
    #[arg(long = "shared", value_name = "GAME[:CAP]")]
    shared: Vec<SharedGame>,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, ScheduleError> {
    let games: Vec<GameRecord> = read_json(&cli.games)?;
    let players: Vec<Player> = read_json(&cli.players)?;
    let sessions: Vec<Session> = read_json(&cli.sessions)?;

    let catalog = Catalog::normalize(games, &players);
    let options = SolveOptions {
        table_limit: cli.table_limit,
        shared: cli.shared.clone(),
    };

    match solve(&catalog, &players, &sessions, &options) {
        Ok(schedule) => {
            print!("{schedule}");
            info!(
                "satisfied {} out of {} plausible interests",
                schedule.satisfied_interests(&players),
                plausible_interests(&players, sessions.len())
            );
            Ok(ExitCode::SUCCESS)
        }
        // An infeasibility verdict is still a completed solve; exit zero so
        // wrappers can tell it apart from bad input.
        Err(ScheduleError::Infeasible(diagnosis)) => {
            println!("No feasible schedule exists.");
            print!("{diagnosis}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => Err(err),
    }
}
