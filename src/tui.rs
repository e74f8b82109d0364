//! The text user interface: a wagered match against the random bot.
//!
//! The human plays Dark. Moves are entered as four numbers,
//! `row col row col`, matching the coordinates printed around the board.

use crossterm::style::Stylize;
use draughts_engine::bot::{self, RandomBot};
use draughts_engine::mock::{MemoryLedger, MemoryWallet};
use draughts_engine::services::{Address, FeeSchedule, WalletSession};
use draughts_engine::{
    Board, Config, GameSession, GameStatus, Players, Position, Side, SharedWager, Turn,
    WagerController, WagerError, WagerState,
};
use rust_decimal::Decimal;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

const STARTING_BALANCE: u32 = 100;

pub struct Settings {
    pub config: Config,
    pub stake: Decimal,
    pub seed: Option<u64>,
}

impl Settings {
    /// Defaults, overridden by `DRAUGHTS_STAKE` and `DRAUGHTS_SEED`.
    pub fn from_env() -> Self {
        let mut settings = Settings {
            config: Config::default(),
            stake: Decimal::from(10),
            seed: None,
        };
        if let Ok(raw) = std::env::var("DRAUGHTS_STAKE") {
            match Decimal::from_str(raw.trim()) {
                Ok(stake) => settings.stake = stake,
                Err(err) => warn!(%raw, %err, "ignoring DRAUGHTS_STAKE"),
            }
        }
        if let Ok(raw) = std::env::var("DRAUGHTS_SEED") {
            match raw.trim().parse() {
                Ok(seed) => settings.seed = Some(seed),
                Err(err) => warn!(%raw, %err, "ignoring DRAUGHTS_SEED"),
            }
        }
        settings
    }
}

enum Command {
    Exit,
    Resign,
    Settle,
    Moves,
    Move(Position, Position),
}

/// Runs the main game loop for the text-based UI.
pub async fn run(settings: Settings) -> Result<(), WagerError> {
    let you = Address::new("you");
    let house = Address::new("bot");
    let ledger = Arc::new(
        MemoryLedger::new(
            FeeSchedule::new(settings.config.fee_basis_points),
            Address::new("treasury"),
        )
        .with_balance(you.clone(), Decimal::from(STARTING_BALANCE))
        .with_balance(house.clone(), Decimal::from(STARTING_BALANCE)),
    );
    let controller = Arc::new(WagerController::new(settings.config, Arc::clone(&ledger))?);
    let wallet = MemoryWallet::connected(you.clone(), Arc::clone(&ledger));

    println!("--- Draughts for stakes ---");
    let address = controller.authenticate(&wallet).await?;
    println!("Signed in as {address}, balance {}", wallet.balance(&address).await.unwrap_or_default());

    let wager = controller
        .create_wager(settings.stake, Players::new(you.clone(), house))
        .await?;
    println!("Escrowed a pot of {}. You play Dark (d/D) and move first.", wager.pot());
    println!("Enter moves as 'row col row col' (e.g. 5 2 4 3). Commands: moves, resign, settle, exit.");

    let shared = SharedWager::new(controller, wager);
    let mut bot = match settings.seed {
        Some(seed) => RandomBot::seeded(seed),
        None => RandomBot::new(),
    };

    loop {
        let game = shared.game().await;
        let state = shared.state().await;

        if game.status().is_terminal() {
            announce(game.status());
            if state.is_closed() {
                report(&state);
                break;
            }
            println!("{}", "Settlement is pending. Type 'settle' to retry or 'exit' to leave.".yellow());
        } else {
            println!();
            print!("{}", render(game.board(), &game));
        }

        if game.status() == GameStatus::InProgress && game.side_to_move() == Side::Light {
            println!("Computer is thinking...");
            let Some(mv) = bot::next_move(&game, &mut bot) else {
                break;
            };
            println!("Computer moves: {mv}");
            if let Err(err) = shared.play(mv).await {
                print_error(&err);
            }
            continue;
        }

        let Some(command) = prompt(&game) else {
            println!("Could not read that. Try 'row col row col'.");
            continue;
        };
        match command {
            Command::Exit => break,
            Command::Resign => match shared.forfeit(Side::Dark).await {
                Ok(_) => {}
                Err(err) => print_error(&err),
            },
            Command::Settle => match shared.settle().await {
                Ok(_) => {}
                Err(err) => print_error(&err),
            },
            Command::Moves => {
                let listed: Vec<String> = game.legal_moves().iter().map(|mv| mv.to_string()).collect();
                println!("Legal moves: {}", listed.join(", "));
            }
            Command::Move(from, to) => {
                if let Err(err) = human_move(&shared, &game, from, to).await {
                    print_error(&err);
                }
            }
        }
    }

    println!("Final balance: {}", ledger.balance_of(&you).await);
    Ok(())
}

async fn human_move(
    shared: &SharedWager<Arc<MemoryLedger>>,
    game: &GameSession,
    from: Position,
    to: Position,
) -> Result<(), WagerError> {
    match game.forced_continuation() {
        Some(forced) if forced != from => {
            println!("You must keep jumping with the piece on {forced}.");
            return Ok(());
        }
        Some(_) => {}
        None => {
            shared.select(from).await?;
        }
    }
    if let Turn::Continues { from } = shared.move_to(to).await? {
        println!("{}", format!("Capture again from {from}!").green());
    }
    Ok(())
}

fn prompt(game: &GameSession) -> Option<Command> {
    match game.forced_continuation() {
        Some(from) => print!("Continue jumping from {from}: "),
        None => print!("Your move: "),
    }
    let _ = io::stdout().flush();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).unwrap_or(0) == 0 {
        return Some(Command::Exit);
    }
    parse_command(input.trim())
}

fn parse_command(input: &str) -> Option<Command> {
    match input {
        "exit" | "quit" => return Some(Command::Exit),
        "resign" => return Some(Command::Resign),
        "settle" => return Some(Command::Settle),
        "moves" => return Some(Command::Moves),
        _ => {}
    }
    let numbers: Vec<u8> = input
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse().ok())
        .collect::<Option<_>>()?;
    match numbers.as_slice() {
        &[fr, fc, tr, tc] => Some(Command::Move(Position::new(fr, fc), Position::new(tr, tc))),
        _ => None,
    }
}

fn render(board: &Board, game: &GameSession) -> String {
    let targets: Vec<Position> = game.legal_moves().iter().map(|mv| mv.to).collect();
    let size = board.size();
    let mut out = String::from("   ");
    for c in 0..size {
        out.push_str(&format!("{c:>2}"));
    }
    out.push('\n');
    for r in 0..size {
        out.push_str(&format!("{r:>2} "));
        for c in 0..size {
            let pos = Position::new(r as u8, c as u8);
            out.push(' ');
            let cell = match board.piece_at(pos).ok().flatten() {
                Some(piece) if piece.side == Side::Dark => piece.to_layout_char().red().bold().to_string(),
                Some(piece) => piece.to_layout_char().cyan().bold().to_string(),
                None if targets.contains(&pos) => '*'.dark_green().to_string(),
                None if pos.is_playable() => '.'.dark_grey().to_string(),
                None => ' '.to_string(),
            };
            out.push_str(&cell);
        }
        out.push('\n');
    }
    out
}

fn announce(status: GameStatus) {
    match status {
        GameStatus::Won(Side::Dark) => println!("{}", "You win!".green().bold()),
        GameStatus::Won(Side::Light) => println!("{}", "The computer wins.".red().bold()),
        GameStatus::Drawn(reason) => println!("Draw ({reason:?})."),
        GameStatus::NotStarted | GameStatus::InProgress => {}
    }
}

fn report(state: &WagerState) {
    if state.receipts().is_empty() {
        println!("Wager closed: {state:?}");
    }
    for receipt in state.receipts() {
        println!(
            "Paid {} to {} from {} (fee {}).",
            receipt.amount, receipt.recipient, receipt.escrow_id, receipt.fee
        );
    }
}

fn print_error(err: &WagerError) {
    if err.is_financial() {
        println!("{}", format!("Transaction failed: {err}. Type 'settle' to retry.").yellow());
    } else {
        println!("Invalid move: {err}. Please try again.");
    }
}
