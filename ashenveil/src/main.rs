//! AI Dungeon Master adventure in the town of Ashenveil.
//!
//! Run with `OPENAI_API_KEY` set (directly or via a `.env` file):
//!
//! ```bash
//! cargo run -p ashenveil
//! ```
//!
//! Pass `--new` to discard the saved game and start over.

use ashenveil_core::{Console, DungeonMaster, GameEngine};
use std::io::{self, BufRead, Write};

const SAVE_FILE: &str = "ashenveil_save.json";
const DIVIDER_WIDTH: usize = 60;

/// Stdin/stdout console for interactive play.
struct StdConsole {
    stdin: io::Stdin,
}

impl StdConsole {
    fn new() -> Self {
        Self { stdin: io::stdin() }
    }
}

impl Console for StdConsole {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        print!("{prompt}");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match self.stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }

    fn print(&mut self, text: &str) {
        println!("{text}");
    }
}

fn print_banner() {
    let bar = "▓".repeat(DIVIDER_WIDTH);
    println!("\n{bar}");
    println!("  A S H E N V E I L");
    println!("{bar}");
    println!("\nA dark fantasy awaits. Type your actions freely.");
    println!("Commands: [inventory] [status] [memory] [world] [quit]");
    println!();
}

fn print_help() {
    println!("ashenveil - AI Dungeon Master adventure");
    println!();
    println!("Usage: ashenveil [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --new       Discard the saved game and start fresh");
    println!("  -h, --help  Show this help");
    println!();
    println!("Requires the OPENAI_API_KEY environment variable, directly or");
    println!("via a .env file in the working directory.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    if std::env::var("OPENAI_API_KEY").is_err() {
        eprintln!("Error: OPENAI_API_KEY environment variable not set.");
        eprintln!("Please set it in a .env file or with: export OPENAI_API_KEY=sk-...");
        std::process::exit(1);
    }

    let dm = DungeonMaster::from_env()?;
    let mut engine = GameEngine::load_or_new(dm, SAVE_FILE).await?;

    if args.iter().any(|a| a == "--new") {
        println!("Starting a new game...");
        engine.reset();
    }

    let mut console = StdConsole::new();
    print_banner();

    if engine.is_fresh() {
        println!("This looks like a new game.");
        if let Some(name) = console.read_line("What is your name, traveler? ") {
            let name = name.trim();
            if !name.is_empty() {
                engine.set_player_name(name);
            }
        }
    }

    engine.run(&mut console).await?;
    Ok(())
}
