use clap::Subcommand;
use roundkit_core::Config;

#[derive(Subcommand)]
pub enum GamesAction {
    /// List configured games
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one game's round parameters as TOML
    Show {
        /// Game id
        id: String,
    },
}

pub fn run(action: GamesAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    match action {
        GamesAction::List { json } => {
            if json {
                let games: Vec<_> = config.games.values().collect();
                println!("{}", serde_json::to_string_pretty(&games)?);
            } else {
                for (id, game) in &config.games {
                    let parts: Vec<_> = game.evaluator.leaves().iter().map(|e| e.name()).collect();
                    println!(
                        "{id:<14} {:>3} rounds  {:<10} {}",
                        game.total_rounds,
                        layout_name(game),
                        parts.join("+")
                    );
                }
            }
        }
        GamesAction::Show { id } => {
            let game = config.game(&id)?;
            print!("{}", toml::to_string_pretty(game)?);
        }
    }
    Ok(())
}

fn layout_name(game: &roundkit_core::RoundConfig) -> &'static str {
    match game.layout {
        roundkit_core::TargetLayout::Single => "single",
        roundkit_core::TargetLayout::Distractors { .. } => "distractors",
        roundkit_core::TargetLayout::Matching { .. } => "matching",
    }
}
