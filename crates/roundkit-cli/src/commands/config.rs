use clap::Subcommand;
use roundkit_core::storage::builtin_games;
use roundkit_core::{Config, ConfigError};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value
    Get {
        /// Dot-separated key, e.g. "games.rhythm.response_timeout_ms"
        key: String,
    },
    /// Change one value and save
    Set {
        /// Dot-separated key, e.g. "games.reaction.total_rounds"
        key: String,
        /// New value; JSON for tables, `none` to clear an optional game field
        value: String,
    },
    /// Print the whole configuration
    List {
        /// Output as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
    /// Restore defaults, or only one game's preset
    Reset {
        /// Built-in game to restore; everything else is kept
        #[arg(long)]
        game: Option<String>,
    },
    /// Print the config file location
    Path,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key).ok_or(ConfigError::UnknownKey(key))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if let Some(stored) = config.get(&key) {
                println!("{key} = {stored}");
            }
        }
        ConfigAction::List { json } => {
            let config = Config::load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }
        ConfigAction::Reset { game: None } => {
            Config::default().save()?;
            println!("config reset to defaults");
        }
        ConfigAction::Reset { game: Some(id) } => {
            let preset = builtin_games()
                .remove(&id)
                .ok_or_else(|| ConfigError::UnknownGame(id.clone()))?;
            let mut config = Config::load()?;
            config.games.insert(id.clone(), preset);
            config.save()?;
            println!("{id} restored to its built-in preset");
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
    }
    Ok(())
}
