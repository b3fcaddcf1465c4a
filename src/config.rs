// src/config.rs
use crate::cards::CardKind;
use crate::constants::{DEFAULT_QUOTE_PROVIDER, DEFAULT_QUOTE_RELAY};
use crate::delivery::ExportAction;
use crate::error::AppError;
use crate::quotes::QuoteClient;
use crate::store::{DataStore, MemoryStore, RestStore};
use crate::types::{StoreKey, Theme, ValidatedUrl};
use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

pub const ENV_STORE_URL: &str = "MARKETDESK_STORE_URL";
pub const ENV_STORE_KEY: &str = "MARKETDESK_STORE_KEY";
pub const ENV_REVALIDATE_SECRET: &str = "MARKETDESK_REVALIDATE_SECRET";
pub const ENV_QUOTE_RELAY: &str = "MARKETDESK_QUOTE_RELAY";
pub const ENV_QUOTE_PROVIDER: &str = "MARKETDESK_QUOTE_PROVIDER";
pub const ENV_DOWNLOAD_DIR: &str = "MARKETDESK_DOWNLOAD_DIR";
pub const ENV_USER_AGENT: &str = "MARKETDESK_USER_AGENT";

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the dashboard API
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:3000")]
        bind: SocketAddr,
    },
    /// Capture a share card and deliver it
    Export {
        /// Card to export (e.g. "market-weather", "daily-news")
        card: CardKind,

        /// Theme the card is captured in
        #[arg(long, default_value = "light")]
        theme: Theme,

        /// Where the captured PNG goes
        #[arg(short, long, value_enum, default_value_t = ActionArg::Download)]
        action: ActionArg,

        /// Directory downloads are saved to (overrides MARKETDESK_DOWNLOAD_DIR)
        #[arg(short = 'o', long)]
        out_dir: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionArg {
    Share,
    Copy,
    Download,
}

impl From<ActionArg> for ExportAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Share => ExportAction::Share,
            ActionArg::Copy => ExportAction::Copy,
            ActionArg::Download => ExportAction::Download,
        }
    }
}

/// Hosted store location and credentials.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub url: ValidatedUrl,
    pub key: StoreKey,
}

/// Resolved configuration, validated and ready to drive either subcommand.
#[derive(Debug, Clone)]
pub struct Config {
    /// `None` runs against an empty in-memory store.
    pub store: Option<StoreSettings>,
    pub revalidate_secret: Option<String>,
    pub quote_relay: String,
    pub quote_provider: String,
    pub download_dir: PathBuf,
    pub user_agent: String,
    pub verbose: bool,
}

impl Config {
    /// Resolves configuration from the process environment.
    pub fn resolve(verbose: bool) -> Result<Self, AppError> {
        Self::resolve_with(verbose, |name| std::env::var(name).ok())
    }

    /// Resolves configuration from an arbitrary variable lookup.
    pub fn resolve_with(
        verbose: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let store = match (var(ENV_STORE_URL), var(ENV_STORE_KEY)) {
            (Some(url), Some(key)) => Some(StoreSettings {
                url: ValidatedUrl::parse(&url)?,
                key: StoreKey::new(key)?,
            }),
            (Some(_), None) => {
                return Err(AppError::MissingConfiguration(format!(
                    "{} is set but {} is not",
                    ENV_STORE_URL, ENV_STORE_KEY
                )))
            }
            _ => None,
        };

        Ok(Self {
            store,
            revalidate_secret: var(ENV_REVALIDATE_SECRET),
            quote_relay: var(ENV_QUOTE_RELAY).unwrap_or_else(|| DEFAULT_QUOTE_RELAY.to_string()),
            quote_provider: var(ENV_QUOTE_PROVIDER)
                .unwrap_or_else(|| DEFAULT_QUOTE_PROVIDER.to_string()),
            download_dir: var(ENV_DOWNLOAD_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            user_agent: var(ENV_USER_AGENT).unwrap_or_default(),
            verbose,
        })
    }

    /// The configured data store, or an empty in-memory one.
    pub fn data_store(&self) -> Result<Arc<dyn DataStore>, AppError> {
        match &self.store {
            Some(settings) => Ok(Arc::new(RestStore::new(
                settings.url.clone(),
                &settings.key,
            )?)),
            None => {
                log::warn!(
                    "{} / {} not set; serving from an empty in-memory store",
                    ENV_STORE_URL,
                    ENV_STORE_KEY
                );
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }

    pub fn quote_client(&self) -> QuoteClient {
        QuoteClient::new(self.quote_relay.clone(), self.quote_provider.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(vars: &[(&str, &str)]) -> Result<Config, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::resolve_with(false, |name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = resolve(&[]).unwrap();
        assert!(config.store.is_none());
        assert!(config.revalidate_secret.is_none());
        assert_eq!(config.quote_relay, DEFAULT_QUOTE_RELAY);
        assert_eq!(config.quote_provider, DEFAULT_QUOTE_PROVIDER);
        assert_eq!(config.download_dir, PathBuf::from("."));
    }

    #[test]
    fn store_needs_both_url_and_key() {
        let err = resolve(&[(ENV_STORE_URL, "https://db.example.com")]).unwrap_err();
        assert!(matches!(err, AppError::MissingConfiguration(_)));

        let config = resolve(&[
            (ENV_STORE_URL, "https://db.example.com"),
            (ENV_STORE_KEY, "service-role-key"),
        ])
        .unwrap();
        assert!(config.store.is_some());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = resolve(&[(ENV_REVALIDATE_SECRET, "  ")]).unwrap();
        assert!(config.revalidate_secret.is_none());
    }

    #[test]
    fn parses_export_command() {
        let cli = CommandLineInput::try_parse_from([
            "marketdesk",
            "export",
            "market-weather",
            "--theme",
            "dark",
            "--action",
            "copy",
        ])
        .unwrap();
        match cli.command {
            Command::Export {
                card,
                theme,
                action,
                out_dir,
            } => {
                assert_eq!(card, CardKind::MarketWeather);
                assert_eq!(theme, Theme::Dark);
                assert_eq!(ExportAction::from(action), ExportAction::Copy);
                assert!(out_dir.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
