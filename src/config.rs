use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::ClientResult;

#[derive(Parser, Debug)]
#[command(name = "pixara", about = "A headless client for the PixaraX social feed")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the PixaraX API
    #[arg(long, env = "PIXARA_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Path to data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Log in and store the credential pair
    Login { username: String, password: String },
    /// Create an account
    Register {
        username: String,
        email: String,
        password: String,
        confirm_password: String,
    },
    /// Forget the stored credentials
    Logout,
    /// Show the authenticated user
    Whoami,
    /// Show the home feed
    Feed,
    /// Show the explore feed
    Explore,
    /// Show a profile (defaults to your own)
    Profile { user_id: Option<u64> },
    /// Publish a post
    Post {
        #[arg(long, default_value = "")]
        caption: String,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Delete one of your posts
    DeletePost { post_id: u64 },
    /// Change the caption of one of your posts
    EditPost { post_id: u64, caption: String },
    /// Like or unlike a post
    Like { post_id: u64 },
    /// Follow or unfollow a user
    Follow { user_id: u64 },
    /// List the comments of a post
    Comments { post_id: u64 },
    /// Comment on a post
    Comment { post_id: u64, content: String },
    /// Edit one of your comments
    EditComment {
        post_id: u64,
        comment_id: u64,
        content: String,
    },
    /// Delete one of your comments
    DeleteComment { post_id: u64, comment_id: u64 },
    /// Update your profile
    Settings {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        birthdate: Option<String>,
        #[arg(long)]
        profile_picture: Option<PathBuf>,
        #[arg(long)]
        cover_photo: Option<PathBuf>,
    },
    /// Show follower and following counts for a user
    Stats { user_id: u64 },
    /// List the followers of a user
    Followers { user_id: u64 },
    /// List who a user follows
    Following { user_id: u64 },
    /// Look up a user id by username
    Resolve { username: String },
}

impl Command {
    /// Commands that act on a stored session and so re-validate it first.
    pub fn uses_stored_session(&self) -> bool {
        !matches!(
            self,
            Command::Login { .. } | Command::Register { .. } | Command::Logout
        )
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub safety: SafetyConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Transport timeout; `None` keeps the platform default.
    pub timeout_secs: Option<u64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SessionConfig {
    pub credentials_path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SafetyConfig {
    pub debounce_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: None,
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref url) = cli.api_url {
            config.api.base_url = url.clone();
        }

        if config.session.credentials_path.is_none() {
            config.session.credentials_path = Some(data_dir.join("credentials.json"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".pixara")
        })
    }

    /// Base URL with a trailing slash so relative endpoint paths join under it.
    pub fn base_url(&self) -> ClientResult<Url> {
        parse_base_url(&self.api.base_url)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.session
            .credentials_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("credentials.json"))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.api.timeout_secs.map(Duration::from_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.safety.debounce_ms)
    }
}

pub fn parse_base_url(raw: &str) -> ClientResult<Url> {
    let trimmed = raw.trim_end_matches('/');
    Ok(Url::parse(&format!("{}/", trimmed))?)
}
