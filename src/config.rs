//! Settings: built-in defaults, then an optional TOML file, then environment
//! variables, then command-line flags.

use std::{
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
};

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_CONFIG_FILE: &str = "blog.toml";
const DEFAULT_CONTENT_DIR: &str = "content";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_COMMENTS_PATH: &str = "data/comments.json";

#[derive(Debug, Parser)]
#[command(name = "markdown-blog", version, about = "Markdown blog server")]
pub struct CliArgs {
    /// Path to a TOML settings file (defaults to ./blog.toml when present).
    #[arg(long = "config", env = "BLOG_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve the blog and the comments API.
    Serve(ServeArgs),
    /// Render every page to a directory.
    Build(BuildArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    /// Override the listening port.
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Override the content directory.
    #[arg(long = "content-dir", value_name = "DIR")]
    pub content_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct BuildArgs {
    /// Output directory for the generated site.
    #[arg(long = "out", value_name = "DIR", default_value = "dist")]
    pub out_dir: PathBuf,

    /// Override the content directory.
    #[arg(long = "content-dir", value_name = "DIR")]
    pub content_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStorage {
    Memory,
    File,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSettings {
    pub content_dir: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dev: Option<bool>,
    #[serde(default)]
    pub comments: RawComments,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawComments {
    pub storage: Option<CommentStorage>,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub content_dir: PathBuf,
    pub addr: SocketAddr,
    pub is_development: bool,
    pub comments: CommentSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentSettings {
    Memory,
    File(PathBuf),
}

impl RawSettings {
    /// Reads `path`, or `blog.toml` if no path was given and it exists.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Toml { path, source })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            let parsed = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: port.clone(),
            })?;
            self.port = Some(parsed);
        }
        if let Some(env) = lookup("RUST_ENV") {
            self.dev = Some(env == "development");
        }
        if let Some(dir) = lookup("BLOG_CONTENT_DIR") {
            self.content_dir = Some(dir.into());
        }
        if let Some(path) = lookup("BLOG_COMMENTS_PATH") {
            self.comments.path = Some(path.into());
        }
        Ok(())
    }

    pub fn apply_serve_overrides(&mut self, args: &ServeArgs) {
        if let Some(port) = args.port {
            self.port = Some(port);
        }
        if let Some(dir) = &args.content_dir {
            self.content_dir = Some(dir.clone());
        }
    }

    pub fn apply_build_overrides(&mut self, args: &BuildArgs) {
        if let Some(dir) = &args.content_dir {
            self.content_dir = Some(dir.clone());
        }
    }
}

impl Settings {
    pub fn from_raw(raw: RawSettings) -> Result<Self, ConfigError> {
        let host = raw.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
        let ip: IpAddr = host.parse().map_err(|_| ConfigError::InvalidValue {
            key: "host",
            value: host.clone(),
        })?;
        let port = raw.port.unwrap_or(DEFAULT_PORT);

        let comments = match raw.comments.storage.unwrap_or(CommentStorage::File) {
            CommentStorage::Memory => CommentSettings::Memory,
            CommentStorage::File => CommentSettings::File(
                raw.comments
                    .path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_COMMENTS_PATH)),
            ),
        };

        Ok(Self {
            content_dir: raw
                .content_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONTENT_DIR)),
            addr: SocketAddr::new(ip, port),
            is_development: raw.dev.unwrap_or(false),
            comments,
        })
    }
}
