//! Client configuration: defaults, then a config file, then command-line
//! flags.

use std::path::Path;
use std::str::FromStr;

pub use clap::Parser;
use resp::Charset;
use resp::CodecError;
use serde::Deserialize;
use serde::Serialize;
use telemetry::TelemetryError;
use thiserror::Error;

const DEFAULT_CONFIG: &str = "conf/radish.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("Failed to read configuration file '{path}': {source}")]
	Io {
		source: std::io::Error,
		path: String,
	},

	#[error("Failed to parse TOML configuration: {0}")]
	TomlParse(#[from] toml::de::Error),

	#[error("Failed to parse JSON configuration: {0}")]
	JsonParse(#[from] serde_json::Error),

	#[error("Failed to parse YAML configuration: {0}")]
	YamlParse(#[from] serde_yaml::Error),

	#[error("Unsupported configuration format: {0}")]
	UnsupportedFormat(String),

	#[error("Configuration file has no extension")]
	NoExtension,

	#[error("Invalid charset: {0}")]
	InvalidCharset(#[from] CodecError),

	#[error("read_buffer_size must be greater than zero")]
	ZeroReadBufferSize,

	#[error("Failed to initialize logger: {0}")]
	Telemetry(#[from] TelemetryError),
}

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
	/// Configuration file path (TOML, JSON, or YAML).
	/// Defaults to conf/radish.toml if it exists.
	#[arg(short, long)]
	pub config: Option<String>,

	/// Server hostname
	#[arg(short = 'H', long)]
	pub host: Option<String>,

	/// Server port
	#[arg(short, long)]
	pub port: Option<u16>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long)]
	pub log_level: Option<String>,

	/// Charset of command arguments and replies (utf-8, ascii, latin1,
	/// utf-16be, utf-16le)
	#[arg(long)]
	pub charset: Option<String>,

	/// Bytes requested from the socket per read
	#[arg(long)]
	pub read_buffer_size: Option<usize>,

	/// Command and arguments; read from stdin when absent
	#[arg(trailing_var_arg = true, allow_hyphen_values = true)]
	pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
	pub host: String,
	pub port: u16,
	pub log_level: String,
	pub charset: String,
	pub read_buffer_size: usize,
	/// Largest bulk string accepted from the server
	pub max_bulk_len: usize,
	/// Merge small request spans before writing
	pub compact: bool,
}

impl ClientConfig {
	pub fn addr(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}

	pub fn charset(&self) -> Result<Charset, ConfigError> {
		Ok(Charset::from_str(&self.charset)?)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		self.charset()?;
		if self.read_buffer_size == 0 {
			return Err(ConfigError::ZeroReadBufferSize);
		}
		Ok(())
	}

	fn apply(&mut self, args: &Cli) {
		if let Some(host) = &args.host {
			self.host = host.clone();
		}
		if let Some(port) = args.port {
			self.port = port;
		}
		if let Some(log_level) = &args.log_level {
			self.log_level = log_level.clone();
		}
		if let Some(charset) = &args.charset {
			self.charset = charset.clone();
		}
		if let Some(size) = args.read_buffer_size {
			self.read_buffer_size = size;
		}
	}
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".into(),
			port: 6379,
			log_level: "warn".into(),
			charset: "utf-8".into(),
			read_buffer_size: 4096,
			max_bulk_len: resp::DEFAULT_MAX_BULK_LEN,
			compact: true,
		}
	}
}

/// Build the effective configuration and install the logger.
pub fn setup(args: &Cli) -> Result<ClientConfig, ConfigError> {
	let config = resolve(args)?;
	telemetry::init(&config.log_level)?;
	log::debug!("configuration: {:?}", config);
	Ok(config)
}

fn resolve(args: &Cli) -> Result<ClientConfig, ConfigError> {
	let mut config = match args.config.as_deref() {
		Some(p) => load_from_file(p)?,
		None if Path::new(DEFAULT_CONFIG).exists() => load_from_file(DEFAULT_CONFIG)?,
		None => ClientConfig::default(),
	};
	config.apply(args);
	config.validate()?;
	Ok(config)
}

fn load_from_file<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
	let path_ref = path.as_ref();
	let content = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
		path: path_ref.display().to_string(),
		source,
	})?;

	let extension = path_ref
		.extension()
		.and_then(|ext| ext.to_str())
		.ok_or(ConfigError::NoExtension)?;

	match extension.to_lowercase().as_str() {
		"toml" => Ok(toml::from_str(&content)?),
		"json" => Ok(serde_json::from_str(&content)?),
		"yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
		_ => Err(ConfigError::UnsupportedFormat(extension.to_string())),
	}
}
