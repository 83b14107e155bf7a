//! Validated run configuration and on-disk layout.
//!
//! Layout under the base directory:
//!
//! ```text
//! <basedir>/
//!   block_file/
//!     logs/
//!       block_file.log
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use block_file_types::RetryConfig;

use crate::args::{Args, LogLevel, Method, Mode};
use crate::error::{Error, Result};

/// Name of the application, used for its directory and log file.
pub const APP_NAME: &str = "block_file";

const INSTANCE_ID_LEN: usize = 5;
const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Absolute base directory.
    pub base_dir: PathBuf,
    pub mode: Mode,
    pub method: Method,
    pub amqp_url: String,
    pub rpc_url: String,
    pub start_height: u64,
    pub batch_size: u32,
    pub block_file: PathBuf,
    pub instance_id: String,
    pub log_level: LogLevel,
    pub rpc_timeout: Duration,
    pub retry: RetryConfig,
    pub exit_on_completion: bool,
}

impl RunConfig {
    /// Validate parsed options, resolving a relative base directory under the home
    /// directory.
    pub fn from_args(args: Args) -> Result<Self> {
        Self::from_args_with_home(args, dirs::home_dir().as_deref())
    }

    pub fn from_args_with_home(args: Args, home: Option<&Path>) -> Result<Self> {
        if args.nb_blocks_per_call == 0 {
            return Err(Error::Config(
                "--nb-blocks-per-call must be at least 1".to_string(),
            ));
        }
        if args.rpc_timeout_secs == 0 {
            return Err(Error::Config(
                "--rpc-timeout-secs must be at least 1".to_string(),
            ));
        }
        if args.connect_backoff_ms > args.connect_max_backoff_ms {
            return Err(Error::Config(format!(
                "--connect-backoff-ms ({}) is larger than --connect-max-backoff-ms ({})",
                args.connect_backoff_ms, args.connect_max_backoff_ms
            )));
        }
        let instance_id = match args.instance_id {
            Some(id) if id.trim().is_empty() => {
                return Err(Error::Config("--instance-id must not be empty".to_string()))
            }
            Some(id) => id,
            None => generate_instance_id(),
        };

        Ok(Self {
            base_dir: resolve_base_dir(&args.basedir, home)?,
            mode: args.mode,
            method: args.method,
            amqp_url: args.amqp,
            rpc_url: args.rpc,
            start_height: args.start_block_height,
            batch_size: args.nb_blocks_per_call,
            block_file: args.block_file_path,
            instance_id,
            log_level: args.log_level,
            rpc_timeout: Duration::from_secs(args.rpc_timeout_secs),
            retry: RetryConfig::new(
                args.connect_retries,
                args.connect_backoff_ms,
                args.connect_max_backoff_ms,
            ),
            exit_on_completion: args.exit_on_completion,
        })
    }

    /// `block_file.<instance id>`
    pub fn app_id(&self) -> String {
        format!("{}.{}", APP_NAME, self.instance_id)
    }

    pub fn app_dir(&self) -> PathBuf {
        self.base_dir.join(APP_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.app_dir().join("logs")
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir().join(format!("{}.log", APP_NAME))
    }

    /// Create the application's directories under the base directory.
    pub fn create_dirs(&self) -> Result<()> {
        let dir = self.log_dir();
        fs::create_dir_all(&dir).map_err(|e| {
            Error::Config(format!("failed to create {}: {}", dir.display(), e))
        })
    }
}

/// Absolute paths are kept; relative ones are taken from the home directory.
pub fn resolve_base_dir(path: &Path, home: Option<&Path>) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    home.map(|home| home.join(path)).ok_or_else(|| {
        Error::Config(format!(
            "cannot resolve base directory {}: no home directory",
            path.display()
        ))
    })
}

/// Random base58 identifier used when no instance id is given.
pub fn generate_instance_id() -> String {
    uuid::Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(INSTANCE_ID_LEN)
        .map(|b| BASE58_ALPHABET[*b as usize % BASE58_ALPHABET.len()] as char)
        .collect()
}
