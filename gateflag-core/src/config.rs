//! YAML configuration for a Gateflag environment.
//!
//! # File layout
//!
//! ```text
//! gateflag.yaml   (mode 0600, created by `gateflag init`)
//! global.yaml     (global stack template, path relative to gateflag.yaml)
//! team.yaml       (per-team stack template)
//! ```
//!
//! # API pattern
//!
//! Loading has two forms:
//! - `load_at(path, env)`: explicit path and environment lookup; used in tests
//! - `load(path)`: reads the real process environment, delegates to `load_at`
//!
//! Environment overrides are applied exactly once, at load time.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::naming::StackNamer;
use crate::types::{ParameterSet, Team};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "gateflag.yaml";

pub const ENV_SECRET: &str = "GATEFLAG_SECRET";
pub const ENV_FLAG_SERVER_HOST: &str = "FLAG_SERVER_HOST";
pub const ENV_REGION: &str = "AWS_REGION";

const DEFAULT_SECRET: &str = "_something_should_be_kept_secret_1337";
const FLAG_SERVER_HOST_PARAM: &str = "FlagServerHost";

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Root of `gateflag.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Environment name; prefixes every stack name.
    pub environment: String,
    pub region: String,
    pub templates: TemplatePaths,
    #[serde(default)]
    pub global_parameters: ParameterSet,
    #[serde(default)]
    pub team_parameters: ParameterSet,
    #[serde(default)]
    pub image: ImageSlot,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub wait: WaitSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    /// Maximum number of team stacks deployed at once.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Placeholder secret substituted into the global template. Never persisted.
    #[serde(skip)]
    pub secret: String,
}

/// Template file locations, relative to the config file's directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePaths {
    pub global: PathBuf,
    pub team: PathBuf,
}

/// Structural address of the team machine's image reference.
///
/// `Resources.<resource>.Properties.<property>` holds `{ Ref: <parameter> }`
/// where `<parameter>` flips between `primary` and `alternate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSlot {
    pub resource: String,
    pub property: String,
    pub primary: String,
    pub alternate: String,
}

impl Default for ImageSlot {
    fn default() -> Self {
        Self {
            resource: "CTFMachineEC2Instance".to_string(),
            property: "ImageId".to_string(),
            primary: "CTFMachineAMI1".to_string(),
            alternate: "CTFMachineAMI2".to_string(),
        }
    }
}

/// Convergence polling policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitSettings {
    pub poll_interval_secs: u64,
    pub max_wait_secs: u64,
}

impl WaitSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self { poll_interval_secs: 5, max_wait_secs: 3600 }
    }
}

/// Caller-level retry policy for transient control-plane failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Attempts including the first one.
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 2000, max_delay_ms: 30_000 }
    }
}

fn default_parallelism() -> usize {
    1
}

impl Default for Config {
    fn default() -> Self {
        let environment = "Gateflag".to_string();
        let global_parameters: ParameterSet = [
            ("EnvironmentName", environment.as_str()),
            (FLAG_SERVER_HOST_PARAM, "https://flaggy.free.beeceptor.com"),
        ]
        .into_iter()
        .collect();
        let team_parameters: ParameterSet = [
            ("EnvironmentName", environment.as_str()),
            ("CTFMachineAMI1", "ami-0015ec7d1ef8504ee"),
            ("CTFMachineAMI2", "ami-0a1e7a1a9eaf0fdba"),
            ("CTFEC2KeyPair", "test-infra-lks"),
        ]
        .into_iter()
        .collect();

        Self {
            environment,
            region: "ap-southeast-1".to_string(),
            templates: TemplatePaths {
                global: PathBuf::from("global.yaml"),
                team: PathBuf::from("team.yaml"),
            },
            global_parameters,
            team_parameters,
            image: ImageSlot::default(),
            teams: vec![Team::new("Team01", "10.0.1.101"), Team::new("Team02", "10.0.1.102")],
            wait: WaitSettings::default(),
            retry: RetrySettings::default(),
            parallelism: default_parallelism(),
            secret: DEFAULT_SECRET.to_string(),
        }
    }
}

impl Config {
    pub fn namer(&self) -> StackNamer {
        StackNamer::new(&self.environment)
    }

    pub fn team(&self, name: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.name.0 == name)
    }

    /// Resolve template paths against `base` (normally the config file's directory).
    pub fn resolve_templates(&mut self, base: &Path) {
        if self.templates.global.is_relative() {
            self.templates.global = base.join(&self.templates.global);
        }
        if self.templates.team.is_relative() {
            self.templates.team = base.join(&self.templates.team);
        }
    }

    /// Apply environment overrides using `lookup` as the variable source.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.secret = lookup(ENV_SECRET).unwrap_or_else(|| DEFAULT_SECRET.to_string());
        if let Some(host) = lookup(ENV_FLAG_SERVER_HOST) {
            self.global_parameters.insert(FLAG_SERVER_HOST_PARAM, host);
        }
        if let Some(region) = lookup(ENV_REGION) {
            self.region = region;
        }
    }

    /// Reject configurations the provisioner cannot act on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment.trim().is_empty() {
            return Err(ConfigError::Invalid("environment must not be empty".into()));
        }
        if self.parallelism == 0 {
            return Err(ConfigError::Invalid("parallelism must be at least 1".into()));
        }
        if self.wait.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("wait.poll_interval_secs must be at least 1".into()));
        }
        if self.image.primary == self.image.alternate {
            return Err(ConfigError::Invalid(
                "image.primary and image.alternate must differ".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for team in &self.teams {
            if team.name.0.is_empty() {
                return Err(ConfigError::Invalid("team names must not be empty".into()));
            }
            if !seen.insert(&team.name) {
                return Err(ConfigError::Invalid(format!("duplicate team '{}'", team.name)));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load and validate the config at `path`, applying overrides from `lookup`.
///
/// Returns `ConfigError::NotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at<F>(path: &Path, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !path.exists() {
        return Err(ConfigError::NotFound { path: path.to_path_buf() });
    }
    let contents = std::fs::read_to_string(path)?;
    let mut config: Config = serde_yaml::from_str(&contents)
        .map_err(|e| ConfigError::Parse { path: path.to_path_buf(), source: e })?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_templates(base);
    config.apply_env(lookup);
    config.validate()?;
    Ok(config)
}

/// `load_at` convenience wrapper reading the process environment.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    load_at(path, |key| std::env::var(key).ok())
}

// ---------------------------------------------------------------------------
// Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically write `config` to `path`.
///
/// Write flow: serialize → `.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| CONFIG_FILE.to_string());
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Write the default configuration to `path`.
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn init_at(path: &Path, force: bool) -> Result<Config, ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists { path: path.to_path_buf() });
    }
    let config = Config::default();
    save_at(path, &config)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
