use crate::filter::{ReconcilerConfig, SearchPolicy};
use crate::motion::{MAX_DAMPING, MIN_DAMPING, MotionConfig};
use crate::progress::ProgressConfig;
use crate::suggest::SuggestConfig;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const APP_DIR: &str = "pharmatrack-feedback";

/// Serialize a `Duration` as integer milliseconds.
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Every tuning constant of the engine, one section per component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub filter: ReconcilerConfig,
    #[serde(default)]
    pub suggest: SuggestConfig,
    #[serde(default)]
    pub motion: MotionConfig,
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "linux") {
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join(APP_DIR)
        } else {
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(format!(".{}", APP_DIR))
        };

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;
            info!("Created config directory: {:?}", config_dir);
        }

        Ok(config_dir.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        debug!("Loading config from: {:?}", config_path);

        if !config_path.exists() {
            info!("Config file doesn't exist, using defaults");
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
        Self::from_toml(&config_content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content).context("Invalid engine config")?;
        Ok(config.validated())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config to TOML")
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        debug!("Saving config to: {:?}", config_path);

        fs::write(&config_path, self.to_toml()?)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        info!("Config saved successfully");
        Ok(())
    }

    /// Clamp out-of-range values instead of rejecting the file.
    pub fn validated(mut self) -> Self {
        self.motion = self.motion.clamped();

        let progress = &mut self.progress;
        if !(0.0..1.0).contains(&progress.ceiling) {
            warn!("progress ceiling {} outside [0, 1), using 0.9", progress.ceiling);
            progress.ceiling = 0.9;
        }
        if !(progress.step > 0.0) || !(progress.finish_step > 0.0) {
            warn!("progress steps must be positive, using defaults");
            let defaults = ProgressConfig::default();
            progress.step = defaults.step;
            progress.finish_step = defaults.finish_step;
        }
        if progress.tick.is_zero() || progress.finish_tick.is_zero() {
            warn!("progress ticks must be non-zero, using defaults");
            let defaults = ProgressConfig::default();
            progress.tick = defaults.tick;
            progress.finish_tick = defaults.finish_tick;
        }

        if self.suggest.max_results == 0 {
            warn!("suggest max_results must be at least 1, using 5");
            self.suggest.max_results = 5;
        }
        if self.filter.search_key.trim().is_empty() {
            warn!("filter search_key is empty, using \"search\"");
            self.filter.search_key = "search".to_string();
        }
        self
    }
}

#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn progress(mut self, progress: ProgressConfig) -> Self {
        self.config.progress = progress;
        self
    }

    pub fn filter(mut self, filter: ReconcilerConfig) -> Self {
        self.config.filter = filter;
        self
    }

    pub fn suggest(mut self, suggest: SuggestConfig) -> Self {
        self.config.suggest = suggest;
        self
    }

    pub fn motion(mut self, motion: MotionConfig) -> Self {
        self.config.motion = motion;
        self
    }

    pub fn search_policy(mut self, policy: SearchPolicy) -> Self {
        self.config.filter.policy = policy;
        self
    }

    pub fn search_debounce(self, delay: Duration) -> Self {
        self.search_policy(SearchPolicy::Debounced { delay })
    }

    pub fn explicit_search(self) -> Self {
        self.search_policy(SearchPolicy::Explicit)
    }

    pub fn damping(mut self, damping: f64) -> Self {
        self.config.motion.damping = damping;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config.validated()
    }
}
