use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub queue: QueueConfig,
    pub seating: SeatingConfig,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Call window before a CALLED party counts as a no-show (seconds)
    pub called_ttl_seconds: u64,
    /// How often the no-show cleaner runs (seconds)
    pub cleanup_interval_seconds: u64,
    /// Linear wait estimate: minutes of service time per party ahead
    pub per_party_service_minutes: u64,
}

#[derive(Debug, Clone)]
pub struct SeatingConfig {
    /// Four-seat tables created when the store holds none
    pub four_tops: u32,
    /// Six-seat tables created when the store holds none
    pub six_tops: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            called_ttl_seconds: 300, // 5 minutes to show up after a call
            cleanup_interval_seconds: 60,
            per_party_service_minutes: 10,
        }
    }
}

impl Default for SeatingConfig {
    fn default() -> Self {
        Self {
            four_tops: 8,
            six_tops: 2,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let node_id =
            std::env::var("INSTANCE_ID").unwrap_or_else(|_| uuid::Uuid::new_v4().to_string());

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let test_mode = std::env::var("TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let queue_defaults = QueueConfig::default();
        let queue = QueueConfig {
            called_ttl_seconds: env_u64("CALLED_TTL_SECONDS", queue_defaults.called_ttl_seconds),
            cleanup_interval_seconds: env_u64(
                "CLEANUP_INTERVAL_SECONDS",
                queue_defaults.cleanup_interval_seconds,
            ),
            per_party_service_minutes: env_u64(
                "SERVICE_MINUTES_PER_PARTY",
                queue_defaults.per_party_service_minutes,
            ),
        };

        let seating_defaults = SeatingConfig::default();
        let seating = SeatingConfig {
            four_tops: env_u64("TABLES_FOUR_TOP", u64::from(seating_defaults.four_tops)) as u32,
            six_tops: env_u64("TABLES_SIX_TOP", u64::from(seating_defaults.six_tops)) as u32,
        };

        let config = Config {
            node: NodeConfig {
                bind_address,
                data_dir,
                id: node_id,
            },
            queue,
            seating,
            test_mode,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.node.id.is_empty() {
            return Err(ConfigError::ValidationError(
                "INSTANCE_ID cannot be empty".to_string(),
            ));
        }

        if self.queue.called_ttl_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "CALLED_TTL_SECONDS must be greater than 0".to_string(),
            ));
        }

        if self.queue.cleanup_interval_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "CLEANUP_INTERVAL_SECONDS must be greater than 0".to_string(),
            ));
        }

        if self.seating.four_tops + self.seating.six_tops == 0 {
            tracing::warn!("No tables configured; parties can be called but never seated.");
        }

        Ok(())
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
