use std::{net::SocketAddr, time::Duration};

use reqwest::Url;
use serde::Deserialize;
use svc_error::extension::sentry::Config as SentryConfig;

use crate::backend::profile::Profile;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub http: HttpConfig,
    pub metrics: Option<MetricsConfig>,
    pub sentry: Option<SentryConfig>,
    pub graphql: GraphqlConfig,
    pub aws: AwsConfig,
    pub opentok: OpentokConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub distribution: DistributionConfig,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

pub fn load() -> Result<Config, config::ConfigError> {
    let mut parser = config::Config::default();
    parser.merge(config::File::with_name("App").required(false))?;
    parser.merge(config::Environment::with_prefix("APP").separator("__"))?;
    parser.try_into::<Config>()
}

#[derive(Clone, Debug, Deserialize)]
pub struct HttpConfig {
    pub listener_address: SocketAddr,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MetricsConfig {
    pub http: MetricsHttpConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MetricsHttpConfig {
    pub bind_address: SocketAddr,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GraphqlConfig {
    pub url: Url,
    pub admin_secret: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AwsConfig {
    pub region: Option<String>,
    pub medialive_role_arn: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OpentokConfig {
    pub api_key: String,
    pub api_secret: String,
    /// Defaults to the public OpenTok API.
    #[serde(default)]
    pub api_url: Option<Url>,
    #[serde(with = "humantime_serde", default = "OpentokConfig::default_token_ttl")]
    pub token_ttl: Duration,
    #[serde(with = "humantime_serde", default = "OpentokConfig::default_jwt_ttl")]
    pub jwt_ttl: Duration,
}

impl OpentokConfig {
    fn default_token_ttl() -> Duration {
        Duration::from_secs(24 * 60 * 60)
    }

    fn default_jwt_ttl() -> Duration {
        Duration::from_secs(5 * 60)
    }
}

/// Wait for a transcode channel to be gone before its inputs are deleted.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    #[serde(with = "humantime_serde")]
    pub delete_poll_interval: Duration,
    pub delete_poll_attempts: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            delete_poll_interval: Duration::from_secs(5),
            delete_poll_attempts: 60,
        }
    }
}

/// Wait for a disabled distribution to deploy before it is deleted.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    #[serde(with = "humantime_serde")]
    pub disable_poll_interval: Duration,
    pub disable_poll_attempts: u32,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            disable_poll_interval: Duration::from_secs(10),
            disable_poll_attempts: 30,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long a stopping process waits for background deletes.
    #[serde(with = "humantime_serde")]
    pub pending_deletes_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            pending_deletes_timeout: Duration::from_secs(30),
        }
    }
}
