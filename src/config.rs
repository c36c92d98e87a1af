//! Configuration for different deployment environments.
//!
//! Every loader reads the process environment (after `.env`, when present)
//! and also accepts an explicit lookup function so it can be tested without
//! touching process state.

use crate::domain::jobs::DEFAULT_RETRIES;
use crate::domain::signature::DEFAULT_TOLERANCE_SECS;
use std::env;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} env var required")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.optional(name) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value }),
            None => Ok(default),
        }
    }
}

fn process_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

/// Settings shared by every deployment: HTTP server, provider credentials
/// and the workflow runner.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Externally reachable base URL of this service
    pub public_url: String,
    pub mux_token_id: String,
    pub mux_token_secret: String,
    /// Shared secret for `mux-signature` verification
    pub mux_webhook_secret: String,
    pub webhook_tolerance_secs: i64,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub imagine_api_key: String,
    /// Bearer token the job endpoints require
    pub workflow_token: String,
    /// Retries granted to each generation run
    pub workflow_retries: u32,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let addr = env.or("ADDR", "127.0.0.1");
        let port = env.or("PORT", "3000");
        let public_url = env
            .optional("PUBLIC_URL")
            .unwrap_or_else(|| format!("http://{}:{}", addr, port))
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            mux_token_id: env.required("MUX_TOKEN_ID")?,
            mux_token_secret: env.required("MUX_TOKEN_SECRET")?,
            mux_webhook_secret: env.required("MUX_WEBHOOK_SECRET")?,
            webhook_tolerance_secs: env
                .parsed("MUX_WEBHOOK_TOLERANCE_SECS", DEFAULT_TOLERANCE_SECS)?,
            gemini_api_key: env.required("GEMINI_API_KEY")?,
            gemini_model: env.or("GEMINI_MODEL", crate::adapters::providers::gemini::DEFAULT_MODEL),
            imagine_api_key: env.required("IMAGINE_API_KEY")?,
            workflow_token: env.required("WORKFLOW_TOKEN")?,
            workflow_retries: env.parsed("WORKFLOW_RETRIES", DEFAULT_RETRIES)?,
            addr,
            port,
            public_url,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

/// Configuration for local/monolith deployment.
#[cfg(feature = "local")]
#[derive(Clone, Debug)]
pub struct LocalConfig {
    /// Redis connection URL
    pub redis_url: String,
    /// Directory stored thumbnails and previews are written to
    pub media_dir: String,
    /// In-process generation workers
    pub workers: usize,
}

#[cfg(feature = "local")]
impl LocalConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        Ok(Self {
            redis_url: env.or("REDIS_URL", "redis://127.0.0.1/"),
            media_dir: env.or("MEDIA_DIR", "./media"),
            workers: env.parsed("WORKERS", 4)?,
        })
    }
}

/// Configuration for AWS deployment.
#[cfg(feature = "aws")]
#[derive(Clone, Debug)]
pub struct AwsConfig {
    /// S3 bucket for thumbnails and previews
    pub s3_bucket: String,
    /// Base URL objects in the bucket are served from
    pub s3_public_url: String,
    /// SQS queue URL for workflow runs
    pub sqs_queue_url: String,
    /// DynamoDB table for video records
    pub dynamodb_table: String,
    /// Concurrent worker loops in `aws_worker`
    pub workers: usize,
}

#[cfg(feature = "aws")]
impl AwsConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let s3_bucket = env.required("S3_BUCKET")?;
        let s3_public_url = env
            .optional("S3_PUBLIC_URL")
            .unwrap_or_else(|| format!("https://{}.s3.amazonaws.com", s3_bucket));
        Ok(Self {
            s3_public_url,
            s3_bucket,
            sqs_queue_url: env.required("SQS_QUEUE_URL")?,
            dynamodb_table: env.required("DYNAMODB_TABLE")?,
            workers: env.parsed("WORKERS", 4)?,
        })
    }
}
