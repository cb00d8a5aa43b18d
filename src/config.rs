//! Process configuration, read once at startup.
//!
//! Every component receives its piece of [`Config`] through its constructor; nothing
//! reads the environment after [`Config::from_env`] returns. Each toggle selects between
//! a real implementation and a mock or disabled one:
//!
//! | Toggle | Off | On |
//! |---|---|---|
//! | `SQS_ENABLED` | in-process mock queue | SQS (`SQS_QUEUE_URL` required) |
//! | `GENERATION_ENABLED` | mock processing path | Anthropic backend (`ANTHROPIC_API_KEY` required) |
//! | `GITHUB_ENABLED` | generated code is only reported | clone/commit/push, plus a PR when `GITHUB_TOKEN` is set |
//!
//! `GENERATION_ENABLED` defaults to on exactly when `ANTHROPIC_API_KEY` is set. Numeric
//! variables that fail to parse fall back to their defaults.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::callback::{DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT};
use crate::generation::{AnthropicConfig, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::git::UrlRewrite;
use crate::processor::ProcessorConfig;
use crate::queue::{DEFAULT_REGION, DEFAULT_VISIBILITY_TIMEOUT, DEFAULT_WAIT_TIME, SqsConfig};
use crate::runner::{DEFAULT_ERROR_BACKOFF, DEFAULT_IDLE_BACKOFF, RunnerConfig};

/// Commit author name when `GIT_BOT_NAME` is unset.
pub const DEFAULT_BOT_NAME: &str = "codevox-bot";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is required when {toggle}=true")]
    MissingVar {
        var: &'static str,
        toggle: &'static str,
    },
}

/// Where jobs come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueConfig {
    Mock,
    Sqs(SqsConfig),
}

/// Which generation backend, if any, serves jobs.
#[derive(Debug, Clone)]
pub enum GenerationConfig {
    /// Jobs take the mock path.
    Disabled,
    Anthropic(AnthropicConfig),
}

/// Git integration on the generation path.
#[derive(Clone)]
pub struct GitHostingConfig {
    /// Token for HTTPS clone/push and PR creation. Without it no PRs are opened.
    pub token: Option<String>,

    /// Commit author name; the email is derived from it.
    pub bot_name: String,

    /// Parent directory of per-job workspaces.
    pub workspace_root: PathBuf,

    /// Prefix rewrites for clone and push URLs, from `GIT_URL_REWRITES`.
    pub url_rewrites: Vec<UrlRewrite>,
}

impl fmt::Debug for GitHostingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHostingConfig")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("bot_name", &self.bot_name)
            .field("workspace_root", &self.workspace_root)
            .field("url_rewrites", &self.url_rewrites)
            .finish()
    }
}

/// The controlling API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackConfig {
    pub api_base_url: String,
    pub timeout: Duration,
}

/// Everything the runner needs to start.
#[derive(Debug, Clone)]
pub struct Config {
    pub queue: QueueConfig,
    pub generation: GenerationConfig,
    /// `None` when `GITHUB_ENABLED` is not `true`.
    pub git: Option<GitHostingConfig>,
    pub callback: CallbackConfig,
    pub runner: RunnerConfig,
    pub processor: ProcessorConfig,
    /// Seed the demo job into the mock queue at startup.
    pub seed_demo_job: bool,
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &str| get(key).map(|v| v.trim().eq_ignore_ascii_case("true"));
        let secs = |key: &str, default: Duration| {
            Duration::from_secs(parse_or(get(key).as_deref(), default.as_secs()))
        };

        let queue = if flag("SQS_ENABLED").unwrap_or(false) {
            let queue_url = get("SQS_QUEUE_URL").ok_or(ConfigError::MissingVar {
                var: "SQS_QUEUE_URL",
                toggle: "SQS_ENABLED",
            })?;
            QueueConfig::Sqs(SqsConfig {
                queue_url,
                region: get("AWS_DEFAULT_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
                wait_time: secs("SQS_WAIT_SECS", DEFAULT_WAIT_TIME),
                visibility_timeout: secs("SQS_VISIBILITY_TIMEOUT_SECS", DEFAULT_VISIBILITY_TIMEOUT),
            })
        } else {
            QueueConfig::Mock
        };

        let api_key = get("ANTHROPIC_API_KEY");
        let generation = if flag("GENERATION_ENABLED").unwrap_or(api_key.is_some()) {
            let api_key = api_key.ok_or(ConfigError::MissingVar {
                var: "ANTHROPIC_API_KEY",
                toggle: "GENERATION_ENABLED",
            })?;
            GenerationConfig::Anthropic(AnthropicConfig {
                model: get("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                max_tokens: parse_or(get("LLM_MAX_TOKENS").as_deref(), DEFAULT_MAX_TOKENS),
                ..AnthropicConfig::new(api_key)
            })
        } else {
            GenerationConfig::Disabled
        };

        let git = flag("GITHUB_ENABLED")
            .unwrap_or(false)
            .then(|| GitHostingConfig {
                token: get("GITHUB_TOKEN"),
                bot_name: get("GIT_BOT_NAME").unwrap_or_else(|| DEFAULT_BOT_NAME.to_string()),
                workspace_root: get("RUNNER_WORKSPACE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(std::env::temp_dir),
                url_rewrites: get("GIT_URL_REWRITES")
                    .map(|v| UrlRewrite::parse_list(&v))
                    .unwrap_or_default(),
            });

        let callback = CallbackConfig {
            api_base_url: get("API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            timeout: DEFAULT_TIMEOUT,
        };

        let runner = RunnerConfig {
            idle_backoff: secs("RUNNER_IDLE_BACKOFF_SECS", DEFAULT_IDLE_BACKOFF),
            error_backoff: secs("RUNNER_ERROR_BACKOFF_SECS", DEFAULT_ERROR_BACKOFF),
        };

        Ok(Config {
            queue,
            generation,
            git,
            callback,
            runner,
            processor: ProcessorConfig::new(),
            seed_demo_job: flag("RUNNER_SEED_DEMO_JOB").unwrap_or(true),
        })
    }
}

fn parse_or<T: FromStr>(value: Option<&str>, default: T) -> T {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_is_all_mock() {
        let config = config(&[]).unwrap();

        assert_eq!(config.queue, QueueConfig::Mock);
        assert!(matches!(config.generation, GenerationConfig::Disabled));
        assert!(config.git.is_none());
        assert_eq!(config.callback.api_base_url, "http://localhost:8000");
        assert_eq!(config.callback.timeout, Duration::from_secs(10));
        assert_eq!(config.runner, RunnerConfig::new());
        assert!(config.seed_demo_job);
    }

    #[test]
    fn sqs_requires_queue_url() {
        assert_eq!(
            config(&[("SQS_ENABLED", "true")]).unwrap_err(),
            ConfigError::MissingVar {
                var: "SQS_QUEUE_URL",
                toggle: "SQS_ENABLED"
            }
        );
    }

    #[test]
    fn sqs_settings_are_read() {
        let config = config(&[
            ("SQS_ENABLED", "TRUE"),
            ("SQS_QUEUE_URL", "https://sqs.eu-west-1.amazonaws.com/1/jobs"),
            ("AWS_DEFAULT_REGION", "eu-west-1"),
            ("SQS_WAIT_SECS", "20"),
            ("SQS_VISIBILITY_TIMEOUT_SECS", "not-a-number"),
        ])
        .unwrap();

        let QueueConfig::Sqs(sqs) = config.queue else {
            panic!("expected SQS");
        };
        assert_eq!(sqs.region, "eu-west-1");
        assert_eq!(sqs.wait_time, Duration::from_secs(20));
        assert_eq!(sqs.visibility_timeout, Duration::from_secs(60));
    }

    #[test]
    fn only_literal_true_enables_a_toggle() {
        let config = config(&[("SQS_ENABLED", "yes"), ("GITHUB_ENABLED", "1")]).unwrap();
        assert_eq!(config.queue, QueueConfig::Mock);
        assert!(config.git.is_none());
    }

    #[test]
    fn api_key_enables_generation_by_default() {
        let config = config(&[("ANTHROPIC_API_KEY", "sk-ant-x"), ("LLM_MAX_TOKENS", "1024")]).unwrap();

        let GenerationConfig::Anthropic(anthropic) = config.generation else {
            panic!("expected generation to be enabled");
        };
        assert_eq!(anthropic.api_key, "sk-ant-x");
        assert_eq!(anthropic.model, DEFAULT_MODEL);
        assert_eq!(anthropic.max_tokens, 1024);
    }

    #[test]
    fn generation_can_be_disabled_despite_key() {
        let config = config(&[("ANTHROPIC_API_KEY", "sk-ant-x"), ("GENERATION_ENABLED", "false")]).unwrap();
        assert!(matches!(config.generation, GenerationConfig::Disabled));
    }

    #[test]
    fn generation_enabled_without_key_is_error() {
        assert_eq!(
            config(&[("GENERATION_ENABLED", "true"), ("ANTHROPIC_API_KEY", "  ")]).unwrap_err(),
            ConfigError::MissingVar {
                var: "ANTHROPIC_API_KEY",
                toggle: "GENERATION_ENABLED"
            }
        );
    }

    #[test]
    fn github_without_token_runs_git_only() {
        let config = config(&[("GITHUB_ENABLED", "true"), ("RUNNER_WORKSPACE_DIR", "/var/tmp/codevox")]).unwrap();

        let git = config.git.unwrap();
        assert_eq!(git.token, None);
        assert_eq!(git.bot_name, "codevox-bot");
        assert_eq!(git.workspace_root, PathBuf::from("/var/tmp/codevox"));
        assert!(git.url_rewrites.is_empty());
    }

    #[test]
    fn url_rewrites_are_read() {
        let config = config(&[
            ("GITHUB_ENABLED", "true"),
            ("GIT_URL_REWRITES", "https://github.com/=https://mirror.internal/gh/"),
        ])
        .unwrap();

        assert_eq!(
            config.git.unwrap().url_rewrites,
            vec![UrlRewrite::new("https://github.com/", "https://mirror.internal/gh/")]
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = config(&[
            ("ANTHROPIC_API_KEY", "sk-ant-very-secret"),
            ("GITHUB_ENABLED", "true"),
            ("GITHUB_TOKEN", "ghp_very_secret"),
        ])
        .unwrap();

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-ant-very-secret"));
        assert!(!rendered.contains("ghp_very_secret"));
    }

    #[test]
    fn backoffs_and_seed_flag_are_configurable() {
        let config = config(&[
            ("RUNNER_IDLE_BACKOFF_SECS", "1"),
            ("RUNNER_ERROR_BACKOFF_SECS", "2"),
            ("RUNNER_SEED_DEMO_JOB", "false"),
            ("API_BASE_URL", "https://api.codevox.dev"),
        ])
        .unwrap();

        assert_eq!(config.runner.idle_backoff, Duration::from_secs(1));
        assert_eq!(config.runner.error_backoff, Duration::from_secs(2));
        assert!(!config.seed_demo_job);
        assert_eq!(config.callback.api_base_url, "https://api.codevox.dev");
    }
}
