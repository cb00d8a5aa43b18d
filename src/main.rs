use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use codevox_runner::callback::CallbackClient;
use codevox_runner::config::{Config, GenerationConfig, QueueConfig};
use codevox_runner::generation::AnthropicGenerator;
use codevox_runner::git::{CommitIdentity, GitWorkflow, GitWorkflowConfig};
use codevox_runner::github::{OctocrabClient, install_crypto_provider};
use codevox_runner::processor::JobProcessor;
use codevox_runner::queue::{MockQueue, QueueBackend, QueuePoller, SqsQueue, demo_job};
use codevox_runner::runner::Runner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "codevox_runner=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    install_crypto_provider();

    let config = Config::from_env().context("invalid configuration")?;
    info!(?config, "Starting CodeVox runner");

    let mut queue = match &config.queue {
        QueueConfig::Mock => QueueBackend::Mock(MockQueue::new()),
        QueueConfig::Sqs(sqs) => QueueBackend::Sqs(SqsQueue::connect(sqs.clone()).await),
    };
    if config.seed_demo_job
        && let Some(mock) = queue.as_mock_mut()
    {
        mock.push(demo_job());
    }

    let generator = match &config.generation {
        GenerationConfig::Disabled => None,
        GenerationConfig::Anthropic(anthropic) => {
            let generator = AnthropicGenerator::new(anthropic.clone())
                .context("failed to build generation client")?;
            info!(model = generator.model(), "Using Anthropic generation backend");
            Some(generator)
        }
    };

    let git = match &config.git {
        Some(hosting) => {
            let github = hosting
                .token
                .as_deref()
                .map(OctocrabClient::from_token)
                .transpose()
                .context("failed to build GitHub client")?;
            if github.is_none() {
                warn!("GITHUB_TOKEN not set, pull requests will not be opened");
            }
            let workflow_config = GitWorkflowConfig {
                workspace_root: hosting.workspace_root.clone(),
                identity: CommitIdentity::bot(hosting.bot_name.clone()),
                token: hosting.token.clone(),
                url_rewrites: hosting.url_rewrites.clone(),
            };
            Some(GitWorkflow::new(workflow_config, github))
        }
        None => None,
    };

    let processor = JobProcessor::new(config.processor.clone(), generator, git);
    if processor.is_mock() {
        info!("No generation backend configured, using mock processing");
    }

    let callback = CallbackClient::with_timeout(&config.callback.api_base_url, config.callback.timeout)
        .context("failed to build callback client")?;
    info!(url = callback.url(), "Reporting results");

    let runner = Runner::new(config.runner.clone(), QueuePoller::new(queue), processor, callback);

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down after the current job");
            on_signal.cancel();
        }
    });

    let stats = runner.run(shutdown).await;
    info!(processed = stats.processed, "Runner exited");
    Ok(())
}
