//! Orchestration: changed paths in, per-service deploy outcomes out.

use crate::changes::{self, ChangeSet};
use crate::error::Result;
use crate::services::{self, ServiceMatcher};
use crate::webhook::{HttpDispatcher, WebhookDispatcher};
use crate::DeployConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

/// Outcome of one service's redeploy attempt.
#[derive(Debug, Clone, Serialize)]
pub struct DeployResult {
    pub service: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Aggregate outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct DeploySummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub deployed: Vec<String>,
    pub failed: Vec<DeployResult>,
    /// True when the change set could not be determined and nothing was attempted.
    pub skipped: bool,
    pub success: bool,
}

pub struct Deployer<D: WebhookDispatcher> {
    config: DeployConfig,
    matcher: ServiceMatcher,
    dispatcher: D,
}

impl Deployer<HttpDispatcher> {
    pub fn new(config: DeployConfig) -> Result<Self> {
        let dispatcher = HttpDispatcher::new(config.retry.clone(), config.append_action)?;
        Self::with_dispatcher(config, dispatcher)
    }
}

impl<D: WebhookDispatcher> Deployer<D> {
    pub fn with_dispatcher(config: DeployConfig, dispatcher: D) -> Result<Self> {
        let matcher = ServiceMatcher::new(&config.services_dir, &config.compose_file)?;
        Ok(Self {
            config,
            matcher,
            dispatcher,
        })
    }

    /// Detect the current push's changes and redeploy every affected service.
    pub async fn run(&self) -> DeploySummary {
        let change_set = changes::detect_changes(&self.config.repo_path).await;
        self.run_with_changes(change_set).await
    }

    /// Redeploy every service whose compose file appears in `change_set`.
    /// Services are processed sequentially; one failure never aborts the rest.
    pub async fn run_with_changes(&self, change_set: ChangeSet) -> DeploySummary {
        let run_id = Uuid::now_v7().to_string();
        let started_at = Utc::now();

        let paths = match change_set {
            ChangeSet::Known(paths) => paths,
            ChangeSet::Undetermined => {
                info!(
                    "Run {} - change set undetermined, skipping redeploys",
                    run_id
                );
                return summary(run_id, started_at, vec![], vec![], true);
            }
        };

        let names = self.matcher.extract_service_names(&paths);
        if names.is_empty() {
            info!(
                "Run {} - {} changed path(s), no deployable services affected",
                run_id,
                paths.len()
            );
            return summary(run_id, started_at, vec![], vec![], false);
        }

        info!(
            "Run {} - redeploying {} service(s): {}",
            run_id,
            names.len(),
            names.join(", ")
        );

        let mut deployed = Vec::new();
        let mut failed = Vec::new();
        for service in names {
            match self.deploy_service(&service).await {
                Ok(()) => {
                    info!("Service '{}' redeployed", service);
                    deployed.push(service);
                }
                Err(e) => {
                    error!("Service '{}' failed to redeploy: {}", service, e);
                    failed.push(DeployResult {
                        service,
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        summary(run_id, started_at, deployed, failed, false)
    }

    async fn deploy_service(&self, service: &str) -> Result<()> {
        let url = services::resolve_webhook(&self.config.secret_prefix, service)?;
        self.dispatcher.trigger(&url, service).await
    }
}

fn summary(
    run_id: String,
    started_at: DateTime<Utc>,
    deployed: Vec<String>,
    failed: Vec<DeployResult>,
    skipped: bool,
) -> DeploySummary {
    let success = failed.is_empty();
    DeploySummary {
        run_id,
        started_at,
        finished_at: Utc::now(),
        deployed,
        failed,
        skipped,
        success,
    }
}
