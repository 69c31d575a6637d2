use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    error::{PortalError, Result},
    pipeline::{Holder, StageId},
    storage::ApplicationStorage,
    tracker::{ApplicationStatusTracker, StatusReport},
};

/// A compensation application as the portal pages hold it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Raw status code; anything outside the pipeline is tolerated.
    pub status: String,
    pub amount: String,
    pub submitted_date: NaiveDate,
    pub last_update: NaiveDate,
    pub current_holder: String,
}

impl Application {
    pub fn tracker(&self) -> ApplicationStatusTracker {
        ApplicationStatusTracker::new(&self.id, &self.status, &self.current_holder)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ApplicationSummary {
    pub total: usize,
    pub approved: usize,
    pub in_progress: usize,
}

/// Lookup, intake and counts over an [`ApplicationStorage`].
pub struct ApplicationRegistry {
    storage: Arc<dyn ApplicationStorage>,
    // id allocation reads the count, so intake is one at a time
    intake: Mutex<()>,
}

impl ApplicationRegistry {
    pub fn new(storage: Arc<dyn ApplicationStorage>) -> Self {
        Self {
            storage,
            intake: Mutex::new(()),
        }
    }

    /// Status report for the application with this id.
    pub async fn track(&self, id: &str) -> Result<StatusReport> {
        let application = self.storage.get(id).await?.ok_or_else(|| {
            warn!(application_id = id, "tracking unknown application");
            PortalError::ApplicationNotFound(id.to_string())
        })?;
        if StageId::parse(&application.status).is_none() {
            warn!(
                application_id = id,
                status = %application.status,
                "status matches no pipeline stage"
            );
        }
        Ok(application.tracker().report())
    }

    /// File a new application; it enters the pipeline at `submitted`.
    pub async fn submit(&self, kind: impl Into<String>, today: NaiveDate) -> Result<Application> {
        let _intake = self.intake.lock().await;
        let sequence = self.storage.count().await? + 1;
        let application = Application {
            id: format!("APP{sequence:03}"),
            kind: kind.into(),
            status: StageId::Submitted.as_str().to_string(),
            amount: "₹0 (Pending Assessment)".to_string(),
            submitted_date: today,
            last_update: today,
            current_holder: Holder::System.label().to_string(),
        };
        self.storage.save(application.clone()).await?;
        info!(application_id = %application.id, kind = %application.kind, "application submitted");
        Ok(application)
    }

    pub async fn list(&self) -> Result<Vec<Application>> {
        self.storage.list().await
    }

    pub async fn summary(&self) -> Result<ApplicationSummary> {
        let applications = self.storage.list().await?;
        let approved = applications
            .iter()
            .filter(|a| a.status == StageId::Approved.as_str())
            .count();
        Ok(ApplicationSummary {
            total: applications.len(),
            approved,
            in_progress: applications.len() - approved,
        })
    }
}

/// The two applications the beneficiary portal starts with.
pub fn sample_applications() -> Vec<Application> {
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
    vec![
        Application {
            id: "APP001".to_string(),
            kind: "PCR Act Compensation".to_string(),
            status: StageId::UnderReview.as_str().to_string(),
            amount: "₹50,000".to_string(),
            submitted_date: date(2024, 1, 15),
            last_update: date(2024, 1, 20),
            current_holder: Holder::DistrictCollector.label().to_string(),
        },
        Application {
            id: "APP002".to_string(),
            kind: "PoA Act Support".to_string(),
            status: StageId::Approved.as_str().to_string(),
            amount: "₹25,000".to_string(),
            submitted_date: date(2024, 1, 10),
            last_update: date(2024, 1, 18),
            current_holder: Holder::CentralStateOfficer.label().to_string(),
        },
    ]
}
