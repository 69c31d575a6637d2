use chrono::Utc;
use portal_core::{
    ApplicationRegistry, InMemoryApplicationStorage, StageState, StatusReport,
    sample_applications,
};
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "status_tracker=info,portal_core=info".into());

    match log_format.as_str() {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_target(true))
                .init();
        }
    }
}

fn print_report(report: &StatusReport) {
    println!(
        "Application {} - {}% complete - currently with {}",
        report.application_id, report.progress_percent, report.current_holder
    );
    for view in &report.stages {
        let marker = match view.state {
            StageState::Active => ">",
            StageState::Completed => "x",
            StageState::Pending => " ",
        };
        let holder = if view.holder_matches {
            format!("*{}*", view.stage.holder)
        } else {
            view.stage.holder.to_string()
        };
        println!(
            "  [{marker}] {:<24} {:<24} {}",
            view.stage.title, holder, view.stage.description
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let registry = ApplicationRegistry::new(Arc::new(
        InMemoryApplicationStorage::with_applications(sample_applications()),
    ));
    let filed = registry
        .submit("PCR Act Compensation", Utc::now().date_naive())
        .await?;

    // track the ids given on the command line, or everything on file
    let mut ids: Vec<String> = std::env::args().skip(1).collect();
    if ids.is_empty() {
        ids = registry.list().await?.into_iter().map(|a| a.id).collect();
    }

    for id in &ids {
        match registry.track(id).await {
            Ok(report) => print_report(&report),
            Err(e) => error!(application_id = %id, "{}", e),
        }
    }

    let summary = registry.summary().await?;
    println!(
        "{} applications ({} approved, {} in progress); newest is {}",
        summary.total, summary.approved, summary.in_progress, filed.id
    );
    let report = registry.track(&filed.id).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
