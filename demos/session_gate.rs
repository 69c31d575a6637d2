use portal_core::{
    FileSessionStore, GateConfig, GateView, InMemorySessionStore, Role, SessionGate,
    SessionStore, SystemClock,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing; `LOG_FORMAT=pretty` for development, JSON otherwise
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "session_gate=debug,portal_core=debug".into());

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
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

fn describe(gate: &SessionGate) -> String {
    match gate.view() {
        GateView::Protected { title, role_label } => {
            format!("[{title}] signed in as {role_label}")
        }
        GateView::Challenge(view) => format!(
            "[{}] {:?} input={:?} button={:?} enabled={}{}",
            view.title,
            view.step,
            view.input,
            view.submit_label,
            view.submit_enabled,
            view.hint.map(|h| format!(" ({h})")).unwrap_or_default(),
        ),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // PORTAL_SESSION_FILE keeps the session across runs, like the browser store
    let store: Arc<dyn SessionStore> = match std::env::var("PORTAL_SESSION_FILE") {
        Ok(path) => {
            info!(path = %path, "using file session store");
            Arc::new(FileSessionStore::new(path))
        }
        Err(_) => {
            info!("using in-memory session store (set PORTAL_SESSION_FILE to persist)");
            Arc::new(InMemorySessionStore::new())
        }
    };

    let gate = SessionGate::mount(
        Role::Police,
        "Police Officer Portal",
        store,
        Arc::new(SystemClock),
        GateConfig::from_env(),
    )
    .await?;
    println!("{}", describe(&gate));

    if !gate.is_authenticated() {
        gate.input_phone("98765");
        println!("{}", describe(&gate));
        gate.submit_phone().await?;

        gate.input_phone("+91 98765 43210");
        gate.submit_phone().await?;
        println!("{}", describe(&gate));

        gate.input_otp("123456");
        gate.submit_otp().await?;
    }

    if let Some(content) = gate.protect("Case management dashboard") {
        println!("{}", describe(&gate));
        println!("rendering: {content}");
    }

    if std::env::var("PORTAL_KEEP_SESSION").is_err() {
        gate.logout().await?;
        println!("{}", describe(&gate));
    }

    Ok(())
}
