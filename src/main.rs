use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::Notify;

#[macro_use]
mod macros;

mod api;
mod cli;
mod config;
mod db;
mod email;
mod error;
mod notify;
mod outbox;
mod routes;
mod sanitize;
mod traits;
mod util;

use config::Config;
use email::{DiscardMailer, Mailer, SmtpMailer};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub mailer: Arc<dyn Mailer>,
    pub outbox_notify: Arc<Notify>,
    #[cfg(test)]
    pub test_mailer: Arc<email::RecordingMailer>,
}

impl AppState {
    /// Wakes the outbox worker without waiting for the next poll tick.
    pub fn poke_outbox(&self) {
        self.outbox_notify.notify_one();
    }

    #[cfg(test)]
    pub fn for_tests(pool: PgPool) -> Self {
        let test_mailer = Arc::new(email::RecordingMailer::default());
        Self {
            pool,
            config: Arc::new(Config::for_tests()),
            mailer: test_mailer.clone(),
            outbox_notify: Arc::new(Notify::new()),
            test_mailer,
        }
    }

    #[cfg(test)]
    pub fn recorded_emails(&self) -> Vec<email::OutgoingEmail> {
        self.test_mailer.sent()
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = cli::Args::parse();

    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(3))
        .connect(&config.database_url)
        .await?;

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp.clone())),
        None => Arc::new(DiscardMailer),
    };

    let state = AppState {
        pool,
        config: Arc::new(config),
        mailer,
        outbox_notify: Arc::new(Notify::new()),
        #[cfg(test)]
        test_mailer: Arc::new(email::RecordingMailer::default()),
    };

    match args.command.unwrap_or_default() {
        cli::Command::Run => {
            tokio::spawn(state.clone().run_outbox_worker());

            let app = routes::router().with_state(state.clone());
            let listener = tokio::net::TcpListener::bind(&state.config.bind_addr).await?;
            tracing::info!(addr = %state.config.bind_addr, "Listening");
            axum::serve(listener, app).await?;
        }
        cli::Command::Reset => {
            state.reset().await?;
            println!("database reset");
        }
        cli::Command::Migrate => {
            state.migrate().await?;
            println!("database migrated");
        }
        cli::Command::CreateUser {
            email,
            first_name,
            last_name,
            role,
        } => {
            let role = role.parse::<db::Role>()?;
            let user = state
                .create_user(&email, &first_name, &last_name, role)
                .await?;
            println!("created user {} ({})", user.email, user.role);
        }
        cli::Command::GrantToken { email } => {
            let user = state.get_user_from_email(&email).await?;
            let user = user.ok_or_else(|| eyre::eyre!("no user with email {email:?}"))?;
            let token = state.create_token(user.id).await?;
            println!("token for {}: {}", user.email, token.token);
        }
    }

    Ok(())
}
