//! `eduadmin` -- command-line admin for the educational catalog backend.
//!
//! Signs in, selects the country/curriculum/stage/grade scope and manages
//! bundles, vouchers, rows and subject services. The token, user and
//! scope persist in the state directory between runs.
//!
//! # Environment variables
//!
//! | Variable               | Default                 | Description                        |
//! |------------------------|-------------------------|------------------------------------|
//! | `API_URL`              | `http://localhost:3001` | Backend base URL                   |
//! | `API_VERSION`          | `/api/v1`               | Path prefix of every endpoint      |
//! | `EDUADMIN_STATE_DIR`   | `.eduadmin`             | Persisted token, user and scope    |
//! | `REQUEST_TIMEOUT_SECS` | `30`                    | HTTP timeout                       |
//! | `DEFAULT_PAGE_SIZE`    | `20`                    | Page size of list commands         |
//! | `RUST_LOG`             | `eduadmin=info,...`     | Log filter                         |

use eduadmin_cli::args;
use eduadmin_cli::commands::App;
use eduadmin_client::config::ClientConfig;
use eduadmin_client::error::{core_message, ClientError};
use eduadmin_core::error::CoreError;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eduadmin=info,eduadmin_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let command = match args::parse(&argv) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}\n\n{}", args::USAGE);
            std::process::exit(2);
        }
    };

    let config = ClientConfig::from_env();
    tracing::debug!(api = %config.base_url(), state_dir = %config.state_dir.display(), "Configuration loaded");

    let app = match App::from_config(config) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build API client");
            std::process::exit(1);
        }
    };

    let mut stdout = std::io::stdout();
    if let Err(e) = app.run(command, &mut stdout).await {
        let message = if let Some(client) = e.downcast_ref::<ClientError>() {
            client.user_message("Request failed")
        } else if let Some(core) = e.downcast_ref::<CoreError>() {
            core_message(core, "Request failed")
        } else {
            format!("{e:#}")
        };
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}
