use std::{env, io, sync};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use stockwatch::configuration::Settings;
use stockwatch::startup::Application;
use stockwatch::telemetry::{get_subscriber, init_subscriber};

/// Ensure the tracing stack is initialized only once
static TRACING: sync::LazyLock<()> = sync::LazyLock::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    if env::var("TEST_LOG").is_ok() {
        init_subscriber(get_subscriber(
            subscriber_name,
            default_filter_level,
            io::stdout,
        ));
    } else {
        init_subscriber(get_subscriber(
            subscriber_name,
            default_filter_level,
            io::sink,
        ));
    };
});

/// Test application data
pub struct TestApp {
    pub address: String,
    pub db_pool: SqlitePool,
    pub api_client: reqwest::Client,
}

impl TestApp {
    /// Spin up a test application backed by an in-memory database
    pub async fn spawn() -> Self {
        // Initialize logging
        sync::LazyLock::force(&TRACING);

        // Prepare the database
        let db_pool = init_test_db_pool().await;

        // Get settings and modify them for testing
        let config = {
            let mut c = Settings::get_config().expect("Failed to read configuration");
            // Listen on a random TCP port
            c.application.app_port = 0;
            c
        };

        // Build the application and get its address
        let app = Application::build_with_db_pool(config, &db_pool)
            .expect("Failed to build application");
        let address = format!("http://127.0.0.1:{}", app.port());

        // Build the API client
        let api_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        // Run the application and return its data
        #[allow(clippy::let_underscore_future)]
        let _ = tokio::spawn(app.run_until_stopped());
        Self {
            address,
            db_pool,
            api_client,
        }
    }

    /// Perform a POST request to the users endpoint
    pub async fn post_users(&self, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(format!("{}/users", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    /// Perform a GET request to the users endpoint
    pub async fn get_users(&self, query: &str) -> reqwest::Response {
        self.api_client
            .get(format!("{}/users{query}", &self.address))
            .send()
            .await
            .expect("Failed to send request")
    }

    /// Perform a POST request to the remove endpoint
    pub async fn post_remove(&self, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(format!("{}/remove", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    /// Perform a form-encoded POST request to the subscribe endpoint
    pub async fn post_subscribe_form(&self, body: &str) -> reqwest::Response {
        self.api_client
            .post(format!("{}/subscribe", &self.address))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body.to_owned())
            .send()
            .await
            .expect("Failed to send request")
    }

    /// Perform a form-encoded POST request to the unsubscribe endpoint
    pub async fn post_unsubscribe_form(&self, body: &str) -> reqwest::Response {
        self.api_client
            .post(format!("{}/unsubscribe", &self.address))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body.to_owned())
            .send()
            .await
            .expect("Failed to send request")
    }
}

/// Initialize an in-memory test database pool
pub async fn init_test_db_pool() -> SqlitePool {
    // A single long-lived connection keeps the in-memory database alive
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(SqliteConnectOptions::new().in_memory(true))
        .await
        .expect("Failed to open the test database");
    sqlx::migrate!()
        .run(&db_pool)
        .await
        .expect("Failed to migrate the test database");
    db_pool
}

/// Assert: response is a redirect to the specified location
pub fn assert_is_redirect_to(response: &reqwest::Response, location: &str) {
    assert_eq!(response.status(), 303);
    assert_eq!(response.headers().get("Location").unwrap(), location);
}
