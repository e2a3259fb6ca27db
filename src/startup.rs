use std::{io, net, time};

use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing_actix_web::TracingLogger;

use crate::configuration::Settings;
use crate::routes::{
    create_subscriber, healthcheck, home, list_subscribers, remove_subscriber, subscribe_form,
    unsubscribe_form,
};

/// Application
pub struct Application {
    server: Server,
    port: u16,
}

impl Application {
    /// Build an application based on settings
    pub async fn build(config: Settings) -> anyhow::Result<Self> {
        // Connect to the database and create the schema
        let db_pool = SqlitePoolOptions::new()
            .acquire_timeout(time::Duration::from_secs(2))
            .connect_with(config.database.db_options())
            .await?;
        sqlx::migrate!().run(&db_pool).await?;

        // Run the HTTP server and return its data
        Self::build_with_db_pool(config, &db_pool)
    }

    /// Build an application based on settings and database pool
    pub fn build_with_db_pool(config: Settings, db_pool: &SqlitePool) -> anyhow::Result<Self> {
        // Run the HTTP server and return its data
        let listener = net::TcpListener::bind(format!(
            "{}:{}",
            config.application.app_host, config.application.app_port
        ))?;
        let port = listener.local_addr()?.port();
        let server = run_server(listener, db_pool.clone())?;
        Ok(Self { server, port })
    }

    /// Get application port
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Run application until it is stopped
    pub async fn run_until_stopped(self) -> io::Result<()> {
        self.server.await
    }
}

/// Run the HTTP server
pub fn run_server(listener: net::TcpListener, db_pool: SqlitePool) -> anyhow::Result<Server> {
    // Prepare data to be added to the application context
    let db_pool = web::Data::new(db_pool);

    // Start the HTTP server
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/", web::get().to(home))
            .route("/healthcheck", web::get().to(healthcheck))
            .route("/users", web::post().to(create_subscriber))
            .route("/users", web::get().to(list_subscribers))
            .route("/remove", web::post().to(remove_subscriber))
            .route("/subscribe", web::post().to(subscribe_form))
            .route("/unsubscribe", web::post().to(unsubscribe_form))
            .app_data(db_pool.clone())
    })
    .listen(listener)?
    .run())
}
