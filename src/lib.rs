pub mod configuration;
pub mod domain;
pub mod mailer;
pub mod price_client;
pub mod routes;
pub mod startup;
pub mod subscriber_store;
pub mod telemetry;
pub mod watcher;
