use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio::time::Instant;

use crate::configuration::Settings;
use crate::mailer::Mailer;
use crate::price_client::PriceClient;
use crate::subscriber_store;

/// Placeholder price used before any real price has been observed
const SENTINEL_PRICE: f64 = 1.0;

/// A price move significant enough to notify about
#[derive(Clone, Copy, Debug)]
pub struct PriceMove {
    pub price: f64,
    pub ratio: f64,
}

/// Watcher state carried across loop iterations
pub struct WatcherState {
    last_notified_price: f64,
    last_check: Option<Instant>,
}

impl Default for WatcherState {
    fn default() -> Self {
        Self::new()
    }
}

impl WatcherState {
    pub const fn new() -> Self {
        Self {
            last_notified_price: SENTINEL_PRICE,
            last_check: None,
        }
    }

    /// Whether enough time has passed since the last check
    pub fn is_due(&self, now: Instant, period: Duration) -> bool {
        self.last_check
            .is_none_or(|last| now.duration_since(last) >= period)
    }

    /// Record that a check happened, regardless of its outcome
    pub fn mark_checked(&mut self, now: Instant) {
        self.last_check = Some(now);
    }

    /// Compare a fetched price against the last-notified price
    ///
    /// Returns the move when the ratio crosses the 10% threshold in either
    /// direction; the last-notified price advances only on a returned move.
    /// The first real price is compared against the sentinel value 1.0 and
    /// therefore almost always fires, matching the original behavior.
    pub fn observe(&mut self, price: f64) -> Option<PriceMove> {
        let ratio = (price / self.last_notified_price).abs();
        if ratio >= 1.1 || ratio <= 0.9 {
            self.last_notified_price = price;
            Some(PriceMove { price, ratio })
        } else {
            None
        }
    }
}

/// Price watcher
pub struct PriceWatcher {
    db_pool: SqlitePool,
    price_client: PriceClient,
    mailer: Mailer,
    period: Duration,
    idle: Duration,
    state: WatcherState,
}

impl PriceWatcher {
    /// Build a price watcher based on settings
    pub fn build(config: Settings) -> anyhow::Result<Self> {
        // Connect to the database
        let db_pool = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_secs(2))
            .connect_lazy_with(config.database.db_options());

        Self::build_with_db_pool(config, &db_pool)
    }

    /// Build a price watcher based on settings and database pool
    pub fn build_with_db_pool(config: Settings, db_pool: &SqlitePool) -> anyhow::Result<Self> {
        let price_client = config.price_api.clone().client();
        let mailer = config.mail.mailer(config.price_api.ticker)?;

        Ok(Self {
            db_pool: db_pool.clone(),
            price_client,
            mailer,
            period: config.watcher.period(),
            idle: config.watcher.idle(),
            state: WatcherState::new(),
        })
    }

    /// Run the watcher loop until the process is stopped
    pub async fn run_until_stopped(mut self) -> anyhow::Result<()> {
        loop {
            if self.state.is_due(Instant::now(), self.period) {
                self.check_price().await;
            }
            tokio::time::sleep(self.idle).await;
        }
    }

    /// Perform one price check cycle
    #[tracing::instrument(name = "Checking current price", skip(self))]
    async fn check_price(&mut self) {
        let sample = match self.price_client.current_price().await {
            Ok(sample) => sample,
            Err(e) => {
                // Self-healing by polling: the next cycle proceeds on schedule
                tracing::warn!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "Failed to fetch the current price, skipping this cycle"
                );
                self.state.mark_checked(Instant::now());
                return;
            }
        };
        tracing::info!(
            price = sample.price,
            observed_at = %sample.observed_at,
            "Fetched current price"
        );
        self.state.mark_checked(Instant::now());

        if let Some(price_move) = self.state.observe(sample.price) {
            // The last-notified price is already advanced at this point, so a
            // failed send still consumes the move
            if let Err(e) = self.notify(price_move).await {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "Failed to deliver price alert"
                );
            }
        }
    }

    /// Notify all current subscribers of a price move
    async fn notify(&self, price_move: PriceMove) -> anyhow::Result<()> {
        let recipients = subscriber_store::subscriber_emails(&self.db_pool).await?;
        self.mailer
            .send_price_alert(price_move.price, price_move.ratio, &recipients)
            .await
    }
}
