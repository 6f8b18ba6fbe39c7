//! Database connection capability.
//!
//! Everything that talks to the server takes a [`Connection`] explicitly.
//! [`HttpConnection`] implements it on top of the ClickHouse HTTP interface.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::error::{ChError, Result};

/// A result row, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// The two things the schema manager needs from a server.
pub trait Connection: Send + Sync {
    /// Executes a statement that returns no rows.
    fn exec(&self, sql: &str) -> impl Future<Output = Result<()>> + Send;

    /// Runs a query and returns its rows.
    fn query(&self, sql: &str) -> impl Future<Output = Result<Vec<Row>>> + Send;
}

/// Settings for [`HttpConnection`].
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Base URL of the HTTP interface, e.g. `http://localhost:8123`.
    pub url: String,
    /// User name.
    pub user: String,
    /// Password, empty for none.
    pub password: String,
    /// Default database for unqualified names.
    pub database: String,
    /// Per-request timeout, also sent as `max_execution_time`.
    pub timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            user: "default".to_string(),
            password: String::new(),
            database: "default".to_string(),
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Connection over the ClickHouse HTTP interface.
#[derive(Debug, Clone)]
pub struct HttpConnection {
    client: Client,
    options: ConnectionOptions,
}

impl HttpConnection {
    /// Builds the client and checks the server answers `/ping`.
    ///
    /// # Errors
    ///
    /// Fails when the client cannot be built or the server is unreachable.
    pub async fn connect(options: ConnectionOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .connect_timeout(options.connect_timeout)
            .build()?;

        let conn = Self { client, options };
        conn.ping().await?;
        Ok(conn)
    }

    /// Returns the connection settings.
    #[must_use]
    pub const fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Checks that the server is up.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-2xx answer.
    pub async fn ping(&self) -> Result<()> {
        let url = format!("{}/ping", self.options.url.trim_end_matches('/'));
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ChError::Server {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }
        Ok(())
    }

    async fn send(&self, sql: String) -> Result<String> {
        let max_execution_time = self.options.timeout.as_secs().to_string();

        let mut request = self
            .client
            .post(&self.options.url)
            .query(&[
                ("database", self.options.database.as_str()),
                ("max_execution_time", max_execution_time.as_str()),
            ])
            .header("X-ClickHouse-User", &self.options.user);
        if !self.options.password.is_empty() {
            request = request.header("X-ClickHouse-Key", &self.options.password);
        }

        let response = request.body(sql).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ChError::Server {
                status: status.as_u16(),
                message: body.trim().to_string(),
            });
        }
        Ok(body)
    }
}

impl Connection for HttpConnection {
    async fn exec(&self, sql: &str) -> Result<()> {
        self.send(sql.to_string()).await?;
        Ok(())
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        debug!(query = %sql, "Running query");
        let body = self.send(with_row_format(sql)).await?;
        parse_rows(&body)
    }
}

fn with_row_format(sql: &str) -> String {
    format!(
        "{} FORMAT JSONEachRow",
        sql.trim_end().trim_end_matches(';').trim_end()
    )
}

/// Parses a `JSONEachRow` body, one object per line.
///
/// # Errors
///
/// Fails when a line is not a JSON object.
pub fn parse_rows(body: &str) -> Result<Vec<Row>> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<Row>(line).map_err(ChError::from))
        .collect()
}
