use std::fmt;

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::{RabbitError, Result};
use crate::model::{
    AlarmsCheck, PublishRequest, PublishResponse, PurgeOutcome, RabbitBinding, RabbitConnection,
    RabbitConsumer, RabbitExchange, RabbitMessage, RabbitOverview, RabbitProperties, RabbitQueue,
};
use crate::path::{encode_segment, encode_vhost};

/// Name the management API uses for the nameless default exchange.
const DEFAULT_EXCHANGE: &str = "amq.default";

/// Connection settings for the management API.
#[derive(Clone, Deserialize)]
pub struct RabbitConfig {
    /// Base URL of the management plugin, e.g. `http://localhost:15672`.
    pub url: String,
    pub username: String,
    /// Sent as HTTP Basic credentials and never logged.
    pub password: String,
}

impl fmt::Debug for RabbitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RabbitConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field(
                "password",
                &format_args!("<redacted:{} bytes>", self.password.len()),
            )
            .finish()
    }
}

/// Queue declaration settings for `PUT /api/queues/{vhost}/{name}`.
#[derive(Debug, Clone, Serialize)]
pub struct QueueDeclare {
    pub durable: bool,
    pub auto_delete: bool,
    pub arguments: Map<String, Value>,
}

impl Default for QueueDeclare {
    fn default() -> Self {
        Self {
            durable: true,
            auto_delete: false,
            arguments: Map::new(),
        }
    }
}

/// HTTP client for the RabbitMQ management API.
#[derive(Clone)]
pub struct RabbitClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl fmt::Debug for RabbitClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RabbitClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl RabbitClient {
    /// Create a client. No request is sent until the first operation.
    pub fn new(config: &RabbitConfig) -> Result<Self> {
        let base_url = config.url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(RabbitError::Config("url must not be empty".to_string()));
        }
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Base URL requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- queues ----

    pub async fn list_queues(&self, vhost: &str) -> Result<Vec<RabbitQueue>> {
        let path = format!("/api/queues/{}", encode_vhost(vhost)?);
        self.get_json(&path).await
    }

    pub async fn get_queue(&self, vhost: &str, name: &str) -> Result<RabbitQueue> {
        let path = queue_path(vhost, name)?;
        self.get_json(&path).await
    }

    pub async fn create_queue(&self, vhost: &str, name: &str, declare: &QueueDeclare) -> Result<()> {
        let path = queue_path(vhost, name)?;
        debug!(vhost, queue = name, durable = declare.durable, "declaring queue");
        self.send(self.request(Method::PUT, &path).json(declare))
            .await?;
        Ok(())
    }

    pub async fn delete_queue(&self, vhost: &str, name: &str) -> Result<()> {
        let path = queue_path(vhost, name)?;
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    /// Remove every ready message from a queue.
    ///
    /// The broker normally answers 204 with no body, which reads as zero
    /// messages purged. Any other body must be a purge count.
    pub async fn purge_queue(&self, vhost: &str, name: &str) -> Result<PurgeOutcome> {
        let path = format!("{}/contents", queue_path(vhost, name)?);
        let response = self.send(self.request(Method::DELETE, &path)).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(PurgeOutcome::default());
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch up to `count` messages and requeue them (`ack_requeue_true`).
    pub async fn get_messages(
        &self,
        vhost: &str,
        name: &str,
        count: usize,
    ) -> Result<Vec<RabbitMessage>> {
        let path = format!("{}/get", queue_path(vhost, name)?);
        let body = json!({
            "count": count,
            "ackmode": "ack_requeue_true",
            "encoding": "auto",
        });
        let response = self
            .send(self.request(Method::POST, &path).json(&body))
            .await?;
        decode(response).await
    }

    pub async fn list_queue_bindings(&self, vhost: &str, name: &str) -> Result<Vec<RabbitBinding>> {
        let path = format!("{}/bindings", queue_path(vhost, name)?);
        self.get_json(&path).await
    }

    // ---- exchanges ----

    /// Publish a string payload through an exchange. An empty exchange name
    /// targets the default exchange.
    pub async fn publish(
        &self,
        vhost: &str,
        exchange: &str,
        routing_key: &str,
        payload: &str,
        properties: &RabbitProperties,
    ) -> Result<PublishResponse> {
        let exchange = if exchange.is_empty() {
            DEFAULT_EXCHANGE
        } else {
            exchange
        };
        let path = format!("{}/publish", exchange_path(vhost, exchange)?);
        let body = PublishRequest {
            properties,
            routing_key,
            payload,
            payload_encoding: "string",
        };
        debug!(vhost, exchange, routing_key, "publishing message");
        let response = self
            .send(self.request(Method::POST, &path).json(&body))
            .await?;
        decode(response).await
    }

    pub async fn list_exchanges(&self, vhost: &str) -> Result<Vec<RabbitExchange>> {
        let path = format!("/api/exchanges/{}", encode_vhost(vhost)?);
        self.get_json(&path).await
    }

    pub async fn create_exchange(
        &self,
        vhost: &str,
        name: &str,
        kind: &str,
        durable: bool,
        auto_delete: bool,
    ) -> Result<()> {
        let path = exchange_path(vhost, name)?;
        let body = json!({
            "type": kind,
            "durable": durable,
            "auto_delete": auto_delete,
            "internal": false,
            "arguments": {},
        });
        self.send(self.request(Method::PUT, &path).json(&body))
            .await?;
        Ok(())
    }

    pub async fn delete_exchange(&self, vhost: &str, name: &str) -> Result<()> {
        let path = exchange_path(vhost, name)?;
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    // ---- bindings ----

    pub async fn list_bindings(&self, vhost: &str) -> Result<Vec<RabbitBinding>> {
        let path = format!("/api/bindings/{}", encode_vhost(vhost)?);
        self.get_json(&path).await
    }

    /// Bind a queue to an exchange. A missing exchange surfaces as a 404.
    pub async fn create_binding(
        &self,
        vhost: &str,
        exchange: &str,
        queue: &str,
        routing_key: &str,
    ) -> Result<()> {
        let path = binding_path(vhost, exchange, queue)?;
        let body = json!({ "routing_key": routing_key, "arguments": {} });
        self.send(self.request(Method::POST, &path).json(&body))
            .await?;
        Ok(())
    }

    pub async fn delete_binding(
        &self,
        vhost: &str,
        exchange: &str,
        queue: &str,
        properties_key: &str,
    ) -> Result<()> {
        let path = format!(
            "{}/{}",
            binding_path(vhost, exchange, queue)?,
            encode_segment(properties_key)
        );
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    // ---- cluster ----

    pub async fn overview(&self) -> Result<RabbitOverview> {
        self.get_json("/api/overview").await
    }

    pub async fn list_consumers(&self, vhost: &str) -> Result<Vec<RabbitConsumer>> {
        let path = format!("/api/consumers/{}", encode_vhost(vhost)?);
        self.get_json(&path).await
    }

    pub async fn list_connections(&self) -> Result<Vec<RabbitConnection>> {
        self.get_json("/api/connections").await
    }

    /// Query the alarms health check.
    ///
    /// A 503 is not a transport failure here: the JSON body is the verdict.
    pub async fn check_alarms(&self) -> Result<AlarmsCheck> {
        let response = self
            .request(Method::GET, "/api/health/checks/alarms")
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        match serde_json::from_str::<AlarmsCheck>(&body) {
            Ok(check) => Ok(check),
            Err(_) if status.is_success() => Ok(AlarmsCheck {
                status: "ok".to_string(),
                reason: None,
            }),
            Err(_) => Err(http_error(status, Some(body))),
        }
    }

    // ---- plumbing ----

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .basic_auth(&self.username, Some(&self.password))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.request(Method::GET, path)).await?;
        decode(response).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.ok();
        debug!(status = status.as_u16(), "management API rejected request");
        Err(http_error(status, body))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn http_error(status: reqwest::StatusCode, body: Option<String>) -> RabbitError {
    RabbitError::Http {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        body,
    }
}

fn queue_path(vhost: &str, name: &str) -> Result<String> {
    Ok(format!(
        "/api/queues/{}/{}",
        encode_vhost(vhost)?,
        encode_segment(name)
    ))
}

fn exchange_path(vhost: &str, name: &str) -> Result<String> {
    Ok(format!(
        "/api/exchanges/{}/{}",
        encode_vhost(vhost)?,
        encode_segment(name)
    ))
}

fn binding_path(vhost: &str, exchange: &str, queue: &str) -> Result<String> {
    Ok(format!(
        "/api/bindings/{}/e/{}/q/{}",
        encode_vhost(vhost)?,
        encode_segment(exchange),
        encode_segment(queue)
    ))
}
