/// Errors returned by the RabbitMQ management client.
#[derive(Debug, thiserror::Error)]
pub enum RabbitError {
    /// The management API answered with a non-2xx status.
    ///
    /// `body` carries the response body verbatim so callers can tell a 409
    /// settings conflict apart from a 404 missing exchange.
    #[error("HTTP {status} {status_text}{}", body_suffix(.body))]
    Http {
        status: u16,
        status_text: String,
        body: Option<String>,
    },

    /// The request could not be sent or the response could not be read.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// A response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// An empty vhost was supplied.
    #[error("vhost must not be empty")]
    EmptyVhost,

    /// The client configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RabbitError {
    /// HTTP status of a management API rejection, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            RabbitError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn body_suffix(body: &Option<String>) -> String {
    match body {
        Some(body) if !body.is_empty() => format!(": {body}"),
        _ => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, RabbitError>;
