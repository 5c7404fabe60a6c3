use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// A composed contact-form inquiry ready for delivery.
#[derive(Debug, Clone)]
pub struct ContactMessage {
    pub subject: String,
    pub text: String,
    /// The submitter's address, set as the reply-to header.
    pub reply_to: String,
}

#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// Provider-assigned message id.
    pub id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    /// Missing API key or delivery address; operator intervention needed.
    #[error("Mailer not configured: {0}")]
    Config(String),

    /// The provider accepted the connection but rejected the message.
    #[error("Delivery provider rejected the message: {0}")]
    Provider(String),

    /// The provider could not be reached.
    #[error("Delivery provider unreachable: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers an inquiry to the configured inbox.
    async fn send(&self, message: &ContactMessage) -> Result<SendReceipt, MailerError>;
}

/// Mailer backed by the Resend HTTP API.
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: Option<String>,
    from: String,
    to: String,
}

impl ResendMailer {
    pub fn new(api_key: Option<String>, from: String, to: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from,
            to,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResendResponse {
    id: Option<String>,
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: &ContactMessage) -> Result<SendReceipt, MailerError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| MailerError::Config("RESEND_API_KEY is not set".to_string()))?;

        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(api_key)
            .json(&json!({
                "from": self.from,
                "to": [self.to],
                "reply_to": message.reply_to,
                "subject": message.subject,
                "text": message.text,
            }))
            .send()
            .await
            .map_err(|e| MailerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Provider(format!("{status}: {body}")));
        }

        let body: ResendResponse = response
            .json()
            .await
            .map_err(|e| MailerError::Transport(e.to_string()))?;

        Ok(SendReceipt { id: body.id })
    }
}

/// Mock implementation for testing; records delivered messages.
pub struct MockMailer {
    pub sent: std::sync::Mutex<Vec<ContactMessage>>,
    pub fail_with: Option<fn() -> MailerError>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    pub fn failing(fail_with: fn() -> MailerError) -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
            fail_with: Some(fail_with),
        }
    }
}

impl Default for MockMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, message: &ContactMessage) -> Result<SendReceipt, MailerError> {
        if let Some(fail) = self.fail_with {
            return Err(fail());
        }
        self.sent.lock().expect("mock lock").push(message.clone());
        Ok(SendReceipt {
            id: Some("mock-message-id".to_string()),
        })
    }
}
