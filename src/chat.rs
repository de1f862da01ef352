// Assistant conversation; replies are opaque text from the service
use std::sync::Arc;
use tracing::warn;

use crate::api::{ApiError, BookingService};
use crate::validation;

pub const GREETING: &str = "Hello! I can help you with information about bus routes, providers, bookings, and more. What would you like to know?";
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    fn assistant(content: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
        }
    }
}

pub struct ChatAssistant {
    service: Arc<dyn BookingService>,
    transcript: Vec<ChatMessage>,
}

impl ChatAssistant {
    pub fn new(service: Arc<dyn BookingService>) -> Self {
        Self {
            service,
            transcript: vec![ChatMessage::assistant(GREETING)],
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub async fn ask(&mut self, message: &str) -> Result<&str, ApiError> {
        let message = validation::require("message", message)?;
        self.transcript.push(ChatMessage {
            role: Role::User,
            content: message.to_string(),
        });

        match self.service.chat(message).await {
            Ok(reply) => {
                self.transcript.push(ChatMessage {
                    role: Role::Assistant,
                    content: reply,
                });
                Ok(self.last_reply())
            }
            Err(err) => {
                warn!(error = %err, "chat request failed");
                self.transcript.push(ChatMessage::assistant(APOLOGY));
                Err(err)
            }
        }
    }

    fn last_reply(&self) -> &str {
        self.transcript
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubBookingService;
    use crate::validation::ValidationError;

    #[tokio::test]
    async fn test_conversation_transcript() {
        let stub = Arc::new(StubBookingService::seeded());
        let mut assistant = ChatAssistant::new(stub);

        let reply = assistant
            .ask("  What is the contact number for Green Line? ")
            .await
            .unwrap()
            .to_string();
        assert!(reply.contains("Green Line: Hotline: 16594"));

        let transcript = assistant.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[0].content, GREETING);
        assert_eq!(transcript[1].role, Role::User);
        assert_eq!(transcript[1].content, "What is the contact number for Green Line?");
        assert_eq!(transcript[2].content, reply);
    }

    #[tokio::test]
    async fn test_failure_appends_apology() {
        let stub = Arc::new(StubBookingService::seeded());
        stub.fail_next_requests(1);
        let mut assistant = ChatAssistant::new(stub.clone());

        assert!(assistant.ask("routes?").await.is_err());
        assert_eq!(assistant.transcript().last().unwrap().content, APOLOGY);

        // Retry works straight away
        assert!(assistant.ask("routes?").await.is_ok());
        assert_eq!(stub.request_count(), 2);
    }

    #[tokio::test]
    async fn test_blank_message_is_not_sent() {
        let stub = Arc::new(StubBookingService::seeded());
        let mut assistant = ChatAssistant::new(stub.clone());

        let err = assistant.ask("   ").await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::MissingField("message"))
        ));
        assert_eq!(assistant.transcript().len(), 1);
        assert_eq!(stub.request_count(), 0);
    }
}
