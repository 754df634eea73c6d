//! Thin HTTP wrapper over the server endpoints. Failures are either
//! transport-level ("connection failed", no automatic retry) or an error
//! message the server chose to surface.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use quaddash_types::api::{
    ClaimResponse, CreateOrderRequest, ErrorBody, SendCodeRequest, SendCodeResponse,
    SendMessageRequest, SessionCheckResponse, VerifyCodeRequest, VerifyCodeResponse,
};
use quaddash_types::models::{ChatChannel, Message, Order};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection failed")]
    Transport(#[source] reqwest::Error),

    /// The server rejected the request; the message is already user-facing.
    #[error("{message}")]
    Api {
        status: StatusCode,
        message: String,
    },

    #[error("unexpected response body")]
    Decode(#[source] reqwest::Error),
}

pub struct BoardClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl BoardClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    /// Attach the bearer session used for all protected endpoints.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await.map_err(ClientError::Transport)?;
        let response = check_status(response).await?;
        response.json().await.map_err(ClientError::Decode)
    }

    // -- Auth --

    pub async fn send_code(&self, email: &str) -> Result<SendCodeResponse, ClientError> {
        self.execute(self.http.post(self.url("/api/auth/send-code")).json(
            &SendCodeRequest {
                email: email.to_string(),
            },
        ))
        .await
    }

    pub async fn verify_code(
        &self,
        email: &str,
        code: &str,
    ) -> Result<VerifyCodeResponse, ClientError> {
        self.execute(self.http.post(self.url("/api/auth/verify-code")).json(
            &VerifyCodeRequest {
                email: email.to_string(),
                code: code.to_string(),
            },
        ))
        .await
    }

    /// Validate the stored session; callers route back to login on failure.
    pub async fn verify_session(&self) -> Result<SessionCheckResponse, ClientError> {
        self.execute(self.authed(self.http.post(self.url("/api/auth/verify-session"))))
            .await
    }

    // -- Orders --

    pub async fn list_orders(&self) -> Result<Vec<Order>, ClientError> {
        self.execute(self.authed(self.http.get(self.url("/api/orders"))))
            .await
    }

    pub async fn create_order(&self, req: &CreateOrderRequest) -> Result<Order, ClientError> {
        self.execute(self.authed(self.http.post(self.url("/api/orders")).json(req)))
            .await
    }

    pub async fn claim_order(&self, order_id: Uuid) -> Result<ClaimResponse, ClientError> {
        self.execute(self.authed(
            self.http
                .post(self.url(&format!("/api/orders/{}/claim", order_id))),
        ))
        .await
    }

    pub async fn cancel_order(&self, order_id: Uuid) -> Result<(), ClientError> {
        let builder = self.authed(
            self.http
                .delete(self.url(&format!("/api/orders/{}", order_id))),
        );
        let response = builder.send().await.map_err(ClientError::Transport)?;
        check_status(response).await?;
        Ok(())
    }

    // -- Chats --

    pub async fn list_chats(&self) -> Result<Vec<ChatChannel>, ClientError> {
        self.execute(self.authed(self.http.get(self.url("/api/chats"))))
            .await
    }

    pub async fn list_messages(&self, chat_id: Uuid) -> Result<Vec<Message>, ClientError> {
        self.execute(self.authed(
            self.http
                .get(self.url(&format!("/api/chats/{}/messages", chat_id))),
        ))
        .await
    }

    pub async fn send_message(
        &self,
        chat_id: Uuid,
        content: &str,
    ) -> Result<Message, ClientError> {
        self.execute(
            self.authed(
                self.http
                    .post(self.url(&format!("/api/chats/{}/messages", chat_id))),
            )
            .json(&SendMessageRequest {
                content: content.to_string(),
            }),
        )
        .await
    }
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    // Prefer the server's own error string when the body carries one
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    Err(ClientError::Api { status, message })
}
