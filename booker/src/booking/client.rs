use super::api::{ApiRequest, ApiResponse, Transport, TransportError};
use super::payload::BookingPayload;
use super::pending::BookingId;
use crate::transaction;
use reqwest::Method;
use serde::{Deserialize, Serialize};

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "password123";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
        }
    }
}

/// Typed calls against the booking endpoints. Each call is one timed transaction.
#[derive(Debug, Clone)]
pub struct BookingClient<T> {
    transport: T,
}

impl<T: Transport + Sync> BookingClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    #[transaction]
    pub async fn list_bookings(&self) -> Result<ApiResponse, TransportError> {
        self.transport
            .send(ApiRequest::new(Method::GET, "/booking"))
            .await
    }

    #[transaction]
    pub async fn create_booking(
        &self,
        payload: &BookingPayload,
    ) -> Result<ApiResponse, TransportError> {
        let req = ApiRequest::new(Method::POST, "/booking").json(payload)?;
        self.transport.send(req).await
    }

    #[transaction]
    pub async fn login(&self, credentials: &Credentials) -> Result<ApiResponse, TransportError> {
        let req = ApiRequest::new(Method::POST, "/auth").json(credentials)?;
        self.transport.send(req).await
    }

    #[transaction]
    pub async fn update_booking(
        &self,
        id: &BookingId,
        token: &str,
        payload: &BookingPayload,
    ) -> Result<ApiResponse, TransportError> {
        let req = ApiRequest::new(Method::PUT, booking_path(id))
            .header("Cookie", format!("token={token}"))
            .json(payload)?;
        self.transport.send(req).await
    }

    #[transaction]
    pub async fn delete_booking(&self, id: &BookingId) -> Result<ApiResponse, TransportError> {
        self.transport
            .send(ApiRequest::new(Method::DELETE, booking_path(id)))
            .await
    }
}

pub fn booking_path(id: &BookingId) -> String {
    format!("/booking/{id}")
}
