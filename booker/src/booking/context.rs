use super::api::{ApiResponse, Transport, TransportError};
use super::client::{BookingClient, Credentials};
use super::payload::BookingPayload;
use super::pending::{BookingId, PendingBookings, PoolScope};
use crate::check::check;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

pub const PENDING_BOOKING_CHECK: &str = "pending booking available";

/// Which operation a scenario's VUs run on every iteration.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Exec {
    /// List every booking.
    #[default]
    FetchAll,
    /// Create one booking and remember its id.
    Create,
    /// Update the most recently created booking.
    Modify,
    /// Delete the most recently created booking.
    Delete,
    /// Create, update and delete a booking in one iteration.
    Lifecycle,
}

impl fmt::Display for Exec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Exec::FetchAll => "fetch-all",
            Exec::Create => "create",
            Exec::Modify => "modify",
            Exec::Delete => "delete",
            Exec::Lifecycle => "lifecycle",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("No pending booking to operate on")]
    NoPendingBooking,

    #[error("Expected status {expected}, got {actual}")]
    UnexpectedStatus { expected: u16, actual: u16 },

    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Deserialize)]
struct CreatedBooking {
    bookingid: BookingId,
}

#[derive(Debug, Deserialize)]
struct AuthReply {
    token: Option<String>,
    reason: Option<String>,
}

/// Result of [`BookingContext::teardown`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Teardown {
    pub leftover: usize,
    pub deleted: usize,
}

/// Everything the booking operations share for the length of a run.
///
/// Cloning is cheap; every clone sees the same pending bookings.
pub struct BookingContext<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    client: BookingClient<T>,
    pending: PendingBookings,
    credentials: Credentials,
}

impl<T> Clone for BookingContext<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Transport + Sync> BookingContext<T> {
    pub fn new(transport: T, credentials: Credentials, scope: PoolScope) -> Self {
        Self {
            inner: Arc::new(Inner {
                client: BookingClient::new(transport),
                pending: PendingBookings::new(scope),
                credentials,
            }),
        }
    }

    pub fn client(&self) -> &BookingClient<T> {
        &self.inner.client
    }

    pub fn pending(&self) -> &PendingBookings {
        &self.inner.pending
    }

    /// Run one iteration of `exec`. Failures are logged and recorded, never returned.
    pub async fn run(&self, exec: Exec) {
        match self.try_run(exec).await {
            Ok(()) => {}
            // Already logged along with the raw response.
            Err(ScenarioError::UnexpectedStatus { .. }) => {}
            Err(err @ ScenarioError::NoPendingBooking) => warn!(%exec, "{err}"),
            Err(err) => error!(%exec, "{err}"),
        }
    }

    pub async fn try_run(&self, exec: Exec) -> Result<(), ScenarioError> {
        match exec {
            Exec::FetchAll => self.fetch_all().await.map(drop),
            Exec::Create => self.create_one().await.map(drop),
            Exec::Modify => self.modify_latest().await.map(drop),
            Exec::Delete => self.delete_latest().await.map(drop),
            Exec::Lifecycle => self.lifecycle().await,
        }
    }

    pub async fn fetch_all(&self) -> Result<ApiResponse, ScenarioError> {
        let res = self.inner.client.list_bookings().await;
        expect_status(res, 200)
    }

    /// Create a booking and push its id on success.
    pub async fn create_one(&self) -> Result<BookingId, ScenarioError> {
        let payload = BookingPayload::generate();
        let res = expect_status(self.inner.client.create_booking(&payload).await, 200)?;

        let CreatedBooking { bookingid } = res.json()?;
        debug!(%bookingid, "Created booking");
        self.inner.pending.push(bookingid.clone());
        Ok(bookingid)
    }

    /// Update the most recently created booking. The pending stack is left as it was.
    pub async fn modify_latest(&self) -> Result<BookingId, ScenarioError> {
        let id = require_pending(self.inner.pending.latest())?;
        debug!(bookingid = %id, "Updating booking");

        let token = self.authenticate().await?;
        let payload = BookingPayload::generate();
        let res = self
            .inner
            .client
            .update_booking(&id, &token, &payload)
            .await;
        expect_status(res, 200)?;

        Ok(id)
    }

    /// Pop the most recently created booking and delete it.
    pub async fn delete_latest(&self) -> Result<BookingId, ScenarioError> {
        let id = require_pending(self.inner.pending.pop())?;
        debug!(bookingid = %id, "Deleting booking");

        let res = self.inner.client.delete_booking(&id).await;
        expect_status(res, 201)?;

        Ok(id)
    }

    pub async fn lifecycle(&self) -> Result<(), ScenarioError> {
        self.create_one().await?;
        self.modify_latest().await?;
        self.delete_latest().await?;
        Ok(())
    }

    async fn authenticate(&self) -> Result<String, ScenarioError> {
        let res = self.inner.client.login(&self.inner.credentials).await?;
        let reply: AuthReply = res.json()?;

        match reply.token {
            Some(token) => Ok(token),
            None => Err(ScenarioError::AuthRejected(
                reply.reason.unwrap_or_else(|| format!("status {}", res.status)),
            )),
        }
    }

    /// Report bookings the run left behind, deleting them when `cleanup` is set.
    pub async fn teardown(&self, cleanup: bool) -> Teardown {
        let leftover = self.inner.pending.drain_all();
        let mut report = Teardown {
            leftover: leftover.len(),
            deleted: 0,
        };

        if leftover.is_empty() {
            return report;
        }

        if !cleanup {
            info!("{} bookings left pending after the run", report.leftover);
            return report;
        }

        info!("Deleting {} bookings left pending after the run", report.leftover);
        for id in leftover {
            match self.inner.client.delete_booking(&id).await {
                Ok(res) if res.status == 201 => report.deleted += 1,
                Ok(res) => warn!(bookingid = %id, status = res.status, "Cleanup failed"),
                Err(err) => warn!(bookingid = %id, "Cleanup failed: {err}"),
            }
        }

        report
    }
}

fn require_pending(id: Option<BookingId>) -> Result<BookingId, ScenarioError> {
    check(PENDING_BOOKING_CHECK, id.is_some());
    id.ok_or(ScenarioError::NoPendingBooking)
}

/// Record the `status is {expected}` check for `res`. A transport failure fails the check too.
fn expect_status(
    res: Result<ApiResponse, TransportError>,
    expected: u16,
) -> Result<ApiResponse, ScenarioError> {
    let name = status_check(expected);

    let res = match res {
        Ok(res) => res,
        Err(err) => {
            check(&name, false);
            return Err(err.into());
        }
    };

    if check(&name, res.status == expected) {
        Ok(res)
    } else {
        error!(status = res.status, body = %res.body, "Check failed: {name}");
        Err(ScenarioError::UnexpectedStatus {
            expected,
            actual: res.status,
        })
    }
}

pub fn status_check(expected: u16) -> String {
    format!("status is {expected}")
}
