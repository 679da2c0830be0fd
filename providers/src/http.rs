//! reqwest-backed status and delivery clients.
//!
//! | Endpoint | Request | Mapping |
//! |----------|---------|---------|
//! | status (either source) | `GET {base}/{id}` | 2xx + JSON [`StatusReport`] → `Success`; retry signal → `RetryAfter`; other → `Failure` |
//! | events | `GET {events_url}` | 2xx + JSON [`Event`]; other → `ClientError::Status` |
//! | delivery | `POST {send_url}` | 2xx → `Accepted`; anything else, including transport errors → `Rejected` |
//!
//! Every delivery carries a fresh `X-Courier-Delivery-Id` header so resends
//! can be told apart in the receiver's logs.

use reqwest::Url;
use serde::Serialize;
use uuid::Uuid;

use courier_types::{Address, ApplicationId, DeliveryResult, Event, Outcome, Payload, StatusReport};

use crate::{ClientError, DeliveryClient, StatusClient, retry};

pub const DELIVERY_ID_HEADER: &str = "X-Courier-Delivery-Id";

fn parse_endpoint(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw).map_err(|e| ClientError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ClientError::InvalidUrl {
            url: raw.to_string(),
            reason: "URL cannot have path segments".to_string(),
        });
    }
    Ok(url)
}

fn status_url(base: &Url, id: &ApplicationId) -> Result<Url, ClientError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ClientError::InvalidUrl {
            url: base.to_string(),
            reason: "URL cannot have path segments".to_string(),
        })?
        .pop_if_empty()
        .push(id.as_str());
    Ok(url)
}

fn transport_error(url: &Url, err: &reqwest::Error) -> ClientError {
    ClientError::Transport {
        url: url.to_string(),
        message: err.to_string(),
    }
}

fn decode_error(url: &Url, err: &reqwest::Error) -> ClientError {
    ClientError::Decode {
        url: url.to_string(),
        message: err.to_string(),
    }
}

/// Status client querying two HTTP endpoints.
#[derive(Debug, Clone)]
pub struct HttpStatusClient {
    client: reqwest::Client,
    primary: Url,
    secondary: Url,
}

impl HttpStatusClient {
    pub fn new(client: reqwest::Client, primary: &str, secondary: &str) -> Result<Self, ClientError> {
        Ok(Self {
            client,
            primary: parse_endpoint(primary)?,
            secondary: parse_endpoint(secondary)?,
        })
    }

    async fn query(&self, base: &Url, id: &ApplicationId) -> Result<Outcome, ClientError> {
        let url = status_url(base, id)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(&url, &e))?;

        let status = response.status();
        if status.is_success() {
            let report: StatusReport = response.json().await.map_err(|e| decode_error(&url, &e))?;
            return Ok(Outcome::Success(report));
        }

        if let Some(delay) = retry::retry_delay(status, response.headers()) {
            tracing::debug!(
                url = %url,
                status = %status,
                delay_ms = delay.as_millis(),
                "Status source asked for a retry"
            );
            return Ok(Outcome::RetryAfter(delay));
        }

        tracing::debug!(url = %url, status = %status, "Status source answered failure");
        Ok(Outcome::Failure)
    }
}

impl StatusClient for HttpStatusClient {
    async fn primary_status(&self, id: &ApplicationId) -> Result<Outcome, ClientError> {
        self.query(&self.primary, id).await
    }

    async fn secondary_status(&self, id: &ApplicationId) -> Result<Outcome, ClientError> {
        self.query(&self.secondary, id).await
    }
}

#[derive(Serialize)]
struct DeliveryRequest<'a> {
    recipient: &'a Address,
    payload: &'a Payload,
}

/// Delivery client backed by an HTTP hub.
#[derive(Debug, Clone)]
pub struct HttpDeliveryClient {
    client: reqwest::Client,
    events_url: Url,
    send_url: Url,
}

impl HttpDeliveryClient {
    pub fn new(client: reqwest::Client, events_url: &str, send_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            client,
            events_url: parse_endpoint(events_url)?,
            send_url: parse_endpoint(send_url)?,
        })
    }
}

impl DeliveryClient for HttpDeliveryClient {
    async fn read_data(&self) -> Result<Event, ClientError> {
        let url = &self.events_url;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.json().await.map_err(|e| decode_error(url, &e))
    }

    async fn send_data(&self, dest: &Address, payload: &Payload) -> DeliveryResult {
        let delivery_id = Uuid::new_v4().to_string();
        let request = self
            .client
            .post(self.send_url.clone())
            .header(DELIVERY_ID_HEADER, &delivery_id)
            .json(&DeliveryRequest {
                recipient: dest,
                payload,
            });

        match request.send().await {
            Ok(response) if response.status().is_success() => DeliveryResult::Accepted,
            Ok(response) => {
                tracing::debug!(
                    recipient = %dest,
                    delivery_id = %delivery_id,
                    status = %response.status(),
                    "Delivery rejected"
                );
                DeliveryResult::Rejected
            }
            Err(e) => {
                tracing::warn!(recipient = %dest, delivery_id = %delivery_id, error = %e, "Delivery transport error");
                DeliveryResult::Rejected
            }
        }
    }
}
