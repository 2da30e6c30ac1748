use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde_json::Value;

use super::BookingApi;
use crate::errors::BookingError;
use crate::models::booking::rejection_message;
use crate::models::{BookingRequest, BookingResult, Business, Service, Slot};

const SERVICE_UNAVAILABLE: &str = "Booking service not available";

pub struct HttpBookingApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBookingApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BookingError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET returning `None` on 404.
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Option<Value>, BookingError> {
        let resp = self.client.get(url).query(query).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.json::<Value>().await.unwrap_or(Value::Null);
            return Err(rejection_from(status, &body));
        }
        let body = resp
            .json::<Value>()
            .await
            .map_err(|e| BookingError::Network(format!("failed to parse response: {e}")))?;
        Ok(Some(body))
    }
}

#[async_trait]
impl BookingApi for HttpBookingApi {
    async fn get_business(&self, business_id: &str) -> Result<Option<Business>, BookingError> {
        let url = self.url(&format!("/customer/business/{business_id}"));
        let Some(body) = self.get_json(&url, &[]).await? else {
            tracing::warn!(business_id, "business not found");
            return Ok(None);
        };

        let business = Business::from_response(body)
            .map_err(|e| BookingError::Network(format!("malformed business payload: {e}")))?;
        tracing::debug!(
            business_id,
            services = business.services.len(),
            staff = business.staff.len(),
            "fetched business"
        );
        Ok(Some(business))
    }

    async fn get_services_for_staff(
        &self,
        business_id: &str,
        staff_id: &str,
    ) -> Result<Vec<Service>, BookingError> {
        let url = self.url(&format!("/booking/{business_id}/services/{staff_id}"));
        let Some(body) = self.get_json(&url, &[]).await? else {
            tracing::warn!(business_id, staff_id, "services for staff not found");
            return Ok(vec![]);
        };

        let services = match body.get("services") {
            Some(list) if list.is_array() => serde_json::from_value::<Vec<Service>>(list.clone())
                .map_err(|e| BookingError::Network(format!("malformed services payload: {e}")))?,
            _ => vec![],
        };
        Ok(services.into_iter().filter(|s| s.is_active).collect())
    }

    async fn get_available_slots(
        &self,
        business_id: &str,
        staff_id: &str,
        service_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, BookingError> {
        let url = self.url(&format!("/book-client/{business_id}/available-slots"));
        let query = [
            ("serviceId", service_id.to_string()),
            ("staffId", staff_id.to_string()),
            ("date", date.format("%Y-%m-%d").to_string()),
        ];
        let Some(body) = self.get_json(&url, &query).await? else {
            tracing::warn!(business_id, staff_id, service_id, %date, "available slots not found");
            return Ok(vec![]);
        };
        Ok(Slot::list_from_response(&body, date))
    }

    async fn submit_booking(&self, request: &BookingRequest) -> Result<BookingResult, BookingError> {
        let url = self.url(&format!("/book-client/{}", request.business_id));
        let resp = self.client.post(&url).json(request).send().await?;

        let status = resp.status();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let err = rejection_from(status, &body);
            tracing::warn!(status = status.as_u16(), error = %err, "booking rejected");
            return Err(err);
        }
        if let Some(message) = rejection_message(&body) {
            tracing::warn!(message = %message, "booking rejected in a successful response");
            return Err(BookingError::BackendRejection {
                status: status.as_u16(),
                message,
            });
        }

        let result = BookingResult::from_response(&body);
        tracing::info!(
            business_id = %request.business_id,
            appointment_id = ?result.id,
            status = result.status.as_str(),
            "booking submitted"
        );
        Ok(result)
    }
}

/// Field-level `errors[].msg` are joined; otherwise `message`; otherwise a
/// status-based fallback.
fn rejection_from(status: StatusCode, body: &Value) -> BookingError {
    let field_messages: Vec<&str> = body["errors"]
        .as_array()
        .map(|errs| {
            errs.iter()
                .filter_map(|e| e["msg"].as_str().or_else(|| e["message"].as_str()).or_else(|| e.as_str()))
                .collect()
        })
        .unwrap_or_default();

    let message = if !field_messages.is_empty() {
        field_messages.join(", ")
    } else if let Some(m) = body["message"].as_str().filter(|m| !m.is_empty()) {
        m.to_string()
    } else if status == StatusCode::NOT_FOUND || status.is_server_error() {
        SERVICE_UNAVAILABLE.to_string()
    } else {
        format!("HTTP error! status: {}", status.as_u16())
    };

    BookingError::BackendRejection {
        status: status.as_u16(),
        message,
    }
}
