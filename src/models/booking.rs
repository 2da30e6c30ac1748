use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::business::{Service, Staff};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContactForm {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// In-progress selections. Replaced wholesale by every wizard transition.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BookingDraft {
    pub service: Option<Service>,
    pub staff: Option<Staff>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub contact: ContactForm,
}

/// Body of `POST /book-client/{businessId}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(skip)]
    pub business_id: String,
    pub full_name: String,
    pub phone_number: String,
    pub service_id: String,
    pub staff_id: String,
    pub date: String,
    pub time: String,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "confirmed" | "booked" | "scheduled" => BookingStatus::Confirmed,
            "cancelled" | "canceled" => BookingStatus::Cancelled,
            "completed" => BookingStatus::Completed,
            "pending" | "" => BookingStatus::Pending,
            other => {
                tracing::warn!(status = other, "unknown booking status, treating as pending");
                BookingStatus::Pending
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookingResult {
    pub id: Option<String>,
    pub service_name: Option<String>,
    pub staff_name: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub total: Option<f64>,
    pub status: BookingStatus,
}

impl BookingResult {
    /// Normalises a booking confirmation. The backend has answered with the
    /// appointment at the top level or wrapped in `appointment`, `booking`
    /// or `data`, and with several spellings of each field.
    pub fn from_response(value: &Value) -> Self {
        let body = envelope(value);

        let id = first_str(
            body,
            &["appointmentId", "_id", "id", "bookingId"],
        )
        .or_else(|| first_str(value, &["appointmentId", "bookingId"]));

        let service_name = body["service"]["name"]
            .as_str()
            .or_else(|| body["serviceName"].as_str())
            .or_else(|| body["service"].as_str())
            .map(str::to_string);

        let staff_name = body["staff"]["fullName"]
            .as_str()
            .or_else(|| body["staff"]["name"].as_str())
            .or_else(|| body["staffName"].as_str())
            .or_else(|| body["staff"].as_str())
            .map(str::to_string);

        let date = first_str(body, &["date", "appointmentDate"]);
        let time = first_str(body, &["startTime", "time"]);

        let total = first_number(body, &["total", "totalPrice", "price"])
            .or_else(|| body["service"]["price"].as_f64());

        let status = body["status"]
            .as_str()
            .or_else(|| value["status"].as_str())
            .map(BookingStatus::parse)
            .unwrap_or_else(|| {
                if value["success"].as_bool() == Some(true) {
                    BookingStatus::Confirmed
                } else {
                    BookingStatus::Pending
                }
            });

        Self {
            id,
            service_name,
            staff_name,
            date,
            time,
            total,
            status,
        }
    }

    /// Fills blanks the backend did not echo from what the customer chose.
    pub fn with_draft_fallback(mut self, draft: &BookingDraft) -> Self {
        if self.service_name.is_none() {
            self.service_name = draft.service.as_ref().map(|s| s.name.clone());
        }
        if self.staff_name.is_none() {
            self.staff_name = draft.staff.as_ref().map(|s| s.full_name.clone());
        }
        if self.date.is_none() {
            self.date = draft.date.map(|d| d.format("%Y-%m-%d").to_string());
        }
        if self.time.is_none() {
            self.time = draft.time.clone();
        }
        if self.total.is_none() {
            self.total = draft.service.as_ref().map(Service::effective_price);
        }
        self
    }
}

/// Statuses that mean the backend refused the booking even on a 2xx.
const FAILURE_STATUSES: &[&str] = &["rejected", "failed", "declined", "error"];

/// A 2xx body can still carry `{ "success": false, "message": ... }` or a
/// failure status such as `"rejected"`.
pub fn rejection_message(value: &Value) -> Option<String> {
    let status = envelope(value)["status"]
        .as_str()
        .or_else(|| value["status"].as_str())
        .map(|s| s.trim().to_lowercase());
    let failed_status = status
        .as_deref()
        .is_some_and(|s| FAILURE_STATUSES.contains(&s));
    if value["success"].as_bool() != Some(false) && !failed_status {
        return None;
    }
    Some(
        value["message"]
            .as_str()
            .or_else(|| envelope(value)["message"].as_str())
            .unwrap_or_default()
            .to_string(),
    )
}

fn envelope(value: &Value) -> &Value {
    ["appointment", "booking", "data"]
        .iter()
        .find_map(|key| value.get(*key).filter(|v| v.is_object()))
        .unwrap_or(value)
}

fn first_str(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match &value[*key] {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn first_number(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match &value[*key] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
