pub mod http;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::BookingError;
use crate::models::{BookingRequest, BookingResult, Business, Service, Slot};

/// The external booking backend. It owns availability, conflict checks and
/// persistence; this crate only reads from it and submits drafts.
#[async_trait]
pub trait BookingApi: Send + Sync {
    /// `Ok(None)` when the business does not exist.
    async fn get_business(&self, business_id: &str) -> Result<Option<Business>, BookingError>;

    /// Empty when the backend knows no services for the staff member.
    async fn get_services_for_staff(
        &self,
        business_id: &str,
        staff_id: &str,
    ) -> Result<Vec<Service>, BookingError>;

    /// Open slots only. Empty when nothing is available.
    async fn get_available_slots(
        &self,
        business_id: &str,
        staff_id: &str,
        service_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, BookingError>;

    async fn submit_booking(&self, request: &BookingRequest) -> Result<BookingResult, BookingError>;
}
