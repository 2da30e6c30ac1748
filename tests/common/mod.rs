#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use tokio::sync::Notify;

use bookme::errors::BookingError;
use bookme::models::{BookingRequest, BookingResult, Business, Service, Slot};
use bookme::services::api::BookingApi;

// ── Mock Backend ──

pub struct MockApi {
    pub business: Option<Business>,
    /// Number of business loads that fail before one succeeds.
    pub business_failures: AtomicUsize,
    pub staff_services: HashMap<String, Vec<Service>>,
    pub slots: HashMap<NaiveDate, Vec<Slot>>,
    pub slot_failures: AtomicUsize,
    pub slot_gates: Mutex<HashMap<NaiveDate, Arc<Notify>>>,
    pub submit_outcome: Result<BookingResult, BookingError>,
    pub calls: Mutex<Vec<String>>,
    pub submitted: Mutex<Vec<BookingRequest>>,
}

impl MockApi {
    pub fn new(business: Option<Business>) -> Self {
        Self {
            business,
            business_failures: AtomicUsize::new(0),
            staff_services: HashMap::new(),
            slots: HashMap::new(),
            slot_failures: AtomicUsize::new(0),
            slot_gates: Mutex::new(HashMap::new()),
            submit_outcome: Ok(BookingResult::from_response(
                &json!({"status": "confirmed", "appointmentId": "A1"}),
            )),
            calls: Mutex::new(vec![]),
            submitted: Mutex::new(vec![]),
        }
    }

    /// Holds slot fetches for `date` until the returned handle is notified.
    pub fn gate(&self, date: NaiveDate) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.slot_gates
            .lock()
            .unwrap()
            .insert(date, Arc::clone(&notify));
        notify
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl BookingApi for MockApi {
    async fn get_business(&self, business_id: &str) -> Result<Option<Business>, BookingError> {
        self.record(format!("business:{business_id}"));
        if take_failure(&self.business_failures) {
            return Err(BookingError::Network("connection refused".into()));
        }
        Ok(self.business.clone())
    }

    async fn get_services_for_staff(
        &self,
        _business_id: &str,
        staff_id: &str,
    ) -> Result<Vec<Service>, BookingError> {
        self.record(format!("services:{staff_id}"));
        Ok(self.staff_services.get(staff_id).cloned().unwrap_or_default())
    }

    async fn get_available_slots(
        &self,
        _business_id: &str,
        staff_id: &str,
        service_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, BookingError> {
        self.record(format!("slots:{staff_id}:{service_id}:{date}"));
        let gate = self.slot_gates.lock().unwrap().get(&date).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if take_failure(&self.slot_failures) {
            return Err(BookingError::Network("request timed out".into()));
        }
        Ok(self.slots.get(&date).cloned().unwrap_or_default())
    }

    async fn submit_booking(&self, request: &BookingRequest) -> Result<BookingResult, BookingError> {
        self.record("submit".to_string());
        self.submitted.lock().unwrap().push(request.clone());
        self.submit_outcome.clone()
    }
}

// ── Fixtures ──

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn slot(date: &str, time: &str) -> Slot {
    Slot {
        date: day(date),
        start_time: time.to_string(),
    }
}

pub fn barbershop() -> Business {
    Business::from_response(json!({
        "business": {
            "_id": "b1",
            "name": "Barbershop",
            "address": "123 Main Street, Tashkent",
            "instagramLink": "https://instagram.com/barbershop",
            "telegramLink": "",
            "services": [
                {"_id": "s1", "name": "Haircut", "category": "Hair", "duration": 60, "price": 75, "discount": 20, "staffIds": ["t1", "t2"]},
                {"_id": "s2", "name": "Shave", "duration": 45, "price": 35, "staffIds": ["t3"]},
                {"_id": "s3", "name": "Styling", "category": "Hair", "price": 25, "staffIds": ["t1"]}
            ],
            "staff": [
                {"_id": "t1", "fullName": "Ahmed Karimov", "position": "Senior barber"},
                {"_id": "t2", "fullName": "Igor Petrov"},
                {"_id": "t3", "fullName": "Dmitry Sokolov"}
            ]
        }
    }))
    .unwrap()
}

/// Backend with the barbershop, per-staff services and slots on 2024-05-31
/// and 2024-06-01.
pub fn barbershop_api() -> MockApi {
    let business = barbershop();
    let mut api = MockApi::new(Some(business.clone()));
    api.staff_services.insert(
        "t1".to_string(),
        vec![business.services[0].clone(), business.services[2].clone()],
    );
    api.slots
        .insert(day("2024-05-31"), vec![slot("2024-05-31", "15:00")]);
    api.slots
        .insert(day("2024-06-01"), vec![slot("2024-06-01", "10:00")]);
    api
}

/// Lets spawned tasks run until `call` shows up in the mock's log.
pub async fn wait_for_call(api: &MockApi, call: &str) {
    for _ in 0..1000 {
        if api.calls().iter().any(|c| c == call) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("{call} was never made; calls: {:?}", api.calls());
}
