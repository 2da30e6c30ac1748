mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use bookme::errors::BookingError;
use bookme::models::{BookingStatus, ContactForm, WizardStage};
use bookme::services::phone::PhonePolicy;
use bookme::services::session::WizardSession;

use common::{barbershop_api, day, slot, wait_for_call, MockApi};

fn session(api: &Arc<MockApi>) -> WizardSession {
    WizardSession::new(api.clone(), "b1", PhonePolicy::Strict, "998")
        .with_today(|| day("2024-05-01"))
}

fn contact(name: &str, phone: &str) -> ContactForm {
    ContactForm {
        name: name.to_string(),
        phone: phone.to_string(),
        notes: None,
    }
}

/// Loads the business and walks to the contact form on 2024-06-01 10:00.
async fn at_contact_form(api: &Arc<MockApi>) -> WizardSession {
    let s = session(api);
    s.load().await.unwrap();
    s.choose_service("s1").unwrap();
    s.choose_staff("t1").await.unwrap();
    s.choose_date(day("2024-06-01")).await.unwrap();
    s.choose_time("10:00").unwrap();
    s
}

// ── Loading ──

#[tokio::test]
async fn test_business_not_found_stops_fetching() {
    let api = Arc::new(MockApi::new(None));
    let s = session(&api);

    let state = s.load().await.unwrap();
    assert_eq!(state.stage, WizardStage::NotFound);

    assert!(matches!(s.choose_service("s1"), Err(BookingError::NotFound(_))));
    assert!(matches!(
        s.choose_date(day("2024-06-01")).await,
        Err(BookingError::NotFound(_))
    ));
    assert!(matches!(s.load().await, Err(BookingError::NotFound(_))));
    assert!(matches!(s.retry_slots().await, Err(BookingError::InvalidTransition { .. })));

    assert_eq!(api.calls(), vec!["business:b1"]);
}

#[tokio::test]
async fn test_business_network_failure_is_retryable() {
    let api = barbershop_api();
    api.business_failures.store(1, Ordering::SeqCst);
    let api = Arc::new(api);
    let s = session(&api);

    let state = s.load().await.unwrap();
    assert_eq!(state.stage, WizardStage::LoadFailed);
    assert!(state.error.is_some());

    let state = s.load().await.unwrap();
    assert_eq!(state.stage, WizardStage::SelectingService);
    assert_eq!(state.services.len(), 3);
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn test_business_cannot_be_reloaded_mid_wizard() {
    let api = Arc::new(barbershop_api());
    let s = session(&api);
    s.load().await.unwrap();
    assert!(matches!(s.load().await, Err(BookingError::InvalidTransition { .. })));
}

// ── Service & staff ──

#[tokio::test]
async fn test_staff_filtered_by_service() {
    let api = Arc::new(barbershop_api());
    let s = session(&api);
    s.load().await.unwrap();

    let state = s.choose_service("s1").unwrap();
    let ids: Vec<_> = state.staff.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t2"]);

    assert!(matches!(
        s.choose_staff("t3").await,
        Err(BookingError::InvalidSelection(_))
    ));
    assert!(!api.calls().iter().any(|c| c == "services:t3"));

    let state = s.choose_staff("t1").await.unwrap();
    assert_eq!(state.stage, WizardStage::SelectingDate);
    assert_eq!(state.draft.staff.as_ref().map(|t| t.id.as_str()), Some("t1"));
    let services: Vec<_> = state.services.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(services, vec!["s1", "s3"]);
}

#[tokio::test]
async fn test_staff_without_backend_services_keeps_list() {
    let api = Arc::new(barbershop_api());
    let s = session(&api);
    s.load().await.unwrap();
    s.choose_service("s1").unwrap();

    let state = s.choose_staff("t2").await.unwrap();
    assert_eq!(state.services.len(), 3);
    assert!(api.calls().iter().any(|c| c == "services:t2"));
}

// ── Date & time ──

#[tokio::test]
async fn test_past_date_rejected_without_fetch() {
    let api = Arc::new(barbershop_api());
    let s = session(&api);
    s.load().await.unwrap();
    s.choose_service("s1").unwrap();
    s.choose_staff("t1").await.unwrap();

    let err = s.choose_date(day("2024-04-30")).await.unwrap_err();
    assert!(matches!(err, BookingError::InvalidSelection(_)));
    assert!(!api.calls().iter().any(|c| c.starts_with("slots:")));
}

#[tokio::test]
async fn test_stale_slot_fetch_does_not_overwrite_selection() {
    let api = barbershop_api();
    let old_gate = api.gate(day("2024-05-31"));
    let api = Arc::new(api);
    let s = Arc::new(session(&api));
    s.load().await.unwrap();
    s.choose_service("s1").unwrap();
    s.choose_staff("t1").await.unwrap();

    let older = {
        let s = Arc::clone(&s);
        tokio::spawn(async move { s.choose_date(day("2024-05-31")).await })
    };
    wait_for_call(&api, "slots:t1:s1:2024-05-31").await;

    let state = s.choose_date(day("2024-06-01")).await.unwrap();
    assert_eq!(state.slots, vec![slot("2024-06-01", "10:00")]);
    let state = s.choose_time("10:00").unwrap();
    assert_eq!(state.stage, WizardStage::FillingContactForm);

    old_gate.notify_one();
    older.await.unwrap().unwrap();

    let state = s.snapshot();
    assert_eq!(state.draft.date, Some(day("2024-06-01")));
    assert_eq!(state.draft.time.as_deref(), Some("10:00"));
    assert_eq!(state.slots, vec![slot("2024-06-01", "10:00")]);
    assert_eq!(state.stage, WizardStage::FillingContactForm);
}

#[tokio::test]
async fn test_changing_date_clears_time_before_fetch_resolves() {
    let api = barbershop_api();
    let gate = api.gate(day("2024-05-31"));
    let api = Arc::new(api);
    let s = Arc::new(at_contact_form(&api).await);
    assert_eq!(s.snapshot().draft.time.as_deref(), Some("10:00"));

    let pending = {
        let s = Arc::clone(&s);
        tokio::spawn(async move { s.choose_date(day("2024-05-31")).await })
    };
    wait_for_call(&api, "slots:t1:s1:2024-05-31").await;

    let mid = s.snapshot();
    assert_eq!(mid.draft.time, None);
    assert!(mid.slots.is_empty());
    assert_eq!(mid.stage, WizardStage::SelectingTime);
    assert!(s.choose_time("10:00").is_err());

    gate.notify_one();
    let state = pending.await.unwrap().unwrap();
    assert_eq!(state.slots, vec![slot("2024-05-31", "15:00")]);
    assert!(s.choose_time("10:00").is_err());
    assert!(s.choose_time("15:00").is_ok());
}

#[tokio::test]
async fn test_slot_fetch_failure_degrades_and_retries() {
    let api = barbershop_api();
    api.slot_failures.store(1, Ordering::SeqCst);
    let api = Arc::new(api);
    let s = session(&api);
    s.load().await.unwrap();
    s.choose_service("s1").unwrap();
    s.choose_staff("t1").await.unwrap();

    let state = s.choose_date(day("2024-06-01")).await.unwrap();
    assert!(state.slots.is_empty());
    assert!(state.slots_failed);
    assert!(s.choose_time("10:00").is_err());

    let state = s.retry_slots().await.unwrap();
    assert!(!state.slots_failed);
    assert_eq!(state.slots.len(), 1);
    assert!(s.choose_time("10:00").is_ok());
}

#[tokio::test]
async fn test_changing_service_discards_pending_slots() {
    let api = barbershop_api();
    let gate = api.gate(day("2024-06-01"));
    let api = Arc::new(api);
    let s = Arc::new(session(&api));
    s.load().await.unwrap();
    s.choose_service("s1").unwrap();
    s.choose_staff("t1").await.unwrap();

    let pending = {
        let s = Arc::clone(&s);
        tokio::spawn(async move { s.choose_date(day("2024-06-01")).await })
    };
    wait_for_call(&api, "slots:t1:s1:2024-06-01").await;

    s.choose_service("s2").unwrap();
    gate.notify_one();
    pending.await.unwrap().unwrap();

    let state = s.snapshot();
    assert_eq!(state.stage, WizardStage::SelectingStaff);
    assert!(state.slots.is_empty());
    assert_eq!(state.draft.date, None);
    let ids: Vec<_> = state.staff.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["t3"]);
}

// ── Submission ──

#[tokio::test]
async fn test_submit_success() {
    let api = Arc::new(barbershop_api());
    let s = at_contact_form(&api).await;

    let state = s.submit(contact("Jo", "+998901234567")).await.unwrap();
    assert_eq!(state.stage, WizardStage::Succeeded);
    let result = state.result.as_ref().unwrap();
    assert_eq!(result.id.as_deref(), Some("A1"));
    assert_eq!(result.status, BookingStatus::Confirmed);
    assert_eq!(result.staff_name.as_deref(), Some("Ahmed Karimov"));
    assert!(state.draft.service.is_none());

    let submitted = api.submitted.lock().unwrap().clone();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].phone_number, "998901234567");
    assert_eq!(submitted[0].full_name, "Jo");
    assert_eq!(submitted[0].time, "10:00");
    assert_eq!(submitted[0].date, "2024-06-01");
}

#[tokio::test]
async fn test_invalid_contact_never_reaches_backend() {
    let api = Arc::new(barbershop_api());
    let s = at_contact_form(&api).await;

    for form in [contact("", "+998901234567"), contact("Jo", "12-34")] {
        let err = s.submit(form).await.unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
    }

    let state = s.snapshot();
    assert_eq!(state.stage, WizardStage::FillingContactForm);
    assert_eq!(state.draft.contact.phone, "12-34");
    assert!(state.field_errors.contains_key("phone"));
    assert!(api.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_backend_rejection_keeps_form() {
    let mut api = barbershop_api();
    api.submit_outcome = Err(BookingError::BackendRejection {
        status: 409,
        message: "Time slot already booked".into(),
    });
    let api = Arc::new(api);
    let s = at_contact_form(&api).await;

    let state = s.submit(contact("Jo", "+998901234567")).await.unwrap();
    assert_eq!(state.stage, WizardStage::Failed);
    assert_eq!(state.error.as_deref(), Some("Time slot already booked"));
    assert_eq!(state.draft.contact.name, "Jo");
    assert_eq!(state.draft.contact.phone, "+998901234567");

    // pick another time after the conflict
    assert!(s.choose_date(day("2024-05-31")).await.is_ok());
    let state = s.choose_time("15:00").unwrap();
    assert_eq!(state.draft.contact.name, "Jo");
}

#[tokio::test]
async fn test_network_failure_on_submit_shows_generic_message() {
    let mut api = barbershop_api();
    api.submit_outcome = Err(BookingError::Network("request timed out".into()));
    let api = Arc::new(api);
    let s = at_contact_form(&api).await;

    let state = s.submit(contact("Jo", "+998901234567")).await.unwrap();
    assert_eq!(state.stage, WizardStage::Failed);
    assert_eq!(state.error.as_deref(), Some(bookme::errors::GENERIC_FAILURE));
}

#[tokio::test]
async fn test_reset_after_success_starts_over() {
    let api = Arc::new(barbershop_api());
    let s = at_contact_form(&api).await;
    s.submit(contact("Jo", "+998901234567")).await.unwrap();

    let state = s.reset().unwrap();
    assert_eq!(state.stage, WizardStage::SelectingService);
    assert!(state.result.is_none());
    assert!(s.choose_service("s2").is_ok());
}
