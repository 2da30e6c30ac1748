use chrono::NaiveDate;
use serde::Serialize;

use crate::errors::{BookingError, FieldErrors};
use crate::models::business::eligible_staff;
use crate::models::{
    BookingDraft, BookingRequest, BookingResult, Business, ContactForm, Service, Slot, SlotKey,
    Staff, WizardStage,
};
use crate::services::phone::PhonePolicy;
use crate::services::validation::{sanitize_input, validate_contact_form};

/// Everything the booking widget shows. Transitions never mutate a state in
/// place; each returns the next one.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WizardState {
    pub business_id: String,
    pub stage: WizardStage,
    pub business: Option<Business>,
    /// Services currently offered. Narrowed once a staff member is chosen.
    pub services: Vec<Service>,
    /// Staff eligible for the selected service.
    pub staff: Vec<Staff>,
    pub no_eligible_staff: bool,
    pub slots: Vec<Slot>,
    /// Which triple `slots` belongs to. `None` until a fetch lands.
    pub slots_for: Option<SlotKey>,
    pub slots_failed: bool,
    pub draft: BookingDraft,
    pub field_errors: FieldErrors,
    pub error: Option<String>,
    pub result: Option<BookingResult>,
}

impl WizardState {
    pub fn new(business_id: impl Into<String>) -> Self {
        Self {
            business_id: business_id.into(),
            stage: WizardStage::Loading,
            business: None,
            services: vec![],
            staff: vec![],
            no_eligible_staff: false,
            slots: vec![],
            slots_for: None,
            slots_failed: false,
            draft: BookingDraft::default(),
            field_errors: FieldErrors::new(),
            error: None,
            result: None,
        }
    }

    pub fn business_loaded(&self, business: Option<Business>) -> Self {
        let mut next = self.clone();
        next.error = None;
        match business {
            Some(business) => {
                next.stage = WizardStage::SelectingService;
                next.services = business.services.clone();
                next.business = Some(business);
            }
            None => {
                next.stage = WizardStage::NotFound;
                next.business = None;
                next.services.clear();
            }
        }
        next
    }

    pub fn business_failed(&self, err: &BookingError) -> Self {
        let mut next = self.clone();
        next.stage = WizardStage::LoadFailed;
        next.error = Some(err.to_string());
        next
    }

    /// The (staff, service, date) triple currently selected, if complete.
    pub fn current_key(&self) -> Option<SlotKey> {
        match (&self.draft.staff, &self.draft.service, self.draft.date) {
            (Some(staff), Some(service), Some(date)) => Some(SlotKey {
                staff_id: staff.id.clone(),
                service_id: service.id.clone(),
                date,
            }),
            _ => None,
        }
    }

    pub fn choose_service(&self, service_id: &str) -> Result<Self, BookingError> {
        self.ensure_selectable("choose a service")?;
        let business = self.business.as_ref().ok_or_else(|| {
            BookingError::NotFound(format!("business {}", self.business_id))
        })?;
        let service = business.find_service(service_id).cloned().ok_or_else(|| {
            BookingError::InvalidSelection(format!("service {service_id} is not offered"))
        })?;

        let mut next = self.cleared_for_selection();
        next.services = business.services.clone();
        next.staff = eligible_staff(&service, &business.staff);
        next.no_eligible_staff = next.staff.is_empty();
        next.draft = BookingDraft {
            service: Some(service),
            contact: self.draft.contact.clone(),
            ..BookingDraft::default()
        };
        next.stage = WizardStage::SelectingStaff;
        Ok(next)
    }

    pub fn choose_staff(&self, staff_id: &str) -> Result<Self, BookingError> {
        self.ensure_selectable("choose staff")?;
        let service = self.draft.service.as_ref().ok_or(BookingError::InvalidTransition {
            stage: self.stage.as_str(),
            action: "choose staff before a service",
        })?;
        let staff = self
            .staff
            .iter()
            .find(|s| s.id == staff_id)
            .cloned()
            .ok_or_else(|| {
                BookingError::InvalidSelection(format!(
                    "staff {staff_id} does not perform service {}",
                    service.id
                ))
            })?;

        let mut next = self.cleared_for_selection();
        next.draft = BookingDraft {
            service: self.draft.service.clone(),
            staff: Some(staff),
            contact: self.draft.contact.clone(),
            ..BookingDraft::default()
        };
        next.stage = WizardStage::SelectingDate;
        Ok(next)
    }

    /// Applies the backend's per-staff service list. Ignored when the staff
    /// member is no longer selected or the list is empty.
    pub fn staff_services_loaded(&self, staff_id: &str, services: Vec<Service>) -> Self {
        let still_selected = self.draft.staff.as_ref().is_some_and(|s| s.id == staff_id);
        if !still_selected || services.is_empty() {
            return self.clone();
        }
        let mut next = self.clone();
        next.services = services;
        next
    }

    /// Selects a date and returns the triple whose slots must be fetched.
    pub fn choose_date(&self, date: NaiveDate, today: NaiveDate) -> Result<(Self, SlotKey), BookingError> {
        self.ensure_selectable("choose a date")?;
        if self.draft.service.is_none() || self.draft.staff.is_none() {
            return Err(BookingError::InvalidTransition {
                stage: self.stage.as_str(),
                action: "choose a date before service and staff",
            });
        }
        if date < today {
            return Err(BookingError::InvalidSelection(format!(
                "{date} is in the past"
            )));
        }

        let mut next = self.cleared_for_selection();
        next.draft = BookingDraft {
            date: Some(date),
            time: None,
            ..self.draft.clone()
        };
        next.stage = WizardStage::SelectingTime;
        let key = next.current_key().ok_or(BookingError::InvalidTransition {
            stage: self.stage.as_str(),
            action: "choose a date",
        })?;
        Ok((next, key))
    }

    /// Applies a slot fetch. A result for any triple other than the one
    /// selected now is discarded, as is any slot dated another day. A failed
    /// fetch leaves an empty list and marks it retryable.
    pub fn slots_loaded(&self, key: &SlotKey, outcome: Result<Vec<Slot>, BookingError>) -> Self {
        if self.current_key().as_ref() != Some(key) {
            return self.clone();
        }

        let mut next = self.clone();
        next.slots_for = Some(key.clone());
        match outcome {
            Ok(slots) => {
                next.slots = slots.into_iter().filter(|s| s.date == key.date).collect();
                next.slots_failed = false;
                next.error = None;
            }
            Err(err) => {
                next.slots.clear();
                next.slots_failed = true;
                next.error = Some(err.to_string());
            }
        }

        // A time picked from an earlier list for the same triple must still
        // be on offer.
        let time_gone = next
            .draft
            .time
            .as_deref()
            .is_some_and(|t| !next.slots.iter().any(|s| s.date == key.date && s.matches(t)));
        if time_gone {
            next.draft.time = None;
            next.stage = WizardStage::SelectingTime;
        }
        next
    }

    pub fn choose_time(&self, time: &str) -> Result<Self, BookingError> {
        self.ensure_selectable("choose a time")?;
        let key = self.current_key().ok_or(BookingError::InvalidTransition {
            stage: self.stage.as_str(),
            action: "choose a time before a date",
        })?;
        if self.slots_for.as_ref() != Some(&key) {
            return Err(BookingError::InvalidSelection(
                "available times for this date are not loaded yet".to_string(),
            ));
        }
        let slot = self
            .slots
            .iter()
            .find(|s| s.date == key.date && s.matches(time))
            .ok_or_else(|| {
                BookingError::InvalidSelection(format!("{time} is not available on {}", key.date))
            })?;

        let mut next = self.clone();
        next.draft.time = Some(slot.start_time.clone());
        next.stage = WizardStage::FillingContactForm;
        next.error = None;
        next.result = None;
        Ok(next)
    }

    /// Validates the contact form and produces the request to send. Nothing
    /// reaches the network unless this succeeds.
    pub fn begin_submit(
        &self,
        form: ContactForm,
        policy: PhonePolicy,
        country_code: &str,
    ) -> Result<(Self, BookingRequest), BookingError> {
        if !matches!(self.stage, WizardStage::FillingContactForm | WizardStage::Failed) {
            return Err(BookingError::InvalidTransition {
                stage: self.stage.as_str(),
                action: "submit",
            });
        }
        let (Some(service), Some(staff), Some(date), Some(time)) = (
            &self.draft.service,
            &self.draft.staff,
            self.draft.date,
            &self.draft.time,
        ) else {
            return Err(BookingError::InvalidTransition {
                stage: self.stage.as_str(),
                action: "submit an incomplete booking",
            });
        };

        let form = ContactForm {
            name: sanitize_input(&form.name),
            phone: form.phone.trim().to_string(),
            notes: form
                .notes
                .as_deref()
                .map(sanitize_input)
                .filter(|n| !n.is_empty()),
        };
        validate_contact_form(&form, policy, country_code)?;

        let request = BookingRequest {
            business_id: self.business_id.clone(),
            full_name: form.name.clone(),
            phone_number: policy.normalize(&form.phone, country_code),
            service_id: service.id.clone(),
            staff_id: staff.id.clone(),
            date: date.format("%Y-%m-%d").to_string(),
            time: time.clone(),
            notes: form.notes.clone().unwrap_or_default(),
        };

        let mut next = self.clone();
        next.draft.contact = form;
        next.field_errors.clear();
        next.error = None;
        next.stage = WizardStage::Submitting;
        Ok((next, request))
    }

    /// Keeps what the customer typed alongside the field errors.
    pub fn form_rejected(&self, form: ContactForm, err: &BookingError) -> Self {
        let mut next = self.clone();
        next.draft.contact = form;
        next.field_errors = match err {
            BookingError::Validation(fields) => fields.clone(),
            _ => FieldErrors::new(),
        };
        next
    }

    pub fn submit_succeeded(&self, result: BookingResult) -> Self {
        let mut next = self.clone();
        next.result = Some(result.with_draft_fallback(&self.draft));
        next.draft = BookingDraft::default();
        next.staff.clear();
        next.no_eligible_staff = false;
        next.slots.clear();
        next.slots_for = None;
        next.error = None;
        next.stage = WizardStage::Succeeded;
        next
    }

    /// The draft, contact form included, survives so the customer can retry.
    pub fn submit_failed(&self, err: &BookingError) -> Self {
        let mut next = self.clone();
        next.error = Some(err.user_message());
        next.stage = WizardStage::Failed;
        next
    }

    /// Starts over with the same business.
    pub fn reset(&self) -> Result<Self, BookingError> {
        self.ensure_selectable("start over")?;
        let mut next = self.cleared_for_selection();
        next.draft = BookingDraft::default();
        next.services = self
            .business
            .as_ref()
            .map(|b| b.services.clone())
            .unwrap_or_default();
        next.stage = WizardStage::SelectingService;
        Ok(next)
    }

    fn ensure_selectable(&self, action: &'static str) -> Result<(), BookingError> {
        match self.stage {
            WizardStage::NotFound => Err(BookingError::NotFound(format!(
                "business {}",
                self.business_id
            ))),
            stage if !stage.accepts_selection() => Err(BookingError::InvalidTransition {
                stage: stage.as_str(),
                action,
            }),
            _ => Ok(()),
        }
    }

    fn cleared_for_selection(&self) -> Self {
        let mut next = self.clone();
        next.slots.clear();
        next.slots_for = None;
        next.slots_failed = false;
        next.field_errors.clear();
        next.error = None;
        next.result = None;
        next
    }
}
