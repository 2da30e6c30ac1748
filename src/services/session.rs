use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{Local, NaiveDate};

use crate::errors::BookingError;
use crate::models::{ContactForm, SlotKey, WizardStage};
use crate::services::api::BookingApi;
use crate::services::phone::PhonePolicy;
use crate::services::platform::Platform;
use crate::services::wizard::WizardState;

type Today = Box<dyn Fn() -> NaiveDate + Send + Sync>;

/// One visitor's pass through the booking wizard.
///
/// Backend lookups run without holding the state lock. Each stage keeps a
/// generation counter; a response whose generation has been superseded by a
/// newer selection is dropped, so the last selection always wins.
pub struct WizardSession {
    api: Arc<dyn BookingApi>,
    phone_policy: PhonePolicy,
    country_code: String,
    platform: Platform,
    today: Today,
    inner: Mutex<Inner>,
}

struct Inner {
    state: WizardState,
    business_gen: u64,
    staff_gen: u64,
    slot_gen: u64,
}

impl WizardSession {
    pub fn new(
        api: Arc<dyn BookingApi>,
        business_id: impl Into<String>,
        phone_policy: PhonePolicy,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            api,
            phone_policy,
            country_code: country_code.into(),
            platform: Platform::Desktop,
            today: Box::new(|| Local::now().date_naive()),
            inner: Mutex::new(Inner {
                state: WizardState::new(business_id),
                business_gen: 0,
                staff_gen: 0,
                slot_gen: 0,
            }),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_today(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Box::new(today);
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn snapshot(&self) -> WizardState {
        self.lock().state.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetches the business profile. Allowed on first load and after a failed
    /// load; a business known to be missing is never fetched again.
    pub async fn load(&self) -> Result<WizardState, BookingError> {
        let (business_id, ticket) = {
            let mut inner = self.lock();
            match inner.state.stage {
                WizardStage::Loading | WizardStage::LoadFailed => {}
                WizardStage::NotFound => {
                    return Err(BookingError::NotFound(format!(
                        "business {}",
                        inner.state.business_id
                    )))
                }
                stage => {
                    return Err(BookingError::InvalidTransition {
                        stage: stage.as_str(),
                        action: "reload the business",
                    })
                }
            }
            inner.state.stage = WizardStage::Loading;
            inner.business_gen += 1;
            (inner.state.business_id.clone(), inner.business_gen)
        };

        let outcome = self.api.get_business(&business_id).await;

        let mut inner = self.lock();
        if inner.business_gen != ticket {
            tracing::debug!(business_id = %business_id, "discarding superseded business load");
            return Ok(inner.state.clone());
        }
        inner.state = match outcome {
            Ok(business) => {
                if business.is_none() {
                    tracing::info!(business_id = %business_id, "business not found");
                }
                inner.state.business_loaded(business)
            }
            Err(e) => {
                tracing::warn!(business_id = %business_id, error = %e, "failed to load business");
                inner.state.business_failed(&e)
            }
        };
        Ok(inner.state.clone())
    }

    pub fn choose_service(&self, service_id: &str) -> Result<WizardState, BookingError> {
        let mut inner = self.lock();
        let next = inner.state.choose_service(service_id)?;
        // Any pending per-staff or slot response now belongs to an old selection.
        inner.staff_gen += 1;
        inner.slot_gen += 1;
        tracing::debug!(
            service_id,
            eligible_staff = next.staff.len(),
            "service selected"
        );
        inner.state = next;
        Ok(inner.state.clone())
    }

    /// Selects a staff member, then narrows the offered services to what the
    /// backend lists for them.
    pub async fn choose_staff(&self, staff_id: &str) -> Result<WizardState, BookingError> {
        let (business_id, ticket) = {
            let mut inner = self.lock();
            let next = inner.state.choose_staff(staff_id)?;
            inner.state = next;
            inner.staff_gen += 1;
            inner.slot_gen += 1;
            (inner.state.business_id.clone(), inner.staff_gen)
        };

        let services = match self.api.get_services_for_staff(&business_id, staff_id).await {
            Ok(services) => services,
            Err(e) => {
                tracing::warn!(staff_id, error = %e, "failed to load services for staff, keeping current list");
                vec![]
            }
        };

        let mut inner = self.lock();
        if inner.staff_gen != ticket {
            tracing::debug!(staff_id, "discarding superseded services-by-staff response");
            return Ok(inner.state.clone());
        }
        inner.state = inner.state.staff_services_loaded(staff_id, services);
        Ok(inner.state.clone())
    }

    /// Selects a date and fetches its open slots. The selected time is
    /// cleared before the fetch starts.
    pub async fn choose_date(&self, date: NaiveDate) -> Result<WizardState, BookingError> {
        let today = (self.today)();
        let (key, ticket) = {
            let mut inner = self.lock();
            let (next, key) = inner.state.choose_date(date, today)?;
            inner.state = next;
            inner.slot_gen += 1;
            (key, inner.slot_gen)
        };
        self.fetch_slots(key, ticket).await
    }

    /// Re-fetches slots for the current triple after a failure or to
    /// refresh a stale list.
    pub async fn retry_slots(&self) -> Result<WizardState, BookingError> {
        let (key, ticket) = {
            let mut inner = self.lock();
            if !inner.state.stage.accepts_selection() {
                return Err(BookingError::InvalidTransition {
                    stage: inner.state.stage.as_str(),
                    action: "reload available times",
                });
            }
            let key = inner.state.current_key().ok_or(BookingError::InvalidTransition {
                stage: inner.state.stage.as_str(),
                action: "reload available times before choosing a date",
            })?;
            inner.slot_gen += 1;
            (key, inner.slot_gen)
        };
        self.fetch_slots(key, ticket).await
    }

    async fn fetch_slots(&self, key: SlotKey, ticket: u64) -> Result<WizardState, BookingError> {
        let business_id = self.lock().state.business_id.clone();
        let outcome = self
            .api
            .get_available_slots(&business_id, &key.staff_id, &key.service_id, key.date)
            .await;
        if let Err(e) = &outcome {
            tracing::warn!(
                staff_id = %key.staff_id,
                service_id = %key.service_id,
                date = %key.date,
                error = %e,
                "failed to load available slots"
            );
        }

        let mut inner = self.lock();
        if inner.slot_gen != ticket {
            tracing::debug!(date = %key.date, "discarding superseded slot response");
            return Ok(inner.state.clone());
        }
        inner.state = inner.state.slots_loaded(&key, outcome);
        Ok(inner.state.clone())
    }

    pub fn choose_time(&self, time: &str) -> Result<WizardState, BookingError> {
        let mut inner = self.lock();
        let next = inner.state.choose_time(time)?;
        inner.state = next;
        Ok(inner.state.clone())
    }

    /// Validates and submits the contact form. Backend failures become the
    /// `Failed` stage; only local validation and out-of-order calls are
    /// returned as errors.
    pub async fn submit(&self, form: ContactForm) -> Result<WizardState, BookingError> {
        let request = {
            let mut inner = self.lock();
            let begun = inner
                .state
                .begin_submit(form.clone(), self.phone_policy, &self.country_code);
            match begun {
                Ok((next, request)) => {
                    inner.state = next;
                    request
                }
                Err(e @ BookingError::Validation(_)) => {
                    inner.state = inner.state.form_rejected(form, &e);
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        };

        let outcome = self.api.submit_booking(&request).await;

        let mut inner = self.lock();
        inner.state = match outcome {
            Ok(result) => {
                tracing::info!(
                    business_id = %request.business_id,
                    appointment_id = ?result.id,
                    "booking confirmed"
                );
                inner.state.submit_succeeded(result)
            }
            Err(e) => {
                tracing::warn!(business_id = %request.business_id, error = %e, "booking failed");
                inner.state.submit_failed(&e)
            }
        };
        Ok(inner.state.clone())
    }

    pub fn reset(&self) -> Result<WizardState, BookingError> {
        let mut inner = self.lock();
        let next = inner.state.reset()?;
        inner.staff_gen += 1;
        inner.slot_gen += 1;
        inner.state = next;
        Ok(inner.state.clone())
    }
}
