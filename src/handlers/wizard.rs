use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, BookingError};
use crate::models::business::group_by_category;
use crate::models::{ContactForm, Service, WizardStage};
use crate::services::platform::Platform;
use crate::services::session::WizardSession;
use crate::services::wizard::WizardState;
use crate::state::AppState;

#[derive(Serialize)]
pub struct WizardView {
    /// Absent when the business does not exist; no session is kept then.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub platform: Platform,
    pub mobile: bool,
    /// Offered services grouped by category, in first-seen order.
    pub service_groups: Vec<ServiceGroup>,
    pub social_links: Vec<SocialLink>,
    #[serde(flatten)]
    pub state: WizardState,
}

#[derive(Serialize)]
pub struct ServiceGroup {
    pub category: String,
    pub services: Vec<ServiceCard>,
}

#[derive(Serialize)]
pub struct ServiceCard {
    #[serde(flatten)]
    pub service: Service,
    pub duration_minutes: u32,
    pub effective_price: f64,
}

#[derive(Serialize)]
pub struct SocialLink {
    pub kind: &'static str,
    pub url: String,
}

fn view(session_id: &str, session: &WizardSession, state: WizardState) -> Json<WizardView> {
    let service_groups = group_by_category(&state.services)
        .into_iter()
        .map(|(category, services)| ServiceGroup {
            category,
            services: services
                .into_iter()
                .map(|service| ServiceCard {
                    duration_minutes: service.duration_minutes(),
                    effective_price: service.effective_price(),
                    service,
                })
                .collect(),
        })
        .collect();
    let social_links = state
        .business
        .as_ref()
        .map(|b| {
            b.social_links()
                .into_iter()
                .map(|(kind, url)| SocialLink {
                    kind,
                    url: url.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let platform = session.platform();
    Json(WizardView {
        session_id: Some(session_id.to_string()),
        platform,
        mobile: platform.is_mobile(),
        service_groups,
        social_links,
        state,
    })
}

fn find_session(state: &AppState, session_id: &str) -> Result<Arc<WizardSession>, AppError> {
    state
        .get_session(session_id)
        .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))
}

// POST /api/wizard
#[derive(Deserialize)]
pub struct CreateSession {
    pub business_id: String,
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateSession>,
) -> Result<Response, AppError> {
    let business_id = payload.business_id.trim();
    if business_id.is_empty() {
        return Err(AppError::BadRequest("business_id is required".to_string()));
    }

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    let platform = state.platform.detect(user_agent);

    let session = Arc::new(
        WizardSession::new(
            Arc::clone(&state.api),
            business_id,
            state.config.phone_policy,
            state.config.country_code.clone(),
        )
        .with_platform(platform),
    );
    let wizard = session.load().await?;

    if wizard.stage == WizardStage::NotFound {
        tracing::info!(business_id, "business not found, no session kept");
        let mut body = view("", &session, wizard);
        body.0.session_id = None;
        return Ok((StatusCode::NOT_FOUND, body).into_response());
    }

    let session_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        session_id = %session_id,
        business_id,
        platform = platform.as_str(),
        stage = wizard.stage.as_str(),
        "wizard session started"
    );

    let body = view(&session_id, &session, wizard);
    state.insert_session(session_id, session);
    Ok((StatusCode::CREATED, body).into_response())
}

// GET /api/wizard/:session_id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<WizardView>, AppError> {
    let session = find_session(&state, &session_id)?;
    Ok(view(&session_id, &session, session.snapshot()))
}

// DELETE /api/wizard/:session_id
pub async fn abandon_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.remove_session(&session_id) {
        tracing::info!(session_id = %session_id, "wizard session abandoned");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::SessionNotFound(session_id))
    }
}

// POST /api/wizard/:session_id/business/retry
pub async fn retry_business(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<WizardView>, AppError> {
    let session = find_session(&state, &session_id)?;
    let wizard = session.load().await?;
    if wizard.stage == WizardStage::NotFound {
        state.remove_session(&session_id);
        tracing::info!(session_id = %session_id, "business gone, session dropped");
        return Err(AppError::Booking(BookingError::NotFound(format!(
            "business {}",
            wizard.business_id
        ))));
    }
    Ok(view(&session_id, &session, wizard))
}

// POST /api/wizard/:session_id/service
#[derive(Deserialize)]
pub struct ChooseService {
    pub service_id: String,
}

pub async fn choose_service(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<ChooseService>,
) -> Result<Json<WizardView>, AppError> {
    let session = find_session(&state, &session_id)?;
    let wizard = session.choose_service(&payload.service_id)?;
    Ok(view(&session_id, &session, wizard))
}

// POST /api/wizard/:session_id/staff
#[derive(Deserialize)]
pub struct ChooseStaff {
    pub staff_id: String,
}

pub async fn choose_staff(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<ChooseStaff>,
) -> Result<Json<WizardView>, AppError> {
    let session = find_session(&state, &session_id)?;
    let wizard = session.choose_staff(&payload.staff_id).await?;
    Ok(view(&session_id, &session, wizard))
}

// POST /api/wizard/:session_id/date
#[derive(Deserialize)]
pub struct ChooseDate {
    pub date: String,
}

pub async fn choose_date(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<ChooseDate>,
) -> Result<Json<WizardView>, AppError> {
    let date = NaiveDate::parse_from_str(payload.date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("invalid date: {}", payload.date)))?;
    let session = find_session(&state, &session_id)?;
    let wizard = session.choose_date(date).await?;
    Ok(view(&session_id, &session, wizard))
}

// POST /api/wizard/:session_id/slots/retry
pub async fn retry_slots(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<WizardView>, AppError> {
    let session = find_session(&state, &session_id)?;
    let wizard = session.retry_slots().await?;
    Ok(view(&session_id, &session, wizard))
}

// POST /api/wizard/:session_id/time
#[derive(Deserialize)]
pub struct ChooseTime {
    pub time: String,
}

pub async fn choose_time(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<ChooseTime>,
) -> Result<Json<WizardView>, AppError> {
    let session = find_session(&state, &session_id)?;
    let wizard = session.choose_time(&payload.time)?;
    Ok(view(&session_id, &session, wizard))
}

// POST /api/wizard/:session_id/submit
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(form): Json<ContactForm>,
) -> Result<Json<WizardView>, AppError> {
    let session = find_session(&state, &session_id)?;
    let wizard = session.submit(form).await?;
    Ok(view(&session_id, &session, wizard))
}

// POST /api/wizard/:session_id/reset
pub async fn reset(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<WizardView>, AppError> {
    let session = find_session(&state, &session_id)?;
    let wizard = session.reset()?;
    Ok(view(&session_id, &session, wizard))
}
