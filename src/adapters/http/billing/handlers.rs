//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to the billing command/query handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRequestParts, Json, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use secrecy::SecretString;

use crate::application::handlers::billing::{
    ApplyPaymentOutcomeHandler, CheckoutSettings, CreatePaymentIntentCommand,
    CreatePaymentIntentHandler, GatewayReconciler, GetCurrentPlanHandler, GetCurrentPlanQuery,
    GrantTrialCommand, HandlePaymentNotificationCommand, HandlePaymentNotificationHandler,
    IdempotencyLedger, ListUnprocessedWebhookEventsHandler, PaymentNotificationProcessor,
    ReplayWebhookEventCommand, ReplayWebhookEventHandler, StartTrialCommand, TrialManager,
};
use crate::domain::billing::{BillingError, SignatureVerifier};
use crate::domain::foundation::{BusinessId, Timestamp, UserId};
use crate::ports::{
    AuditLog, BillingUnitOfWork, BusinessDirectory, CacheInvalidator, CurrentPlanRepository,
    PaymentGateway, PaymentRepository, PlanCatalog, TrialRepository, WebhookEventRepository,
};

use super::dto::{
    CurrentPlanResponse, ErrorResponse, GrantTrialRequest, PlanSelectionRequest, ReplayResponse,
    TrialResponse, UnprocessedEventsQuery, WebhookAck,
};

/// Header carrying the processor's `ts=...,v1=...` signature.
pub const SIGNATURE_HEADER: &str = "x-signature";
/// Header carrying the processor's delivery id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Collaborators the billing handlers are built from.
#[derive(Clone)]
pub struct BillingPorts {
    pub payments: Arc<dyn PaymentRepository>,
    pub plans: Arc<dyn CurrentPlanRepository>,
    pub trials: Arc<dyn TrialRepository>,
    pub unit_of_work: Arc<dyn BillingUnitOfWork>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub catalog: Arc<dyn PlanCatalog>,
    pub cache: Arc<dyn CacheInvalidator>,
    pub audit_log: Arc<dyn AuditLog>,
    pub businesses: Arc<dyn BusinessDirectory>,
}

#[derive(Clone)]
pub struct BillingSettings {
    pub webhook_secret: SecretString,
    pub checkout: CheckoutSettings,
    pub subscription_days: i64,
    pub trial_days: i64,
}

/// Shared application state. Handlers are wired once and shared by reference.
#[derive(Clone)]
pub struct BillingAppState {
    pub notifications: Arc<HandlePaymentNotificationHandler>,
    pub payment_intents: Arc<CreatePaymentIntentHandler>,
    pub trials: Arc<TrialManager>,
    pub current_plan: Arc<GetCurrentPlanHandler>,
    pub replay: Arc<ReplayWebhookEventHandler>,
    pub unprocessed: Arc<ListUnprocessedWebhookEventsHandler>,
    pub businesses: Arc<dyn BusinessDirectory>,
}

impl BillingAppState {
    pub fn new(ports: BillingPorts, settings: BillingSettings) -> Self {
        let ledger = Arc::new(IdempotencyLedger::new(ports.webhook_events.clone()));
        let processor = Arc::new(PaymentNotificationProcessor::new(
            ledger.clone(),
            GatewayReconciler::new(ports.gateway.clone()),
            ports.payments.clone(),
            ApplyPaymentOutcomeHandler::new(
                ports.unit_of_work.clone(),
                ports.cache.clone(),
                settings.subscription_days,
            ),
        ));

        Self {
            notifications: Arc::new(HandlePaymentNotificationHandler::new(
                SignatureVerifier::new(settings.webhook_secret),
                ledger,
                processor.clone(),
            )),
            payment_intents: Arc::new(CreatePaymentIntentHandler::new(
                ports.payments.clone(),
                ports.catalog.clone(),
                ports.gateway.clone(),
                settings.checkout,
            )),
            trials: Arc::new(TrialManager::new(
                ports.trials.clone(),
                ports.unit_of_work.clone(),
                ports.audit_log.clone(),
                ports.cache.clone(),
                settings.trial_days,
            )),
            current_plan: Arc::new(GetCurrentPlanHandler::new(ports.plans.clone())),
            replay: Arc::new(ReplayWebhookEventHandler::new(
                ports.webhook_events.clone(),
                processor,
                ports.audit_log.clone(),
            )),
            unprocessed: Arc::new(ListUnprocessedWebhookEventsHandler::new(ports.webhook_events)),
            businesses: ports.businesses,
        }
    }

    async fn business_of(&self, user: &AuthenticatedUser) -> Result<BusinessId, BillingError> {
        self.businesses
            .business_for_user(&user.user_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Business", &user.user_id))
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Caller identity, forwarded by the platform gateway as `X-User-Id`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("X-User-Id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| UserId::new(s.trim()).ok())
            .ok_or(AuthenticationRequired)?;

        Ok(AuthenticatedUser { user_id })
    }
}

/// Operator identity: an authenticated user the directory lists as admin.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: UserId,
}

pub enum AdminRejection {
    Unauthenticated,
    Forbidden,
    Lookup(BillingError),
}

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        match self {
            AdminRejection::Unauthenticated => AuthenticationRequired.into_response(),
            AdminRejection::Forbidden => {
                let error = ErrorResponse::new("FORBIDDEN", "Operator access is required");
                (StatusCode::FORBIDDEN, Json(error)).into_response()
            }
            AdminRejection::Lookup(err) => BillingApiError(err).into_response(),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<BillingAppState> for AdminUser {
    type Rejection = AdminRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &BillingAppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state)
            .await
            .map_err(|_| AdminRejection::Unauthenticated)?;

        let is_admin = state
            .businesses
            .is_admin(&user.user_id)
            .await
            .map_err(|e| AdminRejection::Lookup(e.into()))?;
        if !is_admin {
            tracing::warn!(user_id = %user.user_id, "Admin endpoint called by non-admin user");
            return Err(AdminRejection::Forbidden);
        }

        Ok(AdminUser {
            user_id: user.user_id,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/:processor - Payment processor notification.
///
/// Always answers 200; the body tells internal observers what happened.
pub async fn receive_payment_notification(
    State(state): State<BillingAppState>,
    Path(processor): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let cmd = HandlePaymentNotificationCommand {
        source: processor,
        raw_body: body.to_vec(),
        signature_header: header(SIGNATURE_HEADER),
        request_id: header(REQUEST_ID_HEADER),
    };

    let outcome = state.notifications.handle(cmd).await;
    (StatusCode::OK, Json(WebhookAck::from(&outcome)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Business Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /billing/checkout - Open a payment intent for the caller's business
pub async fn create_checkout(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<PlanSelectionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let business_id = state.business_of(&user).await?;
    let intent = state
        .payment_intents
        .handle(CreatePaymentIntentCommand {
            business_id,
            plan_type: request.plan,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(intent)))
}

/// POST /billing/trial - Start a self-service trial
pub async fn start_trial(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<PlanSelectionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let business_id = state.business_of(&user).await?;
    let trial = state
        .trials
        .start_trial(StartTrialCommand {
            business_id,
            plan_type: request.plan,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TrialResponse::from(trial))))
}

/// GET /billing/plan - The caller's current plan
pub async fn get_current_plan(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let business_id = state.business_of(&user).await?;
    let plan = state
        .current_plan
        .handle(GetCurrentPlanQuery { business_id })
        .await?;

    Ok(Json(CurrentPlanResponse::from(plan)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Admin Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /admin/trials - Grant a trial with an explicit expiry
pub async fn grant_trial(
    State(state): State<BillingAppState>,
    admin: AdminUser,
    Json(request): Json<GrantTrialRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let trial = state
        .trials
        .grant_trial(GrantTrialCommand {
            business_id: request.business_id,
            plan_type: request.plan,
            expires_at: Timestamp::from_datetime(request.expires_at),
            granted_by: admin.user_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TrialResponse::from(trial))))
}

/// GET /admin/webhooks/unprocessed - Events waiting for manual reconciliation
pub async fn list_unprocessed_webhooks(
    State(state): State<BillingAppState>,
    _admin: AdminUser,
    Query(query): Query<UnprocessedEventsQuery>,
) -> Result<impl IntoResponse, BillingApiError> {
    let events = state.unprocessed.handle(query.limit.unwrap_or(100)).await?;
    Ok(Json(events))
}

/// POST /admin/webhooks/:request_id/replay - Re-run reconciliation for one event
pub async fn replay_webhook(
    State(state): State<BillingAppState>,
    admin: AdminUser,
    Path(request_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let outcome = state
        .replay
        .handle(ReplayWebhookEventCommand {
            request_id: request_id.clone(),
            actor: Some(admin.user_id),
        })
        .await?;

    Ok(Json(ReplayResponse {
        request_id,
        outcome: outcome.as_str(),
        error: outcome.error().map(ToString::to_string),
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let error_code = match &self.0 {
            BillingError::AuthenticationFailure => "AUTHENTICATION_FAILED",
            BillingError::UnresolvedReference { .. } => "UNRESOLVED_REFERENCE",
            BillingError::GatewayUnavailable(_) => "GATEWAY_UNAVAILABLE",
            BillingError::InvalidStateTransition(_) => "INVALID_STATE_TRANSITION",
            BillingError::PersistenceFailure(_) => "PERSISTENCE_FAILURE",
            BillingError::Conflict(_) => "CONFLICT",
            BillingError::NotFound { .. } => "NOT_FOUND",
            BillingError::PlanNotFound(_) => "PLAN_NOT_FOUND",
            BillingError::Validation(_) => "VALIDATION_FAILED",
            BillingError::Internal(_) => "INTERNAL_ERROR",
        };

        if self.0.is_alerting() {
            tracing::error!(alert = true, error = %self.0, "Billing request failed");
        }

        let body = ErrorResponse::new(error_code, self.0.to_string());
        (self.0.status_code(), Json(body)).into_response()
    }
}
