//! In-memory billing store.
//!
//! Implements every persistence port over one mutex-guarded state so that a
//! unit of work is atomic the same way a database transaction is. Used by the
//! test suites and for running the service without Postgres.
//!
//! Supports fault injection:
//! - `fail_next_plan_write` fails the CurrentPlan write inside the next
//!   transaction that touches a plan, rolling back the whole unit
//! - `fail_next_ledger_insert` fails the next ledger insert with a database error

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::billing::{CurrentPlan, Payment, PaymentStatus, PlanStatus, Trial};
use crate::domain::foundation::{BusinessId, DomainError, ErrorCode, PaymentId, Timestamp};
use crate::ports::{
    BillingUnitOfWork, CurrentPlanRepository, PaymentRepository, PaymentTransition, SaveResult,
    TransitionOutcome, TrialOutcome, TrialRepository, WebhookEventRecord, WebhookEventRepository,
};

#[derive(Clone, Default)]
pub struct InMemoryBillingStore {
    inner: Arc<Mutex<StoreState>>,
}

#[derive(Default)]
struct StoreState {
    payments: HashMap<PaymentId, Payment>,
    plans: HashMap<BusinessId, CurrentPlan>,
    trials: HashMap<BusinessId, Trial>,
    /// Insertion order is kept for `list_unprocessed`.
    webhook_events: Vec<WebhookEventRecord>,
    fail_next_plan_write: bool,
    fail_next_ledger_insert: bool,
    applied_transitions: usize,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Fault Injection
    // ════════════════════════════════════════════════════════════════════════════

    /// Makes the next plan write fail, rolling back its transaction.
    pub fn fail_next_plan_write(&self) {
        self.state().fail_next_plan_write = true;
    }

    /// Makes the next ledger insert fail with a non-uniqueness error.
    pub fn fail_next_ledger_insert(&self) {
        self.state().fail_next_ledger_insert = true;
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Seeding and Inspection
    // ════════════════════════════════════════════════════════════════════════════

    pub fn seed_payment(&self, payment: Payment) {
        self.state().payments.insert(payment.id, payment);
    }

    pub fn seed_plan(&self, plan: CurrentPlan) {
        self.state().plans.insert(plan.business_id, plan);
    }

    pub fn payment(&self, id: &PaymentId) -> Option<Payment> {
        self.state().payments.get(id).cloned()
    }

    pub fn plan(&self, business_id: &BusinessId) -> Option<CurrentPlan> {
        self.state().plans.get(business_id).cloned()
    }

    pub fn trial(&self, business_id: &BusinessId) -> Option<Trial> {
        self.state().trials.get(business_id).cloned()
    }

    pub fn trial_count(&self) -> usize {
        self.state().trials.len()
    }

    pub fn webhook_events(&self) -> Vec<WebhookEventRecord> {
        self.state().webhook_events.clone()
    }

    pub fn webhook_event(&self, request_id: &str) -> Option<WebhookEventRecord> {
        self.state()
            .webhook_events
            .iter()
            .find(|e| e.request_id == request_id)
            .cloned()
    }

    /// Number of payment transitions that changed a payment.
    pub fn applied_transitions(&self) -> usize {
        self.state().applied_transitions
    }
}

impl StoreState {
    fn mark_event(&mut self, request_id: &str, at: Timestamp) {
        if let Some(event) = self
            .webhook_events
            .iter_mut()
            .find(|e| e.request_id == request_id)
        {
            if !event.processed {
                event.processed = true;
                event.processed_at = Some(at);
            }
        }
    }

    fn take_plan_fault(&mut self) -> Result<(), DomainError> {
        if std::mem::take(&mut self.fail_next_plan_write) {
            return Err(DomainError::database("injected failure writing current plan"));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentRepository for InMemoryBillingStore {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut state = self.state();
        if state.payments.contains_key(&payment.id) {
            return Err(DomainError::database(format!(
                "duplicate payment id {}",
                payment.id
            )));
        }
        state.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        Ok(self.state().payments.get(id).cloned())
    }

    async fn find_by_external_payment_id(
        &self,
        external_payment_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .state()
            .payments
            .values()
            .find(|p| p.external_payment_id.as_deref() == Some(external_payment_id))
            .cloned())
    }

    async fn set_external_payment_id(
        &self,
        id: &PaymentId,
        external_payment_id: &str,
    ) -> Result<(), DomainError> {
        let mut state = self.state();
        let payment = state.payments.get_mut(id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::PaymentNotFound,
                "Payment not found",
            )
            .with_detail("id", id.to_string())
        })?;
        payment.external_payment_id = Some(external_payment_id.to_string());
        payment.updated_at = Timestamp::now();
        Ok(())
    }
}

#[async_trait]
impl CurrentPlanRepository for InMemoryBillingStore {
    async fn find_by_business(
        &self,
        business_id: &BusinessId,
    ) -> Result<Option<CurrentPlan>, DomainError> {
        Ok(self.state().plans.get(business_id).cloned())
    }

    async fn find_lapsed(&self, now: Timestamp, limit: u32) -> Result<Vec<CurrentPlan>, DomainError> {
        let state = self.state();
        let mut lapsed: Vec<CurrentPlan> = state
            .plans
            .values()
            .filter(|p| p.is_lapsed(now))
            .cloned()
            .collect();
        lapsed.sort_by_key(|p| p.expires_at);
        lapsed.truncate(limit as usize);
        Ok(lapsed)
    }
}

#[async_trait]
impl TrialRepository for InMemoryBillingStore {
    async fn find_by_business(&self, business_id: &BusinessId) -> Result<Option<Trial>, DomainError> {
        Ok(self.state().trials.get(business_id).cloned())
    }
}

#[async_trait]
impl BillingUnitOfWork for InMemoryBillingStore {
    async fn apply_payment_transition(
        &self,
        transition: PaymentTransition,
    ) -> Result<TransitionOutcome, DomainError> {
        let mut state = self.state();

        let stored_status = state
            .payments
            .get(&transition.payment.id)
            .map(|p| p.status)
            .ok_or_else(|| DomainError::database("payment row vanished during transition"))?;

        if stored_status != PaymentStatus::Pending {
            if let Some(request_id) = &transition.webhook_request_id {
                state.mark_event(request_id, transition.occurred_at);
            }
            return Ok(TransitionOutcome::PaymentNotPending);
        }

        // Every fallible step runs before anything is written.
        let business_id = transition.payment.business_id;
        let plan = match transition.activation {
            Some(activation) => {
                state.take_plan_fault()?;
                let stored = state.plans.get(&business_id).cloned();
                let plan = activation.apply_to(business_id, stored).map_err(|e| {
                    DomainError::new(ErrorCode::InvalidStateTransition, e.to_string())
                })?;
                Some(plan)
            }
            None => None,
        };

        let payment = transition.payment;
        if let Some(plan) = &plan {
            state.plans.insert(business_id, plan.clone());
        }
        state.payments.insert(payment.id, payment);
        if let Some(request_id) = &transition.webhook_request_id {
            state.mark_event(request_id, transition.occurred_at);
        }
        state.applied_transitions += 1;

        Ok(TransitionOutcome::Applied { plan })
    }

    async fn start_trial(&self, trial: &Trial) -> Result<TrialOutcome, DomainError> {
        let mut state = self.state();
        if state.trials.contains_key(&trial.business_id) {
            return Ok(TrialOutcome::AlreadyExists);
        }
        state.take_plan_fault()?;

        let stored = state.plans.get(&trial.business_id).cloned();
        let plan = trial
            .plan_activation()
            .apply_to(trial.business_id, stored)
            .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;

        state.trials.insert(trial.business_id, trial.clone());
        state.plans.insert(plan.business_id, plan);
        Ok(TrialOutcome::Created)
    }

    async fn expire_plan(&self, plan: &CurrentPlan) -> Result<bool, DomainError> {
        let mut state = self.state();
        let still_active = state
            .plans
            .get(&plan.business_id)
            .map_or(false, |stored| stored.plan_status == PlanStatus::Active);
        if !still_active {
            return Ok(false);
        }
        state.take_plan_fault()?;

        state.plans.insert(plan.business_id, plan.clone());
        if let Some(trial) = state.trials.get_mut(&plan.business_id) {
            trial.is_active = false;
        }
        Ok(true)
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryBillingStore {
    async fn insert(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        let mut state = self.state();
        if std::mem::take(&mut state.fail_next_ledger_insert) {
            return Err(DomainError::database("injected ledger failure"));
        }
        let duplicate = state
            .webhook_events
            .iter()
            .any(|e| e.dedupe_key == record.dedupe_key || e.request_id == record.request_id);
        if duplicate {
            return Ok(SaveResult::AlreadyExists);
        }
        state.webhook_events.push(record);
        Ok(SaveResult::Inserted)
    }

    async fn mark_processed(&self, request_id: &str, at: Timestamp) -> Result<(), DomainError> {
        self.state().mark_event(request_id, at);
        Ok(())
    }

    async fn find_by_request_id(
        &self,
        request_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        Ok(self.webhook_event(request_id))
    }

    async fn list_unprocessed(&self, limit: u32) -> Result<Vec<WebhookEventRecord>, DomainError> {
        Ok(self
            .state()
            .webhook_events
            .iter()
            .filter(|e| !e.processed)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn delete_processed_before(&self, before: Timestamp) -> Result<u64, DomainError> {
        let mut state = self.state();
        let before_count = state.webhook_events.len();
        state
            .webhook_events
            .retain(|e| !(e.processed && e.received_at.is_before(&before)));
        Ok((before_count - state.webhook_events.len()) as u64)
    }
}
