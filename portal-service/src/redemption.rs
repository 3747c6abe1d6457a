use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::store::{with_deadline, RedemptionStore};

pub const STATUS_REQUESTED: &str = "requested";
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_APPROVED: &str = "approved";
pub const STATUS_DELIVERED: &str = "delivered";

/// Approval state of a redemption. Values outside the known set are carried
/// through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApproveStatus {
    Requested,
    Pending,
    Approved,
    Delivered,
    Unrecognized(String),
}

impl ApproveStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            STATUS_REQUESTED => ApproveStatus::Requested,
            STATUS_PENDING => ApproveStatus::Pending,
            STATUS_APPROVED => ApproveStatus::Approved,
            STATUS_DELIVERED => ApproveStatus::Delivered,
            other => ApproveStatus::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ApproveStatus::Requested => STATUS_REQUESTED,
            ApproveStatus::Pending => STATUS_PENDING,
            ApproveStatus::Approved => STATUS_APPROVED,
            ApproveStatus::Delivered => STATUS_DELIVERED,
            ApproveStatus::Unrecognized(other) => other,
        }
    }
}

impl Default for ApproveStatus {
    fn default() -> Self {
        ApproveStatus::Requested
    }
}

impl From<String> for ApproveStatus {
    fn from(value: String) -> Self {
        ApproveStatus::parse(&value)
    }
}

impl From<ApproveStatus> for String {
    fn from(value: ApproveStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ApproveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted redemption, keyed by the unique `tx_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionRecord {
    pub tx_hash: String,
    pub name: String,
    pub company: String,
    pub email: String,
    pub telephone: String,
    pub tax_id: String,
    /// Decimal amount kept as a string to avoid precision loss.
    pub price: String,
    pub redeem_id: i64,
    /// Unix seconds.
    pub redeem_date: i64,
    pub wallet_address: String,
    #[serde(rename = "approved_status")]
    pub approve_status: ApproveStatus,
    pub amount: i64,
    pub cert_id: i64,
}

impl RedemptionRecord {
    /// First sighting of a `tx_hash`: take the patch as-is.
    pub fn from_patch(patch: RedemptionPatch) -> Self {
        Self {
            tx_hash: patch.tx_hash,
            name: patch.name.unwrap_or_default(),
            company: patch.company.unwrap_or_default(),
            email: patch.email.unwrap_or_default(),
            telephone: patch.telephone.unwrap_or_default(),
            tax_id: patch.tax_id.unwrap_or_default(),
            price: patch.price.unwrap_or_default(),
            redeem_id: patch.redeem_id.unwrap_or_default(),
            redeem_date: patch.redeem_date.unwrap_or_default(),
            wallet_address: patch.wallet_address.unwrap_or_default(),
            approve_status: patch.approve_status.unwrap_or_default(),
            amount: patch.amount.unwrap_or_default(),
            cert_id: patch.cert_id.unwrap_or_default(),
        }
    }
}

/// Incoming partial record. Absent fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionPatch {
    pub tx_hash: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub redeem_id: Option<i64>,
    #[serde(default)]
    pub redeem_date: Option<i64>,
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default, rename = "approved_status")]
    pub approve_status: Option<ApproveStatus>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub cert_id: Option<i64>,
}

/// Patch fields an intake channel may strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchField {
    Name,
    Company,
    Email,
    Telephone,
    TaxId,
    Price,
    RedeemId,
    RedeemDate,
    WalletAddress,
    Amount,
}

impl RedemptionPatch {
    pub fn clear(&mut self, field: PatchField) {
        match field {
            PatchField::Name => self.name = None,
            PatchField::Company => self.company = None,
            PatchField::Email => self.email = None,
            PatchField::Telephone => self.telephone = None,
            PatchField::TaxId => self.tax_id = None,
            PatchField::Price => self.price = None,
            PatchField::RedeemId => self.redeem_id = None,
            PatchField::RedeemDate => self.redeem_date = None,
            PatchField::WalletAddress => self.wallet_address = None,
            PatchField::Amount => self.amount = None,
        }
    }
}

/// Field scoping applied to a patch before it reaches the merger.
pub trait IntakeChannel {
    const NAME: &'static str;
    const CLEARED: &'static [PatchField];

    fn scope(mut patch: RedemptionPatch) -> RedemptionPatch {
        for field in Self::CLEARED {
            patch.clear(*field);
        }
        patch
    }
}

/// Unauthenticated requester intake: contact details only.
pub struct PublicIntakeFields;

impl IntakeChannel for PublicIntakeFields {
    const NAME: &'static str = "public";
    const CLEARED: &'static [PatchField] = &[
        PatchField::Amount,
        PatchField::Price,
        PatchField::RedeemDate,
        PatchField::RedeemId,
        PatchField::WalletAddress,
    ];
}

/// Event-logger intake: on-chain facts only.
pub struct OperatorIntakeFields;

impl IntakeChannel for OperatorIntakeFields {
    const NAME: &'static str = "operator";
    const CLEARED: &'static [PatchField] = &[
        PatchField::Company,
        PatchField::Email,
        PatchField::Name,
        PatchField::TaxId,
        PatchField::Telephone,
    ];
}

fn take_text(slot: &mut String, incoming: &Option<String>) {
    if let Some(value) = incoming {
        if !value.is_empty() {
            slot.clone_from(value);
        }
    }
}

fn take_number(slot: &mut i64, incoming: Option<i64>) {
    if let Some(value) = incoming {
        if value != 0 {
            *slot = value;
        }
    }
}

/// Present, non-empty/non-zero patch fields win; `approve_status` wins
/// whenever present and different. `tx_hash` is never touched.
pub fn merge(existing: &RedemptionRecord, patch: &RedemptionPatch) -> RedemptionRecord {
    let mut merged = existing.clone();

    take_number(&mut merged.amount, patch.amount);
    if let Some(status) = &patch.approve_status {
        if *status != merged.approve_status {
            merged.approve_status = status.clone();
        }
    }
    take_text(&mut merged.company, &patch.company);
    take_text(&mut merged.email, &patch.email);
    take_text(&mut merged.name, &patch.name);
    take_text(&mut merged.price, &patch.price);
    take_number(&mut merged.redeem_date, patch.redeem_date);
    take_number(&mut merged.redeem_id, patch.redeem_id);
    take_text(&mut merged.tax_id, &patch.tax_id);
    take_text(&mut merged.telephone, &patch.telephone);
    take_text(&mut merged.wallet_address, &patch.wallet_address);
    take_number(&mut merged.cert_id, patch.cert_id);

    merged
}

/// Listing criteria. Date bounds: both set gives `[start, end)`, only start
/// gives `>= start`, only end gives `<= end`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedemptionFilter {
    pub statuses: Vec<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub redeem_ids: Vec<i64>,
    pub start_date: Option<i64>,
    pub end_date: Option<i64>,
    pub wallet_address: Option<String>,
}

impl RedemptionFilter {
    pub fn matches(&self, record: &RedemptionRecord) -> bool {
        if !self.statuses.is_empty()
            && !self
                .statuses
                .iter()
                .any(|status| status == record.approve_status.as_str())
        {
            return false;
        }
        if self.name.as_ref().is_some_and(|name| *name != record.name) {
            return false;
        }
        if self.email.as_ref().is_some_and(|email| *email != record.email) {
            return false;
        }
        if !self.redeem_ids.is_empty() && !self.redeem_ids.contains(&record.redeem_id) {
            return false;
        }
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => {
                if record.redeem_date < start || record.redeem_date >= end {
                    return false;
                }
            }
            (Some(start), None) => {
                if record.redeem_date < start {
                    return false;
                }
            }
            (None, Some(end)) => {
                if record.redeem_date > end {
                    return false;
                }
            }
            (None, None) => {}
        }
        if self
            .wallet_address
            .as_ref()
            .is_some_and(|wallet| *wallet != record.wallet_address)
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Merged,
}

impl UpsertOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            UpsertOutcome::Created => "created",
            UpsertOutcome::Merged => "merged",
        }
    }
}

/// Reconciles incoming patches against the redemption store.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn RedemptionStore>,
    deadline: Duration,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RedemptionStore>, deadline: Duration) -> Self {
        Self { store, deadline }
    }

    /// Creates the record on first sight of `tx_hash`, otherwise merges into
    /// the stored one. Read-then-write: concurrent upserts on one `tx_hash`
    /// are last-write-wins per field.
    pub async fn upsert(
        &self,
        patch: RedemptionPatch,
    ) -> ApiResult<(RedemptionRecord, UpsertOutcome)> {
        if patch.tx_hash.trim().is_empty() {
            return Err(ApiError::BadRequest("tx_hash is required".to_string()));
        }

        let existing = with_deadline(self.deadline, self.store.find_by_tx_hash(&patch.tx_hash))
            .await?;

        match existing {
            None => {
                let record = RedemptionRecord::from_patch(patch);
                with_deadline(self.deadline, self.store.insert(&record)).await?;
                info!(tx_hash = %record.tx_hash, "redemption created");
                Ok((record, UpsertOutcome::Created))
            }
            Some(existing) => {
                let merged = merge(&existing, &patch);
                let modified = with_deadline(self.deadline, self.store.update(&merged)).await?;
                if modified == 0 {
                    warn!(tx_hash = %merged.tx_hash, "redemption upsert changed nothing");
                    return Err(ApiError::NotModified("Redemption"));
                }
                info!(tx_hash = %merged.tx_hash, "redemption merged");
                Ok((merged, UpsertOutcome::Merged))
            }
        }
    }

    pub async fn get(&self, tx_hash: &str) -> ApiResult<RedemptionRecord> {
        with_deadline(self.deadline, self.store.find_by_tx_hash(tx_hash))
            .await?
            .ok_or(ApiError::NotFound("Redemption"))
    }

    pub async fn list(&self, filter: &RedemptionFilter) -> ApiResult<Vec<RedemptionRecord>> {
        Ok(with_deadline(self.deadline, self.store.list(filter)).await?)
    }

    /// Sets the status of the record carrying `redeem_id`. Any status may
    /// replace any other.
    pub async fn update_status(
        &self,
        redeem_id: i64,
        status: ApproveStatus,
    ) -> ApiResult<RedemptionRecord> {
        let mut record = with_deadline(self.deadline, self.store.find_by_redeem_id(redeem_id))
            .await?
            .ok_or(ApiError::NotFound("Redemption"))?;

        let modified = with_deadline(
            self.deadline,
            self.store.update_status(&record.tx_hash, &status),
        )
        .await?;
        if modified == 0 {
            return Err(ApiError::NotModified("Redemption status"));
        }

        info!(tx_hash = %record.tx_hash, redeem_id, status = %status, "redemption status updated");
        record.approve_status = status;
        Ok(record)
    }
}
