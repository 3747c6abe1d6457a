use axum::{
    extract::{Path, Query, State},
    Json,
};
use common_auth::{ensure_role, AuthContext, Role};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::redemption::{
    ApproveStatus, IntakeChannel, OperatorIntakeFields, PublicIntakeFields, RedemptionFilter,
    RedemptionPatch, RedemptionRecord,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub redeemed_id: i64,
    pub approve_status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub approve_status: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub redeem_ids: Option<String>,
    pub redeem_start_date: Option<String>,
    pub redeem_end_date: Option<String>,
    pub wallet_address: Option<String>,
}

impl ListParams {
    pub fn into_filter(self) -> ApiResult<RedemptionFilter> {
        let statuses = self
            .approve_status
            .as_deref()
            .map(split_list)
            .unwrap_or_default();

        let redeem_ids = self
            .redeem_ids
            .as_deref()
            .map(split_list)
            .unwrap_or_default()
            .into_iter()
            .map(|id| {
                id.parse::<i64>()
                    .map_err(|_| ApiError::BadRequest("redeemIds is invalid".to_string()))
            })
            .collect::<ApiResult<Vec<_>>>()?;

        Ok(RedemptionFilter {
            statuses,
            name: non_empty(self.name),
            email: non_empty(self.email),
            redeem_ids,
            start_date: parse_date(self.redeem_start_date, "redeemStartDate")?,
            end_date: parse_date(self.redeem_end_date, "redeemEndDate")?,
            wallet_address: non_empty(self.wallet_address),
        })
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Unix seconds; zero or negative means no bound.
fn parse_date(value: Option<String>, field: &str) -> ApiResult<Option<i64>> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map(|date| (date > 0).then_some(date))
            .map_err(|_| ApiError::BadRequest(format!("{field} is invalid"))),
    }
}

async fn record_upsert<C: IntakeChannel>(
    state: &AppState,
    patch: RedemptionPatch,
) -> ApiResult<RedemptionRecord> {
    let result = state.reconciler.upsert(C::scope(patch)).await;
    let outcome = match &result {
        Ok((_, outcome)) => outcome.as_str(),
        Err(ApiError::NotModified(_)) => "not_modified",
        Err(ApiError::Conflict(_)) => "conflict",
        Err(_) => "error",
    };
    debug!(channel = C::NAME, outcome, "redemption upsert");
    state.metrics.redemption_upsert(C::NAME, outcome);
    result.map(|(record, _)| record)
}

pub async fn public_intake(
    State(state): State<AppState>,
    Json(patch): Json<RedemptionPatch>,
) -> ApiResult<Json<RedemptionRecord>> {
    let record = record_upsert::<PublicIntakeFields>(&state, patch).await?;
    Ok(Json(record))
}

pub async fn operator_intake(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(patch): Json<RedemptionPatch>,
) -> ApiResult<Json<RedemptionRecord>> {
    ensure_role(&auth, Role::EventLogger)?;

    let record = record_upsert::<OperatorIntakeFields>(&state, patch).await?;
    Ok(Json(record))
}

pub async fn update_status(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<StatusUpdate>,
) -> ApiResult<Json<RedemptionRecord>> {
    ensure_role(&auth, Role::Admin)?;

    if body.approve_status.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "approve_status must not be empty".to_string(),
        ));
    }
    let status = ApproveStatus::parse(body.approve_status.trim());
    let record = state
        .reconciler
        .update_status(body.redeemed_id, status)
        .await?;
    Ok(Json(record))
}

pub async fn list_redemptions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<RedemptionRecord>>> {
    let filter = params.into_filter()?;
    let records = state.reconciler.list(&filter).await?;
    Ok(Json(records))
}

pub async fn get_redemption(
    State(state): State<AppState>,
    Path(tx_hash): Path<String>,
) -> ApiResult<Json<RedemptionRecord>> {
    let record = state.reconciler.get(&tx_hash).await?;
    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_build_filter() {
        let filter = ListParams {
            approve_status: Some("approved, delivered".to_string()),
            redeem_ids: Some("1, 2,3".to_string()),
            redeem_start_date: Some("100".to_string()),
            redeem_end_date: Some("0".to_string()),
            name: Some(String::new()),
            ..Default::default()
        }
        .into_filter()
        .expect("filter");

        assert_eq!(filter.statuses, vec!["approved", "delivered"]);
        assert_eq!(filter.redeem_ids, vec![1, 2, 3]);
        assert_eq!(filter.start_date, Some(100));
        assert_eq!(filter.end_date, None);
        assert_eq!(filter.name, None);
    }

    #[test]
    fn non_positive_dates_are_not_bounds() {
        let filter = ListParams {
            redeem_start_date: Some("-5".to_string()),
            redeem_end_date: Some("-1".to_string()),
            ..Default::default()
        }
        .into_filter()
        .expect("filter");
        assert_eq!(filter.start_date, None);
        assert_eq!(filter.end_date, None);
    }

    #[test]
    fn unparseable_values_are_bad_requests() {
        let err = ListParams {
            redeem_start_date: Some("yesterday".to_string()),
            ..Default::default()
        }
        .into_filter()
        .expect_err("bad date");
        assert!(matches!(err, ApiError::BadRequest(message) if message.contains("redeemStartDate")));

        let err = ListParams {
            redeem_ids: Some("1,x".to_string()),
            ..Default::default()
        }
        .into_filter()
        .expect_err("bad id");
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
