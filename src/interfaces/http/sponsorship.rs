use super::error::ApiResult;
use super::state::AppState;
use crate::application::intake::PaginationMeta;
use crate::domain::sponsorship::{
    ApplicationStatus, ListFilter, ReviewUpdate, SponsorshipApplication, SponsorshipSubmission,
};
use crate::error::Error;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    success: bool,
    message: String,
    sponsorship_id: String,
    data: SubmitConfirmation,
}

/// Redacted confirmation payload: enough for the applicant to reference the
/// submission, nothing they did not themselves supply.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitConfirmation {
    sponsorship_type: String,
    sponsorship_price: String,
    company_name: String,
    contact_person: String,
    email: String,
    status: ApplicationStatus,
    submission_date: DateTime<Utc>,
}

pub async fn submit(
    State(state): State<AppState>,
    body: Result<Json<SponsorshipSubmission>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let Json(submission) = body.map_err(|err| Error::MalformedPayload(err.to_string()))?;
    let application = state.intake.submit(submission).await?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            success: true,
            message: "sponsorship application submitted successfully".to_string(),
            sponsorship_id: application.id.clone(),
            data: SubmitConfirmation {
                sponsorship_type: application.sponsorship_type,
                sponsorship_price: application.sponsorship_price,
                company_name: application.company_name,
                contact_person: application.contact_person,
                email: application.email,
                status: application.status,
                submission_date: application.submission_date,
            },
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    page: Option<usize>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    status: Option<ApplicationStatus>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    success: bool,
    data: Vec<SponsorshipApplication>,
    pagination: PaginationMeta,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    let filter = ListFilter {
        status: query.status,
        category: query.category,
        email: query.email,
    };
    let (records, pagination) = state.intake.list(filter, query.page, query.limit).await?;
    Ok(Json(ListResponse {
        success: true,
        data: records,
        pagination,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    data: SponsorshipApplication,
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RecordResponse>> {
    let application = state
        .intake
        .get(&id)
        .await?
        .ok_or(Error::ApplicationNotFound(id))?;
    Ok(Json(RecordResponse {
        success: true,
        message: None,
        data: application,
    }))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ReviewUpdate>, JsonRejection>,
) -> ApiResult<Json<RecordResponse>> {
    let Json(review) = body.map_err(|err| Error::MalformedPayload(err.to_string()))?;
    let application = state
        .intake
        .update_review(&id, review)
        .await?
        .ok_or(Error::ApplicationNotFound(id))?;
    Ok(Json(RecordResponse {
        success: true,
        message: Some("sponsorship application updated successfully".to_string()),
        data: application,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    success: bool,
    message: String,
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    if !state.intake.delete(&id).await? {
        return Err(Error::ApplicationNotFound(id).into());
    }
    Ok(Json(DeleteResponse {
        success: true,
        message: "sponsorship application deleted".to_string(),
    }))
}
