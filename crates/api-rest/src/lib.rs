//! # API REST
//!
//! REST API implementation for the patient service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - Bearer-credential gating of every patient route
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, status codes, CORS)
//!
//! Uses `api-shared` for wire types and the credential guard, and `patient-core` for everything
//! else.

#![warn(rust_2018_idioms)]

mod auth;
mod error;

pub use auth::require_bearer;
pub use error::ApiError;

use api_shared::{
    CreatePatientReq, CreatePatientRes, CredentialCheck, ErrorRes, HealthRes, HealthService,
    MessageRes, PatientRes, UpdatePatientReq,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::get,
    Router,
};
use patient_core::{Patient, PatientFields, PatientService};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across REST API handlers
#[derive(Clone)]
pub struct AppState {
    patient_service: PatientService,
    credentials: Arc<dyn CredentialCheck>,
}

impl AppState {
    pub fn new(patient_service: PatientService, credentials: Arc<dyn CredentialCheck>) -> Self {
        Self {
            patient_service,
            credentials,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_patients,
        create_patient,
        get_patient,
        update_patient,
        delete_patient,
    ),
    components(schemas(
        HealthRes,
        CreatePatientReq,
        CreatePatientRes,
        UpdatePatientReq,
        PatientRes,
        MessageRes,
        ErrorRes,
    )),
    modifiers(&BearerSecurity)
)]
pub struct ApiDoc;

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// Builds the full application router.
///
/// Patient routes sit behind [`require_bearer`]; `/health` and the API docs do not.
pub fn router(state: AppState) -> Router {
    let patients = Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route(
            "/patients/:id",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(patients)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn patient_res(patient: &Patient) -> PatientRes {
    PatientRes {
        id: patient.id().to_string(),
        name: patient.name().to_string(),
        email: patient.email().to_string(),
        phone: patient.phone().to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Returns the current health status of the patient service. Not authenticated, so load
/// balancers can call it.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "All patients in insertion order", body = [PatientRes]),
        (status = 401, description = "Missing or invalid bearer token", body = MessageRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
/// List all patients in the system
#[axum::debug_handler]
async fn list_patients(State(state): State<AppState>) -> Result<Json<Vec<PatientRes>>, ApiError> {
    let patients = state.patient_service.list()?;
    Ok(Json(patients.iter().map(patient_res).collect()))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = CreatePatientReq,
    responses(
        (status = 201, description = "Patient created", body = CreatePatientRes),
        (status = 400, description = "Missing or malformed field", body = ErrorRes),
        (status = 401, description = "Missing or invalid bearer token", body = MessageRes),
        (status = 409, description = "Email or phone already registered", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
/// Create a new patient record
///
/// Validates the submitted fields, stores the record, and queues a notification to the
/// patient's phone. The response does not wait for the notification.
///
/// # Errors
///
/// - `400 Bad Request` if a field is missing or malformed, or the body is not valid JSON.
/// - `409 Conflict` if another patient already has this email or phone.
#[axum::debug_handler]
async fn create_patient(
    State(state): State<AppState>,
    payload: Result<Json<CreatePatientReq>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatePatientRes>), ApiError> {
    let Json(req) = payload?;
    let fields = PatientFields {
        name: req.name,
        email: req.email,
        phone: req.phone,
    };

    let id = state.patient_service.create(&fields)?;
    Ok((
        StatusCode::CREATED,
        Json(CreatePatientRes {
            message: "Patient created successfully".into(),
            patient_id: id.to_string(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient identifier")),
    responses(
        (status = 200, description = "Patient found", body = PatientRes),
        (status = 401, description = "Missing or invalid bearer token", body = MessageRes),
        (status = 404, description = "Patient not found", body = MessageRes)
    ),
    security(("bearer" = []))
)]
/// Fetch a single patient record
#[axum::debug_handler]
async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PatientRes>, ApiError> {
    let patient = state.patient_service.get(&id)?;
    Ok(Json(patient_res(&patient)))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient identifier")),
    request_body = UpdatePatientReq,
    responses(
        (status = 200, description = "Patient updated", body = MessageRes),
        (status = 400, description = "Malformed field", body = ErrorRes),
        (status = 401, description = "Missing or invalid bearer token", body = MessageRes),
        (status = 404, description = "Patient not found", body = MessageRes),
        (status = 409, description = "Email or phone already registered", body = ErrorRes)
    ),
    security(("bearer" = []))
)]
/// Partially update a patient record
///
/// Only the supplied fields change. A notification is queued to the resulting phone.
#[axum::debug_handler]
async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePatientReq>, JsonRejection>,
) -> Result<Json<MessageRes>, ApiError> {
    let Json(req) = payload?;
    let fields = PatientFields {
        name: req.name,
        email: req.email,
        phone: req.phone,
    };

    state.patient_service.update(&id, &fields)?;
    Ok(Json(MessageRes::new("Patient updated successfully")))
}

#[utoipa::path(
    delete,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Patient identifier")),
    responses(
        (status = 200, description = "Patient deleted", body = MessageRes),
        (status = 401, description = "Missing or invalid bearer token", body = MessageRes),
        (status = 404, description = "Patient not found", body = MessageRes)
    ),
    security(("bearer" = []))
)]
/// Delete a patient record
#[axum::debug_handler]
async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageRes>, ApiError> {
    state.patient_service.delete(&id)?;
    Ok(Json(MessageRes::new("Patient deleted successfully")))
}
