use std::sync::{Arc, Mutex};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use nutridash_core::models::Food;
use nutridash_core::service::FoodService;

#[derive(Clone)]
struct AppState {
    service: Arc<Mutex<FoodService>>,
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct NameQuery {
    name: String,
}

#[derive(Deserialize)]
struct PortionQuery {
    fdc_id: i64,
}

/// Flat food DTO: the macro values come from the food's most complete
/// calorie conversion, matching what the web client renders.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FoodResponse {
    fdc_id: i64,
    description: String,
    category: Option<String>,
    protein_value: Option<f64>,
    fat_value: Option<f64>,
    carbohydrate_value: Option<f64>,
}

impl From<&Food> for FoodResponse {
    fn from(food: &Food) -> Self {
        let conversion = food.best_calorie_conversion();
        Self {
            fdc_id: food.fdc_id,
            description: food.description.clone(),
            category: food.category.clone(),
            protein_value: conversion.and_then(|c| c.protein_value),
            fat_value: conversion.and_then(|c| c.fat_value),
            carbohydrate_value: conversion.and_then(|c| c.carbohydrate_value),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PortionResponse {
    fdc_id: i64,
    amount: Option<f64>,
    unit_name: Option<String>,
    gram_weight: Option<f64>,
}

/// The web client reads `body.message` on failure.
#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Internal(err) => {
                eprintln!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn list_foods(State(state): State<AppState>) -> Result<Json<Vec<FoodResponse>>, ApiError> {
    let foods = {
        let service = state
            .service
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        service.get_all_foods().context("database error")?
    };
    Ok(Json(foods.iter().map(FoodResponse::from).collect()))
}

async fn get_food(
    State(state): State<AppState>,
    Path(fdc_id): Path<i64>,
) -> Result<Json<FoodResponse>, ApiError> {
    let service = state
        .service
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let food = service
        .get_food_by_id(fdc_id)
        .map_err(|_| ApiError::NotFound(format!("Food not found with fdcId {fdc_id}")))?;
    Ok(Json(FoodResponse::from(&food)))
}

async fn search_foods(
    State(state): State<AppState>,
    Query(params): Query<NameQuery>,
) -> Result<Json<Vec<FoodResponse>>, ApiError> {
    let foods = {
        let service = state
            .service
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        service
            .search_by_description_words(&params.name)
            .context("database error")?
    };
    Ok(Json(foods.iter().map(FoodResponse::from).collect()))
}

async fn search_best(
    State(state): State<AppState>,
    Query(params): Query<NameQuery>,
) -> Result<Json<FoodResponse>, ApiError> {
    let service = state
        .service
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let food = service.search_best_by_description(&params.name).map_err(|_| {
        ApiError::NotFound(format!(
            "No nutrition information found for: {}",
            params.name
        ))
    })?;
    Ok(Json(FoodResponse::from(&food)))
}

async fn get_portion(
    State(state): State<AppState>,
    Query(params): Query<PortionQuery>,
) -> Result<Json<PortionResponse>, ApiError> {
    let fdc_id = params.fdc_id;
    let service = state
        .service
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let portion = service
        .get_portion(fdc_id)
        .map_err(|_| ApiError::NotFound(format!("No portion found for fdcId {fdc_id}")))?;
    Ok(Json(PortionResponse {
        fdc_id: portion.fdc_id,
        amount: portion.amount,
        unit_name: portion.unit_name,
        gram_weight: portion.gram_weight,
    }))
}

// --- Router / entry point ---

fn build_router(state: AppState) -> Router {
    // Read-only API consumed by a browser client on another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/api/food", get(list_foods))
        .route("/api/food/search", get(search_foods))
        .route("/api/food/search/best", get(search_best))
        .route("/api/food/portion", get(get_portion))
        .route("/api/food/{fdc_id}", get(get_food))
        .layer(cors)
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

pub async fn start_server(service: FoodService, port: u16, bind: &str) -> anyhow::Result<()> {
    let state = AppState {
        service: Arc::new(Mutex::new(service)),
    };
    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    println!("Listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
