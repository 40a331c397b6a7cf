use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::error::{ApiError, ApiResponse};
use super::page;
use super::AppState;
use crate::config::{cuda_available, ThemeConfig, APP_NAME, APP_VERSION};
use crate::pipeline::{LogProgress, RecipeResult};
use crate::recipe::{DietaryPreference, Difficulty, RecipeRequest};

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Serialize)]
pub struct RecipeResponse<'a> {
    #[serde(flatten)]
    pub result: &'a RecipeResult,
    pub export_url: Option<String>,
}

#[derive(Serialize)]
pub struct ServingsRange {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

#[derive(Serialize)]
pub struct OptionsResponse {
    pub dietary_preferences: Vec<DietaryPreference>,
    pub difficulty_levels: Vec<Difficulty>,
    pub default_difficulty: Difficulty,
    pub servings: ServingsRange,
    pub show_top_k: bool,
    pub max_upload_size_mb: u64,
    pub allowed_formats: Vec<String>,
    pub theme: ThemeConfig,
}

#[derive(Serialize)]
pub struct SystemResponse {
    pub app_name: &'static str,
    pub version: &'static str,
    pub device: &'static str,
    pub cuda_available: bool,
    pub models: BTreeMap<&'static str, String>,
    pub usda_nutrition: bool,
    pub recipes_generated: Option<usize>,
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(page::render(&state.config))
}

pub async fn health_check() -> Json<ApiResponse> {
    Json(ApiResponse {
        status: "Server is running and healthy".to_string(),
    })
}

pub async fn create_recipe(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let (image, filename, request) = match read_upload(&state, &mut multipart).await {
        Ok(upload) => upload,
        Err(e) => return e.into_response(),
    };

    tracing::info!(
        bytes = image.len(),
        dietary_preference = %request.dietary_preference,
        servings = request.servings,
        difficulty = %request.difficulty,
        "Recipe requested"
    );

    match state
        .pipeline
        .analyze(&image, filename.as_deref(), request, &LogProgress)
        .await
    {
        Ok(result) => Json(RecipeResponse {
            export_url: export_url(&state, &result),
            result: &result,
        })
        .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn get_recipe(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.pipeline.cached(&id) {
        Some(result) => Json(RecipeResponse {
            export_url: export_url(&state, &result),
            result: &result,
        })
        .into_response(),
        None => recipe_not_found(id).into_response(),
    }
}

pub async fn export_recipe(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response, ApiError> {
    if !state.config.features.recipe_export {
        return Err(ApiError::NotFound("Recipe export is disabled".to_string()));
    }

    let result = state.pipeline.cached(&id).ok_or_else(|| recipe_not_found(id))?;
    let disposition = format!("attachment; filename=\"{}\"", result.export_filename());

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        result.export_text(),
    )
        .into_response())
}

pub async fn options(State(state): State<AppState>) -> ApiResult<OptionsResponse> {
    let config = &state.config;
    Ok(Json(OptionsResponse {
        dietary_preferences: config.recipe.dietary_preferences.clone(),
        difficulty_levels: Difficulty::ALL.to_vec(),
        default_difficulty: config.recipe.default_difficulty,
        servings: ServingsRange {
            min: config.recipe.min_servings,
            max: config.recipe.max_servings,
            default: config.recipe.default_servings,
        },
        show_top_k: config.features.top_k_predictions,
        max_upload_size_mb: config.limits.max_file_size_mb,
        allowed_formats: config.limits.allowed_formats.clone(),
        theme: config.theme.clone(),
    }))
}

pub async fn system_info(State(state): State<AppState>) -> ApiResult<SystemResponse> {
    let models = state.pipeline.models();
    Ok(Json(SystemResponse {
        app_name: APP_NAME,
        version: APP_VERSION,
        device: models.device().as_str(),
        cuda_available: cuda_available(),
        models: models.model_ids().into_iter().collect(),
        usda_nutrition: state.pipeline.nutrition_uses_api(),
        recipes_generated: state
            .config
            .features
            .statistics
            .then(|| state.pipeline.recipes_generated()),
    }))
}

async fn read_upload(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<(Vec<u8>, Option<String>, RecipeRequest), ApiError> {
    let mut request = RecipeRequest::from_settings(&state.config.recipe);
    let mut image: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "image" => {
                filename = field.file_name().map(str::to_string);
                image = Some(field.bytes().await?.to_vec());
            }
            "dietary_preference" => {
                request.dietary_preference = field.text().await?.parse()?;
            }
            "servings" => {
                let value = field.text().await?;
                request.servings = value
                    .trim()
                    .parse()
                    .map_err(|_| ApiError::BadRequest(format!("Invalid servings value: {}", value)))?;
            }
            "difficulty" => {
                request.difficulty = field.text().await?.parse()?;
            }
            "show_top_k" => {
                request.show_top_k = parse_flag(&field.text().await?);
            }
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let image = image.ok_or_else(|| ApiError::BadRequest("Missing image field".to_string()))?;
    Ok((image, filename, request))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "on" | "1" | "yes")
}

fn export_url(state: &AppState, result: &RecipeResult) -> Option<String> {
    state
        .config
        .features
        .recipe_export
        .then(|| format!("/api/recipes/{}/export", result.id))
}

fn recipe_not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Recipe {} not found or expired", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("on"));
        assert!(parse_flag(" TRUE "));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
