use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use serde_json::Value;
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

use recipe_vision::api::{create_api, AppState};
use recipe_vision::config::{AppConfig, Device};
use recipe_vision::food::NutritionService;
use recipe_vision::intake::ValidatedImage;
use recipe_vision::models::{Captioner, FoodClassifier, ModelManager, Prediction, RecipeWriter};
use recipe_vision::pipeline::RecipePipeline;
use recipe_vision::recipe::RecipePrompt;
use recipe_vision::Result;

const BOUNDARY: &str = "recipe-vision-test-boundary";

struct StaticCaptioner;

#[async_trait]
impl Captioner for StaticCaptioner {
    async fn caption(&self, _image: &ValidatedImage) -> Result<String> {
        Ok("a plate of spaghetti with tomato sauce".to_string())
    }

    fn model_id(&self) -> String {
        "test/caption".to_string()
    }
}

struct StaticClassifier;

#[async_trait]
impl FoodClassifier for StaticClassifier {
    async fn classify(&self, _image: &ValidatedImage, top_k: usize) -> Result<Vec<Prediction>> {
        let all = vec![
            Prediction::new("spaghetti bolognese", 0.72),
            Prediction::new("lasagna", 0.12),
            Prediction::new("ravioli", 0.08),
            Prediction::new("pizza", 0.05),
            Prediction::new("gnocchi", 0.03),
        ];
        Ok(all.into_iter().take(top_k).collect())
    }

    fn model_id(&self) -> String {
        "test/classifier".to_string()
    }
}

struct PromptEchoWriter;

#[async_trait]
impl RecipeWriter for PromptEchoWriter {
    async fn write_recipe(&self, prompt: &RecipePrompt) -> Result<String> {
        Ok(format!(
            "Ingredients:\n- 400g spaghetti\n\nServes {}. {}",
            prompt.request.servings,
            prompt.dietary_clause()
        ))
    }

    fn model_id(&self) -> String {
        "test/recipe".to_string()
    }
}

fn app_with(config: AppConfig) -> Router {
    let models = ModelManager::from_parts(
        Arc::new(StaticCaptioner),
        Arc::new(StaticClassifier),
        Arc::new(PromptEchoWriter),
        Device::Cpu,
    );
    let pipeline = RecipePipeline::new(&config, models, Arc::new(NutritionService::static_only()));
    create_api(AppState::new(config, pipeline))
}

fn app() -> Router {
    app_with(AppConfig::default())
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 120, 40])));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageOutputFormat::Png).unwrap();
    buf.into_inner()
}

fn multipart_body(image: &[u8], filename: &str, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
            BOUNDARY, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(image);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/recipes")
        .header(header::HOST, "localhost:8501")
        .header(header::CONTENT_LENGTH, body.len())
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_and_index() {
    let response = app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json(response).await["status"].as_str().unwrap().contains("healthy"));

    let response = app().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(text(response).await.contains("Generate Recipe"));
}

#[tokio::test]
async fn test_generate_recipe_and_download() {
    let app = app();
    let body = multipart_body(
        &png(120, 80),
        "dinner.png",
        &[
            ("dietary_preference", "Vegetarian"),
            ("servings", "2"),
            ("difficulty", "Easy"),
            ("show_top_k", "true"),
        ],
    );

    let response = app.clone().oneshot(upload(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let result = json(response).await;

    assert_eq!(result["dish"], "spaghetti bolognese");
    assert_eq!(result["image"]["width"], 120);
    assert_eq!(result["image"]["height"], 80);
    assert_eq!(result["predictions"].as_array().unwrap().len(), 5);
    assert_eq!(result["request"]["dietary_preference"], "Vegetarian");
    assert_eq!(result["nutrition"]["calories"], "~300");
    let recipe = result["recipe"].as_str().unwrap();
    assert!(!recipe.is_empty());
    assert!(recipe.contains("The recipe must be Vegetarian."));

    let id = result["id"].as_str().unwrap();
    let export_url = result["export_url"].as_str().unwrap();
    assert_eq!(export_url, format!("/api/recipes/{}/export", id));

    let response = app.clone().oneshot(get(export_url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"spaghetti_bolognese_recipe.txt\""
    );
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    let exported = text(response).await;
    assert!(exported.starts_with("spaghetti bolognese\n"));
    assert!(exported.contains("Servings: 2"));
    assert!(exported.contains("Generated by AI Vision Recipe Generator"));

    let response = app.clone().oneshot(get(&format!("/api/recipes/{}", id))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["id"], id);

    let response = app.oneshot(get("/api/system")).await.unwrap();
    let system = json(response).await;
    assert_eq!(system["recipes_generated"], 1);
    assert_eq!(system["device"], "cpu");
    assert_eq!(system["models"]["recipe"], "test/recipe");
    assert_eq!(system["usda_nutrition"], false);
}

#[tokio::test]
async fn test_small_image_rejected() {
    let response = app()
        .oneshot(upload(multipart_body(&png(40, 40), "tiny.png", &[])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json(response).await;
    assert!(body["status"].as_str().unwrap().contains("too small"));
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let mut config = AppConfig::default();
    config.server.max_upload_size_mb = 1;
    config.limits.max_file_size_mb = 1;

    let big = vec![0u8; 2 * 1024 * 1024];
    let response = app_with(config)
        .oneshot(upload(multipart_body(&big, "big.png", &[])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = json(response).await;
    assert_eq!(
        body["status"],
        "Image is too large. Please upload an image smaller than 1MB."
    );
}

#[tokio::test]
async fn test_invalid_settings_rejected() {
    let response = app()
        .oneshot(upload(multipart_body(&png(100, 100), "food.png", &[("servings", "50")])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app()
        .oneshot(upload(multipart_body(
            &png(100, 100),
            "food.png",
            &[("difficulty", "Impossible")],
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_recipe_is_not_found() {
    let response = app()
        .oneshot(get("/api/recipes/6f1c1e1a-6f35-4c1c-9a54-3f0e6f2f3c11/export"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cross_origin_post_rejected() {
    let mut request = upload(multipart_body(&png(100, 100), "food.png", &[]));
    request
        .headers_mut()
        .insert(header::ORIGIN, "http://evil.example.com".parse().unwrap());

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_options_lists_preferences() {
    let response = app().oneshot(get("/api/options")).await.unwrap();
    let options = json(response).await;

    assert_eq!(options["dietary_preferences"].as_array().unwrap().len(), 10);
    assert_eq!(options["dietary_preferences"][3], "Gluten-Free");
    assert_eq!(options["servings"]["max"], 12);
    assert_eq!(options["servings"]["default"], 4);
    assert_eq!(options["default_difficulty"], "Medium");
}
