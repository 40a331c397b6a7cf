use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use validator::Validate;

use crate::error::{Result, VisionError};
use crate::recipe::{DietaryPreference, Difficulty};

pub const APP_NAME: &str = "AI Vision Recipe Generator";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    #[validate]
    pub server: ServerConfig,
    #[validate]
    pub models: ModelsConfig,
    #[validate]
    pub generation: GenerationConfig,
    #[validate]
    pub limits: ImageLimits,
    #[validate]
    pub recipe: RecipeSettings,
    #[validate]
    pub cache: CacheConfig,
    pub theme: ThemeConfig,
    pub features: FeatureFlags,
    #[serde(skip)]
    pub secrets: Secrets,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(range(min = 1))]
    pub port: u16,
    pub headless: bool,
    pub enable_cors: bool,
    pub enable_xsrf_protection: bool,
    #[validate(range(min = 1, max = 200))]
    pub max_upload_size_mb: u64,
    #[validate(range(min = 1))]
    pub max_concurrent_requests: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8501,
            headless: true,
            enable_cors: false,
            enable_xsrf_protection: true,
            max_upload_size_mb: 10,
            max_concurrent_requests: 4,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeBackend {
    HuggingFace,
    DeepSeek,
    OpenAI,
    Gemini,
    OpenRouter,
}

impl FromStr for RecipeBackend {
    type Err = VisionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(RecipeBackend::HuggingFace),
            "deepseek" => Ok(RecipeBackend::DeepSeek),
            "openai" => Ok(RecipeBackend::OpenAI),
            "gemini" => Ok(RecipeBackend::Gemini),
            "openrouter" => Ok(RecipeBackend::OpenRouter),
            other => Err(VisionError::Config(format!(
                "Unknown recipe backend: {}. Available backends: huggingface, deepseek, openai, gemini, openrouter",
                other
            ))),
        }
    }
}

impl fmt::Display for RecipeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecipeBackend::HuggingFace => "huggingface",
            RecipeBackend::DeepSeek => "deepseek",
            RecipeBackend::OpenAI => "openai",
            RecipeBackend::Gemini => "gemini",
            RecipeBackend::OpenRouter => "openrouter",
        };
        write!(f, "{}", name)
    }
}

/// Requested computation device for model backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Auto,
    Cpu,
    Cuda,
}

impl FromStr for Device {
    type Err = VisionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Device::Auto),
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Cuda),
            other => Err(VisionError::Config(format!("Unknown device: {}", other))),
        }
    }
}

impl Device {
    /// Resolves `Auto` against the host. A `Cuda` request on a host without
    /// a visible NVIDIA driver falls back to the CPU.
    pub fn resolve(self) -> Device {
        self.resolve_with(cuda_available())
    }

    pub fn resolve_with(self, cuda: bool) -> Device {
        match (self, cuda) {
            (Device::Cpu, _) => Device::Cpu,
            (_, true) => Device::Cuda,
            (Device::Cuda, false) => {
                tracing::warn!("CUDA requested but no CUDA device is available, falling back to CPU");
                Device::Cpu
            }
            (Device::Auto, false) => Device::Cpu,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Auto => "auto",
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
        }
    }
}

/// Whether an NVIDIA driver is visible to this process.
pub fn cuda_available() -> bool {
    match env::var("CUDA_VISIBLE_DEVICES") {
        Ok(devices) if devices.trim().is_empty() || devices.trim() == "-1" => return false,
        _ => {}
    }
    Path::new("/proc/driver/nvidia/version").exists()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ModelsConfig {
    #[validate(length(min = 1))]
    pub caption_model: String,
    #[validate(length(min = 1))]
    pub classifier_model: String,
    #[validate(length(min = 1))]
    pub recipe_model: String,
    #[validate(url)]
    pub inference_url: String,
    pub recipe_backend: RecipeBackend,
    pub device: Device,
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
    pub wait_for_model: bool,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            caption_model: "Salesforce/blip-image-captioning-base".to_string(),
            classifier_model: "nateraw/food".to_string(),
            recipe_model: "google/flan-t5-large".to_string(),
            inference_url: "https://api-inference.huggingface.co/models".to_string(),
            recipe_backend: RecipeBackend::HuggingFace,
            device: Device::Auto,
            request_timeout_secs: 120,
            wait_for_model: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GenerationConfig {
    #[validate(range(min = 1))]
    pub max_caption_length: u32,
    #[validate(range(min = 1))]
    pub caption_num_beams: u32,
    #[validate(range(min = 1))]
    pub max_recipe_length: u32,
    pub min_recipe_length: u32,
    #[validate(range(min = 1))]
    pub num_beams: u32,
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,
    #[validate(range(min = 0.0, max = 1.0))]
    pub top_p: f32,
    #[validate(range(min = 1.0))]
    pub repetition_penalty: f32,
    pub no_repeat_ngram_size: u32,
    #[validate(range(min = 16))]
    pub max_prompt_tokens: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_caption_length: 50,
            caption_num_beams: 5,
            max_recipe_length: 600,
            min_recipe_length: 200,
            num_beams: 5,
            temperature: 0.8,
            top_p: 0.95,
            repetition_penalty: 1.2,
            no_repeat_ngram_size: 3,
            max_prompt_tokens: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ImageLimits {
    #[validate(range(min = 1))]
    pub min_width: u32,
    #[validate(range(min = 1))]
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    #[validate(range(min = 1))]
    pub max_file_size_mb: u64,
    #[validate(length(min = 1))]
    pub allowed_formats: Vec<String>,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            min_width: 50,
            min_height: 50,
            max_width: 4096,
            max_height: 4096,
            max_file_size_mb: 10,
            allowed_formats: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
        }
    }
}

impl ImageLimits {
    pub fn max_file_size_bytes(&self) -> usize {
        (self.max_file_size_mb as usize) * 1024 * 1024
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RecipeSettings {
    pub default_servings: u32,
    #[validate(range(min = 1))]
    pub min_servings: u32,
    pub max_servings: u32,
    pub default_difficulty: Difficulty,
    #[validate(length(min = 1))]
    pub dietary_preferences: Vec<DietaryPreference>,
}

impl Default for RecipeSettings {
    fn default() -> Self {
        Self {
            default_servings: 4,
            min_servings: 1,
            max_servings: 12,
            default_difficulty: Difficulty::Medium,
            dietary_preferences: DietaryPreference::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
    #[validate(range(min = 1))]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 3600,
            capacity: 128,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub primary_color: String,
    pub secondary_color: String,
    pub background_color: String,
    pub secondary_background_color: String,
    pub text_color: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            primary_color: "#FF6B6B".to_string(),
            secondary_color: "#FFE66D".to_string(),
            background_color: "#0E1117".to_string(),
            secondary_background_color: "#262730".to_string(),
            text_color: "#FAFAFA".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub top_k_predictions: bool,
    pub nutrition_estimates: bool,
    pub recipe_export: bool,
    pub statistics: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            top_k_predictions: true,
            nutrition_estimates: true,
            recipe_export: true,
            statistics: true,
        }
    }
}

/// API keys and tokens. Never read from the config file.
#[derive(Clone, Default)]
pub struct Secrets {
    pub hf_token: Option<String>,
    pub usda_api_key: Option<String>,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("hf_token", &self.hf_token.as_ref().map(|_| "***"))
            .field("usda_api_key", &self.usda_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            hf_token: non_empty_env("HF_TOKEN").or_else(|| non_empty_env("HUGGINGFACE_API_TOKEN")),
            usda_api_key: non_empty_env("USDA_API_KEY"),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Defaults, then the TOML file (when present), then environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path: Option<PathBuf> = path
            .map(Path::to_path_buf)
            .or_else(|| non_empty_env("RECIPE_VISION_CONFIG").map(PathBuf::from))
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            });

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.secrets = Secrets::from_env();
        config.check()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VisionError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| VisionError::Config(format!("Invalid config file: {}", e)))
    }

    fn apply_env(&mut self) -> Result<()> {
        // PaaS platforms hand the port over in $PORT
        if let Some(port) = non_empty_env("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| VisionError::Config(format!("Invalid PORT value: {}", port)))?;
        }
        if let Some(address) = non_empty_env("SERVER_ADDRESS") {
            self.server.address = address;
        }
        if let Some(device) = non_empty_env("DEVICE") {
            self.models.device = device.parse()?;
        }
        if let Some(backend) = non_empty_env("RECIPE_BACKEND") {
            self.models.recipe_backend = backend.parse()?;
        }
        if let Some(url) = non_empty_env("INFERENCE_URL") {
            self.models.inference_url = url;
        }
        if let Some(model) = non_empty_env("CAPTION_MODEL") {
            self.models.caption_model = model;
        }
        if let Some(model) = non_empty_env("CLASSIFIER_MODEL") {
            self.models.classifier_model = model;
        }
        if let Some(model) = non_empty_env("RECIPE_MODEL") {
            self.models.recipe_model = model;
        }
        Ok(())
    }

    pub fn with_server_overrides(mut self, address: Option<String>, port: Option<u16>) -> Result<Self> {
        if let Some(address) = address {
            self.server.address = address;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        self.check()?;
        Ok(self)
    }

    /// Field rules plus the cross-field invariants the derive cannot express.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| VisionError::Config(e.to_string()))?;

        let recipe = &self.recipe;
        if recipe.max_servings <= recipe.min_servings {
            return Err(VisionError::Config(
                "max_servings must be greater than min_servings".to_string(),
            ));
        }
        if !(recipe.min_servings..=recipe.max_servings).contains(&recipe.default_servings) {
            return Err(VisionError::Config(format!(
                "default_servings must be between {} and {}",
                recipe.min_servings, recipe.max_servings
            )));
        }

        let limits = &self.limits;
        if limits.min_width > limits.max_width || limits.min_height > limits.max_height {
            return Err(VisionError::Config(
                "minimum image size must not exceed the maximum image size".to_string(),
            ));
        }
        if self.generation.min_recipe_length > self.generation.max_recipe_length {
            return Err(VisionError::Config(
                "min_recipe_length must not exceed max_recipe_length".to_string(),
            ));
        }
        Ok(())
    }

    pub fn model_config(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("caption", self.models.caption_model.clone()),
            ("classifier", self.models.classifier_model.clone()),
            ("recipe", self.models.recipe_model.clone()),
        ])
    }
}

/// Connection settings for a chat-completion recipe backend.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub model: String,
    pub api_url: String,
    pub temperature: f32,
}

impl ProviderConfig {
    pub fn from_env(provider: &str) -> Self {
        let prefix = provider.to_uppercase();

        let model = env::var(format!("{}_MODEL", prefix))
            .unwrap_or_else(|_| match provider {
                "deepseek" => "deepseek-chat".to_string(),
                "openai" => "gpt-4o-mini".to_string(),
                "gemini" => "gemini-1.5-flash".to_string(),
                "openrouter" => "meta-llama/llama-3.1-8b-instruct".to_string(),
                _ => String::new(),
            });

        let api_url = env::var(format!("{}_API_URL", prefix))
            .unwrap_or_else(|_| match provider {
                "deepseek" => "https://api.deepseek.com/v1/chat/completions".to_string(),
                "openrouter" => "https://openrouter.ai/api/v1/chat/completions".to_string(),
                "gemini" => "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
                _ => String::new(),
            });

        let temperature = env::var(format!("{}_TEMPERATURE", prefix))
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(0.8);

        Self {
            model,
            api_url,
            temperature,
        }
    }

    pub fn api_key(provider: &str) -> Option<String> {
        non_empty_env(&format!("{}_API_KEY", provider.to_uppercase()))
    }
}
