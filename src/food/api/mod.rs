pub mod usda;

pub use usda::UsdaClient;
