// src/cloudcrew/clients/mod.rs

pub mod azure_openai;

pub use azure_openai::AzureOpenAIClient;
