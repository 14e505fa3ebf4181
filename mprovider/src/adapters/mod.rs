#[cfg(feature = "openai-compat")]
pub mod openai_compat;

#[cfg(feature = "provider-openrouter")]
pub mod openrouter;

#[cfg(feature = "provider-openai")]
pub mod openai;
