#![allow(dead_code)]

pub mod app;
pub mod config;
pub mod mock_crypto_pay;
pub mod mock_gemini;
