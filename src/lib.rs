pub mod annotation;
pub mod app;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod gbif;
pub mod node;
pub mod output;
pub mod query;
pub mod rank;
pub mod record;
pub mod resolver;
pub mod scorer;
pub mod source;
pub mod walker;
