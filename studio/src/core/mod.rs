pub mod config;
pub mod store;
pub mod models;
pub mod segment;
pub mod session;
pub mod factory;
pub mod llm;
pub mod news;
pub mod cluster;
pub mod style;
pub mod script;
pub mod media;
pub mod studio;
