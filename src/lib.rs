pub mod config;
pub mod datareader;
pub mod environment;
pub mod errors;
pub mod model;
pub mod normalization;
pub mod password;
pub mod populate;
pub mod repository;
pub mod routes;
pub mod services;
pub mod sessions;
