//! Blogicum - A small blogging platform
//!
//! This library provides posts with scheduled publication, categories,
//! locations, comments and user profiles behind a JSON HTTP API.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
