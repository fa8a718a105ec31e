//! Blogicum - a multi-author blogging platform
//!
//! Posts grouped by category and location, scheduled publication,
//! comments, user profiles and a moderation API.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
