//! Cached, validated client for a users REST API.
//!
//! Reads flow through a [`cache::QueryCache`] into [`api::UsersApi`], which
//! calls the [`api::ApiClient`] and checks every payload against its
//! [`api::schema`] shape. Writes go straight to the API and then invalidate,
//! overwrite or drop the cache entries they affect.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
