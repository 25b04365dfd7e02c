//! HTTP handlers for typed objects and the admin site.

pub mod admin;
pub mod object;
