// Data models for the H2PETRONS API

pub mod auth;
pub mod user;

pub use auth::{AuthResponse, LoginRequest, MeResponse, RegisterRequest};
pub use user::{User, UserRole};
