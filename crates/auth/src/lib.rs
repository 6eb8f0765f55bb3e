pub mod dto;
pub mod models;
pub mod rbac;
pub mod repository;
pub mod service;

pub use dto::{LoginRequest, RefreshRequest, TokenPairResponse};
pub use models::{RefreshToken, User};
pub use rbac::{base_permission_set, check_permission, Target};
pub use repository::AuthRepository;
pub use service::AuthService;
