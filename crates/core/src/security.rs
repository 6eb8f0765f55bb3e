pub mod hashing;
pub mod jwt;
pub mod signature;

pub use hashing::PasswordHasher;
pub use jwt::{JwtService, TokenPair};
pub use signature::SignatureVerifier;
