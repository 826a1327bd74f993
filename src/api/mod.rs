//! Typed wrappers over the backend endpoints. Authenticated calls go through
//! `AuthClient::send` so a rejected token is handled in one place; login,
//! registration and password reset use `send_public`.

pub mod auth;
pub mod cameras;
pub mod dashboard;
pub mod password;
pub mod rentals;
pub mod users;

pub use auth::RegisterRequest;
pub use cameras::{CameraForm, ImageUpload};
pub use password::{PasswordReset, ResetStep};
pub use rentals::RentalAction;
