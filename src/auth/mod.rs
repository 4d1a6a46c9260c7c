mod models;
mod session;

pub use models::{Credentials, LoginResponse, MIN_PASSWORD_LENGTH, RegistrationForm};
pub use session::{AuthState, Session, SessionController};
