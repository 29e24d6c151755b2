//! Domain types and models

pub mod event;
pub mod session;
pub mod token;
pub mod user;

pub use event::{
    AuthEvent, EventEnvelope, EventMetadata, LogoutReason, TokenRefreshedEvent, UserLoginEvent,
    UserLogoutEvent,
};
pub use session::{ClientContext, LoginState, SessionId};
pub use token::TokenGrant;
pub use user::UserClaims;
