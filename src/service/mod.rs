//! Business logic: tokens, revocation, challenges, rate limiting, and the
//! flows that orchestrate them

pub mod analysis;
pub mod auth;
pub mod email;
pub mod oauth;
pub mod otp;
pub mod rate_limit;
pub mod revocation;
pub mod token;

pub use analysis::{AnalysisReport, ContractAnalyzer};
pub use auth::AuthService;
pub use email::{EmailConfig, EmailService};
pub use oauth::{FederatedAuthService, GoogleOAuthClient};
pub use otp::{OtpPurpose, OtpService};
pub use rate_limit::{RateLimitConfig, RateLimitService};
pub use revocation::RevocationList;
pub use token::TokenService;
