//! Client-side access layer for a livestream membership storefront.
//!
//! The storefront backend is an opaque remote HTTP API; everything in this
//! crate runs on the viewer's side of the wire. The crate provides:
//!
//! - [`api::ApiClient`]: a typed client for the storefront endpoints
//!   (login/register, one-time codes, OTP, membership checks, Mux listings,
//!   best-effort IP lookup).
//! - [`store::StateStore`]: an injected key/value store standing in for
//!   browser storage, with a tab-lifetime and a persistent scope.
//! - [`gate::AccessGate`]: the decision logic that grants or denies access to
//!   a live stream from stored state plus remote checks. Pages render its
//!   decisions; they contain no gating logic of their own.
//! - [`gate::otp::OtpFlow`]: the email OTP sub-flow used by the membership
//!   verification page.
//! - [`auth`]: login/registration session markers.
//! - [`listing`]: the live/replay show view-model for the home page.
//! - [`poller::Poller`]: fixed-interval background refresh with an explicit
//!   stop contract.
//!
//! All remote calls are strictly sequential with no automatic retries; a
//! failed call is converted into user-facing state at the call site and never
//! propagates as a fault.

pub mod api;
pub mod auth;
pub mod config;
pub mod gate;
pub mod listing;
pub mod poller;
pub mod store;

pub(crate) mod validate;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthClient, AuthError, AuthStatus, LoginSession, RegisterForm};
pub use config::Config;
pub use gate::membership::{MembershipError, MembershipRecord, MembershipType, StreamAccess};
pub use gate::otp::{OtpError, OtpFlow, OtpState};
pub use gate::session::{DenyReason, SessionCheck, SubmitError, VerificationSession};
pub use gate::AccessGate;
pub use listing::{LiveShow, ReplayShow, ShowListing};
pub use poller::Poller;
pub use store::{MemoryStore, Scope, StateStore};
