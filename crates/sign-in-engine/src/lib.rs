//! Sign-in business logic for the Openshelf account core.
//!
//! [`SignInBusinessLogic`] drives the per-library sign-in/sign-out state
//! machine: it validates credentials against the library's patron-profile
//! endpoint, runs the optional DRM activation sub-step, persists the result
//! through the account session, and broadcasts state changes. Transport,
//! DRM, and catalog sync are injected behind traits.

mod drm;
mod engine;
mod error;
mod sign_in_fsm;
mod traits;

pub use engine::{SchemeResolution, SignInBusinessLogic, SignInOutcome};
pub use error::{SignInError, SignInResult};
pub use sign_in_fsm::{SessionState, SessionStateChangedPayload};
pub use traits::{
    BookRegistrySyncing, DrmActivation, DrmAuthorizing, DrmFailure, HttpMethod, HttpRequest,
    HttpResponse, NetworkExecutor, NetworkFailure, NoopBookRegistry, ReqwestExecutor,
};
