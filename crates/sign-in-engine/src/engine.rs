//! The sign-in engine.

use account_session::{AccountDetails, AccountEvent, AccountEventBus, Credential};
use auth_document::{AuthenticationScheme, ProblemDocument, UserProfileDocument};
use shelf_config_and_utils::{Config, MultiSchemePolicy};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::drm::split_client_token;
use crate::error::{SignInError, SignInResult};
use crate::sign_in_fsm::{
    SessionState, SessionStateChangedPayload, SignInMachine, SignInMachineInput,
    SignInMachineState,
};
use crate::traits::{
    BookRegistrySyncing, DrmActivation, DrmAuthorizing, DrmFailure, HttpRequest, NetworkExecutor,
};

/// Outcome of a [`SignInBusinessLogic::log_in`] call.
#[derive(Debug, PartialEq, Eq)]
pub enum SignInOutcome {
    /// Credentials validated and persisted.
    SignedIn,
    /// Another sign-in for this library was already running; this call did
    /// nothing. The in-flight attempt reports its own result.
    AlreadyInFlight,
}

/// How the active authentication scheme was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemeResolution {
    /// Explicitly chosen this session.
    Override(AuthenticationScheme),
    /// Restored from a previous session's persisted choice.
    Persisted(AuthenticationScheme),
    /// The library declares exactly one scheme.
    OnlyOne(AuthenticationScheme),
    /// Multiple schemes, resolved to the first by configured policy.
    DefaultFirst(AuthenticationScheme),
    /// Multiple schemes and no basis to choose; the caller must pick.
    Unresolved(usize),
}

impl SchemeResolution {
    pub fn scheme(&self) -> Option<&AuthenticationScheme> {
        match self {
            SchemeResolution::Override(s)
            | SchemeResolution::Persisted(s)
            | SchemeResolution::OnlyOne(s)
            | SchemeResolution::DefaultFirst(s) => Some(s),
            SchemeResolution::Unresolved(_) => None,
        }
    }
}

/// Outcome of the validation pipeline, before anything is persisted.
struct Validated {
    profile: UserProfileDocument,
    drm: Option<(String, String, DrmActivation)>,
}

/// Per-library sign-in/sign-out driver.
///
/// Holds the FSM for transient sign-in state; durable state goes through the
/// account session. Credential writes never happen on a failure path, so a
/// failed re-validation leaves any prior signed-in state intact.
pub struct SignInBusinessLogic {
    account: AccountDetails,
    events: AccountEventBus,
    network: Arc<dyn NetworkExecutor>,
    drm: Option<Arc<dyn DrmAuthorizing>>,
    registry_sync: Arc<dyn BookRegistrySyncing>,
    fsm: Mutex<SignInMachine>,
    /// Overlapping sign-in attempts are dropped, not queued.
    sign_in_lock: AsyncMutex<()>,
    sync_check_lock: AsyncMutex<()>,
    scheme_override: Mutex<Option<AuthenticationScheme>>,
    multi_scheme_policy: MultiSchemePolicy,
    drm_timeout: Duration,
}

impl SignInBusinessLogic {
    pub fn new(
        account: AccountDetails,
        events: AccountEventBus,
        network: Arc<dyn NetworkExecutor>,
        drm: Option<Arc<dyn DrmAuthorizing>>,
        registry_sync: Arc<dyn BookRegistrySyncing>,
        config: &Config,
    ) -> Self {
        // The FSM itself is not persisted; a credential that survived a
        // previous process run restores the signed-in state so sign-out and
        // reauthentication stay reachable after a relaunch.
        let fsm = if account.session().is_signed_in() {
            SignInMachine::from_state(SignInMachineState::SignedIn)
        } else {
            SignInMachine::new()
        };
        Self {
            account,
            events,
            network,
            drm,
            registry_sync,
            fsm: Mutex::new(fsm),
            sign_in_lock: AsyncMutex::new(()),
            sync_check_lock: AsyncMutex::new(()),
            scheme_override: Mutex::new(None),
            multi_scheme_policy: config.multi_scheme_policy,
            drm_timeout: Duration::from_secs(config.drm_timeout_secs),
        }
    }

    pub fn account(&self) -> &AccountDetails {
        &self.account
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        let fsm = self.fsm.lock().expect("fsm lock poisoned");
        SessionState::from(fsm.state())
    }

    /// Snapshot of the current state for observers.
    pub fn state_payload(&self) -> SessionStateChangedPayload {
        SessionStateChangedPayload {
            state: self.state(),
            library: self.account.uuid().to_string(),
            authorization_identifier: self.account.session().authorization_identifier(),
        }
    }

    /// Transition the FSM, logging the state change.
    fn transition(&self, input: &SignInMachineInput) -> SignInResult<SessionState> {
        let mut fsm = self.fsm.lock().expect("fsm lock poisoned");
        let old_state = SessionState::from(fsm.state());

        fsm.consume(input).map_err(|_| {
            SignInError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_state = SessionState::from(fsm.state());
        drop(fsm);

        if old_state != new_state {
            debug!(
                library = %self.account.uuid(),
                old_state = ?old_state,
                new_state = ?new_state,
                "Session state transition"
            );
        }
        Ok(new_state)
    }

    // Scheme selection

    /// Set or clear the in-memory scheme choice for this session.
    pub fn set_scheme_override(&self, scheme: Option<AuthenticationScheme>) {
        *self.scheme_override.lock().expect("scheme lock poisoned") = scheme;
    }

    /// Resolve the active authentication scheme.
    ///
    /// Resolution order: session override, then the persisted choice, then
    /// the only declared scheme, then the configured multi-scheme policy.
    /// The order lets a single-scheme library just work while multi-scheme
    /// libraries need an explicit choice at most once per persisted session.
    pub fn selected_authentication(&self) -> SchemeResolution {
        if let Some(scheme) = self.scheme_override.lock().expect("scheme lock poisoned").clone() {
            return SchemeResolution::Override(scheme);
        }
        if let Some(scheme) = self.account.session().selected_auth_scheme() {
            return SchemeResolution::Persisted(scheme);
        }
        let schemes = self.account.schemes();
        if schemes.len() == 1 {
            return SchemeResolution::OnlyOne(schemes[0].clone());
        }
        match self.multi_scheme_policy {
            MultiSchemePolicy::FirstListed if !schemes.is_empty() => {
                SchemeResolution::DefaultFirst(schemes[0].clone())
            }
            _ => SchemeResolution::Unresolved(schemes.len()),
        }
    }

    // Request construction

    /// Build the profile request used for credential validation.
    ///
    /// Token-based schemes attach a bearer token when one is available,
    /// preferring the candidate credential being validated over the stored
    /// one. Basic auth stays challenge-driven at the transport layer.
    pub fn make_auth_request(&self, candidate: Option<&Credential>) -> SignInResult<HttpRequest> {
        let url = self
            .account
            .user_profile_url()
            .ok_or_else(|| SignInError::NoUrl("user profile".to_string()))?;

        let mut request = HttpRequest::get(url.clone());

        let token_based = self
            .selected_authentication()
            .scheme()
            .map(|s| s.auth_type.is_token_based())
            .unwrap_or(false);
        if token_based {
            let token = candidate
                .and_then(|c| c.auth_token().map(String::from))
                .or_else(|| {
                    self.account
                        .session()
                        .credential()
                        .and_then(|c| c.auth_token().map(String::from))
                });
            if let Some(token) = token {
                request = request.with_header("Authorization", &format!("Bearer {token}"));
            }
        }
        Ok(request)
    }

    // Sign-in

    /// Validate `credential` against the server and persist it on success.
    ///
    /// A call that overlaps an in-flight attempt for the same library
    /// returns [`SignInOutcome::AlreadyInFlight`] without touching the
    /// network; the duplicate carries no new information.
    pub async fn log_in(&self, credential: Credential) -> SignInResult<SignInOutcome> {
        let Ok(_guard) = self.sign_in_lock.try_lock() else {
            debug!(library = %self.account.uuid(), "Sign-in already in flight, skipping");
            return Ok(SignInOutcome::AlreadyInFlight);
        };

        self.transition(&SignInMachineInput::LogInAttempt)?;

        match self.validate(&credential).await {
            Ok(validated) => {
                self.finalize(&credential, &validated);
                self.transition(&SignInMachineInput::ValidationSucceeded)?;
                info!(library = %self.account.uuid(), "Sign-in complete");
                self.events.publish(AccountEvent::SignedIn {
                    library: self.account.uuid().to_string(),
                });
                self.registry_sync.sync_resetting_cache(false).await;
                self.registry_sync.save().await;
                Ok(SignInOutcome::SignedIn)
            }
            Err(e) => {
                let _ = self.transition(&SignInMachineInput::ValidationFailed);
                warn!(library = %self.account.uuid(), error = %e, "Sign-in failed");
                let (title, message) = match &e {
                    SignInError::Validation { title, message } => {
                        (title.clone(), message.clone())
                    }
                    other => (None, Some(other.to_string())),
                };
                self.events.publish(AccountEvent::ValidationFailed {
                    library: self.account.uuid().to_string(),
                    title,
                    message,
                });
                Err(e)
            }
        }
    }

    /// The validation pipeline. Persists nothing.
    async fn validate(&self, credential: &Credential) -> SignInResult<Validated> {
        let request = self.make_auth_request(Some(credential))?;
        let response = self.network.execute(request).await?;

        if !response.is_success() {
            let problem = ProblemDocument::parse(&response.body).ok();
            let (title, message) = match &problem {
                Some(p) => (p.title.clone(), p.user_message()),
                None => (None, None),
            };
            return Err(SignInError::Validation { title, message });
        }

        let profile = UserProfileDocument::parse(&response.body)?;
        let drm = self.activate_drm(&profile).await?;

        Ok(Validated { profile, drm })
    }

    /// DRM activation sub-step. Returns `(vendor, client_token, activation)`
    /// when activation ran.
    async fn activate_drm(
        &self,
        profile: &UserProfileDocument,
    ) -> SignInResult<Option<(String, String, DrmActivation)>> {
        let Some(drm) = &self.drm else {
            return Ok(None);
        };
        let Some(entry) = profile.usable_drm() else {
            return Ok(None);
        };
        let (Some(vendor), Some(client_token)) =
            (entry.vendor.as_deref(), entry.client_token.as_deref())
        else {
            return Ok(None);
        };

        let (username, password) = split_client_token(client_token);
        debug!(vendor = %vendor, "Starting DRM activation");

        // The vendor library can hang without ever calling back.
        match timeout(self.drm_timeout, drm.authorize(vendor, &username, &password)).await {
            Err(_) => {
                warn!(vendor = %vendor, timeout_secs = self.drm_timeout.as_secs(), "DRM activation timed out");
                Err(SignInError::DrmTimeout)
            }
            Ok(Err(DrmFailure::Rejected(reason))) => Err(SignInError::DrmRejected(reason)),
            Ok(Err(DrmFailure::Unavailable(reason))) => Err(SignInError::DrmUnavailable(reason)),
            Ok(Ok(activation)) => Ok(Some((
                vendor.to_string(),
                client_token.to_string(),
                activation,
            ))),
        }
    }

    /// Persist everything a successful validation produced, as one grouped
    /// write.
    fn finalize(&self, credential: &Credential, validated: &Validated) {
        let session = self.account.session();
        let scheme = self.selected_authentication().scheme().cloned();

        session.transaction(|| {
            session.set_credential(Some(credential));
            if let Some(scheme) = scheme.as_ref() {
                session.set_selected_auth_scheme(Some(scheme));
            }
            if let Some(id) = validated.profile.authorization_identifier.as_deref() {
                session.set_authorization_identifier(Some(id));
            }
            if let Some((vendor, client_token, activation)) = &validated.drm {
                session.set_provider(Some(vendor));
                session.set_adobe_token(Some(client_token));
                session.set_user_id(Some(&activation.user_id));
                session.set_device_id(Some(&activation.device_id));
            }
        });
    }

    // Sign-out

    /// Sign out. `full` clears everything including DRM device identifiers;
    /// otherwise those survive so the next sign-in skips device activation.
    ///
    /// DRM deactivation is attempted first with freshly validated
    /// credentials, but its failure never blocks the local sign-out; a
    /// patron must always be able to sign out even when server-side cleanup
    /// fails.
    pub async fn log_out(&self, full: bool) -> SignInResult<()> {
        self.transition(&SignInMachineInput::LogOutRequested)?;

        let session = self.account.session();
        if let Some(drm) = &self.drm {
            if let (Some(user_id), Some(device_id)) = (session.user_id(), session.device_id()) {
                let (username, password) = match self.fetch_fresh_drm_credentials().await {
                    Some(pair) => pair,
                    None => session
                        .adobe_token()
                        .map(|t| split_client_token(&t))
                        .unwrap_or_default(),
                };
                if let Err(e) = drm
                    .deauthorize(&username, &password, &user_id, &device_id)
                    .await
                {
                    warn!(
                        library = %self.account.uuid(),
                        error = %e,
                        "DRM deactivation failed, signing out anyway"
                    );
                }
            }
        }

        if full {
            session.remove_all();
        } else {
            session.remove_barcode_and_pin();
        }

        let _ = self.transition(&SignInMachineInput::LogOutComplete);
        info!(library = %self.account.uuid(), "Signed out");
        self.events.publish(AccountEvent::SignedOut {
            library: self.account.uuid().to_string(),
        });
        self.registry_sync.reset(self.account.uuid()).await;
        Ok(())
    }

    /// Re-validate against the server to get a fresh DRM token for
    /// deactivation; stored tokens may have expired. Best effort.
    async fn fetch_fresh_drm_credentials(&self) -> Option<(String, String)> {
        let request = match self.make_auth_request(None) {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, "Cannot build request for fresh DRM token");
                return None;
            }
        };
        let response = match self.network.execute(request).await {
            Ok(r) if r.is_success() => r,
            Ok(r) => {
                debug!(status = r.status, "Fresh DRM token fetch rejected");
                return None;
            }
            Err(e) => {
                debug!(error = %e, "Fresh DRM token fetch failed");
                return None;
            }
        };
        let profile = UserProfileDocument::parse(&response.body).ok()?;
        let token = profile.usable_drm()?.client_token.as_deref()?;
        Some(split_client_token(token))
    }

    // Reauthentication trigger

    /// Feed a problem document observed on any authenticated request.
    ///
    /// Returns true when it flagged the session for reauthentication.
    pub fn note_server_problem(&self, problem: &ProblemDocument) -> bool {
        if !problem.indicates_authentication_needs_refresh() {
            return false;
        }
        match self.transition(&SignInMachineInput::RefreshNeeded) {
            Ok(_) => {
                info!(library = %self.account.uuid(), "Server flagged credentials as stale");
                true
            }
            // Not signed in, nothing to refresh.
            Err(_) => false,
        }
    }

    // Annotations sync permission

    /// Read the server-side annotations-sync opt-in and persist it locally.
    ///
    /// Returns `Ok(None)` when an overlapping check was already running.
    pub async fn check_sync_permission(&self) -> SignInResult<Option<bool>> {
        let Ok(_guard) = self.sync_check_lock.try_lock() else {
            debug!(library = %self.account.uuid(), "Sync-permission check already in flight");
            return Ok(None);
        };

        let request = self.make_auth_request(None)?;
        let response = self.network.execute(request).await?;
        if !response.is_success() {
            let problem = ProblemDocument::parse(&response.body).ok();
            return Err(SignInError::Validation {
                title: problem.as_ref().and_then(|p| p.title.clone()),
                message: problem.as_ref().and_then(|p| p.user_message()),
            });
        }

        let profile = UserProfileDocument::parse(&response.body)?;
        let granted = profile.annotations_sync_enabled();
        self.store_sync_permission(granted);
        Ok(Some(granted))
    }

    /// Change the server-side annotations-sync opt-in, then persist locally.
    pub async fn update_sync_permission(&self, granted: bool) -> SignInResult<()> {
        let url = self
            .account
            .user_profile_url()
            .ok_or_else(|| SignInError::NoUrl("user profile".to_string()))?;

        let body = serde_json::json!({
            "settings": { "simplified:synchronize_annotations": granted }
        });
        let mut request = HttpRequest::put(url.clone(), body.to_string().into_bytes())
            .with_header("Content-Type", "vnd.librarysimplified/user-profile+json");
        if let Some(token) = self
            .account
            .session()
            .credential()
            .and_then(|c| c.auth_token().map(String::from))
        {
            request = request.with_header("Authorization", &format!("Bearer {token}"));
        }

        let response = self.network.execute(request).await?;
        if !response.is_success() {
            let problem = ProblemDocument::parse(&response.body).ok();
            return Err(SignInError::Validation {
                title: problem.as_ref().and_then(|p| p.title.clone()),
                message: problem.as_ref().and_then(|p| p.user_message()),
            });
        }

        self.store_sync_permission(granted);
        Ok(())
    }

    fn store_sync_permission(&self, granted: bool) {
        if granted == self.account.sync_permission_granted() {
            return;
        }
        self.account.set_sync_permission_granted(granted);
        self.events.publish(AccountEvent::SyncPermissionChanged {
            library: self.account.uuid().to_string(),
            granted,
        });
    }
}
