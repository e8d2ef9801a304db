use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::evaluator::PermissionEvaluator;
use super::events::{AccessEvent, AccessEvents};
use super::types::{Permission, PermissionState};
use crate::clients::{ClientDescriptor, RevokeMode};
use crate::error::{AccessError, AccessResult};
use crate::platform::{GrantResult, Platform};

/// Where a client stands in the request protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPhase {
    Idle,
    Requested,
}

/// How the last resolved request for a client ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    Granted,
    Denied,
}

/// The screen that launched a request.
///
/// Closing it cancels its token; requests it launched are dropped and their
/// late results come back as `StaleResult`. Clones share the same token.
#[derive(Debug, Clone)]
pub struct Screen {
    id: String,
    cancel: CancellationToken,
}

impl Screen {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// For hosts that tie the screen to other cancellable work.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self::new()
    }
}

/// Subject id of the app-wide storage permission in requests, outcomes and
/// events. The catalog never accepts it as a client id.
pub const STORAGE_SUBJECT: &str = "app:storage";

/// An outstanding ask to the platform's grant UI.
///
/// Not `Clone`: handing it to `resolve` consumes it. `client_id` is
/// `STORAGE_SUBJECT` for `request_storage`.
#[derive(Debug, Serialize)]
pub struct CapabilityRequest {
    pub token: String,
    pub client_id: String,
    pub target: Permission,
    pub screen_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

struct Pending {
    subject: String,
    // None for the app-wide storage slot
    client: Option<ClientDescriptor>,
    target: Permission,
    screen_id: String,
    screen: CancellationToken,
}

impl Pending {
    fn is_live(&self) -> bool {
        !self.screen.is_cancelled()
    }
}

/// Runs request → resolve and revoke for every client.
///
/// At most one live request exists per client, plus one for the app-wide
/// storage permission. Everything mutating takes `&mut self`; the host
/// drives it from one sequential context.
pub struct CapabilityRequestFlow {
    platform: Arc<dyn Platform>,
    evaluator: PermissionEvaluator,
    pending: HashMap<String, Pending>,
    outcomes: HashMap<String, RequestOutcome>,
    events: AccessEvents,
}

impl CapabilityRequestFlow {
    pub fn new(platform: Arc<dyn Platform>, evaluator: PermissionEvaluator) -> Self {
        Self {
            platform,
            evaluator,
            pending: HashMap::new(),
            outcomes: HashMap::new(),
            events: AccessEvents::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AccessEvent> {
        self.events.subscribe()
    }

    pub fn phase(&self, client_id: &str) -> RequestPhase {
        if self.live_request_for(client_id).is_some() {
            RequestPhase::Requested
        } else {
            RequestPhase::Idle
        }
    }

    pub fn last_outcome(&self, client_id: &str) -> Option<RequestOutcome> {
        self.outcomes.get(client_id).copied()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.values().filter(|p| p.is_live()).count()
    }

    /// Launch the grant UI for the first permission `client` is missing.
    pub fn request(
        &mut self,
        client: &ClientDescriptor,
        screen: &Screen,
    ) -> AccessResult<CapabilityRequest> {
        self.check_slot(&client.id, screen)?;

        let target = match self.evaluator.missing(client).into_iter().next() {
            Some(permission) => permission,
            None => {
                return Err(AccessError::InvalidState(format!(
                    "{} is already granted",
                    client.id
                )))
            }
        };

        self.launch(&client.id, Some(client.clone()), target, screen)
    }

    /// Launch the runtime dialog for the app-wide storage permission,
    /// independent of any client.
    pub fn request_storage(&mut self, screen: &Screen) -> AccessResult<CapabilityRequest> {
        self.check_slot(STORAGE_SUBJECT, screen)?;

        if self.evaluator.has_storage_access() {
            return Err(AccessError::InvalidState(
                "shared storage access is already granted".to_string(),
            ));
        }

        self.launch(STORAGE_SUBJECT, None, Permission::ReadExternalStorage, screen)
    }

    /// Apply the platform's answer to `request` and return the subject's
    /// freshly evaluated state. The subject is Idle again afterwards.
    pub fn resolve(
        &mut self,
        request: CapabilityRequest,
        result: GrantResult,
    ) -> AccessResult<PermissionState> {
        self.resolve_token(&request.token, result)
    }

    /// `resolve` for hosts that only kept the correlation token.
    pub fn resolve_token(
        &mut self,
        token: &str,
        result: GrantResult,
    ) -> AccessResult<PermissionState> {
        let pending = match self.pending.remove(token) {
            Some(p) => p,
            None => {
                log::debug!("Dropping result for unknown request {}", token);
                return Err(AccessError::StaleResult(format!("no request {}", token)));
            }
        };
        let subject = pending.subject.clone();

        if !pending.is_live() {
            log::debug!(
                "Dropping result for {}: screen {} closed",
                subject,
                pending.screen_id
            );
            self.events.emit(AccessEvent::Discarded {
                client_id: subject,
                token: token.to_string(),
            });
            return Err(AccessError::StaleResult(format!(
                "screen {} closed",
                pending.screen_id
            )));
        }

        let outcome = match self.accept(&pending.target, &result) {
            Ok(()) => {
                log::info!("Granted {} for {}", pending.target, subject);
                RequestOutcome::Granted
            }
            Err(reason) => {
                log::info!("Grant for {} denied: {}", subject, reason);
                self.events.emit(AccessEvent::Denied {
                    client_id: subject.clone(),
                    reason,
                });
                RequestOutcome::Denied
            }
        };
        self.outcomes.insert(subject.clone(), outcome);

        let state = match pending.client {
            Some(ref client) => self.evaluator.evaluate(client),
            None if self.evaluator.has_storage_access() => PermissionState::Granted,
            None => PermissionState::NotGranted,
        };
        if outcome == RequestOutcome::Granted {
            self.events.emit(AccessEvent::Granted {
                client_id: subject,
                state,
            });
        }
        Ok(state)
    }

    /// Drop every grant `client` holds through its document tree.
    pub fn revoke(&mut self, client: &ClientDescriptor) -> AccessResult<()> {
        self.prune_closed();

        if self.live_request_for(&client.id).is_some() {
            return Err(AccessError::InvalidState(format!(
                "{} has a request in flight",
                client.id
            )));
        }
        if !self.evaluator.evaluate(client).is_granted() {
            return Err(AccessError::InvalidState(format!(
                "{} is not granted",
                client.id
            )));
        }
        if client.revoke_mode == RevokeMode::Unsupported {
            return Err(AccessError::Unsupported(format!(
                "{} can only be revoked from system settings",
                client.display_name
            )));
        }
        // The shared storage permission belongs to the whole app, never to one client.
        let tree = client.tree_permission().ok_or_else(|| {
            AccessError::Unsupported(format!(
                "{} only uses shared storage access",
                client.display_name
            ))
        })?;

        if !self.platform.release_grant(&tree)? {
            log::warn!("Platform refused to release {} for {}", tree, client.id);
            return Err(AccessError::Unsupported(format!(
                "platform refused to release {}",
                tree
            )));
        }

        self.outcomes.remove(&client.id);
        log::info!("Revoked {} for {}", tree, client.id);
        self.events.emit(AccessEvent::Revoked {
            client_id: client.id.clone(),
        });
        Ok(())
    }

    /// Close `screen` and drop the requests it launched right away.
    pub fn close_screen(&mut self, screen: &Screen) {
        screen.close();
        self.prune_closed();
    }

    fn check_slot(&mut self, subject: &str, screen: &Screen) -> AccessResult<()> {
        if screen.is_closed() {
            return Err(AccessError::InvalidState(format!(
                "screen {} is closed",
                screen.id()
            )));
        }
        self.prune_closed();

        if let Some(token) = self.live_request_for(subject) {
            return Err(AccessError::InvalidState(format!(
                "{} already has request {} in flight",
                subject, token
            )));
        }
        Ok(())
    }

    fn launch(
        &mut self,
        subject: &str,
        client: Option<ClientDescriptor>,
        target: Permission,
        screen: &Screen,
    ) -> AccessResult<CapabilityRequest> {
        self.platform.launch_grant(&target)?;

        let token = uuid::Uuid::new_v4().to_string();
        log::debug!(
            "Launched grant UI for {} ({}), request {}",
            subject,
            target,
            token
        );
        self.pending.insert(
            token.clone(),
            Pending {
                subject: subject.to_string(),
                client,
                target: target.clone(),
                screen_id: screen.id().to_string(),
                screen: screen.cancellation(),
            },
        );
        self.events.emit(AccessEvent::Requested {
            client_id: subject.to_string(),
            permission: target.clone(),
        });

        Ok(CapabilityRequest {
            token,
            client_id: subject.to_string(),
            target,
            screen_id: screen.id().to_string(),
            created_at: chrono::Utc::now(),
        })
    }

    fn accept(&self, target: &Permission, result: &GrantResult) -> Result<(), String> {
        let matches = match (target, result) {
            (_, GrantResult::Cancelled) => return Err("grant dialog cancelled".to_string()),
            (Permission::DocumentTree(_), GrantResult::Tree { tree }) => target.matches_tree(tree),
            (Permission::ReadExternalStorage, GrantResult::Allowed) => true,
            _ => false,
        };
        if !matches {
            return Err(format!("result does not grant {}", target));
        }
        self.platform
            .persist_grant(target)
            .map_err(|e| format!("could not persist {}: {}", target, e))
    }

    fn live_request_for(&self, subject: &str) -> Option<&str> {
        self.pending
            .iter()
            .find(|(_, p)| p.subject == subject && p.is_live())
            .map(|(token, _)| token.as_str())
    }

    fn prune_closed(&mut self) {
        let closed: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, p)| !p.is_live())
            .map(|(token, _)| token.clone())
            .collect();
        for token in closed {
            if let Some(p) = self.pending.remove(&token) {
                log::debug!(
                    "Discarding request {} for {}: screen {} closed",
                    token,
                    p.subject,
                    p.screen_id
                );
                self.events.emit(AccessEvent::Discarded {
                    client_id: p.subject,
                    token,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::simulated::{PlatformCall, SimulatedPlatform};

    const STATUSES: &str = "Android/media/com.whatsapp/WhatsApp/Media/.Statuses";

    fn whatsapp() -> ClientDescriptor {
        ClientDescriptor::new("wa", "WhatsApp", STATUSES)
    }

    fn tree() -> Permission {
        Permission::document_tree(STATUSES)
    }

    fn flow(platform: SimulatedPlatform) -> (CapabilityRequestFlow, Arc<SimulatedPlatform>) {
        let platform = Arc::new(platform);
        let evaluator = PermissionEvaluator::new(platform.clone());
        (CapabilityRequestFlow::new(platform.clone(), evaluator), platform)
    }

    fn picked(path: &str) -> GrantResult {
        GrantResult::Tree {
            tree: path.to_string(),
        }
    }

    #[test]
    fn request_launches_grant_ui_for_missing_tree() {
        let (mut flow, platform) = flow(SimulatedPlatform::new());
        let screen = Screen::new();

        let request = flow.request(&whatsapp(), &screen).unwrap();
        assert_eq!(request.client_id, "wa");
        assert_eq!(request.target, tree());
        assert_eq!(request.screen_id, screen.id());
        assert_eq!(flow.phase("wa"), RequestPhase::Requested);
        assert!(platform.was_called(&PlatformCall::LaunchGrant(tree())));
    }

    #[test]
    fn second_request_while_pending_is_invalid() {
        let (mut flow, _) = flow(SimulatedPlatform::new());
        let screen = Screen::new();

        let _first = flow.request(&whatsapp(), &screen).unwrap();
        let second = flow.request(&whatsapp(), &Screen::new());
        assert!(matches!(second, Err(AccessError::InvalidState(_))));
        assert_eq!(flow.pending_count(), 1);
    }

    #[test]
    fn requests_for_different_clients_are_independent() {
        let (mut flow, _) = flow(SimulatedPlatform::new());
        let screen = Screen::new();
        let business =
            ClientDescriptor::new("wab", "WhatsApp Business", "WhatsApp Business/Media/.Statuses");

        flow.request(&whatsapp(), &screen).unwrap();
        flow.request(&business, &screen).unwrap();
        assert_eq!(flow.pending_count(), 2);
    }

    #[test]
    fn matching_tree_grants_and_returns_to_idle() {
        let (mut flow, platform) = flow(SimulatedPlatform::new());
        let screen = Screen::new();

        let request = flow.request(&whatsapp(), &screen).unwrap();
        let state = flow.resolve(request, picked(STATUSES)).unwrap();

        assert_eq!(state, PermissionState::Granted);
        assert_eq!(flow.phase("wa"), RequestPhase::Idle);
        assert_eq!(flow.last_outcome("wa"), Some(RequestOutcome::Granted));
        assert!(platform.holds(&tree()));
    }

    #[test]
    fn cancelled_dialog_denies_and_allows_retry() {
        let (mut flow, platform) = flow(SimulatedPlatform::new());
        let screen = Screen::new();

        let request = flow.request(&whatsapp(), &screen).unwrap();
        let state = flow.resolve(request, GrantResult::Cancelled).unwrap();
        assert_eq!(state, PermissionState::NotGranted);
        assert_eq!(flow.last_outcome("wa"), Some(RequestOutcome::Denied));
        assert!(!platform.was_called(&PlatformCall::PersistGrant(tree())));

        assert!(flow.request(&whatsapp(), &screen).is_ok());
    }

    #[test]
    fn wrong_folder_is_denied() {
        let (mut flow, platform) = flow(SimulatedPlatform::new());
        let request = flow.request(&whatsapp(), &Screen::new()).unwrap();

        let state = flow
            .resolve(request, picked("Android/media/com.whatsapp"))
            .unwrap();
        assert_eq!(state, PermissionState::NotGranted);
        assert_eq!(flow.last_outcome("wa"), Some(RequestOutcome::Denied));
        assert!(!platform.holds(&tree()));
    }

    #[test]
    fn persist_failure_is_denied() {
        let (mut flow, _) = flow(SimulatedPlatform::new().fail_persist());
        let request = flow.request(&whatsapp(), &Screen::new()).unwrap();

        let state = flow.resolve(request, picked(STATUSES)).unwrap();
        assert_eq!(state, PermissionState::NotGranted);
        assert_eq!(flow.last_outcome("wa"), Some(RequestOutcome::Denied));
    }

    #[test]
    fn legacy_storage_is_granted_by_allowed_result() {
        use crate::clients::Capability;

        let client = whatsapp().with_capabilities(vec![Capability::LegacyStorage]);
        let (mut flow, _) = flow(SimulatedPlatform::new());
        let request = flow.request(&client, &Screen::new()).unwrap();
        assert_eq!(request.target, Permission::ReadExternalStorage);

        let state = flow.resolve(request, GrantResult::Allowed).unwrap();
        assert_eq!(state, PermissionState::Granted);
    }

    #[test]
    fn multi_permission_client_needs_one_request_per_permission() {
        use crate::clients::Capability;

        let client = whatsapp().with_capabilities(vec![
            Capability::LegacyStorage,
            Capability::ScopedDocumentAccess,
        ]);
        let (mut flow, _) = flow(SimulatedPlatform::new());
        let screen = Screen::new();

        let first = flow.request(&client, &screen).unwrap();
        assert_eq!(
            flow.resolve(first, GrantResult::Allowed).unwrap(),
            PermissionState::NotGranted
        );
        assert_eq!(flow.last_outcome("wa"), Some(RequestOutcome::Granted));

        let second = flow.request(&client, &screen).unwrap();
        assert_eq!(second.target, tree());
        assert_eq!(
            flow.resolve(second, picked(STATUSES)).unwrap(),
            PermissionState::Granted
        );
    }

    #[test]
    fn request_for_granted_client_is_invalid() {
        let (mut flow, platform) = flow(SimulatedPlatform::new().with_grant(tree()));
        let result = flow.request(&whatsapp(), &Screen::new());
        assert!(matches!(result, Err(AccessError::InvalidState(_))));
        assert!(!platform.was_called(&PlatformCall::LaunchGrant(tree())));
    }

    #[test]
    fn launch_failure_leaves_client_idle() {
        let (mut flow, _) = flow(SimulatedPlatform::new().fail_launch());
        let result = flow.request(&whatsapp(), &Screen::new());
        assert!(matches!(result, Err(AccessError::Platform(_))));
        assert_eq!(flow.phase("wa"), RequestPhase::Idle);
    }

    #[test]
    fn unknown_token_is_stale() {
        let (mut flow, _) = flow(SimulatedPlatform::new());
        let result = flow.resolve_token("nope", GrantResult::Allowed);
        assert!(matches!(result, Err(AccessError::StaleResult(_))));
    }

    #[test]
    fn token_resolves_only_once() {
        let (mut flow, _) = flow(SimulatedPlatform::new());
        let request = flow.request(&whatsapp(), &Screen::new()).unwrap();
        let token = request.token.clone();

        flow.resolve_token(&token, GrantResult::Cancelled).unwrap();
        let again = flow.resolve_token(&token, picked(STATUSES));
        assert!(again.unwrap_err().is_stale());
    }

    #[test]
    fn closed_screen_turns_result_stale() {
        let (mut flow, platform) = flow(SimulatedPlatform::new());
        let screen = Screen::new();
        let request = flow.request(&whatsapp(), &screen).unwrap();

        screen.close();
        assert_eq!(flow.phase("wa"), RequestPhase::Idle);

        let result = flow.resolve(request, picked(STATUSES));
        assert!(result.unwrap_err().is_stale());
        assert!(!platform.holds(&tree()));
        assert_eq!(flow.last_outcome("wa"), None);
    }

    #[test]
    fn close_screen_prunes_eagerly() {
        let (mut flow, _) = flow(SimulatedPlatform::new());
        let screen = Screen::new();
        let mut rx = flow.subscribe();
        let request = flow.request(&whatsapp(), &screen).unwrap();

        flow.close_screen(&screen);
        assert_eq!(flow.pending_count(), 0);
        assert!(matches!(rx.try_recv(), Ok(AccessEvent::Requested { .. })));
        assert_eq!(
            rx.try_recv().unwrap(),
            AccessEvent::Discarded {
                client_id: "wa".into(),
                token: request.token.clone(),
            }
        );

        assert!(flow.resolve(request, picked(STATUSES)).unwrap_err().is_stale());
    }

    #[test]
    fn closed_screen_cannot_request() {
        let (mut flow, _) = flow(SimulatedPlatform::new());
        let screen = Screen::new();
        screen.close();
        assert!(matches!(
            flow.request(&whatsapp(), &screen),
            Err(AccessError::InvalidState(_))
        ));
    }

    #[test]
    fn revoke_releases_tree() {
        let (mut flow, platform) = flow(SimulatedPlatform::new().with_grant(tree()));
        let mut rx = flow.subscribe();

        flow.revoke(&whatsapp()).unwrap();
        assert!(!platform.holds(&tree()));
        assert_eq!(
            rx.try_recv().unwrap(),
            AccessEvent::Revoked {
                client_id: "wa".into()
            }
        );
    }

    #[test]
    fn refused_revoke_is_unsupported_and_keeps_grant() {
        let (mut flow, platform) =
            flow(SimulatedPlatform::new().with_grant(tree()).refuse_release());

        let result = flow.revoke(&whatsapp());
        assert!(matches!(result, Err(AccessError::Unsupported(_))));
        assert!(platform.holds(&tree()));
    }

    #[test]
    fn unsupported_revoke_mode_never_calls_platform() {
        let (mut flow, platform) = flow(SimulatedPlatform::new().with_grant(tree()));
        let client = whatsapp().with_revoke_mode(RevokeMode::Unsupported);

        assert!(matches!(
            flow.revoke(&client),
            Err(AccessError::Unsupported(_))
        ));
        assert!(!platform.was_called(&PlatformCall::ReleaseGrant(tree())));
    }

    #[test]
    fn revoke_requires_grant_and_no_pending_request() {
        let (mut flow, _) = flow(SimulatedPlatform::new());
        assert!(matches!(
            flow.revoke(&whatsapp()),
            Err(AccessError::InvalidState(_))
        ));

        let _request = flow.request(&whatsapp(), &Screen::new()).unwrap();
        assert!(matches!(
            flow.revoke(&whatsapp()),
            Err(AccessError::InvalidState(_))
        ));
    }

    #[test]
    fn cancelled_resolve_emits_denied_event() {
        let (mut flow, _) = flow(SimulatedPlatform::new());
        let mut rx = flow.subscribe();
        let request = flow.request(&whatsapp(), &Screen::new()).unwrap();

        flow.resolve(request, GrantResult::Cancelled).unwrap();
        assert!(matches!(rx.try_recv(), Ok(AccessEvent::Requested { .. })));
        match rx.try_recv().unwrap() {
            AccessEvent::Denied { client_id, reason } => {
                assert_eq!(client_id, "wa");
                assert!(reason.contains("cancelled"), "unexpected reason: {}", reason);
            }
            other => panic!("expected Denied, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn wrong_folder_emits_denied_event() {
        let (mut flow, _) = flow(SimulatedPlatform::new());
        let request = flow.request(&whatsapp(), &Screen::new()).unwrap();
        let mut rx = flow.subscribe();

        flow.resolve(request, picked("/")).unwrap();
        match rx.try_recv().unwrap() {
            AccessEvent::Denied { client_id, reason } => {
                assert_eq!(client_id, "wa");
                assert!(reason.contains(&tree().to_string()), "unexpected reason: {}", reason);
            }
            other => panic!("expected Denied, got {:?}", other),
        }
    }

    #[test]
    fn allowed_result_does_not_grant_a_tree() {
        let (mut flow, platform) = flow(SimulatedPlatform::new());
        let request = flow.request(&whatsapp(), &Screen::new()).unwrap();

        let state = flow.resolve(request, GrantResult::Allowed).unwrap();
        assert_eq!(state, PermissionState::NotGranted);
        assert_eq!(flow.last_outcome("wa"), Some(RequestOutcome::Denied));
        assert!(!platform.was_called(&PlatformCall::PersistGrant(tree())));
        assert!(!platform.holds(&tree()));
    }

    #[test]
    fn storage_request_grants_app_wide_permission() {
        let (mut flow, platform) = flow(SimulatedPlatform::new());
        let mut rx = flow.subscribe();

        let request = flow.request_storage(&Screen::new()).unwrap();
        assert_eq!(request.client_id, STORAGE_SUBJECT);
        assert_eq!(request.target, Permission::ReadExternalStorage);
        assert_eq!(flow.phase(STORAGE_SUBJECT), RequestPhase::Requested);

        let state = flow.resolve(request, GrantResult::Allowed).unwrap();
        assert_eq!(state, PermissionState::Granted);
        assert_eq!(flow.phase(STORAGE_SUBJECT), RequestPhase::Idle);
        assert_eq!(flow.last_outcome(STORAGE_SUBJECT), Some(RequestOutcome::Granted));
        assert!(platform.holds(&Permission::ReadExternalStorage));

        assert!(matches!(rx.try_recv(), Ok(AccessEvent::Requested { .. })));
        assert_eq!(
            rx.try_recv().unwrap(),
            AccessEvent::Granted {
                client_id: STORAGE_SUBJECT.into(),
                state: PermissionState::Granted,
            }
        );
    }

    #[test]
    fn storage_request_has_its_own_slot() {
        let (mut flow, _) = flow(SimulatedPlatform::new());
        let screen = Screen::new();

        let _client = flow.request(&whatsapp(), &screen).unwrap();
        let storage = flow.request_storage(&screen).unwrap();
        assert!(matches!(
            flow.request_storage(&screen),
            Err(AccessError::InvalidState(_))
        ));
        assert_eq!(flow.pending_count(), 2);

        let state = flow.resolve(storage, picked(STATUSES)).unwrap();
        assert_eq!(state, PermissionState::NotGranted);
        assert_eq!(flow.last_outcome(STORAGE_SUBJECT), Some(RequestOutcome::Denied));
        assert_eq!(flow.phase("wa"), RequestPhase::Requested);
        assert!(flow.request_storage(&screen).is_ok());
    }

    #[test]
    fn storage_request_when_already_granted_is_invalid() {
        let (mut flow, platform) =
            flow(SimulatedPlatform::new().with_grant(Permission::ReadExternalStorage));
        assert!(matches!(
            flow.request_storage(&Screen::new()),
            Err(AccessError::InvalidState(_))
        ));
        assert!(!platform.was_called(&PlatformCall::LaunchGrant(Permission::ReadExternalStorage)));
    }

    #[test]
    fn closed_screen_drops_storage_request() {
        let (mut flow, platform) = flow(SimulatedPlatform::new());
        let screen = Screen::new();
        let request = flow.request_storage(&screen).unwrap();

        flow.close_screen(&screen);
        assert!(flow.resolve(request, GrantResult::Allowed).unwrap_err().is_stale());
        assert!(!platform.holds(&Permission::ReadExternalStorage));
        assert_eq!(flow.last_outcome(STORAGE_SUBJECT), None);
    }
}
