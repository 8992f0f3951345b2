//! Registry of browsing sessions and the view/frame ids that refer to them.
//!
//! Content processes report the same session through different ids (a view
//! id first, a frame id moments later) from several threads. Every lookup and
//! registration runs inside one critical section so racing reports converge
//! on a single session.

pub mod session;

pub use session::*;

use crate::handler::BrowserHost;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of resolving ids to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionMatch {
    pub session_id: SessionId,
    /// The ids matched the session's guest mapping rather than its own.
    pub is_guest: bool,
}

impl SessionMatch {
    fn primary(session_id: SessionId) -> Self {
        Self {
            session_id,
            is_guest: false,
        }
    }

    fn guest(session_id: SessionId) -> Self {
        Self {
            session_id,
            is_guest: true,
        }
    }
}

pub struct SessionRegistry {
    state: Mutex<RegistryState>,
    guest_views_enabled: bool,
}

struct RegistryState {
    last_session_id: u32,
    sessions: Vec<SessionInfo>,
}

impl RegistryState {
    fn allocate(&mut self, is_popup: bool) -> &mut SessionInfo {
        self.last_session_id += 1;
        let id = SessionId::new(self.last_session_id);
        self.sessions.push(SessionInfo::new(id, is_popup));
        let last = self.sessions.len() - 1;
        &mut self.sessions[last]
    }

    fn position(&self, id: SessionId) -> Option<usize> {
        self.sessions.iter().position(|info| info.id == id)
    }

    /// Registers `id` on the session at `target` and drops it from every other
    /// session's mapping of the same kind and granularity.
    fn assign(&mut self, target: usize, kind: MappingKind, granularity: Granularity, id: RenderId) {
        for (index, info) in self.sessions.iter_mut().enumerate() {
            let mapping = info.mapping_mut(kind);
            if index == target {
                mapping.insert(granularity, id);
            } else if mapping.remove(granularity, id) {
                debug!(
                    "Moved {:?} {:?} id {} away from session {}",
                    kind, granularity, id, info.id
                );
            }
        }
    }

    fn find(&self, granularity: Granularity, id: RenderId, guest_views_enabled: bool) -> Option<SessionMatch> {
        for info in &self.sessions {
            if info.render_ids.contains(granularity, id) {
                return Some(SessionMatch::primary(info.id));
            }
            if guest_views_enabled && info.guest_render_ids.contains(granularity, id) {
                return Some(SessionMatch::guest(info.id));
            }
        }
        None
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_guest_views(true)
    }

    pub fn with_guest_views(guest_views_enabled: bool) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                last_session_id: 0,
                sessions: Vec::new(),
            }),
            guest_views_enabled,
        }
    }

    pub fn guest_views_enabled(&self) -> bool {
        self.guest_views_enabled
    }

    pub fn create(&self, is_popup: bool) -> SessionId {
        let mut state = self.state.lock();
        let id = state.allocate(is_popup).id;
        debug!("Created session {} (popup: {})", id, is_popup);
        id
    }

    /// Resolves the session owning either id pair, registering the other pair
    /// on it. Precedence per session, in insertion order: primary view id,
    /// primary frame id, then guest view or frame id. When nothing matches a
    /// new popup session is created holding both pairs.
    pub fn resolve_or_create(
        &self,
        view_process_id: ProcessId,
        view_routing_id: RoutingId,
        frame_process_id: ProcessId,
        frame_routing_id: RoutingId,
    ) -> SessionMatch {
        let view_id = RenderId::new(view_process_id, view_routing_id);
        let frame_id = RenderId::new(frame_process_id, frame_routing_id);
        let mut state = self.state.lock();

        for index in 0..state.sessions.len() {
            let info = &state.sessions[index];
            let session_id = info.id;

            if info.render_ids.contains(Granularity::View, view_id) {
                state.assign(index, MappingKind::Primary, Granularity::Frame, frame_id);
                return SessionMatch::primary(session_id);
            }
            if info.render_ids.contains(Granularity::Frame, frame_id) {
                state.assign(index, MappingKind::Primary, Granularity::View, view_id);
                return SessionMatch::primary(session_id);
            }
            if self.guest_views_enabled
                && (info.guest_render_ids.contains(Granularity::View, view_id)
                    || info.guest_render_ids.contains(Granularity::Frame, frame_id))
            {
                return SessionMatch::guest(session_id);
            }
        }

        // Must be a popup if it hasn't already been created. This is a guess:
        // a top-level session whose ids were never registered lands here too.
        let index = state.sessions.len();
        let session_id = state.allocate(true).id;
        state.assign(index, MappingKind::Primary, Granularity::View, view_id);
        state.assign(index, MappingKind::Primary, Granularity::Frame, frame_id);
        info!(
            "Created popup session {} for view {} and frame {}",
            session_id, view_id, frame_id
        );
        SessionMatch::primary(session_id)
    }

    pub fn find_by_view(&self, process_id: ProcessId, routing_id: RoutingId) -> Option<SessionMatch> {
        let id = RenderId::new(process_id, routing_id);
        let found = self
            .state
            .lock()
            .find(Granularity::View, id, self.guest_views_enabled);
        if found.is_none() {
            warn!(
                "No session matching view process id {} and routing id {}",
                process_id, routing_id
            );
        }
        found
    }

    pub fn find_by_frame(&self, process_id: ProcessId, routing_id: RoutingId) -> Option<SessionMatch> {
        let id = RenderId::new(process_id, routing_id);
        let found = self
            .state
            .lock()
            .find(Granularity::Frame, id, self.guest_views_enabled);
        if found.is_none() {
            warn!(
                "No session matching frame process id {} and routing id {}",
                process_id, routing_id
            );
        }
        found
    }

    /// Removes a session. Removing a session that is not tracked is a
    /// lifecycle bug and panics.
    pub fn remove(&self, session_id: SessionId) {
        let removed = {
            let mut state = self.state.lock();
            let pos = state.position(session_id);
            pos.map(|pos| state.sessions.remove(pos))
        };
        let Some(removed) = removed else {
            panic!("session {} is not tracked by the registry", session_id);
        };
        debug!("Removed session {}", session_id);
        // The host may hold the last reference back into the embedder; drop it
        // outside the lock.
        drop(removed);
    }

    /// Destroys every remaining session. Live browsers are asked to destroy
    /// themselves (which removes them); sessions without one are removed
    /// directly.
    pub fn destroy_all(&self) {
        let snapshot: Vec<(SessionId, bool, Option<Arc<dyn BrowserHost>>)> = {
            let state = self.state.lock();
            state
                .sessions
                .iter()
                .map(|info| (info.id, info.is_popup, info.browser.clone()))
                .collect()
        };

        if !snapshot.is_empty() {
            info!("Destroying {} remaining sessions", snapshot.len());
        }

        for (session_id, is_popup, browser) in snapshot {
            match browser {
                Some(browser) => browser.destroy(),
                None => {
                    // Canceled popups get an identity record but never a browser.
                    debug_assert!(is_popup, "session {} has no browser", session_id);
                    self.remove(session_id);
                }
            }
        }

        debug_assert!(
            self.state.lock().sessions.is_empty(),
            "sessions remain after destroy_all"
        );
    }

    /// Pairs a session with its live browser object.
    pub fn set_browser(&self, session_id: SessionId, browser: Arc<dyn BrowserHost>) -> bool {
        let mut state = self.state.lock();
        match state.position(session_id) {
            Some(pos) => {
                state.sessions[pos].browser = Some(browser);
                true
            }
            None => false,
        }
    }

    pub fn clear_browser(&self, session_id: SessionId) -> Option<Arc<dyn BrowserHost>> {
        let mut state = self.state.lock();
        let pos = state.position(session_id)?;
        state.sessions[pos].browser.take()
    }

    pub fn browser(&self, session_id: SessionId) -> Option<Arc<dyn BrowserHost>> {
        let state = self.state.lock();
        let pos = state.position(session_id)?;
        state.sessions[pos].browser.clone()
    }

    pub fn is_popup(&self, session_id: SessionId) -> Option<bool> {
        let state = self.state.lock();
        state.position(session_id).map(|pos| state.sessions[pos].is_popup)
    }

    pub fn contains(&self, session_id: SessionId) -> bool {
        self.state.lock().position(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.state.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().sessions.is_empty()
    }

    pub fn session_ids(&self) -> Vec<SessionId> {
        self.state.lock().sessions.iter().map(|info| info.id).collect()
    }

    pub fn snapshot(&self, session_id: SessionId) -> Option<SessionSnapshot> {
        let state = self.state.lock();
        let pos = state.position(session_id)?;
        Some(SessionSnapshot::from(&state.sessions[pos]))
    }

    pub fn add_view_id(&self, session_id: SessionId, process_id: ProcessId, routing_id: RoutingId) -> bool {
        self.register(session_id, MappingKind::Primary, Granularity::View, RenderId::new(process_id, routing_id))
    }

    pub fn add_frame_id(&self, session_id: SessionId, process_id: ProcessId, routing_id: RoutingId) -> bool {
        self.register(session_id, MappingKind::Primary, Granularity::Frame, RenderId::new(process_id, routing_id))
    }

    pub fn add_guest_view_id(&self, session_id: SessionId, process_id: ProcessId, routing_id: RoutingId) -> bool {
        self.register(session_id, MappingKind::Guest, Granularity::View, RenderId::new(process_id, routing_id))
    }

    pub fn add_guest_frame_id(&self, session_id: SessionId, process_id: ProcessId, routing_id: RoutingId) -> bool {
        self.register(session_id, MappingKind::Guest, Granularity::Frame, RenderId::new(process_id, routing_id))
    }

    pub fn remove_view_id(&self, session_id: SessionId, process_id: ProcessId, routing_id: RoutingId) -> bool {
        self.unregister(session_id, MappingKind::Primary, Granularity::View, RenderId::new(process_id, routing_id))
    }

    pub fn remove_frame_id(&self, session_id: SessionId, process_id: ProcessId, routing_id: RoutingId) -> bool {
        self.unregister(session_id, MappingKind::Primary, Granularity::Frame, RenderId::new(process_id, routing_id))
    }

    pub fn remove_guest_view_id(&self, session_id: SessionId, process_id: ProcessId, routing_id: RoutingId) -> bool {
        self.unregister(session_id, MappingKind::Guest, Granularity::View, RenderId::new(process_id, routing_id))
    }

    pub fn remove_guest_frame_id(&self, session_id: SessionId, process_id: ProcessId, routing_id: RoutingId) -> bool {
        self.unregister(session_id, MappingKind::Guest, Granularity::Frame, RenderId::new(process_id, routing_id))
    }

    fn register(&self, session_id: SessionId, kind: MappingKind, granularity: Granularity, id: RenderId) -> bool {
        let mut state = self.state.lock();
        match state.position(session_id) {
            Some(pos) => {
                state.assign(pos, kind, granularity, id);
                true
            }
            None => {
                warn!("Cannot register id {} on unknown session {}", id, session_id);
                false
            }
        }
    }

    fn unregister(&self, session_id: SessionId, kind: MappingKind, granularity: Granularity, id: RenderId) -> bool {
        let mut state = self.state.lock();
        match state.position(session_id) {
            Some(pos) => state.sessions[pos].mapping_mut(kind).remove(granularity, id),
            None => false,
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SessionRegistry")
            .field("last_session_id", &state.last_session_id)
            .field("sessions", &state.sessions)
            .field("guest_views_enabled", &self.guest_views_enabled)
            .finish()
    }
}
