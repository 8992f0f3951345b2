use crate::handler::BrowserHost;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

pub type ProcessId = i32;
pub type RoutingId = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(u32);

impl SessionId {
    pub(crate) fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A (process id, routing id) pair addressing a view or frame in a content
/// process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderId {
    pub process_id: ProcessId,
    pub routing_id: RoutingId,
}

impl RenderId {
    pub fn new(process_id: ProcessId, routing_id: RoutingId) -> Self {
        Self {
            process_id,
            routing_id,
        }
    }
}

impl fmt::Display for RenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.process_id, self.routing_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    View,
    Frame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingKind {
    Primary,
    Guest,
}

/// The view and frame ids currently known to refer to one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMapping {
    view_ids: SmallVec<[RenderId; 4]>,
    frame_ids: SmallVec<[RenderId; 4]>,
}

impl IdentityMapping {
    pub fn new() -> Self {
        Self::default()
    }

    fn ids(&self, granularity: Granularity) -> &SmallVec<[RenderId; 4]> {
        match granularity {
            Granularity::View => &self.view_ids,
            Granularity::Frame => &self.frame_ids,
        }
    }

    fn ids_mut(&mut self, granularity: Granularity) -> &mut SmallVec<[RenderId; 4]> {
        match granularity {
            Granularity::View => &mut self.view_ids,
            Granularity::Frame => &mut self.frame_ids,
        }
    }

    pub fn contains(&self, granularity: Granularity, id: RenderId) -> bool {
        self.ids(granularity).contains(&id)
    }

    /// Returns `false` if the id was already present.
    pub fn insert(&mut self, granularity: Granularity, id: RenderId) -> bool {
        if self.contains(granularity, id) {
            return false;
        }
        self.ids_mut(granularity).push(id);
        true
    }

    pub fn remove(&mut self, granularity: Granularity, id: RenderId) -> bool {
        let ids = self.ids_mut(granularity);
        match ids.iter().position(|existing| *existing == id) {
            Some(pos) => {
                ids.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn view_ids(&self) -> &[RenderId] {
        &self.view_ids
    }

    pub fn frame_ids(&self) -> &[RenderId] {
        &self.frame_ids
    }

    pub fn is_empty(&self) -> bool {
        self.view_ids.is_empty() && self.frame_ids.is_empty()
    }
}

/// Identity record for one browsing session. Owned by the registry.
pub(crate) struct SessionInfo {
    pub(crate) id: SessionId,
    pub(crate) is_popup: bool,
    pub(crate) browser: Option<Arc<dyn BrowserHost>>,
    pub(crate) render_ids: IdentityMapping,
    pub(crate) guest_render_ids: IdentityMapping,
}

impl SessionInfo {
    pub(crate) fn new(id: SessionId, is_popup: bool) -> Self {
        Self {
            id,
            is_popup,
            browser: None,
            render_ids: IdentityMapping::new(),
            guest_render_ids: IdentityMapping::new(),
        }
    }

    pub(crate) fn mapping_mut(&mut self, kind: MappingKind) -> &mut IdentityMapping {
        match kind {
            MappingKind::Primary => &mut self.render_ids,
            MappingKind::Guest => &mut self.guest_render_ids,
        }
    }
}

impl fmt::Debug for SessionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionInfo")
            .field("id", &self.id)
            .field("is_popup", &self.is_popup)
            .field("has_browser", &self.browser.is_some())
            .field("render_ids", &self.render_ids)
            .field("guest_render_ids", &self.guest_render_ids)
            .finish()
    }
}

/// Point-in-time copy of a session's identity record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub is_popup: bool,
    pub has_browser: bool,
    pub render_ids: IdentityMapping,
    pub guest_render_ids: IdentityMapping,
}

impl From<&SessionInfo> for SessionSnapshot {
    fn from(info: &SessionInfo) -> Self {
        Self {
            id: info.id,
            is_popup: info.is_popup,
            has_browser: info.browser.is_some(),
            render_ids: info.render_ids.clone(),
            guest_render_ids: info.guest_render_ids.clone(),
        }
    }
}
