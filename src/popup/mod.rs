//! Popup window negotiation.
//!
//! The engine reports a `window.open` in two steps on the IO executor: first
//! the opener's identity ([`PopupNegotiator::set_last_create_window_params`]),
//! then the request itself ([`PopupNegotiator::can_create_window`]). The
//! negotiator resolves the opener, asks its life-span handler, and admits at
//! most one pending popup per opener session.

pub mod features;

pub use features::translate_popup_features;

use crate::handler::{
    BrowserSettings, Client, OpenUrlParams, PageTransition, PopupDecision, PopupFeatures,
    WindowFeatures, WindowInfo, WindowOpenDisposition,
};
use crate::registry::{ProcessId, RoutingId, SessionId, SessionRegistry};
use crate::threading::{BrowserThread, BrowserThreads};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

/// Identity of the frame that called `window.open`, captured before the
/// request is evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateWindowParams {
    pub opener_process_id: ProcessId,
    pub opener_view_id: RoutingId,
    pub opener_frame_id: i64,
    pub target_url: Url,
    pub target_frame_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateWindowRequest {
    pub target_url: Url,
    pub referrer: Option<Url>,
    pub disposition: WindowOpenDisposition,
    pub features: WindowFeatures,
    pub user_gesture: bool,
    pub opener_suppressed: bool,
}

impl CreateWindowRequest {
    pub fn new(target_url: Url) -> Self {
        Self {
            target_url,
            referrer: None,
            disposition: WindowOpenDisposition::NewPopup,
            features: WindowFeatures::default(),
            user_gesture: false,
            opener_suppressed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CreateWindowDecision {
    pub allowed: bool,
    pub no_script_access: bool,
}

impl CreateWindowDecision {
    pub fn deny() -> Self {
        Self::default()
    }
}

/// What a life-span handler is told about a popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupRequest {
    pub target_url: Url,
    pub target_frame_name: String,
    pub disposition: WindowOpenDisposition,
    pub user_gesture: bool,
    pub features: PopupFeatures,
}

/// Placement, client and settings for an admitted popup, held until the
/// popup's host is created.
#[derive(Clone)]
pub struct PendingPopupInfo {
    pub window_info: WindowInfo,
    pub client: Option<Arc<dyn Client>>,
    pub settings: BrowserSettings,
}

impl fmt::Debug for PendingPopupInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingPopupInfo")
            .field("window_info", &self.window_info)
            .field("has_client", &self.client.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

pub struct PopupNegotiator {
    registry: Arc<SessionRegistry>,
    threads: BrowserThreads,
    last_params: Mutex<Option<CreateWindowParams>>,
    pending: DashMap<SessionId, PendingPopupInfo>,
}

impl PopupNegotiator {
    pub fn new(registry: Arc<SessionRegistry>, threads: BrowserThreads) -> Self {
        Self {
            registry,
            threads,
            last_params: Mutex::new(None),
            pending: DashMap::new(),
        }
    }

    pub fn set_last_create_window_params(&self, params: CreateWindowParams) {
        self.threads.require(BrowserThread::Io);
        let mut last = self.last_params.lock();
        if let Some(stale) = last.as_ref() {
            debug!(
                "Replacing unconsumed popup params for opener {}:{}",
                stale.opener_process_id, stale.opener_view_id
            );
        }
        *last = Some(params);
    }

    pub fn has_captured_params(&self) -> bool {
        self.last_params.lock().is_some()
    }

    /// Decides whether the captured opener may create a window. The captured
    /// params are consumed whatever the outcome.
    pub fn can_create_window(&self, request: &CreateWindowRequest) -> CreateWindowDecision {
        self.threads.require(BrowserThread::Io);

        let Some(params) = self.last_params.lock().take() else {
            error!("Popup request for {} without opener params", request.target_url);
            return CreateWindowDecision::deny();
        };

        let Some(opener) = self
            .registry
            .find_by_view(params.opener_process_id, params.opener_view_id)
        else {
            return CreateWindowDecision::deny();
        };

        let Some(browser) = self.registry.browser(opener.session_id) else {
            warn!(
                "Popup denied: opener session {} has no browser",
                opener.session_id
            );
            return CreateWindowDecision::deny();
        };

        if opener.is_guest {
            // Guest views navigate their owner instead of opening a window.
            let open_params = OpenUrlParams {
                url: request.target_url.clone(),
                referrer: request.referrer.clone(),
                disposition: request.disposition,
                transition: PageTransition::Link,
                is_renderer_initiated: true,
                user_gesture: request.user_gesture,
            };
            debug!(
                "Redirecting guest popup for {} to session {}",
                request.target_url, opener.session_id
            );
            self.threads.post_or_run(
                BrowserThread::Ui,
                Box::new(move || browser.open_url(open_params)),
            );
            return CreateWindowDecision::deny();
        }

        let client = browser.client();
        let features = translate_popup_features(&request.features);

        let mut pending = PendingPopupInfo {
            window_info: WindowInfo::popup(String::new()),
            client: client.clone(),
            settings: browser.settings(),
        };
        if features.x_set {
            pending.window_info.x = Some(features.x);
        }
        if features.y_set {
            pending.window_info.y = Some(features.y);
        }
        if features.width_set {
            pending.window_info.width = Some(features.width);
        }
        if features.height_set {
            pending.window_info.height = Some(features.height);
        }

        let mut no_script_access = false;
        let handler = client.as_ref().and_then(|client| client.life_span_handler());
        let allowed = match handler {
            Some(handler) => {
                let frame = browser.frame(params.opener_frame_id);
                let popup_request = PopupRequest {
                    target_url: params.target_url,
                    target_frame_name: params.target_frame_name,
                    disposition: request.disposition,
                    user_gesture: request.user_gesture,
                    features,
                };
                let decision = handler.on_before_popup(
                    &browser,
                    frame.as_ref(),
                    &popup_request,
                    &mut pending,
                    &mut no_script_access,
                );
                decision == PopupDecision::Allow
            }
            None => true,
        };

        if !allowed {
            info!(
                "Popup for {} canceled by session {}",
                request.target_url, opener.session_id
            );
            return CreateWindowDecision {
                allowed: false,
                no_script_access,
            };
        }

        let admitted = match self.pending.entry(opener.session_id) {
            Entry::Occupied(_) => {
                warn!("Creation of popup window denied because one is already pending.");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(pending);
                true
            }
        };

        CreateWindowDecision {
            allowed: admitted,
            no_script_access,
        }
    }

    /// Hands over the admitted popup record for `opener`, freeing its slot.
    pub fn take_pending_popup(&self, opener: SessionId) -> Option<PendingPopupInfo> {
        self.pending.remove(&opener).map(|(_, info)| info)
    }

    pub fn has_pending_popup(&self, opener: SessionId) -> bool {
        self.pending.contains_key(&opener)
    }

    /// Drops any pending popup for a session that is going away.
    pub fn forget(&self, session: SessionId) {
        if self.pending.remove(&session).is_some() {
            debug!("Discarded pending popup of removed session {}", session);
        }
    }
}

impl fmt::Debug for PopupNegotiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopupNegotiator")
            .field("captured", &self.has_captured_params())
            .field("pending", &self.pending.len())
            .finish()
    }
}
