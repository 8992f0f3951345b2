//! Navigation interception. Every navigation is shown to the session's
//! request handler on the UI executor before it starts, and the handler may
//! cancel it.

use crate::handler::{Frame, PageTransition, INVALID_FRAME_ID, UNSPECIFIED_FRAME_ID};
use crate::registry::{SessionId, SessionRegistry};
use crate::threading::{BrowserThread, BrowserThreads};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationParams {
    pub url: Url,
    pub referrer: Option<Url>,
    pub has_user_gesture: bool,
    pub is_post: bool,
    pub transition: PageTransition,
    pub is_redirect: bool,
    pub is_external_protocol: bool,
}

impl NavigationParams {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            referrer: None,
            has_user_gesture: false,
            is_post: false,
            transition: PageTransition::Link,
            is_redirect: false,
            is_external_protocol: false,
        }
    }
}

/// Read-only view of a pending navigation handed to request handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    url: Url,
    method: &'static str,
    referrer: Option<Url>,
    transition: PageTransition,
    is_main_frame: bool,
    has_user_gesture: bool,
}

impl NavigationRequest {
    pub fn from_params(params: &NavigationParams, is_main_frame: bool) -> Self {
        Self {
            url: params.url.clone(),
            method: if params.is_post { "POST" } else { "GET" },
            referrer: params.referrer.clone(),
            transition: params.transition,
            is_main_frame,
            has_user_gesture: params.has_user_gesture,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> &str {
        self.method
    }

    pub fn referrer(&self) -> Option<&Url> {
        self.referrer.as_ref()
    }

    pub fn transition(&self) -> PageTransition {
        self.transition
    }

    pub fn is_main_frame(&self) -> bool {
        self.is_main_frame
    }

    pub fn has_user_gesture(&self) -> bool {
        self.has_user_gesture
    }
}

/// What the engine knows about a navigation when it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavigationHandle {
    pub is_main_frame: bool,
    /// Routing id of the frame that owns the navigating subframe.
    pub parent_routing_id: Option<i64>,
    /// Routing id of the navigating frame, once the navigation has committed.
    pub committed_routing_id: Option<i64>,
}

impl NavigationHandle {
    /// Frame ids handed to the interceptor: `(frame_id, parent_frame_id)`.
    pub fn frame_ids(&self) -> (i64, i64) {
        if self.is_main_frame {
            return (INVALID_FRAME_ID, UNSPECIFIED_FRAME_ID);
        }

        let parent_frame_id = match self.parent_routing_id {
            Some(id) if id >= 0 => id,
            _ => UNSPECIFIED_FRAME_ID,
        };
        let frame_id = match self.committed_routing_id {
            Some(id) if id >= 0 => id,
            _ => INVALID_FRAME_ID,
        };
        (frame_id, parent_frame_id)
    }
}

#[derive(Debug, Clone)]
pub struct NavigationInterceptor {
    registry: Arc<SessionRegistry>,
    threads: BrowserThreads,
}

impl NavigationInterceptor {
    pub fn new(registry: Arc<SessionRegistry>, threads: BrowserThreads) -> Self {
        Self { registry, threads }
    }

    pub fn intercept(&self, source: SessionId, handle: &NavigationHandle, params: &NavigationParams) -> bool {
        let (frame_id, parent_frame_id) = handle.frame_ids();
        self.should_ignore_navigation(source, handle.is_main_frame, frame_id, parent_frame_id, params)
    }

    /// Returns `true` when the navigation should be cancelled.
    pub fn should_ignore_navigation(
        &self,
        source: SessionId,
        is_main_frame: bool,
        frame_id: i64,
        parent_frame_id: i64,
        params: &NavigationParams,
    ) -> bool {
        self.threads.require(BrowserThread::Ui);

        let Some(browser) = self.registry.browser(source) else {
            return false;
        };
        let Some(handler) = browser.client().and_then(|client| client.request_handler()) else {
            return false;
        };

        let existing = if is_main_frame {
            browser.main_frame()
        } else if frame_id >= 0 {
            let frame = browser.frame(frame_id);
            if frame.is_none() {
                warn!("Navigating frame {} not found in session {}", frame_id, source);
            }
            frame
        } else {
            None
        };
        // Subframes that don't exist yet get a placeholder.
        let frame = existing.unwrap_or_else(|| Frame::temporary(parent_frame_id));

        let request = NavigationRequest::from_params(params, is_main_frame);
        let ignore = handler.on_before_browse(&browser, &frame, &request, params.is_redirect);
        if ignore {
            debug!("Navigation to {} cancelled by session {}", params.url, source);
        }
        ignore
    }
}
