//! Interfaces implemented by the embedding application, and the session
//! runtime object the engine drives.
//!
//! Every handler is optional. A [`Client`] that returns `None` for a handler
//! gets the documented default for that decision.

pub mod types;

pub use types::*;

use crate::navigation::NavigationRequest;
use crate::popup::{PendingPopupInfo, PopupRequest};
use crate::registry::SessionId;
use crate::threading::RequestCallback;
use std::sync::Arc;

/// The live object behind a session. The embedder never constructs one; it
/// only pairs it with the identity record in the registry.
pub trait BrowserHost: Send + Sync {
    fn session_id(&self) -> SessionId;

    fn is_popup(&self) -> bool;

    fn client(&self) -> Option<Arc<dyn Client>>;

    fn settings(&self) -> BrowserSettings;

    fn main_frame(&self) -> Option<Frame>;

    fn frame(&self, frame_id: i64) -> Option<Frame>;

    /// Navigates this browser. Only called on the UI thread.
    fn open_url(&self, params: OpenUrlParams);

    /// Tears the browser down. Implementations must remove their session
    /// from the registry before returning.
    fn destroy(&self);
}

pub trait Client: Send + Sync {
    fn life_span_handler(&self) -> Option<Arc<dyn LifeSpanHandler>> {
        None
    }

    fn request_handler(&self) -> Option<Arc<dyn RequestHandler>> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PopupDecision {
    Allow,
    Cancel,
}

pub trait LifeSpanHandler: Send + Sync {
    /// Called on the IO thread before a popup window is created.
    ///
    /// `popup` starts out with the opener's client and settings and may be
    /// modified to change the new window's placement, client or settings.
    /// Set `no_javascript_access` to stop the popup from scripting its opener.
    fn on_before_popup(
        &self,
        browser: &Arc<dyn BrowserHost>,
        frame: Option<&Frame>,
        request: &PopupRequest,
        popup: &mut PendingPopupInfo,
        no_javascript_access: &mut bool,
    ) -> PopupDecision;
}

pub trait RequestHandler: Send + Sync {
    /// Called on the IO thread when a page requests persistent storage.
    /// Return `true` and resolve `callback` (now or later) to handle the
    /// request; `false` disallows it immediately.
    fn on_quota_request(
        &self,
        _browser: &Arc<dyn BrowserHost>,
        _origin_url: &str,
        _new_size: i64,
        _callback: RequestCallback,
    ) -> bool {
        false
    }

    /// Called on the UI thread for a main-frame certificate error. `callback`
    /// is only present when the error may be overridden. Return `true` to
    /// wait for the callback, `false` to cancel the request.
    fn on_certificate_error(
        &self,
        _browser: &Arc<dyn BrowserHost>,
        _cert_error: CertError,
        _request_url: &str,
        _ssl_info: &SslInfo,
        _callback: Option<RequestCallback>,
    ) -> bool {
        false
    }

    /// Called on the UI thread before a navigation. Return `true` to cancel it.
    fn on_before_browse(
        &self,
        _browser: &Arc<dyn BrowserHost>,
        _frame: &Frame,
        _request: &NavigationRequest,
        _is_redirect: bool,
    ) -> bool {
        false
    }
}
