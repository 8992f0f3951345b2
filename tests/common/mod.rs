#![allow(dead_code)]

use browser_embedder::handler::{
    BrowserSettings, CertError, Client, Frame, LifeSpanHandler, OpenUrlParams, PopupDecision,
    RequestHandler, SslInfo, MAIN_FRAME_ID,
};
use browser_embedder::navigation::NavigationRequest;
use browser_embedder::popup::{PendingPopupInfo, PopupRequest};
use browser_embedder::{
    BrowserHost, BrowserThread, BrowserThreads, EmbedderClient, EmbedderConfig, RequestCallback,
    SessionId, SessionRegistry,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

pub struct MockBrowser {
    pub session_id: SessionId,
    pub is_popup: bool,
    pub client: Option<Arc<dyn Client>>,
    pub settings: BrowserSettings,
    pub frames: Vec<Frame>,
    pub registry: Weak<SessionRegistry>,
    pub threads: Option<BrowserThreads>,
    pub opened: Mutex<Vec<(OpenUrlParams, bool)>>,
    pub destroyed: AtomicUsize,
}

impl MockBrowser {
    pub fn new(session_id: SessionId, registry: &Arc<SessionRegistry>, client: Option<Arc<dyn Client>>) -> Self {
        Self {
            session_id,
            is_popup: false,
            client,
            settings: BrowserSettings::default(),
            frames: vec![Frame {
                id: MAIN_FRAME_ID,
                is_main: true,
                name: String::new(),
                url: None,
                parent_id: None,
            }],
            registry: Arc::downgrade(registry),
            threads: None,
            opened: Mutex::new(Vec::new()),
            destroyed: AtomicUsize::new(0),
        }
    }

    pub fn with_threads(mut self, threads: &BrowserThreads) -> Self {
        self.threads = Some(threads.clone());
        self
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn opened(&self) -> Vec<(OpenUrlParams, bool)> {
        self.opened.lock().clone()
    }

    pub fn destroy_count(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl BrowserHost for MockBrowser {
    fn session_id(&self) -> SessionId {
        self.session_id
    }

    fn is_popup(&self) -> bool {
        self.is_popup
    }

    fn client(&self) -> Option<Arc<dyn Client>> {
        self.client.clone()
    }

    fn settings(&self) -> BrowserSettings {
        self.settings.clone()
    }

    fn main_frame(&self) -> Option<Frame> {
        self.frames.iter().find(|frame| frame.is_main).cloned()
    }

    fn frame(&self, frame_id: i64) -> Option<Frame> {
        self.frames.iter().find(|frame| frame.id == frame_id).cloned()
    }

    fn open_url(&self, params: OpenUrlParams) {
        let on_ui = self
            .threads
            .as_ref()
            .map(|threads| threads.currently_on(BrowserThread::Ui))
            .unwrap_or(false);
        self.opened.lock().push((params, on_ui));
    }

    fn destroy(&self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.session_id);
        }
    }
}

#[derive(Default)]
pub struct MockClient {
    pub life_span: Option<Arc<dyn LifeSpanHandler>>,
    pub request: Option<Arc<dyn RequestHandler>>,
}

impl Client for MockClient {
    fn life_span_handler(&self) -> Option<Arc<dyn LifeSpanHandler>> {
        self.life_span.clone()
    }

    fn request_handler(&self) -> Option<Arc<dyn RequestHandler>> {
        self.request.clone()
    }
}

/// Life-span handler with a fixed answer that records what it was shown.
pub struct PopupPolicy {
    pub decision: PopupDecision,
    pub no_javascript_access: bool,
    pub window_name: Option<String>,
    pub calls: Mutex<Vec<(PopupRequest, Option<Frame>)>>,
}

impl PopupPolicy {
    pub fn new(decision: PopupDecision) -> Self {
        Self {
            decision,
            no_javascript_access: false,
            window_name: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl LifeSpanHandler for PopupPolicy {
    fn on_before_popup(
        &self,
        _browser: &Arc<dyn BrowserHost>,
        frame: Option<&Frame>,
        request: &PopupRequest,
        popup: &mut PendingPopupInfo,
        no_javascript_access: &mut bool,
    ) -> PopupDecision {
        self.calls.lock().push((request.clone(), frame.cloned()));
        if let Some(name) = &self.window_name {
            popup.window_info.window_name = name.clone();
        }
        *no_javascript_access = self.no_javascript_access;
        self.decision
    }
}

/// How a [`RecordingRequestHandler`] treats the callbacks it receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackMode {
    /// Return `false` without touching the callback.
    Decline,
    /// Resolve the callback before returning `true`.
    AnswerNow(bool),
    /// Keep the callback and return `true`.
    Retain,
    /// Drop the callback and return `true`.
    DropIt,
}

pub struct RecordingRequestHandler {
    pub mode: CallbackMode,
    pub ignore_navigation: bool,
    pub retained: Mutex<Vec<RequestCallback>>,
    pub quota_requests: Mutex<Vec<(String, i64)>>,
    pub certificate_errors: Mutex<Vec<(CertError, String, bool)>>,
    pub navigations: Mutex<Vec<(Frame, NavigationRequest, bool)>>,
}

impl RecordingRequestHandler {
    pub fn new(mode: CallbackMode) -> Self {
        Self {
            mode,
            ignore_navigation: false,
            retained: Mutex::new(Vec::new()),
            quota_requests: Mutex::new(Vec::new()),
            certificate_errors: Mutex::new(Vec::new()),
            navigations: Mutex::new(Vec::new()),
        }
    }

    pub fn take_retained(&self) -> Option<RequestCallback> {
        self.retained.lock().pop()
    }

    fn handle(&self, callback: Option<RequestCallback>) -> bool {
        match (self.mode, callback) {
            (CallbackMode::Decline, _) => false,
            (CallbackMode::AnswerNow(allow), Some(callback)) => {
                callback.continue_with(allow);
                true
            }
            (CallbackMode::Retain, Some(callback)) => {
                self.retained.lock().push(callback);
                true
            }
            (_, callback) => {
                drop(callback);
                true
            }
        }
    }
}

impl RequestHandler for RecordingRequestHandler {
    fn on_quota_request(
        &self,
        _browser: &Arc<dyn BrowserHost>,
        origin_url: &str,
        new_size: i64,
        callback: RequestCallback,
    ) -> bool {
        self.quota_requests.lock().push((origin_url.to_string(), new_size));
        self.handle(Some(callback))
    }

    fn on_certificate_error(
        &self,
        _browser: &Arc<dyn BrowserHost>,
        cert_error: CertError,
        request_url: &str,
        _ssl_info: &SslInfo,
        callback: Option<RequestCallback>,
    ) -> bool {
        self.certificate_errors
            .lock()
            .push((cert_error, request_url.to_string(), callback.is_some()));
        self.handle(callback)
    }

    fn on_before_browse(
        &self,
        _browser: &Arc<dyn BrowserHost>,
        frame: &Frame,
        request: &NavigationRequest,
        is_redirect: bool,
    ) -> bool {
        self.navigations
            .lock()
            .push((frame.clone(), request.clone(), is_redirect));
        self.ignore_navigation
    }
}

pub fn embedder() -> EmbedderClient {
    EmbedderClient::new(EmbedderConfig::default()).unwrap()
}

/// Creates a session owning view and frame `(process_id, routing_id)` and
/// attaches a browser built by `build`.
pub fn attach_session<F>(
    embedder: &EmbedderClient,
    process_id: i32,
    routing_id: i32,
    build: F,
) -> (SessionId, Arc<MockBrowser>)
where
    F: FnOnce(MockBrowser) -> MockBrowser,
{
    let registry = embedder.registry();
    let session = registry.create(false);
    registry.add_view_id(session, process_id, routing_id);
    registry.add_frame_id(session, process_id, routing_id);

    let browser = Arc::new(build(MockBrowser::new(session, registry, None)));
    embedder.attach_browser(session, browser.clone());
    (session, browser)
}
