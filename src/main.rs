use browser_embedder::handler::{
    BrowserSettings, CertError, Client, Frame, LifeSpanHandler, OpenUrlParams, PopupDecision,
    RequestHandler, ResourceType, SslInfo, WindowFeatures, MAIN_FRAME_ID,
};
use browser_embedder::navigation::{NavigationHandle, NavigationParams, NavigationRequest};
use browser_embedder::permission::{CertificateErrorRequest, StorageQuotaParams, StorageType};
use browser_embedder::popup::{CreateWindowParams, CreateWindowRequest, PendingPopupInfo, PopupRequest};
use browser_embedder::{
    BrowserHost, EmbedderClient, EmbedderConfig, RequestCallback, SessionId, SessionRegistry,
};
use std::env;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use url::Url;

#[derive(Debug, Clone)]
struct AppConfig {
    config_path: Option<PathBuf>,
    log_level: Level,
    wait_for_signal: bool,
}

impl AppConfig {
    fn from_args() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut config = Self::default();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--config" => {
                    if i + 1 < args.len() {
                        config.config_path = Some(PathBuf::from(&args[i + 1]));
                        i += 1;
                    }
                }
                "--debug" => config.log_level = Level::DEBUG,
                "--trace" => config.log_level = Level::TRACE,
                "--wait" => config.wait_for_signal = true,
                _ => {}
            }
            i += 1;
        }

        config
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            log_level: Level::INFO,
            wait_for_signal: false,
        }
    }
}

fn setup_logging(level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Stand-in for a real browser window.
struct DemoBrowser {
    session_id: SessionId,
    is_popup: bool,
    client: Arc<dyn Client>,
    settings: BrowserSettings,
    url: Url,
    registry: Weak<SessionRegistry>,
}

impl BrowserHost for DemoBrowser {
    fn session_id(&self) -> SessionId {
        self.session_id
    }

    fn is_popup(&self) -> bool {
        self.is_popup
    }

    fn client(&self) -> Option<Arc<dyn Client>> {
        Some(Arc::clone(&self.client))
    }

    fn settings(&self) -> BrowserSettings {
        self.settings.clone()
    }

    fn main_frame(&self) -> Option<Frame> {
        Some(Frame {
            id: MAIN_FRAME_ID,
            is_main: true,
            name: String::new(),
            url: Some(self.url.clone()),
            parent_id: None,
        })
    }

    fn frame(&self, frame_id: i64) -> Option<Frame> {
        self.main_frame().filter(|_| frame_id == MAIN_FRAME_ID || frame_id == 0)
    }

    fn open_url(&self, params: OpenUrlParams) {
        info!("Session {} navigating to {}", self.session_id, params.url);
    }

    fn destroy(&self) {
        info!("Destroying browser for session {}", self.session_id);
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.session_id);
        }
    }
}

struct DemoClient;

impl Client for DemoClient {
    fn life_span_handler(&self) -> Option<Arc<dyn LifeSpanHandler>> {
        Some(Arc::new(DemoHandler))
    }

    fn request_handler(&self) -> Option<Arc<dyn RequestHandler>> {
        Some(Arc::new(DemoHandler))
    }
}

struct DemoHandler;

impl LifeSpanHandler for DemoHandler {
    fn on_before_popup(
        &self,
        _browser: &Arc<dyn BrowserHost>,
        _frame: Option<&Frame>,
        request: &PopupRequest,
        popup: &mut PendingPopupInfo,
        _no_javascript_access: &mut bool,
    ) -> PopupDecision {
        info!("Allowing popup '{}' for {}", request.target_frame_name, request.target_url);
        popup.window_info.window_name = request.target_frame_name.clone();
        PopupDecision::Allow
    }
}

impl RequestHandler for DemoHandler {
    fn on_quota_request(
        &self,
        _browser: &Arc<dyn BrowserHost>,
        origin_url: &str,
        new_size: i64,
        callback: RequestCallback,
    ) -> bool {
        let allow = new_size <= 64 * 1024 * 1024;
        info!("Quota request of {} bytes from {}: {}", new_size, origin_url, allow);
        callback.continue_with(allow);
        true
    }

    fn on_certificate_error(
        &self,
        _browser: &Arc<dyn BrowserHost>,
        cert_error: CertError,
        request_url: &str,
        _ssl_info: &SslInfo,
        callback: Option<RequestCallback>,
    ) -> bool {
        warn!("Certificate error {} for {}", cert_error.code(), request_url);
        match callback {
            Some(callback) => {
                callback.cancel();
                true
            }
            None => false,
        }
    }

    fn on_before_browse(
        &self,
        _browser: &Arc<dyn BrowserHost>,
        frame: &Frame,
        request: &NavigationRequest,
        _is_redirect: bool,
    ) -> bool {
        info!("Frame {} navigating to {}", frame.id, request.url());
        request.url().scheme() == "javascript"
    }
}

fn attach_demo_browser(embedder: &EmbedderClient, session_id: SessionId, is_popup: bool, url: Url) {
    let browser = DemoBrowser {
        session_id,
        is_popup,
        client: Arc::new(DemoClient),
        settings: embedder.config().default_browser_settings.clone(),
        url,
        registry: Arc::downgrade(embedder.registry()),
    };
    embedder.attach_browser(session_id, Arc::new(browser));
}

async fn run_demo(embedder: &EmbedderClient) -> browser_embedder::Result<()> {
    let home = Url::parse("https://example.com/")?;
    let opener = embedder.create_session(false);
    embedder.registry().add_view_id(opener, 1, 1);
    embedder.registry().add_frame_id(opener, 1, 1);
    attach_demo_browser(embedder, opener, false, home.clone());

    let popup_url = Url::parse("https://example.com/popup")?;
    let request = CreateWindowRequest {
        features: WindowFeatures {
            width: 640.0,
            width_set: true,
            ..Default::default()
        },
        user_gesture: true,
        ..CreateWindowRequest::new(popup_url.clone())
    };

    let decision = embedder
        .request_create_window(
            CreateWindowParams {
                opener_process_id: 1,
                opener_view_id: 1,
                opener_frame_id: MAIN_FRAME_ID,
                target_url: popup_url.clone(),
                target_frame_name: "demo".to_string(),
            },
            request,
        )
        .await?;
    info!("Popup decision: {:?}", decision);

    if decision.allowed {
        if let Some(pending) = embedder.take_pending_popup(opener) {
            let popup = embedder.resolve_or_create(1, 2, 1, 2);
            info!("Popup session {} placed at {:?}", popup.session_id, pending.window_info);
            attach_demo_browser(embedder, popup.session_id, true, popup_url);
        }
    }

    let quota = embedder
        .quota_decision(
            StorageQuotaParams {
                render_view_id: 1,
                origin_url: home.clone(),
                storage_type: StorageType::Persistent,
                requested_size: 10 * 1024 * 1024,
            },
            1,
        )
        .await?;
    info!("Quota decision: {:?}", quota);

    let proceed = embedder
        .certificate_decision(CertificateErrorRequest {
            render_process_id: 1,
            render_frame_id: 1,
            cert_error: CertError::DateInvalid,
            ssl_info: SslInfo::default(),
            request_url: Url::parse("https://expired.example.com/")?,
            resource_type: ResourceType::MainFrame,
            overridable: true,
            strict_enforcement: false,
        })
        .await?;
    info!("Certificate error may proceed: {}", proceed);

    let ignored = embedder
        .navigation_decision(
            opener,
            NavigationHandle {
                is_main_frame: false,
                parent_routing_id: Some(1),
                committed_routing_id: None,
            },
            NavigationParams::new(Url::parse("https://example.com/frame")?),
        )
        .await?;
    info!("Subframe navigation ignored: {}", ignored);

    Ok(())
}

#[tokio::main]
async fn main() -> browser_embedder::Result<()> {
    let app_config = AppConfig::from_args();

    setup_logging(app_config.log_level);

    info!("Starting browser embedder");

    let config = match &app_config.config_path {
        Some(path) => EmbedderConfig::from_json_file(path)?,
        None => EmbedderConfig::default(),
    };

    let embedder = EmbedderClient::new(config)?;

    if let Err(e) = run_demo(&embedder).await {
        error!("Demo failed: {}", e);
    }

    if app_config.wait_for_signal {
        info!("Waiting for ctrl-c");
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
        }
        info!("Received SIGINT, shutting down gracefully");
    }

    embedder.shutdown()?;
    Ok(())
}
