use crate::handler::BrowserHost;
use crate::navigation::{NavigationHandle, NavigationInterceptor, NavigationParams};
use crate::permission::{
    CertificateErrorContext, CertificateErrorRequest, CertificateRequestResult,
    QuotaPermissionContext, QuotaPermissionResponse, StorageQuotaParams,
};
use crate::popup::{CreateWindowDecision, CreateWindowParams, CreateWindowRequest, PendingPopupInfo, PopupNegotiator};
use crate::registry::{ProcessId, RoutingId, SessionId, SessionMatch, SessionRegistry};
use crate::threading::{oneshot_completion, BrowserThread, BrowserThreads};
use crate::{EmbedderConfig, EmbedderError, Result};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// Entry point for the engine side: owns the executors, the session
/// registry and the decision flows that consult embedder handlers.
pub struct EmbedderClient {
    config: EmbedderConfig,
    threads: BrowserThreads,
    registry: Arc<SessionRegistry>,
    popups: Arc<PopupNegotiator>,
    quota: QuotaPermissionContext,
    certificates: CertificateErrorContext,
    navigation: NavigationInterceptor,
}

impl EmbedderClient {
    pub fn new(config: EmbedderConfig) -> Result<Self> {
        let threads = BrowserThreads::with_options(config.thread_options())?;
        let registry = Arc::new(SessionRegistry::with_guest_views(config.enable_guest_views));

        info!(
            "Embedder started (guest views: {}, strict thread checks: {})",
            config.enable_guest_views, config.strict_thread_checks
        );

        Ok(Self {
            popups: Arc::new(PopupNegotiator::new(Arc::clone(&registry), threads.clone())),
            quota: QuotaPermissionContext::new(Arc::clone(&registry), threads.clone()),
            certificates: CertificateErrorContext::new(Arc::clone(&registry), threads.clone()),
            navigation: NavigationInterceptor::new(Arc::clone(&registry), threads.clone()),
            config,
            threads,
            registry,
        })
    }

    pub fn config(&self) -> &EmbedderConfig {
        &self.config
    }

    pub fn threads(&self) -> &BrowserThreads {
        &self.threads
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn popups(&self) -> &Arc<PopupNegotiator> {
        &self.popups
    }

    pub fn quota(&self) -> &QuotaPermissionContext {
        &self.quota
    }

    pub fn certificates(&self) -> &CertificateErrorContext {
        &self.certificates
    }

    pub fn navigation(&self) -> &NavigationInterceptor {
        &self.navigation
    }

    // Sessions

    pub fn create_session(&self, is_popup: bool) -> SessionId {
        self.registry.create(is_popup)
    }

    pub fn resolve_or_create(
        &self,
        view_process_id: ProcessId,
        view_routing_id: RoutingId,
        frame_process_id: ProcessId,
        frame_routing_id: RoutingId,
    ) -> SessionMatch {
        self.registry
            .resolve_or_create(view_process_id, view_routing_id, frame_process_id, frame_routing_id)
    }

    pub fn attach_browser(&self, session_id: SessionId, browser: Arc<dyn BrowserHost>) -> bool {
        self.registry.set_browser(session_id, browser)
    }

    pub fn browser_for_view(&self, process_id: ProcessId, routing_id: RoutingId) -> Option<Arc<dyn BrowserHost>> {
        let found = self.registry.find_by_view(process_id, routing_id)?;
        self.registry.browser(found.session_id)
    }

    pub fn browser_for_frame(&self, process_id: ProcessId, routing_id: RoutingId) -> Option<Arc<dyn BrowserHost>> {
        let found = self.registry.find_by_frame(process_id, routing_id)?;
        self.registry.browser(found.session_id)
    }

    pub fn remove_session(&self, session_id: SessionId) {
        self.popups.forget(session_id);
        self.registry.remove(session_id);
    }

    // Popups

    pub fn take_pending_popup(&self, opener: SessionId) -> Option<PendingPopupInfo> {
        self.popups.take_pending_popup(opener)
    }

    /// Runs both popup negotiation steps on the IO executor.
    pub async fn request_create_window(
        &self,
        params: CreateWindowParams,
        request: CreateWindowRequest,
    ) -> Result<CreateWindowDecision> {
        let popups = Arc::clone(&self.popups);
        let (sender, receiver) = oneshot::channel();
        self.threads.post_task(BrowserThread::Io, move || {
            popups.set_last_create_window_params(params);
            let _ = sender.send(popups.can_create_window(&request));
        })?;
        receiver
            .await
            .map_err(|_| EmbedderError::DecisionDropped("create window".to_string()))
    }

    // Permissions

    /// Starts a quota request on the IO executor. The receiver yields the
    /// final answer.
    pub fn request_quota_permission(
        &self,
        params: StorageQuotaParams,
        render_process_id: ProcessId,
    ) -> Result<oneshot::Receiver<QuotaPermissionResponse>> {
        let quota = self.quota.clone();
        let (completion, receiver) = oneshot_completion::<QuotaPermissionResponse>();
        self.threads.post_task(BrowserThread::Io, move || {
            quota.request_quota_permission(&params, render_process_id, completion);
        })?;
        Ok(receiver)
    }

    pub async fn quota_decision(
        &self,
        params: StorageQuotaParams,
        render_process_id: ProcessId,
    ) -> Result<QuotaPermissionResponse> {
        let receiver = self.request_quota_permission(params, render_process_id)?;
        Ok(receiver.await.unwrap_or(QuotaPermissionResponse::Cancelled))
    }

    /// Evaluates a certificate error on the UI executor and waits for the
    /// final answer. `true` means the request may proceed.
    pub async fn certificate_decision(&self, request: CertificateErrorRequest) -> Result<bool> {
        let overridable = request.overridable && !request.strict_enforcement;
        let certificates = self.certificates.clone();
        let (result_sender, result_receiver) = oneshot::channel();
        let (completion, answer) = oneshot_completion::<bool>();
        self.threads.post_task(BrowserThread::Ui, move || {
            let result = certificates.allow_certificate_error(&request, completion);
            let _ = result_sender.send(result);
        })?;

        let result = result_receiver
            .await
            .map_err(|_| EmbedderError::DecisionDropped("certificate error".to_string()))?;
        debug!("Certificate error evaluated as {:?}", result);

        match result {
            // No callback was offered, so the handler's return value is final.
            CertificateRequestResult::Continue if !overridable => Ok(true),
            CertificateRequestResult::Continue => Ok(answer.await.unwrap_or(false)),
            CertificateRequestResult::Cancel | CertificateRequestResult::Deny => Ok(false),
        }
    }

    // Navigation

    pub async fn navigation_decision(
        &self,
        source: SessionId,
        handle: NavigationHandle,
        params: NavigationParams,
    ) -> Result<bool> {
        let navigation = self.navigation.clone();
        let (sender, receiver) = oneshot::channel();
        self.threads.post_task(BrowserThread::Ui, move || {
            let _ = sender.send(navigation.intercept(source, &handle, &params));
        })?;
        receiver
            .await
            .map_err(|_| EmbedderError::DecisionDropped("navigation".to_string()))
    }

    /// Destroys every session on the UI executor, then stops both executors.
    pub fn shutdown(&self) -> Result<()> {
        let sessions = self.registry.session_ids();
        info!("Shutting down embedder with {} sessions", sessions.len());

        let registry = Arc::clone(&self.registry);
        self.threads
            .run_blocking(BrowserThread::Ui, move || registry.destroy_all())?;
        for session in sessions {
            self.popups.forget(session);
        }

        self.threads.shutdown();
        Ok(())
    }
}

impl std::fmt::Debug for EmbedderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedderClient")
            .field("config", &self.config)
            .field("threads", &self.threads)
            .field("sessions", &self.registry.len())
            .finish()
    }
}
