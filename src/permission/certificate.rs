use crate::handler::{CertError, ClientCertificate, ResourceType, SslInfo};
use crate::registry::{ProcessId, RoutingId, SessionRegistry};
use crate::threading::{BrowserThread, BrowserThreads, RequestCallback};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateErrorRequest {
    pub render_process_id: ProcessId,
    pub render_frame_id: RoutingId,
    pub cert_error: CertError,
    pub ssl_info: SslInfo,
    pub request_url: Url,
    pub resource_type: ResourceType,
    pub overridable: bool,
    pub strict_enforcement: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CertificateRequestResult {
    /// The request may go ahead. For overridable errors the completion
    /// carries the final answer; otherwise the handler's return value is it.
    Continue,
    Cancel,
    /// Nobody was asked.
    Deny,
}

/// Decides certificate errors on the UI executor.
#[derive(Debug, Clone)]
pub struct CertificateErrorContext {
    registry: Arc<SessionRegistry>,
    threads: BrowserThreads,
}

impl CertificateErrorContext {
    pub fn new(registry: Arc<SessionRegistry>, threads: BrowserThreads) -> Self {
        Self { registry, threads }
    }

    /// Returns the synchronous result. The completion only runs when the
    /// result is `Continue` and the error was overridable. A non-overridable
    /// error gets no callback and follows the handler's return value.
    pub fn allow_certificate_error<F>(
        &self,
        request: &CertificateErrorRequest,
        completion: F,
    ) -> CertificateRequestResult
    where
        F: FnOnce(bool) + Send + 'static,
    {
        self.threads.require(BrowserThread::Ui);

        if request.resource_type != ResourceType::MainFrame {
            debug!(
                "Certificate error {} on {:?} resource {}; cancelling",
                request.cert_error.code(),
                request.resource_type,
                request.request_url
            );
            return CertificateRequestResult::Cancel;
        }

        let target = self
            .registry
            .find_by_frame(request.render_process_id, request.render_frame_id)
            .and_then(|found| self.registry.browser(found.session_id))
            .and_then(|browser| {
                let handler = browser.client()?.request_handler()?;
                Some((browser, handler))
            });
        let Some((browser, handler)) = target else {
            return CertificateRequestResult::Deny;
        };

        let overridable = request.overridable && !request.strict_enforcement;
        let callback = overridable
            .then(|| RequestCallback::new(&self.threads, BrowserThread::Ui, false, completion));

        let proceed = handler.on_certificate_error(
            &browser,
            request.cert_error,
            request.request_url.as_str(),
            &request.ssl_info,
            callback.clone(),
        );

        match callback {
            Some(callback) if proceed => {
                drop(callback);
                CertificateRequestResult::Continue
            }
            Some(callback) => {
                callback.disconnect();
                info!(
                    "Certificate error {} for {} declined by handler",
                    request.cert_error.code(),
                    request.request_url
                );
                CertificateRequestResult::Cancel
            }
            None if proceed => CertificateRequestResult::Continue,
            None => CertificateRequestResult::Cancel,
        }
    }
}

/// Picks the certificate to present for client authentication.
pub fn select_client_certificate(certificates: &[ClientCertificate]) -> Option<ClientCertificate> {
    certificates.first().cloned()
}
