use crate::registry::{ProcessId, RoutingId, SessionRegistry};
use crate::threading::{BrowserThread, BrowserThreads, RequestCallback};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageType {
    Temporary,
    Persistent,
    Syncable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageQuotaParams {
    pub render_view_id: RoutingId,
    pub origin_url: Url,
    pub storage_type: StorageType,
    pub requested_size: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuotaPermissionResponse {
    Allow,
    Disallow,
    Cancelled,
}

impl From<bool> for QuotaPermissionResponse {
    fn from(allow: bool) -> Self {
        if allow {
            QuotaPermissionResponse::Allow
        } else {
            QuotaPermissionResponse::Disallow
        }
    }
}

/// Routes storage quota requests to the requesting session's request
/// handler. Completions are delivered on the IO executor.
#[derive(Debug, Clone)]
pub struct QuotaPermissionContext {
    registry: Arc<SessionRegistry>,
    threads: BrowserThreads,
}

impl QuotaPermissionContext {
    pub fn new(registry: Arc<SessionRegistry>, threads: BrowserThreads) -> Self {
        Self { registry, threads }
    }

    pub fn request_quota_permission<F>(
        &self,
        params: &StorageQuotaParams,
        render_process_id: ProcessId,
        completion: F,
    ) where
        F: FnOnce(QuotaPermissionResponse) + Send + 'static,
    {
        self.threads.require(BrowserThread::Io);

        if params.storage_type != StorageType::Persistent {
            debug!(
                "Quota request for {:?} storage from {} refused",
                params.storage_type, params.origin_url
            );
            completion(QuotaPermissionResponse::Disallow);
            return;
        }

        let handler = self
            .registry
            .find_by_view(render_process_id, params.render_view_id)
            .and_then(|found| self.registry.browser(found.session_id))
            .and_then(|browser| {
                let handler = browser.client()?.request_handler()?;
                Some((browser, handler))
            });

        let Some((browser, handler)) = handler else {
            completion(QuotaPermissionResponse::Disallow);
            return;
        };

        let callback = RequestCallback::new(&self.threads, BrowserThread::Io, false, move |allow| {
            completion(QuotaPermissionResponse::from(allow))
        });

        let handled = handler.on_quota_request(
            &browser,
            params.origin_url.as_str(),
            params.requested_size,
            callback.clone(),
        );

        if !handled {
            info!(
                "Quota request of {} bytes from {} not handled; disallowing",
                params.requested_size, params.origin_url
            );
            // Answer directly; any clone the handler kept becomes inert.
            if let Some(respond) = callback.detach() {
                respond(false);
            }
        }
    }
}
