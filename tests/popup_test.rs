mod common;

use browser_embedder::handler::{
    BrowserSettings, Frame, PageTransition, PopupDecision, SettingState, WindowFeatures,
    WindowOpenDisposition,
};
use browser_embedder::popup::{CreateWindowDecision, CreateWindowParams, CreateWindowRequest};
use browser_embedder::BrowserThread;
use common::{attach_session, embedder, MockClient, PopupPolicy};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use url::Url;

fn params(process_id: i32, view_id: i32) -> CreateWindowParams {
    CreateWindowParams {
        opener_process_id: process_id,
        opener_view_id: view_id,
        opener_frame_id: 5,
        target_url: Url::parse("https://example.com/popup").unwrap(),
        target_frame_name: "child".to_string(),
    }
}

fn request() -> CreateWindowRequest {
    CreateWindowRequest {
        features: WindowFeatures {
            x: 15.5,
            x_set: true,
            width: 300.0,
            width_set: true,
            additional_features: vec!["custom".to_string()],
            ..Default::default()
        },
        user_gesture: true,
        ..CreateWindowRequest::new(Url::parse("https://example.com/popup").unwrap())
    }
}

#[tokio::test]
async fn test_popup_allowed_without_handler() {
    let embedder = embedder();
    let client = Arc::new(MockClient::default());
    let (opener, _browser) = attach_session(&embedder, 1, 1, |mut browser| {
        browser.client = Some(client.clone());
        browser.settings = BrowserSettings {
            javascript: SettingState::Disabled,
            ..Default::default()
        };
        browser
    });

    let decision = embedder.request_create_window(params(1, 1), request()).await.unwrap();

    assert_eq!(
        decision,
        CreateWindowDecision {
            allowed: true,
            no_script_access: false
        }
    );
    let pending = embedder.take_pending_popup(opener).unwrap();
    assert_eq!(pending.settings.javascript, SettingState::Disabled);
    assert_eq!(pending.window_info.x, Some(15));
    assert_eq!(pending.window_info.y, None);
    assert_eq!(pending.window_info.width, Some(300));
    assert!(pending.window_info.as_popup);
    assert!(pending.client.is_some());
    assert!(!embedder.popups().has_pending_popup(opener));
    embedder.shutdown().unwrap();
}

#[tokio::test]
async fn test_handler_sees_translated_request_and_frame() {
    let embedder = embedder();
    let policy = Arc::new(PopupPolicy {
        no_javascript_access: true,
        window_name: Some("named".to_string()),
        ..PopupPolicy::new(PopupDecision::Allow)
    });
    let client = Arc::new(MockClient {
        life_span: Some(policy.clone()),
        request: None,
    });
    let opener_frame = Frame {
        id: 5,
        is_main: false,
        name: "opener".to_string(),
        url: None,
        parent_id: Some(-1),
    };
    let (opener, _browser) = attach_session(&embedder, 2, 2, |mut browser| {
        browser.client = Some(client.clone());
        browser.with_frame(opener_frame.clone())
    });

    let decision = embedder.request_create_window(params(2, 2), request()).await.unwrap();

    assert!(decision.allowed);
    assert!(decision.no_script_access);
    let calls = policy.calls.lock().clone();
    assert_eq!(calls.len(), 1);
    let (popup_request, frame) = &calls[0];
    assert_eq!(popup_request.target_frame_name, "child");
    assert_eq!(popup_request.disposition, WindowOpenDisposition::NewPopup);
    assert!(popup_request.user_gesture);
    assert_eq!(popup_request.features.x, 15);
    assert_eq!(
        popup_request.features.additional_features,
        Some(vec!["custom".to_string()])
    );
    assert_eq!(frame.as_ref(), Some(&opener_frame));
    assert_eq!(
        embedder.take_pending_popup(opener).unwrap().window_info.window_name,
        "named"
    );
    embedder.shutdown().unwrap();
}

#[tokio::test]
async fn test_handler_cancel_denies_without_pending_record() {
    let embedder = embedder();
    let policy = Arc::new(PopupPolicy::new(PopupDecision::Cancel));
    let client = Arc::new(MockClient {
        life_span: Some(policy.clone()),
        request: None,
    });
    let (opener, _browser) = attach_session(&embedder, 3, 3, |mut browser| {
        browser.client = Some(client.clone());
        browser
    });

    let decision = embedder.request_create_window(params(3, 3), request()).await.unwrap();

    assert!(!decision.allowed);
    assert_eq!(policy.call_count(), 1);
    assert!(!embedder.popups().has_pending_popup(opener));
    embedder.shutdown().unwrap();
}

#[tokio::test]
async fn test_second_popup_denied_while_one_is_pending() {
    let embedder = embedder();
    let (opener, _browser) = attach_session(&embedder, 4, 4, |browser| browser);

    let first = embedder.request_create_window(params(4, 4), request()).await.unwrap();
    let second = embedder.request_create_window(params(4, 4), request()).await.unwrap();

    assert!(first.allowed);
    assert!(!second.allowed);

    assert!(embedder.take_pending_popup(opener).is_some());
    let third = embedder.request_create_window(params(4, 4), request()).await.unwrap();
    assert!(third.allowed);
    embedder.shutdown().unwrap();
}

#[tokio::test]
async fn test_guest_opener_redirects_to_owner() {
    let embedder = embedder();
    let policy = Arc::new(PopupPolicy::new(PopupDecision::Allow));
    let client = Arc::new(MockClient {
        life_span: Some(policy.clone()),
        request: None,
    });
    let threads = embedder.threads().clone();
    let (owner, browser) = attach_session(&embedder, 5, 5, |mut browser| {
        browser.client = Some(client.clone());
        browser.with_threads(&threads)
    });
    embedder.registry().add_guest_view_id(owner, 6, 1);

    let decision = embedder.request_create_window(params(6, 1), request()).await.unwrap();
    embedder.threads().flush(BrowserThread::Ui).unwrap();

    assert_eq!(decision, CreateWindowDecision::deny());
    assert_eq!(policy.call_count(), 0);
    assert!(!embedder.popups().has_pending_popup(owner));

    let opened = browser.opened();
    assert_eq!(opened.len(), 1);
    let (open_params, on_ui) = &opened[0];
    assert!(on_ui);
    assert_eq!(open_params.url.as_str(), "https://example.com/popup");
    assert_eq!(open_params.transition, PageTransition::Link);
    assert!(open_params.user_gesture);
    embedder.shutdown().unwrap();
}

#[tokio::test]
async fn test_unknown_opener_denied_and_params_reset() {
    let embedder = embedder();

    let decision = embedder.request_create_window(params(9, 9), request()).await.unwrap();

    assert_eq!(decision, CreateWindowDecision::deny());
    assert!(!embedder.popups().has_captured_params());
    embedder.shutdown().unwrap();
}

#[tokio::test]
async fn test_removed_session_forgets_pending_popup() {
    let embedder = embedder();
    let registry = embedder.registry().clone();
    let opener = registry.create(false);
    registry.add_view_id(opener, 7, 7);
    let browser = Arc::new(common::MockBrowser::new(opener, &registry, None));
    embedder.attach_browser(opener, browser);

    assert!(embedder.request_create_window(params(7, 7), request()).await.unwrap().allowed);
    embedder.remove_session(opener);

    assert!(!embedder.popups().has_pending_popup(opener));
    embedder.shutdown().unwrap();
}
