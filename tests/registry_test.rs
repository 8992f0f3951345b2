mod common;

use browser_embedder::{EmbedderClient, EmbedderConfig, SessionRegistry};
use common::{attach_session, embedder, MockBrowser};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;

#[test]
fn test_popup_fallback_then_opener_claims_ids() {
    let registry = SessionRegistry::new();
    let opener = registry.create(false);
    assert_eq!(opener.value(), 1);

    let first = registry.resolve_or_create(10, 1, 10, 1);
    assert_eq!(first.session_id.value(), 2);
    assert_eq!(registry.is_popup(first.session_id), Some(true));

    registry.add_view_id(opener, 10, 1);
    registry.add_frame_id(opener, 10, 1);

    let second = registry.resolve_or_create(10, 1, 10, 1);
    assert_eq!(second.session_id, opener);
    assert_eq!(registry.find_by_view(10, 1).map(|m| m.session_id), Some(opener));
}

#[test]
fn test_shutdown_destroys_live_and_canceled_sessions() {
    let embedder = embedder();
    let (_live, browser) = attach_session(&embedder, 1, 1, |browser| browser);
    let canceled_popup = embedder.resolve_or_create(2, 2, 2, 2);
    assert!(embedder.registry().browser(canceled_popup.session_id).is_none());
    assert_eq!(embedder.registry().len(), 2);

    embedder.shutdown().unwrap();

    assert!(embedder.registry().is_empty());
    assert_eq!(browser.destroy_count(), 1);
}

#[test]
fn test_browser_lookup_by_frame_after_resolution() {
    let embedder = embedder();
    let registry = embedder.registry().clone();
    let session = registry.create(false);
    registry.add_view_id(session, 3, 1);
    embedder.attach_browser(session, Arc::new(MockBrowser::new(session, &registry, None)));

    embedder.resolve_or_create(3, 1, 3, 7);

    let browser = embedder.browser_for_frame(3, 7).unwrap();
    assert_eq!(browser.session_id(), session);
    assert!(embedder.browser_for_view(3, 2).is_none());
    embedder.shutdown().unwrap();
}

#[test]
fn test_guest_views_disabled_by_config() {
    let embedder = EmbedderClient::new(EmbedderConfig {
        enable_guest_views: false,
        ..EmbedderConfig::default()
    })
    .unwrap();
    let registry = embedder.registry().clone();
    let owner = embedder.create_session(false);
    let browser = Arc::new(MockBrowser::new(owner, &registry, None));
    embedder.attach_browser(owner, browser.clone());
    registry.add_guest_view_id(owner, 4, 4);

    assert!(!embedder.registry().guest_views_enabled());
    assert_eq!(embedder.registry().find_by_view(4, 4), None);
    embedder.shutdown().unwrap();
    assert_eq!(browser.destroy_count(), 1);
}

proptest! {
    #[test]
    fn prop_resolution_is_stable(
        pairs in proptest::collection::vec((0..4i32, 0..4i32, 0..4i32, 0..4i32), 1..25)
    ) {
        let registry = SessionRegistry::new();
        for (vp, vr, fp, fr) in &pairs {
            registry.resolve_or_create(*vp, *vr, *fp, *fr);
        }
        for (vp, vr, fp, fr) in &pairs {
            let before = registry.len();
            let resolved = registry.resolve_or_create(*vp, *vr, *fp, *fr);
            prop_assert_eq!(registry.len(), before);
            prop_assert!(registry.contains(resolved.session_id));
        }
    }
}
