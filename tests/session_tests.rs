//! Integration tests for the capture session lifecycle.

mod common;

use capture_fx::capture::{StreamOutcome, SyntheticProvider};
use capture_fx::dialog::CaptureView;
use capture_fx::{
    CaptureError, CaptureOptions, FacingMode, MediaAccessError, SessionAction, SessionState,
};
use common::{alerting, harness};
use std::time::Duration;

#[tokio::test]
async fn single_capture_is_submitted() {
    let mut h = harness(SyntheticProvider::new(), CaptureOptions::default());

    h.session.show().await.unwrap();
    assert_eq!(h.session.state(), SessionState::Previewing);
    assert_eq!(h.provider.live_streams(), 1);
    assert_eq!(h.ui.borrow().view, Some(CaptureView::Live));

    let first = h.session.take_photo().unwrap().clone();
    assert_eq!(h.session.state(), SessionState::Captured);
    assert_eq!(h.ui.borrow().view, Some(CaptureView::Preview(first.clone())));

    h.session.submit().unwrap();

    assert_eq!(*h.submissions.borrow(), vec![vec![first]]);
    assert_eq!(h.session.state(), SessionState::Idle);
    assert_eq!(h.provider.live_streams(), 0);
    assert!(!h.ui.borrow().open);
}

#[tokio::test]
async fn take_multiple_accumulates_images() {
    let mut h = harness(SyntheticProvider::new(), CaptureOptions::default());

    h.session.show().await.unwrap();
    let first = h.session.take_photo().unwrap().clone();
    h.session.take_multiple().unwrap();
    assert_eq!(h.session.state(), SessionState::Previewing);
    assert_eq!(h.session.images().len(), 1);

    let second = h.session.take_photo().unwrap().clone();
    assert_ne!(first, second);
    h.session.submit().unwrap();

    assert_eq!(*h.submissions.borrow(), vec![vec![first, second]]);
}

#[tokio::test]
async fn retake_drops_only_the_last_capture() {
    let mut h = harness(SyntheticProvider::new(), CaptureOptions::default());
    h.session.show().await.unwrap();

    h.session.take_photo().unwrap();
    h.session.take_multiple().unwrap();
    h.session.take_photo().unwrap();
    assert_eq!(h.session.images().len(), 2);

    h.session.retake().unwrap();
    assert_eq!(h.session.images().len(), 1);
    assert_eq!(h.session.state(), SessionState::Previewing);

    let ui = h.ui.borrow();
    assert_eq!(ui.primary.as_ref().unwrap().action, SessionAction::TakePhoto);
    assert!(ui.custom.is_empty());
    assert_eq!(ui.view, Some(CaptureView::Live));
    drop(ui);

    // Retake is only offered once per capture.
    assert!(matches!(
        h.session.retake(),
        Err(CaptureError::InvalidTransition {
            action: SessionAction::Retake,
            state: SessionState::Previewing,
        })
    ));
    assert_eq!(h.session.images().len(), 1);
}

#[tokio::test]
async fn image_count_tracks_successful_captures() {
    let mut h = harness(SyntheticProvider::new(), CaptureOptions::default());
    h.session.show().await.unwrap();

    for n in 1..=5 {
        h.session.take_photo().unwrap();
        assert_eq!(h.session.images().len(), n);
        // A second take without returning to the feed is rejected.
        assert!(h.session.take_photo().is_err());
        assert_eq!(h.session.images().len(), n);
        h.session.take_multiple().unwrap();
    }
}

#[tokio::test]
async fn captured_state_rebinds_dialog_actions() {
    let mut h = harness(SyntheticProvider::new(), CaptureOptions::default());
    h.session.show().await.unwrap();
    {
        let ui = h.ui.borrow();
        assert_eq!(ui.primary.as_ref().unwrap().label, "Take Photo");
        assert_eq!(ui.secondary.as_ref().unwrap().label, "Switch Camera");
    }

    h.session.take_photo().unwrap();
    let ui = h.ui.borrow();
    assert_eq!(ui.primary.as_ref().unwrap().action, SessionAction::Submit);
    assert_eq!(ui.secondary.as_ref().unwrap().action, SessionAction::Retake);
    assert_eq!(ui.custom.len(), 1);
    assert_eq!(ui.custom[0].label, "Take Multiple");
}

#[tokio::test]
async fn denied_permission_alerts_once_and_stays_idle() {
    let provider = SyntheticProvider::with_script([StreamOutcome::Deny]);
    let mut h = harness(provider, alerting());

    let err = h.session.show().await.unwrap_err();
    assert!(matches!(
        err,
        CaptureError::MediaAccess(MediaAccessError::PermissionDenied)
    ));
    assert_eq!(h.ui.borrow().alerts(), 1);
    assert_eq!(h.session.state(), SessionState::Idle);
    assert!(h.ui.borrow().presented.is_empty());
    assert_eq!(h.provider.live_streams(), 0);

    // No automatic retry; the caller shows again.
    assert_eq!(h.provider.requests().len(), 1);
    h.session.show().await.unwrap();
    assert_eq!(h.session.state(), SessionState::Previewing);
    assert_eq!(h.ui.borrow().alerts(), 1);
}

#[tokio::test]
async fn failures_are_silent_without_error_option() {
    let provider = SyntheticProvider::with_script([StreamOutcome::Unavailable]);
    let mut h = harness(provider, CaptureOptions::default());

    let err = h.session.show().await.unwrap_err();
    assert!(err.is_media_access());
    assert_eq!(h.ui.borrow().alerts(), 0);
    assert_eq!(h.session.state(), SessionState::Idle);
}

#[tokio::test]
async fn switch_camera_toggles_without_overlapping_streams() {
    let mut h = harness(SyntheticProvider::new(), CaptureOptions::default());
    h.session.show().await.unwrap();
    assert_eq!(h.session.facing_mode(), FacingMode::Environment);

    h.session.switch_camera().await.unwrap();
    assert_eq!(h.session.facing_mode(), FacingMode::User);
    assert_eq!(h.session.state(), SessionState::Previewing);
    assert_eq!(h.ui.borrow().infos(), 1);

    h.session.switch_camera().await.unwrap();
    assert_eq!(h.session.facing_mode(), FacingMode::Environment);

    let requested: Vec<FacingMode> = h
        .provider
        .requests()
        .iter()
        .map(|constraints| constraints.video.facing_mode)
        .collect();
    assert_eq!(
        requested,
        vec![FacingMode::Environment, FacingMode::User, FacingMode::Environment]
    );
    assert_eq!(h.provider.streams_opened(), 3);
    assert_eq!(h.provider.peak_live_streams(), 1);
    assert_eq!(h.provider.live_streams(), 1);
}

#[tokio::test]
async fn switch_camera_keeps_captured_images() {
    let mut h = harness(SyntheticProvider::new(), CaptureOptions::default());
    h.session.show().await.unwrap();
    h.session.take_photo().unwrap();
    h.session.take_multiple().unwrap();

    h.session.switch_camera().await.unwrap();
    h.session.take_photo().unwrap();
    h.session.submit().unwrap();

    let submissions = h.submissions.borrow();
    assert_eq!(submissions[0].len(), 2);
    assert_eq!(submissions[0][0].dimensions().unwrap(), (64, 48));
    assert_eq!(submissions[0][1].dimensions().unwrap(), (32, 24));
}

#[tokio::test]
async fn failed_switch_restores_facing_mode() {
    let provider = SyntheticProvider::new();
    let mut h = harness(provider, alerting());
    h.session.show().await.unwrap();
    h.session.take_photo().unwrap();
    h.session.take_multiple().unwrap();

    h.provider.push_outcome(StreamOutcome::Deny);
    assert!(h.session.switch_camera().await.is_err());

    assert_eq!(h.session.facing_mode(), FacingMode::Environment);
    assert_eq!(h.session.state(), SessionState::Idle);
    assert_eq!(h.session.images().len(), 1);
    assert_eq!(h.provider.live_streams(), 0);
    assert_eq!(h.ui.borrow().alerts(), 1);
}

#[tokio::test]
async fn hide_is_safe_in_every_state() {
    let mut h = harness(SyntheticProvider::new(), CaptureOptions::default());

    h.session.hide();
    h.session.hide();
    assert_eq!(h.session.state(), SessionState::Idle);

    h.session.show().await.unwrap();
    h.session.hide();
    h.session.hide();
    assert_eq!(h.provider.live_streams(), 0);
    assert!(!h.session.has_live_stream());
    assert_eq!(h.ui.borrow().hides, 1);

    h.session.show().await.unwrap();
    h.session.take_photo().unwrap();
    h.session.hide();
    h.session.hide();
    assert_eq!(h.provider.live_streams(), 0);
    assert_eq!(h.session.state(), SessionState::Idle);
    assert!(h.submissions.borrow().is_empty());
}

#[tokio::test]
async fn actions_outside_their_state_change_nothing() {
    let mut h = harness(SyntheticProvider::new(), CaptureOptions::default());

    assert!(h.session.take_photo().is_err());
    assert!(h.session.submit().is_err());
    assert!(h.session.take_multiple().is_err());
    assert!(h.session.switch_camera().await.is_err());
    assert!(h.provider.requests().is_empty());

    h.session.show().await.unwrap();
    assert!(matches!(
        h.session.show().await,
        Err(CaptureError::InvalidTransition {
            action: SessionAction::Show,
            state: SessionState::Previewing,
        })
    ));
    assert_eq!(h.provider.live_streams(), 1);
}

#[tokio::test]
async fn dispatch_drives_the_full_workflow() {
    let mut h = harness(SyntheticProvider::new(), CaptureOptions::default());

    for action in [
        SessionAction::Show,
        SessionAction::TakePhoto,
        SessionAction::TakeMultiple,
        SessionAction::SwitchCamera,
        SessionAction::TakePhoto,
        SessionAction::Retake,
        SessionAction::TakePhoto,
        SessionAction::Submit,
    ] {
        h.session.dispatch(action).await.unwrap();
    }

    assert_eq!(h.submissions.borrow().len(), 1);
    assert_eq!(h.submissions.borrow()[0].len(), 2);
    assert_eq!(h.session.state(), SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn cancelling_an_in_flight_request_acquires_nothing() {
    let provider =
        SyntheticProvider::with_script([StreamOutcome::GrantAfter(Duration::from_secs(5))]);
    let mut h = harness(provider, alerting());
    let canceller = h.session.canceller();

    let (shown, ()) = tokio::join!(h.session.show(), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    assert!(matches!(shown, Err(CaptureError::Cancelled)));
    assert_eq!(h.session.state(), SessionState::Idle);
    assert_eq!(h.provider.streams_opened(), 0);
    assert_eq!(h.ui.borrow().alerts(), 0);
    assert!(h.ui.borrow().presented.is_empty());

    // A later request is unaffected by the earlier cancellation.
    h.session.show().await.unwrap();
    assert_eq!(h.session.state(), SessionState::Previewing);
}

#[tokio::test(start_paused = true)]
async fn cancel_without_pending_request_does_not_affect_next_show() {
    let provider =
        SyntheticProvider::with_script([StreamOutcome::GrantAfter(Duration::from_secs(5))]);
    let mut h = harness(provider, CaptureOptions::default());
    let canceller = h.session.canceller();

    canceller.cancel();
    canceller.cancel();

    h.session.show().await.unwrap();
    assert_eq!(h.session.state(), SessionState::Previewing);
    assert_eq!(h.provider.streams_opened(), 1);
    assert_eq!(h.provider.live_streams(), 1);

    // Cancelling while previewing leaves the held stream alone.
    canceller.cancel();
    assert_eq!(h.session.state(), SessionState::Previewing);
    assert!(h.session.has_live_stream());
}

#[tokio::test]
async fn dropping_the_session_releases_the_stream() {
    let h = harness(SyntheticProvider::new(), CaptureOptions::default());
    let provider = h.provider.clone();
    let ui = h.ui.clone();
    let mut session = h.session;

    session.show().await.unwrap();
    assert_eq!(provider.live_streams(), 1);

    drop(session);
    assert_eq!(provider.live_streams(), 0);
    assert!(!ui.borrow().open);
}
