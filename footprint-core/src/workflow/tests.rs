//! Unit tests for the capture state machine.

use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;
use tokio::sync::Notify;

use super::*;
use crate::test_support::{StubCameraProvider, StubLocationProvider, candidate};
use crate::{Address, Coordinates, DeviceError, MemoryBackend};

type TestWorkflow = CaptureWorkflow<StubLocationProvider, StubCameraProvider, MemoryBackend>;

fn workflow(location: StubLocationProvider, camera: StubCameraProvider) -> TestWorkflow {
    CaptureWorkflow::new(
        location,
        camera,
        Arc::new(RecordStore::new(MemoryBackend::default())),
    )
}

fn park() -> TestWorkflow {
    workflow(
        StubLocationProvider::at(37.421, -122.084),
        StubCameraProvider::with_photo("file:///park.jpg"),
    )
}

fn force_state(workflow: &TestWorkflow, state: CaptureState) {
    workflow.lock().state = state;
}

#[rstest]
#[tokio::test]
async fn capture_commits_a_named_record() {
    let workflow = park();
    workflow.begin_capture().expect("begin");
    assert_eq!(
        workflow.request_location().await.expect("location"),
        FetchOutcome::Applied
    );
    assert_eq!(workflow.state(), CaptureState::Staging);
    assert_eq!(
        workflow.request_photo().await.expect("photo"),
        FetchOutcome::Applied
    );
    assert_eq!(workflow.state(), CaptureState::Ready);

    let records = workflow.commit("Park").expect("commit");
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.name(), "Park");
    assert_eq!(record.photo().as_str(), "file:///park.jpg");
    assert_eq!(record.coords().latitude(), 37.421);
    assert_eq!(record.coords().longitude(), -122.084);
    assert_eq!(workflow.state(), CaptureState::Idle);
    assert!(workflow.session().is_none());
}

#[rstest]
#[tokio::test]
async fn photo_may_arrive_before_location() {
    let workflow = park();
    workflow.begin_capture().expect("begin");
    workflow.request_photo().await.expect("photo");
    assert_eq!(workflow.state(), CaptureState::Staging);
    workflow.request_location().await.expect("location");
    assert_eq!(workflow.state(), CaptureState::Ready);
}

#[rstest]
#[tokio::test]
async fn commit_before_both_fetches_is_rejected() {
    let workflow = park();
    workflow.begin_capture().expect("begin");
    workflow.request_location().await.expect("location");

    let err = workflow.commit("Park").expect_err("not ready");
    assert!(matches!(
        err,
        CaptureError::NotReady {
            state: CaptureState::Staging
        }
    ));
    assert_eq!(workflow.state(), CaptureState::Staging);
    assert!(workflow.store().load().expect("load").is_empty());
}

#[rstest]
fn commit_while_idle_is_rejected() {
    let workflow = park();
    let err = workflow.commit("Park").expect_err("idle");
    assert!(matches!(
        err,
        CaptureError::NotReady {
            state: CaptureState::Idle
        }
    ));
}

#[rstest]
#[tokio::test]
async fn fetch_outside_a_session_is_rejected() {
    let workflow = park();
    let err = workflow.request_location().await.expect_err("idle");
    assert!(matches!(err, CaptureError::InvalidState { .. }));
    assert_eq!(workflow.state(), CaptureState::Idle);
}

#[rstest]
#[tokio::test]
async fn dismissed_camera_stages_nothing() {
    let workflow = workflow(
        StubLocationProvider::at(1.0, 2.0),
        StubCameraProvider::canceled(),
    );
    workflow.begin_capture().expect("begin");
    workflow.request_location().await.expect("location");

    let outcome = workflow.request_photo().await.expect("photo");
    assert_eq!(outcome, FetchOutcome::Canceled);
    assert_eq!(workflow.state(), CaptureState::Staging);
    assert!(workflow.candidate().expect("session").photo.is_none());
}

#[rstest]
#[tokio::test]
async fn denied_permission_surfaces_and_keeps_state() {
    let workflow = workflow(
        StubLocationProvider::denied(),
        StubCameraProvider::with_photo("file:///p.jpg"),
    );
    workflow.begin_capture().expect("begin");

    let err = workflow.request_location().await.expect_err("denied");
    assert!(matches!(
        err,
        CaptureError::PermissionDenied {
            device: Device::Location
        }
    ));
    assert_eq!(workflow.state(), CaptureState::Staging);
    assert_eq!(workflow.location.calls(), 0);
}

#[rstest]
#[tokio::test]
async fn unavailable_device_leaves_candidate_untouched() {
    let workflow = workflow(
        StubLocationProvider::without_fix(),
        StubCameraProvider::with_photo("file:///p.jpg"),
    );
    workflow.begin_capture().expect("begin");
    workflow.request_photo().await.expect("photo");

    let err = workflow.request_location().await.expect_err("no fix");
    assert!(matches!(
        err,
        CaptureError::DeviceUnavailable {
            device: Device::Location,
            ..
        }
    ));
    assert_eq!(workflow.state(), CaptureState::Staging);
    let staged = workflow.candidate().expect("session");
    assert!(staged.location.is_none());
    assert!(staged.photo.is_some());
}

#[rstest]
#[case::nan(f64::NAN, 0.0)]
#[case::latitude_out_of_range(91.0, 0.0)]
#[case::longitude_out_of_range(0.0, 181.0)]
#[tokio::test]
async fn invalid_reading_is_never_staged(#[case] latitude: f64, #[case] longitude: f64) {
    let workflow = workflow(
        StubLocationProvider::reporting(latitude, longitude),
        StubCameraProvider::with_photo("file:///p.jpg"),
    );
    workflow.begin_capture().expect("begin");
    workflow.request_photo().await.expect("photo");

    let err = workflow.request_location().await.expect_err("invalid reading");
    assert!(matches!(
        err,
        CaptureError::DeviceUnavailable {
            device: Device::Location,
            ..
        }
    ));
    assert_eq!(workflow.state(), CaptureState::Staging);
    assert!(workflow.candidate().expect("session").location.is_none());

    let err = workflow.commit("Park").expect_err("nothing to commit");
    assert!(matches!(err, CaptureError::NotReady { .. }));
    assert_eq!(workflow.store().backend().write_count(), 0);
}

#[rstest]
#[tokio::test]
async fn camera_failure_keeps_staged_location() {
    let workflow = workflow(
        StubLocationProvider::at(37.421, -122.084),
        StubCameraProvider::failing(DeviceError::unavailable(Device::Camera, "no camera")),
    );
    workflow.begin_capture().expect("begin");
    workflow.request_location().await.expect("location");
    let before = workflow.candidate().expect("session");

    let err = workflow.request_photo().await.expect_err("camera fails");
    assert!(matches!(
        err,
        CaptureError::DeviceUnavailable {
            device: Device::Camera,
            ..
        }
    ));
    assert_eq!(workflow.state(), CaptureState::Staging);
    assert_eq!(workflow.candidate(), Some(before));
    assert_eq!(workflow.camera.calls(), 1);
}

#[rstest]
#[tokio::test]
async fn slow_camera_times_out_and_keeps_staged_location() {
    let gate = Arc::new(Notify::new());
    let timeout = Duration::from_millis(10);
    let workflow = workflow(
        StubLocationProvider::at(37.421, -122.084),
        StubCameraProvider::with_photo("file:///p.jpg").with_gate(gate),
    )
    .with_config(WorkflowConfig::default().with_timeout(timeout));
    workflow.begin_capture().expect("begin");
    workflow.request_location().await.expect("location");

    let err = workflow.request_photo().await.expect_err("timeout");
    assert!(matches!(
        err,
        CaptureError::Timeout {
            device: Device::Camera,
            after
        } if after == timeout
    ));
    assert_eq!(workflow.state(), CaptureState::Staging);
    let staged = workflow.candidate().expect("session");
    assert!(staged.photo.is_none());
    let fix = staged.location.expect("location survives");
    assert_eq!(fix.coords.latitude(), 37.421);
}

#[rstest]
#[tokio::test]
async fn slow_provider_times_out() {
    let gate = Arc::new(Notify::new());
    let timeout = Duration::from_millis(10);
    let workflow = workflow(
        StubLocationProvider::at(1.0, 2.0).with_gate(gate),
        StubCameraProvider::with_photo("file:///p.jpg"),
    )
    .with_config(WorkflowConfig::default().with_timeout(timeout));
    workflow.begin_capture().expect("begin");

    let err = workflow.request_location().await.expect_err("timeout");
    assert!(matches!(
        err,
        CaptureError::Timeout {
            device: Device::Location,
            after
        } if after == timeout
    ));
    assert_eq!(workflow.state(), CaptureState::Staging);
}

#[rstest]
#[tokio::test]
async fn geocode_failure_keeps_coordinates() {
    let workflow = workflow(
        StubLocationProvider::at(48.8584, 2.2945)
            .with_geocode_error(DeviceError::unavailable(Device::Location, "offline")),
        StubCameraProvider::with_photo("file:///p.jpg"),
    );
    workflow.begin_capture().expect("begin");

    assert_eq!(
        workflow.request_location().await.expect("location"),
        FetchOutcome::Applied
    );
    let fix = workflow
        .candidate()
        .and_then(|staged| staged.location)
        .expect("location staged");
    assert_eq!(fix.coords.latitude(), 48.8584);
    assert!(fix.address.is_none());
}

#[rstest]
#[tokio::test]
async fn cancel_discards_staged_values() {
    let workflow = park();
    workflow.begin_capture().expect("begin");
    workflow.request_location().await.expect("location");
    workflow.request_photo().await.expect("photo");

    workflow.cancel().expect("cancel");
    assert_eq!(workflow.state(), CaptureState::Idle);
    assert!(workflow.candidate().is_none());
    assert!(workflow.store().load().expect("load").is_empty());
    assert_eq!(workflow.store().backend().write_count(), 0);
}

#[rstest]
#[tokio::test]
async fn result_arriving_after_cancel_is_discarded() {
    let gate = Arc::new(Notify::new());
    let workflow = workflow(
        StubLocationProvider::at(1.0, 2.0),
        StubCameraProvider::with_photo("file:///late.jpg").with_gate(Arc::clone(&gate)),
    );
    workflow.begin_capture().expect("begin");

    let (outcome, ()) = tokio::join!(workflow.request_photo(), async {
        workflow.cancel().expect("cancel");
        gate.notify_one();
    });
    assert_eq!(outcome.expect("photo"), FetchOutcome::Discarded);
    assert_eq!(workflow.state(), CaptureState::Idle);
    assert!(workflow.candidate().is_none());
}

#[rstest]
#[tokio::test]
async fn result_from_a_replaced_session_does_not_leak() {
    let gate = Arc::new(Notify::new());
    let workflow = workflow(
        StubLocationProvider::at(1.0, 2.0).with_gate(Arc::clone(&gate)),
        StubCameraProvider::with_photo("file:///p.jpg"),
    );
    let first = workflow.begin_capture().expect("begin");

    let (outcome, second) = tokio::join!(workflow.request_location(), async {
        let second = workflow.begin_capture().expect("restart");
        gate.notify_one();
        second
    });
    assert_ne!(first, second);
    assert_eq!(outcome.expect("location"), FetchOutcome::Discarded);
    assert_eq!(workflow.session(), Some(second));
    assert!(workflow.candidate().expect("session").location.is_none());
}

#[rstest]
#[tokio::test]
async fn begin_capture_restarts_a_staged_session() {
    let workflow = park();
    let first = workflow.begin_capture().expect("begin");
    workflow.request_photo().await.expect("photo");

    let second = workflow.begin_capture().expect("restart");
    assert!(second > first);
    assert_eq!(workflow.state(), CaptureState::Staging);
    assert_eq!(workflow.candidate(), Some(Candidate::default()));
}

#[rstest]
#[tokio::test]
async fn failed_commit_can_be_retried() {
    let workflow = park();
    workflow.begin_capture().expect("begin");
    workflow.request_location().await.expect("location");
    workflow.request_photo().await.expect("photo");

    workflow.store().backend().fail_writes(true);
    let err = workflow.commit("Park").expect_err("write fails");
    assert!(matches!(err, CaptureError::Storage(_)));
    assert_eq!(workflow.state(), CaptureState::Ready);
    assert!(workflow.candidate().expect("kept").is_complete());

    workflow.store().backend().fail_writes(false);
    let records = workflow.commit("Park").expect("retry");
    assert_eq!(records.len(), 1);
    assert_eq!(workflow.state(), CaptureState::Idle);
}

#[rstest]
#[case::cancel(|w: &TestWorkflow| w.cancel())]
#[case::begin(|w: &TestWorkflow| w.begin_capture().map(|_| ()))]
fn operations_are_rejected_while_committing(
    #[case] operation: fn(&TestWorkflow) -> Result<(), CaptureError>,
) {
    let workflow = park();
    workflow.begin_capture().expect("begin");
    force_state(&workflow, CaptureState::Committing);

    let err = operation(&workflow).expect_err("committing");
    assert!(matches!(
        err,
        CaptureError::InvalidState {
            state: CaptureState::Committing,
            ..
        }
    ));
    assert_eq!(workflow.state(), CaptureState::Committing);
}

#[rstest]
#[tokio::test]
async fn result_arriving_while_committing_is_discarded() {
    let workflow = park();
    let session = workflow.begin_capture().expect("begin");
    force_state(&workflow, CaptureState::Committing);

    let outcome = workflow.settle(session, Device::Camera, |staged| {
        staged.photo = Some(PhotoRef::new("file:///late.jpg"));
    });
    assert_eq!(outcome, FetchOutcome::Discarded);
    assert!(workflow.candidate().expect("session").photo.is_none());
}

#[rstest]
#[case::theme("  Picnic ", None, "Picnic")]
#[case::address_summary(
    "",
    Some(Address {
        street: Some("Amphitheatre Pkwy".into()),
        city: Some("Mountain View".into()),
        ..Address::default()
    }),
    "Amphitheatre Pkwy Mountain View"
)]
#[case::fallback("   ", None, FALLBACK_NAME)]
fn commit_name_resolution(
    #[case] theme: &str,
    #[case] address: Option<Address>,
    #[case] expected: &str,
) {
    let staged = Candidate {
        location: Some(LocationFix {
            coords: Coordinates::new(0.0, 0.0).expect("coordinates"),
            address,
        }),
        photo: Some(PhotoRef::new("file:///p.jpg")),
    };
    let record = finished_record(theme, staged).expect("record");
    assert_eq!(record.name(), expected);
}

#[rstest]
#[tokio::test]
async fn ensure_permissions_reports_location_first() {
    let workflow = workflow(StubLocationProvider::denied(), StubCameraProvider::denied());
    let err = workflow.ensure_permissions().await.expect_err("denied");
    assert!(matches!(
        err,
        CaptureError::PermissionDenied {
            device: Device::Location
        }
    ));

    let granted = park();
    granted.ensure_permissions().await.expect("granted");
}

#[rstest]
#[tokio::test]
async fn retake_photo_replaces_only_the_photo() {
    let workflow = workflow(
        StubLocationProvider::at(0.0, 0.0),
        StubCameraProvider::with_photo("file:///retake.jpg"),
    );
    let created = workflow
        .store()
        .create(candidate("Park", 0.0, 0.0))
        .expect("create");
    let id = created[0].id();

    let PhotoUpdate::Updated(records) = workflow.retake_photo(id).await.expect("retake") else {
        panic!("expected an updated collection");
    };
    assert_eq!(records[0].name(), "Park");
    assert_eq!(records[0].photo().as_str(), "file:///retake.jpg");
    assert_eq!(workflow.state(), CaptureState::Idle);
}

#[rstest]
#[tokio::test]
async fn dismissed_retake_changes_nothing() {
    let workflow = workflow(StubLocationProvider::at(0.0, 0.0), StubCameraProvider::canceled());
    let created = workflow
        .store()
        .create(candidate("Park", 0.0, 0.0))
        .expect("create");
    let writes = workflow.store().backend().write_count();

    let outcome = workflow.retake_photo(created[0].id()).await.expect("retake");
    assert_eq!(outcome, PhotoUpdate::Canceled);
    assert_eq!(workflow.store().backend().write_count(), writes);
}
