//! End-to-end voice session properties
//!
//! Drives the session controller with mock hosts, the synthetic camera,
//! and fixed detectors, asserting the host protocol invariants: exactly
//! one completion per session, progress cadence, and graceful degradation
//! on every failure path.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use lookout_gateway::capture::sim::{SimBehavior, SimFrameSource};
use lookout_gateway::config::AnalysisConfig;
use lookout_gateway::{AnalysisClient, FaceDetector, SessionController, VoiceCommand};

mod common;
use common::{FixedDetector, HostCall, MockHost, TrackingSource, face, test_config, who_is_in};

fn controller(
    source: Arc<dyn lookout_gateway::FrameSource>,
    detector: Arc<dyn FaceDetector>,
    pictures: &tempfile::TempDir,
) -> SessionController {
    SessionController::new(test_config(pictures.path().to_path_buf()), source, detector)
}

#[tokio::test]
async fn healthy_session_reports_faces_and_completes_once() {
    let pictures = tempfile::tempdir().unwrap();
    let source = Arc::new(SimFrameSource::new().with_cadence(Duration::from_millis(5)));
    let detector = Arc::new(FixedDetector::new(vec![face(30.0, "female")]));
    let host = Arc::new(MockHost::new(who_is_in("kitchen")));

    controller(source, Arc::clone(&detector) as Arc<dyn FaceDetector>, &pictures)
        .handle_invocation(Arc::clone(&host) as Arc<dyn lookout_gateway::VoiceHost>)
        .await
        .unwrap();

    let successes = host.successes();
    assert_eq!(successes.len(), 1);
    assert!(successes[0].contains("female"));
    assert!(successes[0].contains("30"));
    assert!(successes[0].contains("kitchen"));
    assert_eq!(host.completes.load(Ordering::SeqCst), 1);
    assert_eq!(detector.calls.load(Ordering::SeqCst), 1);

    // captured frame was persisted before upload
    assert!(pictures.path().read_dir().unwrap().next().is_some());
}

#[tokio::test]
async fn acknowledge_precedes_every_other_host_call() {
    let pictures = tempfile::tempdir().unwrap();
    let source = Arc::new(SimFrameSource::new());
    let detector = Arc::new(FixedDetector::new(Vec::new()));
    let host = Arc::new(MockHost::new(who_is_in("kitchen")));

    controller(source, detector, &pictures)
        .handle_invocation(Arc::clone(&host) as Arc<dyn lookout_gateway::VoiceHost>)
        .await
        .unwrap();

    let calls = host.calls();
    assert_eq!(calls[0], HostCall::Acknowledge);
    assert_eq!(*calls.last().unwrap(), HostCall::Complete);
}

#[tokio::test]
async fn unrecognized_command_short_circuits_to_app_launch() {
    let pictures = tempfile::tempdir().unwrap();
    let source = Arc::new(SimFrameSource::new());
    let detector = Arc::new(FixedDetector::new(vec![face(50.0, "male")]));
    let host = Arc::new(MockHost::new(VoiceCommand::with_slot(
        "showMeTheWeather",
        "location",
        "kitchen",
    )));

    controller(source, Arc::clone(&detector) as Arc<dyn FaceDetector>, &pictures)
        .handle_invocation(Arc::clone(&host) as Arc<dyn lookout_gateway::VoiceHost>)
        .await
        .unwrap();

    let calls = host.calls();
    assert!(calls.iter().any(|c| matches!(c, HostCall::Launch(_))));
    assert!(host.successes().is_empty());
    assert_eq!(host.completes.load(Ordering::SeqCst), 1);
    assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn no_matching_device_completes_imageless() {
    let pictures = tempfile::tempdir().unwrap();
    let source = Arc::new(SimFrameSource::new().without_devices());
    let detector = Arc::new(FixedDetector::new(vec![face(20.0, "female")]));
    let host = Arc::new(MockHost::new(who_is_in("kitchen")));

    controller(source, Arc::clone(&detector) as Arc<dyn FaceDetector>, &pictures)
        .handle_invocation(Arc::clone(&host) as Arc<dyn lookout_gateway::VoiceHost>)
        .await
        .unwrap();

    // no image means analysis is skipped and the count is zero
    assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    let successes = host.successes();
    assert_eq!(successes.len(), 1);
    assert!(successes[0].contains('0'));
    assert!(successes[0].contains("kitchen"));
    assert_eq!(host.completes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_stream_open_completes_imageless() {
    let pictures = tempfile::tempdir().unwrap();
    let source = Arc::new(SimFrameSource::new().with_behavior(SimBehavior::OpenFails));
    let detector = Arc::new(FixedDetector::new(Vec::new()));
    let host = Arc::new(MockHost::new(who_is_in("office")));

    controller(source, detector, &pictures)
        .handle_invocation(Arc::clone(&host) as Arc<dyn lookout_gateway::VoiceHost>)
        .await
        .unwrap();

    let successes = host.successes();
    assert_eq!(successes.len(), 1);
    assert!(successes[0].contains("0 persons in office"));
    assert_eq!(host.completes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transport_failure_degrades_to_zero_faces() {
    let pictures = tempfile::tempdir().unwrap();
    let source = Arc::new(SimFrameSource::new().with_cadence(Duration::from_millis(5)));
    // nothing listens on this port, so the request fails fast
    let client = AnalysisClient::new(&AnalysisConfig {
        endpoint: Some("http://127.0.0.1:9/face/v1.0".to_string()),
        key: Some(secrecy::SecretString::from("test-key".to_string())),
    })
    .unwrap();
    let host = Arc::new(MockHost::new(who_is_in("kitchen")));

    controller(source, Arc::new(client), &pictures)
        .handle_invocation(Arc::clone(&host) as Arc<dyn lookout_gateway::VoiceHost>)
        .await
        .unwrap();

    let successes = host.successes();
    assert_eq!(successes.len(), 1);
    assert!(successes[0].contains("0 persons"));
    assert_eq!(host.completes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_success_report_still_completes_once() {
    let pictures = tempfile::tempdir().unwrap();
    let source = Arc::new(SimFrameSource::new().with_cadence(Duration::from_millis(5)));
    let detector = Arc::new(FixedDetector::new(vec![face(30.0, "female")]));
    let host = Arc::new(MockHost::new(who_is_in("kitchen")).with_failing_delivery());

    let result = controller(source, detector, &pictures)
        .handle_invocation(Arc::clone(&host) as Arc<dyn lookout_gateway::VoiceHost>)
        .await;

    // the delivery error surfaces, but completion is still owed
    assert!(result.is_err());
    assert_eq!(host.completes.load(Ordering::SeqCst), 1);
    assert_eq!(*host.calls().last().unwrap(), HostCall::Complete);
}

#[tokio::test]
async fn failed_launch_request_still_completes_once() {
    let pictures = tempfile::tempdir().unwrap();
    let source = Arc::new(SimFrameSource::new());
    let detector = Arc::new(FixedDetector::new(Vec::new()));
    let host = Arc::new(
        MockHost::new(VoiceCommand::with_slot("showMeTheWeather", "location", "kitchen"))
            .with_failing_delivery(),
    );

    let result = controller(source, detector, &pictures)
        .handle_invocation(Arc::clone(&host) as Arc<dyn lookout_gateway::VoiceHost>)
        .await;

    assert!(result.is_err());
    assert_eq!(host.completes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancellation_yields_exactly_one_completion_and_releases_stream() {
    let pictures = tempfile::tempdir().unwrap();
    // stream opens but never delivers, so the session parks at the gate
    let source = TrackingSource::new(SimFrameSource::new().with_behavior(SimBehavior::NeverDelivers));
    let stops = Arc::clone(&source.stops);
    let detector = Arc::new(FixedDetector::new(Vec::new()));
    let host = Arc::new(MockHost::new(who_is_in("kitchen")));

    let controller = controller(Arc::new(source), detector, &pictures);
    let host_for_session = Arc::clone(&host) as Arc<dyn lookout_gateway::VoiceHost>;
    let session = tokio::spawn(async move { controller.handle_invocation(host_for_session).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    host.cancel();
    session.await.unwrap().unwrap();

    assert!(host.successes().is_empty());
    assert_eq!(host.completes.load(Ordering::SeqCst), 1);
    assert_eq!(stops.load(Ordering::SeqCst), 1, "stream not released");
}

#[tokio::test]
async fn repeated_cancellation_does_not_duplicate_completion() {
    let pictures = tempfile::tempdir().unwrap();
    let source = Arc::new(SimFrameSource::new().with_behavior(SimBehavior::NeverDelivers));
    let detector = Arc::new(FixedDetector::new(Vec::new()));
    let host = Arc::new(MockHost::new(who_is_in("kitchen")));

    let controller = controller(source, detector, &pictures);
    let host_for_session = Arc::clone(&host) as Arc<dyn lookout_gateway::VoiceHost>;
    let session = tokio::spawn(async move { controller.handle_invocation(host_for_session).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    host.cancel();
    host.cancel();
    host.cancel();
    session.await.unwrap().unwrap();

    assert_eq!(host.completes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn heartbeat_keeps_reporting_during_a_slow_network_call() {
    let pictures = tempfile::tempdir().unwrap();
    let source = Arc::new(SimFrameSource::new().with_cadence(Duration::from_millis(5)));
    let detector = Arc::new(FixedDetector::new(Vec::new()).with_delay(Duration::from_millis(300)));
    let host = Arc::new(MockHost::new(who_is_in("kitchen")));

    controller(source, detector, &pictures)
        .handle_invocation(Arc::clone(&host) as Arc<dyn lookout_gateway::VoiceHost>)
        .await
        .unwrap();

    // period is 50ms; a 300ms detection must not starve progress
    assert!(
        host.progress_count() >= 3,
        "only {} progress reports",
        host.progress_count()
    );
    assert_eq!(host.completes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn progress_carries_camera_prefix_once_streaming() {
    let pictures = tempfile::tempdir().unwrap();
    let source = Arc::new(SimFrameSource::new().with_cadence(Duration::from_millis(5)));
    let detector = Arc::new(FixedDetector::new(Vec::new()).with_delay(Duration::from_millis(150)));
    let host = Arc::new(MockHost::new(who_is_in("kitchen")));

    controller(source, detector, &pictures)
        .handle_invocation(Arc::clone(&host) as Arc<dyn lookout_gateway::VoiceHost>)
        .await
        .unwrap();

    let camera_on = host.calls().iter().any(|c| {
        matches!(c, HostCall::Progress(text) if text.starts_with("Camera on: "))
    });
    assert!(camera_on, "no progress carried the camera prefix");
}
