//! Playback of provider-hosted lessons through the embedded adapter
//!
//! The embedded frame only reports readiness, so these tests check the
//! reduced-fidelity behavior: optimistic transport, URL-driven resume and
//! bookmarks taken from the locally estimated position.

use lesson_player::{
    adapters::{Fidelity, embedded::EmbedCommand, simulated::SimulatedPlatform},
    config::Config,
    errors::PlayerError,
    models::{
        ActivityType, MediaReference, PlaybackPhase, PlayerSettings, Provider, SavedPosition,
    },
    player::{OpenRequest, PlayerController},
    services::{InMemoryProgressStore, InMemoryServices},
};
use std::{sync::Arc, time::Duration};
use tracing_test::traced_test;

const LESSON: &str = "lesson-yt";
const WATCH_URL: &str = "https://www.youtube.com/watch?v=abc123";

fn request(settings: PlayerSettings) -> OpenRequest {
    OpenRequest {
        student_id: "student-7".to_string(),
        lesson_id: LESSON.to_string(),
        reference: MediaReference::new(WATCH_URL),
        settings,
    }
}

async fn open_embedded(
    services: &InMemoryServices,
    settings: PlayerSettings,
) -> (PlayerController, SimulatedPlatform) {
    let mut platform = SimulatedPlatform::new(0.0);
    let mut controller = PlayerController::open(
        request(settings),
        &mut platform,
        services.service_set(),
        &Config::default(),
    )
    .await
    .expect("controller opens");
    controller.settle().await;
    (controller, platform)
}

fn query_value(url: &url::Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[tokio::test]
async fn test_embedded_source_mounts_frame_with_player_params() {
    let services = InMemoryServices::new();
    let (mut controller, platform) = open_embedded(&services, PlayerSettings::default()).await;

    assert_eq!(controller.source().provider, Provider::Embedded);
    assert_eq!(controller.fidelity(), Fidelity::LIFECYCLE_ONLY);
    assert_eq!(controller.state().phase, PlaybackPhase::Ready);
    assert!(!controller.state().duration_known());

    assert!(platform.embed().is_mounted());
    let src = platform.embed().src().expect("frame mounted with a source");
    assert_eq!(src.host_str(), Some("www.youtube.com"));
    assert_eq!(src.path(), "/embed/abc123");
    assert_eq!(query_value(&src, "enablejsapi").as_deref(), Some("1"));
    assert_eq!(query_value(&src, "autoplay").as_deref(), Some("0"));
    assert_eq!(query_value(&src, "playsinline").as_deref(), Some("1"));
    assert_eq!(query_value(&src, "start"), None);

    controller.shutdown().await;
    assert!(!platform.embed().is_mounted());
    assert_eq!(platform.embed().unmount_count(), 1);
}

#[tokio::test]
async fn test_embedded_play_is_optimistic() {
    let services = InMemoryServices::new();
    let (mut controller, platform) = open_embedded(&services, PlayerSettings::default()).await;
    platform.embed().set_delivering(false);

    controller.play().unwrap();
    controller.settle().await;
    assert_eq!(controller.state().phase, PlaybackPhase::Playing);
    assert!(controller.state().is_playing);

    controller.pause().unwrap();
    controller.settle().await;
    assert_eq!(controller.state().phase, PlaybackPhase::Paused);
    controller.shutdown().await;

    assert_eq!(
        services.activity.types().await,
        vec![ActivityType::Start, ActivityType::Pause]
    );
}

#[tokio::test]
async fn test_embedded_commands_reach_frame() {
    let services = InMemoryServices::new();
    let (mut controller, platform) = open_embedded(&services, PlayerSettings::default()).await;

    controller.play().unwrap();
    controller.seek(30.0).unwrap();
    controller.toggle_mute().unwrap();
    controller.settle().await;

    assert!(!controller.state().is_seeking);
    let delivered = platform.embed().delivered();
    assert!(delivered.contains(&EmbedCommand::Play));
    assert!(delivered.contains(&EmbedCommand::SeekTo(30.0)));
    assert!(delivered.contains(&EmbedCommand::Mute));
    controller.shutdown().await;
}

#[tokio::test]
async fn test_embedded_resume_uses_start_parameter() {
    let services = InMemoryServices {
        progress: Arc::new(InMemoryProgressStore::with_position(
            LESSON,
            SavedPosition {
                position: 95.0,
                duration: 300.0,
            },
        )),
        ..InMemoryServices::new()
    };
    let (mut controller, platform) = open_embedded(&services, PlayerSettings::default()).await;

    let src = platform.embed().src().unwrap();
    assert_eq!(query_value(&src, "start").as_deref(), Some("95"));
    assert!(
        !platform
            .embed()
            .delivered()
            .iter()
            .any(|c| matches!(c, EmbedCommand::SeekTo(_)))
    );
    controller.shutdown().await;
    assert!(services.activity.events().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_embedded_bookmark_uses_estimated_position() {
    let services = InMemoryServices::new();
    let (mut controller, _platform) = open_embedded(&services, PlayerSettings::default()).await;

    controller.play().unwrap();
    controller.settle().await;
    tokio::time::sleep(Duration::from_secs(12)).await;

    let bookmark = controller.bookmark().await.unwrap();
    assert!((bookmark.timestamp - 12.0).abs() < 0.5);
    controller.shutdown().await;

    assert_eq!(services.bookmarks.bookmarks().await.len(), 1);
}

#[tokio::test]
async fn test_embedded_frame_has_no_subtitle_tracks() {
    let services = InMemoryServices::new();
    let mut settings = PlayerSettings::default();
    settings.subtitles.enabled = true;
    settings.subtitles.language = "en".to_string();
    let (mut controller, _platform) = open_embedded(&services, settings).await;

    assert_eq!(controller.state().subtitle_language, None);
    assert!(matches!(
        controller.set_subtitles(Some("en")),
        Err(PlayerError::UnknownSubtitle { .. })
    ));
    controller.shutdown().await;
}

#[tokio::test]
async fn test_embedded_mount_failure_surfaces_error() {
    let services = InMemoryServices::new();
    let mut platform = SimulatedPlatform::new(0.0);
    platform.embed().fail_mount("frame blocked");
    let mut controller = PlayerController::open(
        request(PlayerSettings::default()),
        &mut platform,
        services.service_set(),
        &Config::default(),
    )
    .await
    .unwrap();
    controller.settle().await;

    assert_eq!(controller.state().phase, PlaybackPhase::Error);
    assert!(controller.state().error.is_some());
    controller.shutdown().await;
}

#[tokio::test]
#[traced_test]
async fn test_simulated_watch_skips_embedded_lessons() {
    let services = InMemoryServices::new();
    let (mut controller, platform) = open_embedded(&services, PlayerSettings::default()).await;
    controller.play().unwrap();
    controller.settle().await;

    let watched = platform.watch_lesson(&mut controller, 30.0, 0.25).await;
    assert_eq!(watched, 0.0);
    assert!(platform.element().snapshot().source.is_none());
    assert!(logs_contain("reports no playback time"));
    controller.shutdown().await;

    assert!(services.progress.writes().await.is_empty());
}
