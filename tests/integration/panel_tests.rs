//! Panel reconciliation tests against the simulated daemon

use deckshot_panel::panel::view::Row;
use deckshot_panel::{Config, ConfigState, Gateway, MockGateway, Panel, PanelHandle, RunState};
use deckshot_protocol::ConfigSummary;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const TICK: Duration = Duration::from_secs(1);
const SETTLE: Duration = Duration::from_millis(1);

fn mount(gateway: &Arc<MockGateway>) -> PanelHandle {
    let config = Config::default();
    assert_eq!(config.poll_interval(), TICK);
    Panel::mount(Arc::clone(gateway) as Arc<dyn Gateway>, &config)
}

fn uploader_description(panel: &PanelHandle) -> String {
    panel
        .view()
        .content
        .rows
        .into_iter()
        .find_map(|row| match row {
            Row::Field { description, .. } => Some(description),
            _ => None,
        })
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_poll_sequence_with_failure() {
    let gateway = Arc::new(MockGateway::new(false).script_queries([
        Some(true),
        Some(true),
        None,
        Some(true),
    ]));
    let panel = mount(&gateway);

    let mut seen = vec![panel.state()];
    tokio::time::sleep(SETTLE).await;
    seen.push(panel.state());
    for _ in 0..3 {
        tokio::time::sleep(TICK).await;
        seen.push(panel.state());
    }

    assert_eq!(
        seen,
        vec![
            RunState::Stopped,
            RunState::Running,
            RunState::Running,
            RunState::Running,
            RunState::Running,
        ]
    );
    assert_eq!(gateway.query_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_poll_overwrites_and_failure_retains() {
    let gateway = Arc::new(MockGateway::new(false).script_queries([Some(true), Some(false), None]));
    let panel = mount(&gateway);

    tokio::time::sleep(SETTLE).await;
    assert_eq!(panel.state(), RunState::Running);
    tokio::time::sleep(TICK).await;
    assert_eq!(panel.state(), RunState::Stopped);
    tokio::time::sleep(TICK).await;
    assert_eq!(panel.state(), RunState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_is_optimistic() {
    let gateway = Arc::new(MockGateway::new(false).with_latency(Duration::from_millis(100)));
    let panel = mount(&gateway);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!panel.believed_running());

    panel.toggle();
    assert!(panel.believed_running());
    assert_eq!(gateway.toggle_calls(), 0);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(gateway.is_running());
    assert!(panel.believed_running());

    panel.toggle();
    assert!(!panel.believed_running());
}

#[tokio::test(start_paused = true)]
async fn test_failed_toggle_self_corrects() {
    let gateway = Arc::new(
        MockGateway::new(false)
            .script_queries([Some(false), Some(false)])
            .script_toggles([false]),
    );
    let panel = mount(&gateway);
    tokio::time::sleep(SETTLE).await;
    assert_eq!(panel.state(), RunState::Stopped);

    panel.toggle();
    assert_eq!(panel.state(), RunState::Running);

    tokio::time::sleep(SETTLE).await;
    assert_eq!(gateway.toggle_calls(), 1);
    assert_eq!(gateway.query_calls(), 2);
    assert_eq!(panel.state(), RunState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_noop_toggle_corrected_within_one_interval() {
    // Corrective poll fails, so only the next tick can restore the truth
    let gateway = Arc::new(
        MockGateway::new(false)
            .with_noop_toggle()
            .script_queries([Some(false), None]),
    );
    let panel = mount(&gateway);
    tokio::time::sleep(SETTLE).await;

    panel.toggle();
    tokio::time::sleep(SETTLE).await;
    assert_eq!(panel.state(), RunState::Running);

    tokio::time::sleep(TICK).await;
    assert_eq!(panel.state(), RunState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_external_stop_is_picked_up() {
    let gateway = Arc::new(MockGateway::new(true));
    let panel = mount(&gateway);
    tokio::time::sleep(SETTLE).await;
    assert!(panel.believed_running());

    gateway.set_running(false);
    tokio::time::sleep(TICK).await;
    assert!(!panel.believed_running());
}

#[tokio::test(start_paused = true)]
async fn test_unmount_stops_all_calls() {
    let gateway = Arc::new(MockGateway::new(false));
    let mut panel = mount(&gateway);
    tokio::time::sleep(TICK * 2).await;
    assert!(gateway.query_calls() >= 2);

    panel.unmount();
    assert!(!panel.is_mounted());
    let calls = gateway.total_calls();

    tokio::time::sleep(TICK * 2).await;
    assert_eq!(gateway.total_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_drop_tears_down() {
    let gateway = Arc::new(MockGateway::new(false));
    let panel = mount(&gateway);
    tokio::time::sleep(SETTLE).await;

    drop(panel);
    let calls = gateway.total_calls();
    tokio::time::sleep(TICK * 2).await;
    assert_eq!(gateway.total_calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_config_fetched_once() {
    let summary: ConfigSummary =
        serde_json::from_value(json!({ "uploader": { "kind": "s3", "bucket": "shots" } })).unwrap();
    let gateway = Arc::new(MockGateway::new(false).with_config(Some(summary.clone())));
    let panel = mount(&gateway);
    assert_eq!(panel.config(), ConfigState::Loading);

    tokio::time::sleep(TICK * 3).await;
    assert_eq!(panel.config(), ConfigState::Loaded(Some(summary)));
    assert_eq!(uploader_description(&panel), "s3");
    assert_eq!(gateway.config_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_absent_config_shows_placeholder() {
    let gateway = Arc::new(MockGateway::new(false).with_config(None));
    let panel = mount(&gateway);
    tokio::time::sleep(SETTLE).await;

    assert_eq!(panel.config(), ConfigState::Loaded(None));
    assert_eq!(uploader_description(&panel), "N/A");
}

#[tokio::test(start_paused = true)]
async fn test_failed_config_shows_placeholder() {
    let gateway = Arc::new(MockGateway::new(false).with_failing_config());
    let panel = mount(&gateway);
    tokio::time::sleep(SETTLE).await;

    assert_eq!(panel.config(), ConfigState::Unavailable);
    assert_eq!(uploader_description(&panel), "N/A");
}

#[tokio::test(start_paused = true)]
async fn test_view_tracks_belief() {
    let gateway = Arc::new(MockGateway::new(true));
    let panel = mount(&gateway);

    let before = panel.view();
    assert_eq!(before.title, "Deckshot");
    assert!(matches!(&before.content.rows[0], Row::Toggle { checked: false, .. }));

    tokio::time::sleep(SETTLE).await;
    let after = panel.view();
    assert!(matches!(
        &after.content.rows[0],
        Row::Toggle { checked: true, description, .. } if description == "Deckshot is running"
    ));
}
