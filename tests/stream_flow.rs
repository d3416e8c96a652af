//! End-to-end flow through the stream adapter into the broadcast dashboard.

use gate_host::domain::{HostEvent, ServerMessage};
use gate_host::link::command_channel;
use gate_host::server::BroadcastDashboard;
use gate_host::{LabelClock, SeriesWindow, ServoCommand, StreamAdapter};
use serde_json::json;
use tokio::sync::mpsc;

struct FixedClock;

impl LabelClock for FixedClock {
    fn label(&self) -> String {
        "12:00:00".to_string()
    }
}

#[tokio::test]
async fn readings_reach_clients_and_commands_reach_device() {
    let dashboard = BroadcastDashboard::new();
    let mut client = dashboard.subscribe();
    let latest = dashboard.latest();
    let (sink, mut device) = command_channel(4);
    let (tx, rx) = mpsc::channel(16);

    let adapter = StreamAdapter::new(SeriesWindow::new(3).unwrap(), dashboard, sink, FixedClock);

    for (dist, mov) in [(10, 0), (20, 1), (30, 0), (40, 1)] {
        tx.send(HostEvent::Sensor(json!({"dist": dist, "mov": mov}))).await.unwrap();
    }
    tx.send(HostEvent::Sensor(json!({"dist": "broken"}))).await.unwrap();
    tx.send(HostEvent::Command(ServoCommand { angle: 180.0 })).await.unwrap();
    drop(tx);

    let adapter = adapter.run(rx).await;
    assert_eq!(adapter.window().len(), 3);

    // four readings -> four status + four frame messages, malformed one dropped
    let mut frames = Vec::new();
    let mut statuses = 0;
    while let Ok(message) = client.try_recv() {
        match message {
            ServerMessage::Frame(frame) => frames.push(frame),
            ServerMessage::Status(_) => statuses += 1,
            ServerMessage::Connected { .. } => {}
        }
    }
    assert_eq!(frames.len(), 4);
    assert_eq!(statuses, 4);

    let last = frames.last().unwrap();
    assert!(!last.animation);
    assert_eq!(last.snapshot.distances, vec![20.0, 30.0, 40.0]);
    let indices: Vec<usize> = last.snapshot.markers.iter().map(|m| m.index).collect();
    assert_eq!(indices, vec![0, 2]);

    let view = latest.borrow().clone();
    assert_eq!(view.status.distance, "40 cm");
    assert_eq!(view.status.motion, "DETECTED");

    assert_eq!(device.recv().await, Some(ServoCommand { angle: 180.0 }));
}
