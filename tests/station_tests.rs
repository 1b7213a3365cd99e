//! Integration tests for the command station

use rs_cmdstation::hal::{MemoryStore, MockHardware};
use rs_cmdstation::{CommandStation, Entity, FrameExtractor, StationConfig};

fn station_over(store: &MemoryStore, config: StationConfig) -> (MockHardware, CommandStation) {
    let mock = MockHardware::new();
    let mut station = CommandStation::new(config, mock.hardware(), Box::new(store.clone()));
    station.init();
    (mock, station)
}

#[test]
fn layout_survives_restart() {
    let store = MemoryStore::new();
    let (_mock, mut station) = station_over(&store, StationConfig::default());

    assert_eq!(station.dispatch("T 1 2 1"), "<O>");
    assert_eq!(station.dispatch("Z 5 12 0"), "<O>");
    assert_eq!(station.dispatch("S 1 21 1"), "<O>");
    assert_eq!(station.dispatch("T 1 1"), "<H 1 1>");
    assert_eq!(station.dispatch("Z 5 1"), "<Y 5 0>");
    assert_eq!(station.dispatch("E"), "<e 1 1 1>");
    assert!(!station.ctx.is_dirty());

    let (mock, mut restarted) = station_over(&store, StationConfig::default());
    assert_eq!(restarted.dispatch("T"), "<H 1 2 1 1>");
    assert_eq!(restarted.dispatch("Z"), "<Y 5 12 0 1>");
    assert_eq!(restarted.dispatch("S"), "<Q 1 21 1>");
    assert!(mock.pins.level(12));
    assert_eq!(mock.pins.input_pull_up(21), Some(true));
}

#[test]
fn unsaved_changes_are_lost_on_restart() {
    let store = MemoryStore::new();
    let (_mock, mut station) = station_over(&store, StationConfig::default());

    station.dispatch("Z 5 12 0");
    station.dispatch("E");
    station.dispatch("Z 5 1");
    assert!(station.ctx.is_dirty());

    let (mock, mut restarted) = station_over(&store, StationConfig::default());
    assert_eq!(restarted.dispatch("Z"), "<Y 5 12 0 0>");
    assert!(!mock.pins.level(12));
}

#[test]
fn forced_outputs_ignore_saved_state() {
    let store = MemoryStore::new();
    let (_mock, mut station) = station_over(&store, StationConfig::default());

    // Forced active, switched off before saving
    station.dispatch("Z 2 13 6");
    station.dispatch("Z 2 0");
    // Forced inactive, switched on before saving
    station.dispatch("Z 3 14 2");
    station.dispatch("Z 3 1");
    station.dispatch("E");

    let (mock, restarted) = station_over(&store, StationConfig::default());
    assert!(restarted.ctx.outputs.get(2).is_some_and(|o| o.is_active()));
    assert!(restarted.ctx.outputs.get(3).is_some_and(|o| !o.is_active()));
    assert!(mock.pins.level(13));
    assert!(!mock.pins.level(14));
}

#[test]
fn inverted_output_drives_low() {
    let store = MemoryStore::new();
    let (mock, mut station) = station_over(&store, StationConfig::default());

    station.dispatch("Z 1 16 1");
    assert_eq!(station.dispatch("Z 1 1"), "<Y 1 0>");
    assert!(!mock.pins.level(16));
    assert_eq!(station.dispatch("Z 1 0"), "<Y 1 1>");
    assert!(mock.pins.level(16));
}

#[test]
fn sensor_state_is_not_restored() {
    let store = MemoryStore::new();
    let (mock, mut station) = station_over(&store, StationConfig::default());

    station.dispatch("S 4 22 0");
    mock.pins.set_input(22, true);
    let events = station.ctx.sensors.poll(&mut station.ctx.hw);
    assert_eq!(events, vec!["<Q 4>"]);
    station.dispatch("E");

    let (_mock, restarted) = station_over(&store, StationConfig::default());
    assert!(restarted.ctx.sensors.get(4).is_some_and(|s| !s.is_active()));
}

#[test]
fn disabled_kinds_are_not_loaded_or_stored() {
    let store = MemoryStore::new();
    let (_mock, mut station) = station_over(&store, StationConfig::default());
    station.dispatch("Z 5 12 0");
    station.dispatch("S 1 21 0");
    station.dispatch("T 1 1 0");
    station.dispatch("E");

    let mut features = StationConfig::default().features;
    features.outputs = false;
    features.sensors = false;
    let config = StationConfig::default().with_features(features);

    let (_mock, mut restarted) = station_over(&store, config);
    assert_eq!(restarted.dispatch("Z 5 1"), "<X>");
    assert_eq!(restarted.dispatch("S"), "<X>");
    assert_eq!(restarted.dispatch("E"), "<e 1 0 0>");
    assert!(!restarted.dispatch("s").contains("<Y"));
}

#[test]
fn frames_split_across_reads() {
    let store = MemoryStore::new();
    let (_mock, mut station) = station_over(&store, StationConfig::default());
    let mut extractor: FrameExtractor = FrameExtractor::new();

    let stream = b"<Z 1 16 0><Z 1 1>\r\n<T 2 17 0><T 2 1>";
    let mut responses = String::new();
    for byte in stream {
        responses.push_str(&station.feed(&mut extractor, std::slice::from_ref(byte)));
    }

    assert_eq!(responses, "<O><Y 1 0><O><H 2 1>");
    assert_eq!(extractor.pending(), 0);
}

#[test]
fn oversized_frame_is_dropped_and_stream_recovers() {
    let store = MemoryStore::new();
    let (_mock, mut station) = station_over(&store, StationConfig::default());
    let mut extractor: FrameExtractor<16> = FrameExtractor::new();

    let mut oversized = b"<Z 1 16 0 ".to_vec();
    oversized.extend(std::iter::repeat(b'9').take(40));
    assert_eq!(station.feed(&mut extractor, &oversized), "");
    assert!(extractor.dropped_bytes() > 0);

    assert_eq!(station.feed(&mut extractor, b"><F>"), "<f 180000>");
    assert!(station.ctx.outputs.is_empty());
}

#[test]
fn unknown_and_empty_commands_fail() {
    let store = MemoryStore::new();
    let (_mock, mut station) = station_over(&store, StationConfig::default());
    let mut extractor: FrameExtractor = FrameExtractor::new();

    assert_eq!(station.feed(&mut extractor, b"<q 1>"), "<X>");
    assert_eq!(station.feed(&mut extractor, b"<>"), "<X>");
    assert_eq!(station.feed(&mut extractor, b"<   >"), "<X>");
}

#[test]
fn each_registered_id_is_unique() {
    let station = CommandStation::with_mocks(StationConfig::default());
    let mut ids: Vec<&str> = station.registry.ids().collect();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), total);
    assert!(ids.contains(&"estop"));
    assert!(ids.contains(&"Tex"));
}

#[test]
fn outputs_and_sensors_never_share_a_pin() {
    let store = MemoryStore::new();
    let (_mock, mut station) = station_over(&store, StationConfig::default());

    assert_eq!(station.dispatch("Z 1 16 0"), "<O>");
    assert_eq!(station.dispatch("S 1 16 0"), "<X>");
    assert_eq!(station.dispatch("S 1 17 0"), "<O>");
    assert_eq!(station.dispatch("Z 1 17 0"), "<X>");
    // Restricted boot pins are refused for both
    assert_eq!(station.dispatch("Z 2 6 0"), "<X>");
    assert_eq!(station.dispatch("S 2 6 0"), "<X>");
}

#[test]
fn erase_then_restart_is_empty() {
    let store = MemoryStore::new();
    let (_mock, mut station) = station_over(&store, StationConfig::default());
    station.dispatch("T 1 1 0");
    station.dispatch("Z 5 12 0");
    station.dispatch("E");
    assert_eq!(station.dispatch("e"), "<O>");

    let (_mock, restarted) = station_over(&store, StationConfig::default());
    assert!(restarted.ctx.turnouts.is_empty());
    assert!(restarted.ctx.outputs.is_empty());
}

#[test]
fn corrupt_document_loads_nothing() {
    let store = MemoryStore::new();
    store.insert("turnouts", b"{ not json".to_vec());
    store.insert(
        "outputs",
        br#"{"count": 2, "entities": [{"id": 1, "pin": 12}, {"id": 1, "pin": 13}]}"#.to_vec(),
    );

    let (_mock, station) = station_over(&store, StationConfig::default());
    assert!(station.ctx.turnouts.is_empty());
    // Repeated ids keep the first record
    assert_eq!(station.ctx.outputs.len(), 1);
    assert_eq!(station.ctx.outputs.get(1).map(|o| o.pin()), Some(12));
}
