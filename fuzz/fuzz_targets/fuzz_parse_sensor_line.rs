#![no_main]
use libfuzzer_sys::fuzz_target;
use parkgate::link::{SensorState, parse_sensor_line};
use parkgate::recognizer::normalize_plate_text;

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);

    if let Some(event) = parse_sensor_line(&line) {
        // Only the four known prefixes may produce an event
        let t = line.trim();
        let expected = if event.state == SensorState::Occupied { ":0" } else { ":1" };
        assert!(t.starts_with(event.lane.as_str().to_uppercase().as_str()));
        assert!(t.contains(expected));
    }

    let plate = normalize_plate_text(&line.split('|').collect::<Vec<_>>());
    assert!(!plate.contains('\n') && !plate.contains('\r'));
});
