#![no_main]

use libfuzzer_sys::fuzz_target;
use mqtt_load_generator::broker::QoS;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let tokens = input
            .split_whitespace()
            .take(64)
            .map(str::to_owned)
            .collect::<Vec<_>>();
        if let Ok(settings) = mqtt_load_generator::fuzzing::settings_from_cli(tokens) {
            debug_assert!(settings.client_count >= 1);
            debug_assert!(settings.port != 0);
            debug_assert!(!settings.host.trim().is_empty());
            debug_assert!(QoS::from_u8(settings.qos.as_u8()).is_some());
            debug_assert!((0.0..=1.0).contains(&settings.mutation.rate()));
        }
    }
});
