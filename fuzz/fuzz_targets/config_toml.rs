#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(settings) = mqtt_load_generator::fuzzing::settings_from_toml(input) {
            debug_assert!(settings.client_count >= 1);
            debug_assert!(!settings.connect_timeout.is_zero());
            if settings.message_count == 0 {
                debug_assert_eq!(settings.expected_publishes(), 0);
            }
        }
    }
});
