#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(settings) = mqtt_load_generator::fuzzing::settings_from_json(input) {
            debug_assert!(settings.client_count >= 1);
            debug_assert!(settings.port != 0);
        }
    }
});
