#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = mqtt_load_generator::fuzzing::decode_packet_input(data);
});
