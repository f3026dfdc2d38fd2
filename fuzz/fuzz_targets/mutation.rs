#![no_main]

use libfuzzer_sys::fuzz_target;
use mqtt_load_generator::mutation::MutatorKind;

fuzz_target!(|data: &[u8]| {
    let [selector, s0, s1, s2, s3, s4, s5, s6, s7, rest @ ..] = data else {
        return;
    };
    let seed = u64::from_le_bytes([*s0, *s1, *s2, *s3, *s4, *s5, *s6, *s7]);
    let split = rest.len() / 2;
    let (head, payload) = rest.split_at(split);
    let topic = String::from_utf8_lossy(head);
    let disallowed = "+#";

    let sample =
        mqtt_load_generator::fuzzing::mutate_input(*selector, seed, disallowed, &topic, payload);

    assert_eq!(sample.topic.chars().count(), topic.chars().count());
    assert_eq!(sample.payload.len(), payload.len());
    for (before, after) in topic.chars().zip(sample.topic.chars()) {
        if before == after {
            continue;
        }
        assert!(!sample.disallowed.contains(after));
        assert!(u32::from(after) <= 0xFF);
        if sample.kind == MutatorKind::Alfa {
            assert!(after.is_ascii_alphanumeric());
        }
    }
    if sample.kind == MutatorKind::None {
        assert_eq!(sample.topic, topic);
        assert_eq!(sample.payload, payload);
    }
});
