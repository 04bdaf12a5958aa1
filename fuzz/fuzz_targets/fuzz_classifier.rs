#![no_main]
use libfuzzer_sys::fuzz_target;
use planchat::agent::{suggest_actions, KeywordClassifier, MatchMode, QueryClassifier};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    for mode in [MatchMode::Substring, MatchMode::Word] {
        let classifier = KeywordClassifier::new(
            planchat::agent::classifier::DEFAULT_WRITE_KEYWORDS,
            mode,
        );
        let _ = classifier.classify(&text);
    }
    let _ = suggest_actions(&text);
});
