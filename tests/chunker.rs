use pagelens::chunker::ChunkerConfig;
use proptest::prelude::*;

// Generators for window/overlap pairs and text of arbitrary unicode.

fn config_strategy() -> impl Strategy<Value = ChunkerConfig> {
    (2usize..256).prop_flat_map(|max_chars| {
        (Just(max_chars), 0usize..max_chars)
            .prop_map(|(max_chars, overlap)| ChunkerConfig::new(max_chars, overlap).unwrap())
    })
}

proptest! {
    #[test]
    fn prop_every_chunk_fits_the_window(
        config in config_strategy(),
        text in ".{0,2000}",
    ) {
        for chunk in config.split(&text) {
            prop_assert!(chunk.text.chars().count() <= config.max_chars());
        }
    }

    #[test]
    fn prop_dropping_overlaps_reconstructs_the_text(
        config in config_strategy(),
        text in ".{0,2000}",
    ) {
        let chunks = config.split(&text);
        let mut rebuilt = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                rebuilt.push_str(&chunk.text);
            } else {
                let tail: String = chunk.text.chars().skip(config.overlap()).collect();
                rebuilt.push_str(&tail);
            }
        }
        prop_assert_eq!(rebuilt, text);
    }

    #[test]
    fn prop_short_text_is_one_chunk(
        config in config_strategy(),
        text in ".{1,64}",
    ) {
        prop_assume!(text.chars().count() <= config.max_chars());
        let chunks = config.split(&text);
        prop_assert_eq!(chunks.len(), 1);
        prop_assert_eq!(&chunks[0].text, &text);
    }
}

#[test]
fn default_window_splits_ten_thousand_chars_into_three() {
    let text: String = ('a'..='z').cycle().take(10_000).collect();
    let chunks = ChunkerConfig::default().split(&text);
    assert_eq!(chunks.len(), 3);

    // Window math: [0, 4096), [3996, 8092), [7992, 10000).
    assert_eq!(chunks[0].text.chars().count(), 4096);
    assert_eq!(chunks[1].text.chars().count(), 4096);
    assert_eq!(chunks[2].text.chars().count(), 2008);
}
