use fabstir_websearch::compress::{CompressConfig, CompressStrategy, ContextCompressor, Splitter};
use proptest::prelude::*;

fn splitter() -> impl Strategy<Value = Splitter> {
    prop_oneof![Just(Splitter::Simple), Just(Splitter::FineGrained)]
}

fn document() -> impl Strategy<Value = String> {
    "[a-z强化学习环境奖励 ,.!?。！？；\n#]{0,600}"
}

proptest! {
    #[test]
    fn segments_partition_the_text(text in document(), splitter in splitter()) {
        let joined: String = splitter.segments(&text).concat();
        prop_assert_eq!(joined, text);
    }

    #[test]
    fn scored_segments_cover_the_text(text in document(), splitter in splitter()) {
        let compressor = ContextCompressor::new(CompressConfig::default().with_splitter(splitter));
        let scored = compressor.score_segments("强化学习 reward", &text);
        let joined: String = scored.iter().map(|s| s.text.as_str()).collect();
        prop_assert_eq!(joined, text);
        prop_assert!(scored.iter().all(|s| s.score >= 0.0));
    }

    #[test]
    fn output_never_exceeds_budget(
        text in document(),
        query in "[a-z强化学习 ]{0,12}",
        max_chars in 1usize..400,
        splitter in splitter(),
    ) {
        let config = CompressConfig::default()
            .with_max_chars(max_chars)
            .with_splitter(splitter);
        let result = ContextCompressor::new(config).compress_detailed(&query, &text).unwrap();
        prop_assert!(result.text.chars().count() <= max_chars);
    }

    #[test]
    fn ranked_output_is_selected_segments_in_order(
        text in document(),
        max_chars in 1usize..200,
    ) {
        let config = CompressConfig::default().with_max_chars(max_chars);
        let result = ContextCompressor::new(config).compress_detailed("强化学习", &text).unwrap();
        if result.strategy == CompressStrategy::Ranked {
            prop_assert!(result.segments.windows(2).all(|w| w[0].index < w[1].index));
            let joined: String = result.segments.iter().map(|s| s.text.as_str()).collect();
            prop_assert_eq!(joined, result.text);
        }
    }
}
