//! Property tests for content codecs and history ordering

use std::sync::Arc;

use murmur_core::codecs::{
    CodecRegistry, Compression, Content, ContentTypeId, Reaction, ReactionAction, ReactionSchema,
};
use murmur_core::test_utils::{encoded_text, TestGroupBuilder, ALICE, BOB};
use murmur_core::{MessageFilter, SendOptions, SortDirection};
use proptest::prelude::*;

fn compression() -> impl Strategy<Value = Option<Compression>> {
    prop_oneof![Just(None), Just(Some(Compression::Deflate)), Just(Some(Compression::Gzip))]
}

fn reaction() -> impl Strategy<Value = Reaction> {
    (
        "[0-9a-f]{32}",
        prop_oneof![Just(ReactionAction::Added), Just(ReactionAction::Removed)],
        prop_oneof![
            Just(ReactionSchema::Unicode),
            Just(ReactionSchema::Shortcode),
            Just(ReactionSchema::Custom)
        ],
        "\\PC{1,8}",
    )
        .prop_map(|(reference, action, schema, content)| Reaction { reference, action, schema, content })
}

proptest! {
    #[test]
    fn text_round_trips(text in "\\PC*", compression in compression()) {
        let registry = Arc::new(CodecRegistry::new());
        let codec = registry.find(None);
        let mut encoded = codec.encode(&Content::Text(text.clone())).unwrap();
        if let Some(compression) = compression {
            encoded = encoded.compress(compression).unwrap();
        }

        let restored = encoded.decompress().unwrap();
        prop_assert_eq!(codec.decode(&restored).unwrap(), Content::Text(text));
    }

    #[test]
    fn reaction_round_trips(reaction in reaction(), compression in compression()) {
        let registry = CodecRegistry::new();
        let codec = registry.find(Some(&ContentTypeId::reaction()));
        let content = Content::Reaction(reaction);
        let mut encoded = codec.encode(&content).unwrap();
        if let Some(compression) = compression {
            encoded = encoded.compress(compression).unwrap();
        }

        prop_assert_eq!(codec.decode(&encoded.decompress().unwrap()).unwrap(), content);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn ascending_limit_is_reversed_descending(count in 0usize..12, limit in 1usize..15) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let fixture = TestGroupBuilder::new(ALICE).build();
            for i in 0..count {
                fixture.engine.receive_at(BOB, encoded_text(&format!("m{}", i)), 1_000 + i as i64);
            }

            let descending = fixture.group.messages(MessageFilter::new().limit(limit)).await.unwrap();
            let mut ascending = fixture
                .group
                .messages(MessageFilter::new().limit(limit).direction(SortDirection::Ascending))
                .await
                .unwrap();

            assert_eq!(descending.len(), count.min(limit));
            ascending.reverse();
            assert_eq!(ascending, descending);
        });
    }

    #[test]
    fn sent_text_lists_back(texts in prop::collection::vec("\\PC{0,40}", 1..6)) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let fixture = TestGroupBuilder::new(ALICE).build();
            for text in &texts {
                let options = SendOptions::default().with_compression(Compression::Deflate);
                fixture.group.send(text.as_str(), Some(options)).await.unwrap();
            }

            let listed = fixture
                .group
                .messages(MessageFilter::new().direction(SortDirection::Ascending))
                .await
                .unwrap();
            let listed: Vec<String> = listed.iter().filter_map(|m| m.text().map(str::to_string)).collect();
            assert_eq!(listed, texts);
        });
    }
}
