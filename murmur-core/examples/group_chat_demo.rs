//! Two members chatting in an in-memory group
//!
//! Run with:
//! ```bash
//! MURMUR_LOG_LEVEL=debug cargo run --example group_chat_demo
//! ```

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

use murmur_core::codecs::{Reaction, ReactionAction, ReactionSchema};
use murmur_core::config::ClientConfig;
use murmur_core::logging::{init_logging_with_config, LogConfig};
use murmur_core::test_utils::encoded_text;
use murmur_core::{
    Client, ContentTypeId, InMemoryEngine, MemoryConsentBackend, MessageFilter, SendOptions,
    SortDirection,
};
use tracing::info;

const ALICE: &str = "0xA11CEa11cea11cea11cea11cea11cea11cea11c";
const BOB: &str = "0xB0Bb0bb0bb0bb0bb0bb0bb0bb0bb0bb0bb0bb0b";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::from_env().context("loading configuration")?;
    init_logging_with_config(LogConfig::try_from(&config.logging)?)?;
    murmur_core::metrics::init_metrics();

    let client = Client::builder(ALICE)
        .config(config)
        .consent_backend(Arc::new(MemoryConsentBackend::new()))
        .build()?;
    let engine = Arc::new(InMemoryEngine::new(ALICE).with_members([BOB]).with_name("demo"));
    let group = client.group(engine.clone());

    info!(group_id = %group.id(), topic = %group.topic(), peers = ?group.peer_addresses(), "Group ready");

    let mut stream = group.stream_messages().await?;

    let greeting = group.send("hello bob", None).await?;
    engine.receive(BOB, encoded_text("hi alice!"));

    let reaction = Reaction {
        reference: greeting.clone(),
        action: ReactionAction::Added,
        schema: ReactionSchema::Unicode,
        content: "👋".to_string(),
    };
    group.send(reaction, Some(SendOptions::content_type(ContentTypeId::reaction()))).await?;

    for _ in 0..3 {
        let next = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .context("waiting for live message")?;
        let Some(message) = next else { break };
        info!(
            from = %message.sender_address,
            content = ?message.content,
            fallback = ?message.fallback,
            "Live message"
        );
    }
    group.end_stream();

    let history = group.messages(MessageFilter::new().direction(SortDirection::Ascending)).await?;
    for message in &history {
        println!("{} {}: {:?}", message.sent_at.to_rfc3339(), message.sender_address, message.content);
    }

    info!(
        allowed = client.consent().is_group_allowed(group.id()).await?,
        messages = history.len(),
        "Demo finished"
    );
    Ok(())
}
