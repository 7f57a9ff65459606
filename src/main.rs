//! Headless walk-through of a chat session against an in-process frame.
//!
//! Run with `RUST_LOG=debug` to see the connection lifecycle.

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use std::rc::Rc;

    use anyhow::Context;
    use blipchat::{AuthConfig, BlipChatWidget, EventHooks, Headless, WidgetConfig};
    use blipchat_client::dispatcher::origin_of;
    use blipchat_client::{LoopbackTransport, MemoryStore};
    use blipchat_shared::{InboundEnvelope, NotificationBatch};
    use serde_json::json;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blipchat=debug,blipchat_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app_key = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ZGVtb2JvdDpzZWNyZXQ=".to_string());

    let mut config = WidgetConfig::new(app_key).with_events(
        EventHooks::new()
            .with_on_enter(|| tracing::info!("host: chat opened"))
            .with_on_leave(|| tracing::info!("host: chat closed"))
            .with_on_load(|| tracing::info!("host: chat loaded")),
    );
    if let Ok(identity) = std::env::var("BLIP_CHAT_USER") {
        let password = std::env::var("BLIP_CHAT_PASSWORD").unwrap_or_default();
        config = config.with_auth(AuthConfig::dev(identity, password));
    }

    let transport = Rc::new(LoopbackTransport::new());
    let widget = BlipChatWidget::with_parts(
        config,
        transport.clone(),
        Rc::new(MemoryStore::new()),
        Rc::new(Headless),
    );
    let origin = origin_of(widget.chat_url()).context("chat url has no origin")?;

    // Sent before anything is open; held until the frame connects.
    widget.send_message(json!("Hello from the demo"));
    widget.send_command(json!({ "method": "get", "uri": "/account" }));

    widget.open_chat();
    transport.complete_load();
    transport.deliver(&origin, InboundEnvelope::Ready);
    transport.deliver(&origin, InboundEnvelope::Connected);

    widget.close_chat();
    transport.deliver(
        &origin,
        InboundEnvelope::Notification {
            message_data: NotificationBatch::new(3),
        },
    );
    tracing::info!(unread = widget.unread_count(), "after notifications");

    for sent in transport.sent() {
        println!(
            "-> {} {}",
            sent.target_origin,
            sent.envelope.to_json().context("encode envelope")?
        );
    }

    widget.destroy();
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {}
