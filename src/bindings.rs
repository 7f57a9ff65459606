//! JavaScript entry point.
//!
//! ```js
//! const chat = new BlipChat({
//!   appKey: "…",
//!   target: "chat-box",
//!   authConfig: { authType: "Dev", userIdentity: "alice", userPassword: "…" },
//!   events: { onEnter() {}, onLeave() {}, onLoad() {} },
//! });
//! chat.sendMessage("hello");
//! ```

use std::rc::Rc;

use anyhow::{anyhow, Context};
use blipchat_client::transport::posted_value;
use blipchat_client::{EventHooks, Hook};
use blipchat_shared::{AuthConfig, Environment};
use js_sys::{Function, Reflect, JSON};
use serde::Deserialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::config::{ButtonConfig, WidgetConfig};
use crate::widget::BlipChatWidget;

/// Serializable part of the options object. Event hooks are read separately.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlipChatOptions {
    app_key: String,
    #[serde(default)]
    button_config: Option<ButtonConfig>,
    #[serde(default)]
    auth_config: Option<AuthConfig>,
    #[serde(default)]
    account: Option<Value>,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    environment: Option<String>,
    #[serde(default)]
    verify_origin: Option<bool>,
}

fn parse_options(options: &JsValue) -> anyhow::Result<WidgetConfig> {
    let json = JSON::stringify(options)
        .map_err(|e| anyhow!("options are not serializable: {:?}", e))?
        .as_string()
        .context("options must be an object")?;
    let parsed: BlipChatOptions =
        serde_json::from_str(&json).context("invalid chat options")?;

    let mut config = WidgetConfig::new(parsed.app_key).with_events(read_events(options));
    if let Some(button) = parsed.button_config {
        config = config.with_button(button);
    }
    if let Some(auth) = parsed.auth_config {
        config = config.with_auth(auth);
    }
    if let Some(account) = parsed.account {
        config = config.with_account(account);
    }
    if let Some(target) = parsed.target {
        config = config.with_target(target);
    }
    if let Some(name) = parsed.environment {
        let environment: Environment = name
            .parse()
            .map_err(|e| anyhow!("{}", e))
            .context("invalid environment")?;
        config = config.with_environment(environment);
    }
    if let Some(verify) = parsed.verify_origin {
        config = config.with_verify_origin(verify);
    }
    Ok(config)
}

fn read_events(options: &JsValue) -> EventHooks {
    let Ok(events) = Reflect::get(options, &JsValue::from_str("events")) else {
        return EventHooks::default();
    };
    if !events.is_object() {
        return EventHooks::default();
    }
    EventHooks {
        on_enter: read_hook(&events, "onEnter"),
        on_leave: read_hook(&events, "onLeave"),
        on_load: read_hook(&events, "onLoad"),
    }
}

fn read_hook(events: &JsValue, name: &str) -> Option<Hook> {
    let function: Function = Reflect::get(events, &JsValue::from_str(name))
        .ok()?
        .dyn_into()
        .ok()?;
    let name = name.to_string();
    Some(Rc::new(move || {
        if let Err(e) = function.call0(&JsValue::NULL) {
            blipchat_client::log_error!("{} threw: {:?}", name, e);
        }
    }))
}

/// Strings pass through as-is; anything else goes through JSON. Values with
/// no JSON form (`undefined`, functions) yield `None`.
fn to_value(value: &JsValue) -> Option<Value> {
    if let Some(text) = value.as_string() {
        return Some(Value::String(text));
    }
    let json = JSON::stringify(value).ok().and_then(|json| json.as_string());
    posted_value(json.as_deref())
}

#[wasm_bindgen]
pub struct BlipChat {
    widget: BlipChatWidget,
}

#[wasm_bindgen]
impl BlipChat {
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<BlipChat, JsError> {
        let config = parse_options(&options).map_err(|e| JsError::new(&format!("{:#}", e)))?;
        let widget = BlipChatWidget::mount(config).map_err(|e| JsError::new(&e.to_string()))?;
        Ok(BlipChat { widget })
    }

    /// Strings go out as plain text; anything else as JSON.
    #[wasm_bindgen(js_name = sendMessage)]
    pub fn send_message(&self, content: JsValue) {
        match to_value(&content) {
            Some(content) => self.widget.send_message(content),
            None => blipchat_client::log_warn!("sendMessage: nothing to send, dropping"),
        }
    }

    #[wasm_bindgen(js_name = sendCommand)]
    pub fn send_command(&self, command: JsValue) {
        match to_value(&command) {
            Some(command) => self.widget.send_command(command),
            None => blipchat_client::log_warn!("sendCommand: nothing to send, dropping"),
        }
    }

    #[wasm_bindgen(js_name = openChat)]
    pub fn open_chat(&self) {
        self.widget.open_chat();
    }

    #[wasm_bindgen(js_name = closeChat)]
    pub fn close_chat(&self) {
        self.widget.close_chat();
    }

    #[wasm_bindgen(js_name = toggleChat)]
    pub fn toggle_chat(&self) {
        self.widget.toggle_chat();
    }

    #[wasm_bindgen(getter, js_name = unreadCount)]
    pub fn unread_count(&self) -> u32 {
        self.widget.unread_count()
    }

    pub fn destroy(&self) {
        self.widget.destroy();
    }
}
