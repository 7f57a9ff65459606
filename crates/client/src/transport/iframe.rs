//! WASM/Web transport: an `<iframe>` plus `window.postMessage`.

use std::cell::RefCell;
use std::rc::Rc;

use blipchat_shared::{OutboundEnvelope, WidgetError};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{js_sys, Element, HtmlIFrameElement, MessageEvent};

use super::{decode_posted, FrameTransport, InboundListener, InboundMessage, LoadCallback};

pub const FRAME_ID: &str = "blip-chat-iframe";

#[derive(Default)]
struct LoadState {
    loaded: bool,
    callbacks: Vec<LoadCallback>,
}

pub struct IframeTransport {
    container: Element,
    frame: RefCell<Option<HtmlIFrameElement>>,
    destination: RefCell<Option<String>>,
    load_state: Rc<RefCell<LoadState>>,
    load_handler: RefCell<Option<Closure<dyn FnMut(web_sys::Event)>>>,
    message_handler: RefCell<Option<Closure<dyn FnMut(MessageEvent)>>>,
}

impl IframeTransport {
    /// A transport whose frame will be appended to `container`.
    pub fn new(container: Element) -> Self {
        Self {
            container,
            frame: RefCell::new(None),
            destination: RefCell::new(None),
            load_state: Rc::new(RefCell::new(LoadState::default())),
            load_handler: RefCell::new(None),
            message_handler: RefCell::new(None),
        }
    }

    /// The frame element, once created.
    pub fn frame(&self) -> Option<HtmlIFrameElement> {
        self.frame.borrow().clone()
    }

    fn create_frame(&self, destination: &str) -> Result<HtmlIFrameElement, WidgetError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| WidgetError::transport("no document"))?;
        let frame = document
            .create_element("iframe")
            .map_err(|e| WidgetError::transport(format!("create iframe: {:?}", e)))?
            .dyn_into::<HtmlIFrameElement>()
            .map_err(|_| WidgetError::transport("created element is not an iframe"))?;

        frame.set_src(destination);
        frame.set_id(FRAME_ID);
        let _ = frame.set_attribute("frameborder", "0");
        let _ = frame.set_attribute("allow", "geolocation");

        let load_state = self.load_state.clone();
        let onload = Closure::wrap(Box::new(move |_: web_sys::Event| {
            let callbacks = {
                let mut state = load_state.borrow_mut();
                if state.loaded {
                    // Navigation inside the frame fires load again
                    return;
                }
                state.loaded = true;
                std::mem::take(&mut state.callbacks)
            };
            crate::log_debug!("Chat frame loaded");
            for callback in callbacks {
                callback();
            }
        }) as Box<dyn FnMut(web_sys::Event)>);
        frame.set_onload(Some(onload.as_ref().unchecked_ref()));
        *self.load_handler.borrow_mut() = Some(onload);

        self.container
            .append_child(&frame)
            .map_err(|e| WidgetError::transport(format!("append iframe: {:?}", e)))?;
        Ok(frame)
    }

    fn post(&self, envelope: &OutboundEnvelope) -> Result<(), WidgetError> {
        let frame = self.frame.borrow();
        let destination = self.destination.borrow();
        let (Some(frame), Some(destination)) = (frame.as_ref(), destination.as_ref()) else {
            crate::log_debug!("No chat frame yet, dropping {}", envelope.kind());
            return Ok(());
        };
        let window = frame
            .content_window()
            .ok_or_else(|| WidgetError::transport("frame has no content window"))?;
        let json = envelope.to_json()?;
        let message = js_sys::JSON::parse(&json)
            .map_err(|e| WidgetError::transport(format!("JSON.parse: {:?}", e)))?;
        window
            .post_message(&message, destination)
            .map_err(|e| WidgetError::transport(format!("postMessage: {:?}", e)))
    }

    fn detach_listener(&self) {
        let Some(handler) = self.message_handler.borrow_mut().take() else {
            return;
        };
        if let Some(window) = web_sys::window() {
            let _ = window
                .remove_event_listener_with_callback("message", handler.as_ref().unchecked_ref());
        }
    }
}

impl FrameTransport for IframeTransport {
    fn open(&self, destination: &str) {
        if self.frame.borrow().is_some() {
            return;
        }
        match self.create_frame(destination) {
            Ok(frame) => {
                crate::log_info!("Chat frame created for {}", destination);
                *self.frame.borrow_mut() = Some(frame);
                *self.destination.borrow_mut() = Some(destination.to_string());
            }
            Err(e) => crate::log_error!("Failed to create chat frame: {}", e),
        }
    }

    fn is_open(&self) -> bool {
        self.frame.borrow().is_some()
    }

    fn send(&self, envelope: &OutboundEnvelope) {
        if let Err(e) = self.post(envelope) {
            crate::log_error!("Failed to post {}: {}", envelope.kind(), e);
        }
    }

    fn on_receive(&self, listener: InboundListener) {
        self.detach_listener();

        let handler = Closure::wrap(Box::new(move |e: MessageEvent| {
            // `undefined` and functions stringify to `undefined`, not a string
            let text = js_sys::JSON::stringify(&e.data())
                .ok()
                .and_then(|text| text.as_string());
            match decode_posted(text.as_deref()) {
                Some(envelope) => listener(InboundMessage {
                    origin: e.origin(),
                    envelope,
                }),
                // Other scripts on the page post messages too
                None => crate::log_debug!("Ignoring non-envelope message from {}", e.origin()),
            }
        }) as Box<dyn FnMut(MessageEvent)>);

        let Some(window) = web_sys::window() else {
            crate::log_error!("No window, cannot listen for chat messages");
            return;
        };
        if let Err(e) =
            window.add_event_listener_with_callback("message", handler.as_ref().unchecked_ref())
        {
            crate::log_error!("Failed to add message listener: {:?}", e);
            return;
        }
        *self.message_handler.borrow_mut() = Some(handler);
    }

    fn on_load(&self, callback: LoadCallback) {
        {
            let mut state = self.load_state.borrow_mut();
            if !state.loaded {
                state.callbacks.push(callback);
                return;
            }
        }
        callback();
    }

    fn close(&self) {
        self.detach_listener();
    }
}
