//! Visual side of the widget.
//!
//! The protocol core only tells the presentation what changed; how the
//! launcher, badge and frame look is up to the implementation.

/// Receives presentation changes. Every method defaults to doing nothing.
pub trait Presentation {
    /// The frame is ready; let the user open it.
    fn reveal_launcher(&self) {}

    fn set_chat_visible(&self, _visible: bool) {}

    /// Unread count changed.
    fn set_unread(&self, _count: u32) {}
}

/// No visuals at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl Presentation for Headless {}

#[cfg(target_arch = "wasm32")]
pub use dom::DomPresentation;

#[cfg(target_arch = "wasm32")]
mod dom {
    use blipchat_client::transport::FRAME_ID;
    use wasm_bindgen::JsCast;
    use web_sys::{Document, HtmlElement};

    use super::Presentation;

    const LAUNCHER_ID: &str = "blip-chat-open-iframe";
    const BADGE_ID: &str = "blip-chat-notifications";
    const OPENED_CLASS: &str = "blip-chat-iframe-opened";

    /// Drives the widget chrome the host page rendered, looked up by id.
    /// Missing elements are skipped.
    pub struct DomPresentation {
        document: Document,
    }

    impl DomPresentation {
        pub fn new(document: Document) -> Self {
            Self { document }
        }

        fn element(&self, id: &str) -> Option<HtmlElement> {
            self.document.get_element_by_id(id)?.dyn_into().ok()
        }
    }

    impl Presentation for DomPresentation {
        fn reveal_launcher(&self) {
            let Some(button) = self.element(LAUNCHER_ID) else {
                return;
            };
            let style = button.style();
            let _ = style.set_property("visibility", "visible");
            let _ = style.set_property("opacity", "1");
        }

        fn set_chat_visible(&self, visible: bool) {
            let Some(frame) = self.element(FRAME_ID) else {
                return;
            };
            let classes = frame.class_list();
            let _ = if visible {
                classes.add_1(OPENED_CLASS)
            } else {
                classes.remove_1(OPENED_CLASS)
            };
        }

        fn set_unread(&self, count: u32) {
            let Some(badge) = self.element(BADGE_ID) else {
                return;
            };
            badge.set_text_content(Some(&count.to_string()));
            let _ = badge
                .style()
                .set_property("opacity", if count > 0 { "1" } else { "0" });
        }
    }
}
