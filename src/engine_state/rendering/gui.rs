//! # GUI Registry
//!
//! A minimal retained GUI: named boxes and buttons arranged in a parent tree, key
//! bindings that trigger actions, and a 2D overlay pass that draws one quad per visible
//! element. Widget layout and styling are left to the graphics backend.

use std::collections::HashMap;

use cgmath::{Point3, Vector3};
use winit::keyboard::KeyCode;

use super::{vertex::Vertex, Graphics, RenderMode};

/// Something the user asked for through the GUI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuiAction {
    /// Start a new procedurally generated level.
    NewLevel,
    /// Show or hide the load menu.
    ToggleLoadMenu,
    /// Load the finite world stored in the given slot.
    LoadSlot(u8),
    /// Leave the current menu or level.
    Exit,
    /// Show or hide the in-level menu.
    ToggleLevelMenu,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ElementKind {
    Box,
    Button(GuiAction),
}

#[derive(Clone, Debug)]
struct Element {
    name: String,
    parent: Option<String>,
    kind: ElementKind,
    visible: bool,
}

/// The GUI collaborator used by the render thread.
pub trait Gui {
    /// Registers a box. Replaces any element with the same name.
    fn add_box(&mut self, name: &str, parent: Option<&str>, visible: bool);

    /// Registers a button triggering `action`. Replaces any element with the same name.
    fn add_button(&mut self, name: &str, parent: Option<&str>, action: GuiAction, visible: bool);

    /// Removes an element and every element below it.
    fn remove(&mut self, name: &str);

    fn set_visible(&mut self, name: &str, visible: bool);

    /// Whether the element and all of its ancestors are visible.
    fn is_visible(&self, name: &str) -> bool;

    fn contains(&self, name: &str) -> bool;

    /// Binds a key so that pressing it triggers `action`.
    fn bind_key(&mut self, key: KeyCode, action: GuiAction);

    fn key_action(&self, key: KeyCode) -> Option<GuiAction>;

    /// The action of the button `name`, if it is a visible button.
    fn activate(&self, name: &str) -> Option<GuiAction>;

    /// Draws every visible element. Called with depth testing disabled.
    fn draw(&self, graphics: &mut dyn Graphics);
}

/// Default [`Gui`] implementation.
#[derive(Default)]
pub struct GuiRegistry {
    elements: Vec<Element>,
    key_actions: HashMap<KeyCode, GuiAction>,
}

impl GuiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, name: &str) -> Option<&Element> {
        self.elements.iter().find(|element| element.name == name)
    }

    fn insert(&mut self, element: Element) {
        self.elements.retain(|existing| existing.name != element.name);
        self.elements.push(element);
    }

    fn is_descendant_of(&self, element: &Element, ancestor: &str) -> bool {
        let mut parent = element.parent.as_deref();
        while let Some(name) = parent {
            if name == ancestor {
                return true;
            }
            parent = self.find(name).and_then(|element| element.parent.as_deref());
        }
        false
    }

    /// Number of registered elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Gui for GuiRegistry {
    fn add_box(&mut self, name: &str, parent: Option<&str>, visible: bool) {
        self.insert(Element {
            name: name.to_owned(),
            parent: parent.map(str::to_owned),
            kind: ElementKind::Box,
            visible,
        });
    }

    fn add_button(&mut self, name: &str, parent: Option<&str>, action: GuiAction, visible: bool) {
        self.insert(Element {
            name: name.to_owned(),
            parent: parent.map(str::to_owned),
            kind: ElementKind::Button(action),
            visible,
        });
    }

    fn remove(&mut self, name: &str) {
        let doomed: Vec<String> = self
            .elements
            .iter()
            .filter(|element| element.name == name || self.is_descendant_of(element, name))
            .map(|element| element.name.clone())
            .collect();
        self.elements.retain(|element| !doomed.contains(&element.name));
    }

    fn set_visible(&mut self, name: &str, visible: bool) {
        if let Some(element) = self.elements.iter_mut().find(|element| element.name == name) {
            element.visible = visible;
        }
    }

    fn is_visible(&self, name: &str) -> bool {
        let mut current = self.find(name);
        while let Some(element) = current {
            if !element.visible {
                return false;
            }
            match &element.parent {
                Some(parent) => current = self.find(parent),
                None => return true,
            }
        }
        false
    }

    fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    fn bind_key(&mut self, key: KeyCode, action: GuiAction) {
        self.key_actions.insert(key, action);
    }

    fn key_action(&self, key: KeyCode) -> Option<GuiAction> {
        self.key_actions.get(&key).copied()
    }

    fn activate(&self, name: &str) -> Option<GuiAction> {
        match self.find(name)?.kind {
            ElementKind::Button(action) if self.is_visible(name) => Some(action),
            _ => None,
        }
    }

    fn draw(&self, graphics: &mut dyn Graphics) {
        graphics.set_render_mode(RenderMode::Overlay);
        for element in self.elements.iter().filter(|element| self.is_visible(&element.name)) {
            let corner = |x: f32, y: f32| {
                Vertex::new(Point3::new(x, y, 0.0), 0, x, y, Vector3::new(0, 0, 1))
            };
            let quad = [
                corner(0.0, 0.0),
                corner(1.0, 0.0),
                corner(1.0, 1.0),
                corner(0.0, 1.0),
            ];
            graphics.upload_static(&quad);
            graphics.draw_indexed(6);
            log::trace!("Drew GUI element {}", element.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu() -> GuiRegistry {
        let mut gui = GuiRegistry::new();
        gui.add_box("mainMenu", None, true);
        gui.add_button("newButton", Some("mainMenu"), GuiAction::NewLevel, true);
        gui.add_box("loadMenu", Some("mainMenu"), false);
        gui.add_button("loadSlot1", Some("loadMenu"), GuiAction::LoadSlot(1), true);
        gui
    }

    #[test]
    fn test_hidden_parent_hides_children() {
        let mut gui = menu();
        assert!(gui.is_visible("newButton"));
        assert!(!gui.is_visible("loadSlot1"));
        assert_eq!(gui.activate("loadSlot1"), None);

        gui.set_visible("loadMenu", true);
        assert_eq!(gui.activate("loadSlot1"), Some(GuiAction::LoadSlot(1)));

        gui.set_visible("mainMenu", false);
        assert_eq!(gui.activate("newButton"), None);
    }

    #[test]
    fn test_remove_takes_subtree() {
        let mut gui = menu();
        gui.remove("loadMenu");
        assert!(!gui.contains("loadSlot1"));
        assert!(gui.contains("newButton"));
        assert_eq!(gui.len(), 2);
    }

    #[test]
    fn test_boxes_do_not_activate() {
        let gui = menu();
        assert_eq!(gui.activate("mainMenu"), None);
        assert_eq!(gui.activate("missing"), None);
    }
}
