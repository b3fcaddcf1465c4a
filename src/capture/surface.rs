//! Card surfaces: the styled box trees a share card renders into, and the
//! handles used to capture them.

use parking_lot::RwLock;
use std::sync::{Arc, Weak};

use crate::types::Rgba;

/// Position and size in CSS pixels, relative to the parent node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub offset_x: f32,
    pub offset_y: f32,
    pub color: Rgba,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeStyle {
    pub background: Option<Rgba>,
    pub border_radius: f32,
    pub shadow: Option<Shadow>,
    /// Preview transform; 1.0 is the true size.
    pub scale: f32,
    pub opacity: f32,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            background: None,
            border_radius: 0.0,
            shadow: None,
            scale: 1.0,
            opacity: 1.0,
        }
    }
}

/// Where an embedded image comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetRef {
    Remote(String),
    Inline(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum NodeContent {
    #[default]
    None,
    Image(AssetRef),
}

/// One box of a card surface.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CardNode {
    pub rect: Rect,
    pub style: NodeStyle,
    pub content: NodeContent,
    pub children: Vec<CardNode>,
}

impl CardNode {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            ..Self::default()
        }
    }

    pub fn with_background(mut self, color: Rgba) -> Self {
        self.style.background = Some(color);
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.style.border_radius = radius;
        self
    }

    pub fn with_shadow(mut self, shadow: Shadow) -> Self {
        self.style.shadow = Some(shadow);
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.style.scale = scale;
        self
    }

    pub fn with_image(mut self, asset: AssetRef) -> Self {
        self.content = NodeContent::Image(asset);
        self
    }

    pub fn with_child(mut self, child: CardNode) -> Self {
        self.children.push(child);
        self
    }

    /// Natural content height: the node's own height or its lowest child,
    /// whichever is larger.
    pub fn natural_height(&self) -> f32 {
        self.children
            .iter()
            .map(|child| child.rect.y + child.natural_height())
            .fold(self.rect.height, f32::max)
    }

    /// Visits every node depth-first, parents before children.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a CardNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

type Slot = RwLock<Option<CardNode>>;

/// A mounted card surface, owned by the card instance that renders it.
///
/// Dropping the mount (or calling [`CardMount::unmount`]) makes every
/// outstanding [`CaptureTarget`] resolve to nothing.
#[derive(Debug)]
pub struct CardMount {
    slot: Arc<Slot>,
}

impl CardMount {
    pub fn new(tree: CardNode) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Some(tree))),
        }
    }

    /// Re-renders the card with new content.
    pub fn replace(&self, tree: CardNode) {
        *self.slot.write() = Some(tree);
    }

    pub fn unmount(&self) {
        self.slot.write().take();
    }

    pub fn is_mounted(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Current tree, cloned.
    pub fn snapshot(&self) -> Option<CardNode> {
        self.slot.read().clone()
    }

    pub fn target(&self) -> CaptureTarget {
        CaptureTarget {
            slot: Arc::downgrade(&self.slot),
        }
    }
}

/// Opaque handle to a mounted card surface.
#[derive(Debug, Clone)]
pub struct CaptureTarget {
    slot: Weak<Slot>,
}

impl CaptureTarget {
    /// A target that never resolves, for cards that never mounted.
    pub fn detached() -> Self {
        Self { slot: Weak::new() }
    }

    /// Clones the live tree, or `None` once the card is gone.
    pub fn snapshot(&self) -> Option<CardNode> {
        self.slot.upgrade().and_then(|slot| slot.read().clone())
    }

    pub fn is_mounted(&self) -> bool {
        self.slot
            .upgrade()
            .map(|slot| slot.read().is_some())
            .unwrap_or(false)
    }
}
