// Copyright (c) 2024-present the levk contributors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! The 2D view hierarchy: a parent/child graph of anchor-relative rectangles,
//! addressed by stable [`ViewId`] the same way [`levk_scene::NodeTree`]
//! addresses 3D nodes. A `ViewTree` is a plain `HashMap<ViewId, View>` plus an
//! explicit root list and a monotonic counter, not a freelist-backed pool.

use fxhash::FxHashMap;
use levk_core::math::Vector2;
use levk_core::{log::LevkLog, Id, InputState};
use levk_resource::AssetProviders;
use levk_scene::DrawList;

/// Placeholder type purely used to parametrize [`Id<View>`]; never constructed.
pub struct ViewMarker;
pub type ViewId = Id<ViewMarker>;

/// The anchor-relative, rotated rectangle a [`View`] resolves to once its
/// ancestor chain is taken into account.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorldFrame {
    pub center: Vector2<f32>,
    pub extent: Vector2<f32>,
    pub rotation: f32,
}

/// Content a view renders. Implemented by concrete view kinds ([`crate::text::TextContent`]
/// and any caller-defined quad/image content); a view with no content is a
/// purely structural grouping node.
pub trait ViewContent: Send + Sync {
    /// Called once per tick, after the pointer/dt have propagated down from
    /// the view's parent but before any of its children are ticked.
    fn tick(&mut self, _dt: f32, _input: &InputState) {}
    /// Issues this view's drawables into `out`, in `frame`'s local-to-world
    /// space. Depth-test is always disabled for UI drawables. `providers` lets
    /// content validate its material the same way the scene's mesh-to-drawable
    /// expansion does.
    fn render(&self, frame: &WorldFrame, providers: &AssetProviders, out: &mut DrawList);
}

/// A rectangle with an anchor, a z-index, a z-rotation, and an ordered list
/// of sub-views.
pub struct View {
    id: ViewId,
    parent: ViewId,
    children: Vec<ViewId>,
    destroyed: bool,
    pub name: String,
    /// Fraction (typically `[0, 1]` on each axis) of the parent's extent that
    /// locates this view's anchor point, measured from the parent's centre.
    pub anchor: Vector2<f32>,
    /// Pixel offset from the anchor point to this view's own centre.
    pub offset: Vector2<f32>,
    /// This view's own extent in pixels.
    pub size: Vector2<f32>,
    pub z_index: i32,
    pub z_rotation: f32,
    pub visible: bool,
    pub content: Option<Box<dyn ViewContent>>,
}

impl View {
    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn parent(&self) -> ViewId {
        self.parent
    }

    pub fn children(&self) -> &[ViewId] {
        &self.children
    }
}

/// Fields needed to create a [`View`]; `parent` of `ViewId::NONE` creates a root.
pub struct ViewCreateInfo {
    pub name: String,
    pub parent: ViewId,
    pub anchor: Vector2<f32>,
    pub offset: Vector2<f32>,
    pub size: Vector2<f32>,
    pub z_index: i32,
    pub z_rotation: f32,
    pub content: Option<Box<dyn ViewContent>>,
}

impl Default for ViewCreateInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            parent: ViewId::NONE,
            anchor: Vector2::new(0.0, 0.0),
            offset: Vector2::new(0.0, 0.0),
            size: Vector2::new(0.0, 0.0),
            z_index: 0,
            z_rotation: 0.0,
            content: None,
        }
    }
}

/// The 2D view hierarchy.
#[derive(Default)]
pub struct ViewTree {
    views: FxHashMap<ViewId, View>,
    roots: Vec<ViewId>,
    next_id: levk_core::id::IdSource<ViewMarker>,
}

impl ViewTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn roots(&self) -> &[ViewId] {
        &self.roots
    }

    pub fn get(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    pub fn get_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.views.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &View> {
        self.views.values()
    }

    /// Creates a view. If `info.parent` does not resolve to a live view, the
    /// new view is created as a root and a warning is logged.
    pub fn add(&mut self, info: ViewCreateInfo) -> ViewId {
        let id = self.next_id.next();
        let parent = if info.parent.is_none() {
            ViewId::NONE
        } else if self.views.contains_key(&info.parent) {
            info.parent
        } else {
            LevkLog::warn(format!(
                "view tree: add() given unknown parent {}, creating '{}' as a root instead",
                info.parent, info.name
            ));
            ViewId::NONE
        };

        let view = View {
            id,
            parent,
            children: Vec::new(),
            destroyed: false,
            name: info.name,
            anchor: info.anchor,
            offset: info.offset,
            size: info.size,
            z_index: info.z_index,
            z_rotation: info.z_rotation,
            visible: true,
            content: info.content,
        };
        self.views.insert(id, view);

        if parent.is_none() {
            self.roots.push(id);
        } else if let Some(parent_view) = self.views.get_mut(&parent) {
            parent_view.children.push(id);
        }
        id
    }

    /// Marks `id` for removal at the end of the current [`ViewTree::tick`]
    /// rather than removing it immediately, so a content's own `tick` can
    /// safely destroy itself or a sibling mid-propagation.
    pub fn destroy(&mut self, id: ViewId) {
        if let Some(view) = self.views.get_mut(&id) {
            view.destroyed = true;
        }
    }

    /// Detaches `id` from its parent (or the root list), then recursively
    /// removes every descendant, then erases `id` itself. A no-op for
    /// unknown ids.
    pub fn remove(&mut self, id: ViewId) {
        let Some(view) = self.views.get(&id) else {
            return;
        };
        let parent = view.parent();
        let children: Vec<ViewId> = view.children().to_vec();

        if parent.is_none() {
            self.roots.retain(|root| *root != id);
        } else if let Some(parent_view) = self.views.get_mut(&parent) {
            parent_view.children.retain(|child| *child != id);
        }

        for child in children {
            self.remove_subtree(child);
        }
        self.views.remove(&id);
    }

    fn remove_subtree(&mut self, id: ViewId) {
        let Some(view) = self.views.get(&id) else {
            return;
        };
        let children: Vec<ViewId> = view.children().to_vec();
        for child in children {
            self.remove_subtree(child);
        }
        self.views.remove(&id);
    }

    /// World frame: the anchor-relative frame resolved through every
    /// ancestor, rooted at `canvas_extent` (the window's framebuffer extent
    /// in pixels, centred at the origin).
    pub fn world_frame(&self, id: ViewId, canvas_extent: Vector2<f32>) -> WorldFrame {
        match self.views.get(&id) {
            Some(view) => {
                let super_frame = if view.parent.is_some() {
                    self.world_frame(view.parent, canvas_extent)
                } else {
                    WorldFrame {
                        center: Vector2::new(0.0, 0.0),
                        extent: canvas_extent,
                        rotation: 0.0,
                    }
                };
                let center = super_frame.center
                    + Vector2::new(
                        view.anchor.x * super_frame.extent.x,
                        view.anchor.y * super_frame.extent.y,
                    )
                    + view.offset;
                WorldFrame {
                    center,
                    extent: view.size,
                    rotation: super_frame.rotation + view.z_rotation,
                }
            }
            None => WorldFrame::default(),
        }
    }

    /// Recursively propagates `dt`/`input` to every view's content, parent
    /// before children, then prunes every view (and its subtree) marked
    /// [`ViewTree::destroy`]d during this pass.
    pub fn tick(&mut self, dt: f32, input: &InputState) {
        let roots = self.roots.clone();
        for root in roots {
            self.tick_subtree(root, dt, input);
        }
        self.prune_destroyed();
    }

    fn tick_subtree(&mut self, id: ViewId, dt: f32, input: &InputState) {
        let children = match self.views.get_mut(&id) {
            Some(view) => {
                if let Some(content) = view.content.as_mut() {
                    content.tick(dt, input);
                }
                view.children.clone()
            }
            None => return,
        };
        for child in children {
            self.tick_subtree(child, dt, input);
        }
    }

    fn prune_destroyed(&mut self) {
        let destroyed: Vec<ViewId> = self
            .views
            .iter()
            .filter(|(_, view)| view.destroyed)
            .map(|(id, _)| *id)
            .collect();
        for id in destroyed {
            self.remove(id);
        }
    }

    /// Issues every visible view's drawables into `out`, in subtree order,
    /// root-to-leaf, with each view's local content rendered in its resolved
    /// [`WorldFrame`]. Depth-test is disabled for the whole UI layer.
    pub fn render(&self, canvas_extent: Vector2<f32>, providers: &AssetProviders, out: &mut DrawList) {
        let roots = self.roots.clone();
        for root in roots {
            self.render_subtree(root, canvas_extent, providers, out);
        }
    }

    fn render_subtree(
        &self,
        id: ViewId,
        canvas_extent: Vector2<f32>,
        providers: &AssetProviders,
        out: &mut DrawList,
    ) {
        let Some(view) = self.views.get(&id) else {
            return;
        };
        if view.visible {
            if let Some(content) = view.content.as_ref() {
                let frame = self.world_frame(id, canvas_extent);
                content.render(&frame, providers, out);
            }
        }
        for child in view.children.clone() {
            self.render_subtree(child, canvas_extent, providers, out);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn info(name: &str, parent: ViewId) -> ViewCreateInfo {
        ViewCreateInfo {
            name: name.to_string(),
            parent,
            ..Default::default()
        }
    }

    #[test]
    fn invariant_child_list_agrees_with_parent_field() {
        let mut tree = ViewTree::new();
        let root = tree.add(info("root", ViewId::NONE));
        let child = tree.add(info("child", root));
        assert!(tree.get(root).unwrap().children().contains(&child));
        assert_eq!(tree.get(child).unwrap().parent(), root);
    }

    #[test]
    fn world_frame_combines_anchor_offset_and_ancestor_chain() {
        let mut tree = ViewTree::new();
        let root = tree.add(ViewCreateInfo {
            name: "root".to_string(),
            anchor: Vector2::new(0.5, 0.5),
            size: Vector2::new(800.0, 600.0),
            ..Default::default()
        });
        let child = tree.add(ViewCreateInfo {
            name: "child".to_string(),
            parent: root,
            anchor: Vector2::new(0.0, 0.0),
            offset: Vector2::new(10.0, 20.0),
            size: Vector2::new(100.0, 50.0),
            ..Default::default()
        });

        let canvas = Vector2::new(800.0, 600.0);
        let root_frame = tree.world_frame(root, canvas);
        assert_eq!(root_frame.center, Vector2::new(400.0, 300.0));

        let child_frame = tree.world_frame(child, canvas);
        assert_eq!(child_frame.center, Vector2::new(410.0, 320.0));
        assert_eq!(child_frame.extent, Vector2::new(100.0, 50.0));
    }

    #[test]
    fn z_rotation_accumulates_down_the_ancestor_chain() {
        let mut tree = ViewTree::new();
        let root = tree.add(ViewCreateInfo {
            name: "root".to_string(),
            z_rotation: 0.5,
            ..Default::default()
        });
        let child = tree.add(ViewCreateInfo {
            name: "child".to_string(),
            parent: root,
            z_rotation: 0.25,
            ..Default::default()
        });

        let frame = tree.world_frame(child, Vector2::new(0.0, 0.0));
        assert!((frame.rotation - 0.75).abs() < 1e-6);
    }

    #[test]
    fn destroyed_subviews_are_pruned_after_tick() {
        let mut tree = ViewTree::new();
        let root = tree.add(info("root", ViewId::NONE));
        let child = tree.add(info("child", root));
        let grandchild = tree.add(info("grandchild", child));

        tree.destroy(child);
        tree.tick(0.016, &InputState::new());

        assert!(tree.get(child).is_none());
        assert!(tree.get(grandchild).is_none());
        assert!(tree.get(root).unwrap().children().is_empty());
    }

    #[test]
    fn add_with_unknown_parent_falls_back_to_root() {
        let mut tree = ViewTree::new();
        let bogus = ViewId::from_raw(777);
        let id = tree.add(info("orphan", bogus));
        assert_eq!(tree.get(id).unwrap().parent(), ViewId::NONE);
        assert!(tree.roots().contains(&id));
    }

    struct CountingContent {
        ticks: std::sync::Arc<std::sync::atomic::AtomicU32>,
    }

    impl ViewContent for CountingContent {
        fn tick(&mut self, _dt: f32, _input: &InputState) {
            self.ticks.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }

        fn render(&self, _frame: &WorldFrame, _providers: &AssetProviders, _out: &mut DrawList) {}
    }

    #[test]
    fn tick_propagates_to_every_view_with_content() {
        let ticks = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
        let mut tree = ViewTree::new();
        let root = tree.add(ViewCreateInfo {
            name: "root".to_string(),
            content: Some(Box::new(CountingContent {
                ticks: ticks.clone(),
            })),
            ..Default::default()
        });
        tree.add(ViewCreateInfo {
            name: "child".to_string(),
            parent: root,
            content: Some(Box::new(CountingContent {
                ticks: ticks.clone(),
            })),
            ..Default::default()
        });

        tree.tick(0.016, &InputState::new());
        assert_eq!(ticks.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
