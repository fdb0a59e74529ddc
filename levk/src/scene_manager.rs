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

//! Owns every loaded level and tracks which one is active. A level bundles a
//! [`Scene`] with the [`ViewTree`] that overlays it — spec.md §4.7 describes
//! the scene as owning "node tree + entities + camera + lights + UI root",
//! but `levk-scene` cannot depend on `levk-ui` (that dependency runs the
//! other way, so `levk-ui`'s drawables can reference `levk-scene`'s
//! [`DrawList`]), so the bundling happens here, one layer up, instead.

use fxhash::FxHashMap;
use levk_scene::Scene;
use levk_ui::ViewTree;

/// One loaded level: a 3D scene plus the 2D view tree drawn over it.
pub struct Level {
    pub scene: Scene,
    pub ui: ViewTree,
}

impl Level {
    pub fn new(scene: Scene) -> Self {
        Self { scene, ui: ViewTree::new() }
    }
}

/// Holds every level the host application has loaded, addressed by name, and
/// tracks which one is currently ticked and rendered by [`crate::Runtime::run`].
#[derive(Default)]
pub struct SceneManager {
    levels: FxHashMap<String, Level>,
    active: Option<String>,
}

impl SceneManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the named level. Does not change which level is
    /// active.
    pub fn insert(&mut self, name: impl Into<String>, level: Level) {
        self.levels.insert(name.into(), level);
    }

    /// Removes the named level. If it was active, no level is active
    /// afterwards.
    pub fn remove(&mut self, name: &str) -> Option<Level> {
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        self.levels.remove(name)
    }

    /// Switches the active level. Returns `false` and leaves the active level
    /// unchanged if `name` is not loaded.
    pub fn set_active(&mut self, name: &str) -> bool {
        if self.levels.contains_key(name) {
            self.active = Some(name.to_string());
            true
        } else {
            false
        }
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active(&self) -> Option<&Level> {
        self.active.as_ref().and_then(|name| self.levels.get(name))
    }

    pub fn active_mut(&mut self) -> Option<&mut Level> {
        let name = self.active.as_ref()?;
        self.levels.get_mut(name)
    }

    pub fn active_scene(&self) -> Option<&Scene> {
        self.active().map(|level| &level.scene)
    }

    pub fn active_scene_mut(&mut self) -> Option<&mut Scene> {
        self.active_mut().map(|level| &mut level.scene)
    }

    pub fn get(&self, name: &str) -> Option<&Level> {
        self.levels.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Level> {
        self.levels.get_mut(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_active_rejects_unknown_names() {
        let mut manager = SceneManager::new();
        manager.insert("menu", Level::new(Scene::new("menu")));
        assert!(!manager.set_active("does-not-exist"));
        assert!(manager.active().is_none());
        assert!(manager.set_active("menu"));
        assert_eq!(manager.active_scene().unwrap().name, "menu");
    }

    #[test]
    fn removing_the_active_level_clears_active() {
        let mut manager = SceneManager::new();
        manager.insert("menu", Level::new(Scene::new("menu")));
        manager.set_active("menu");
        manager.remove("menu");
        assert!(manager.active().is_none());
    }

    #[test]
    fn switching_levels_preserves_the_previous_one() {
        let mut manager = SceneManager::new();
        manager.insert("menu", Level::new(Scene::new("menu")));
        manager.insert("level1", Level::new(Scene::new("level1")));
        manager.set_active("menu");
        manager.set_active("level1");
        assert_eq!(manager.active_scene().unwrap().name, "level1");
        assert_eq!(manager.get("menu").unwrap().scene.name, "menu");
    }
}
