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

//! Entities bind a node to a bag of polymorphic [`Component`]s.
//!
//! Components reference their entity and scene only through stable ids, never
//! through owning references (DESIGN.md records why: entity/component/scene form
//! a reference cycle that Rust's ownership model cannot express directly). The
//! scene temporarily removes an entity from its map while ticking it so that a
//! component's [`TickContext`] can hold an honest `&mut Scene` without aliasing
//! the very `Vec<Component>` it is iterating — the same "take it out, operate,
//! put it back" trick this family of engines uses via pool tickets.

use crate::draw_list::DrawList;
use crate::node::{EntityId, NodeId};
use crate::scene::Scene;
use levk_core::{log::LevkLog, math::Vector3};
use std::any::{Any, TypeId};

/// Passed to [`Component::setup`] and [`Component::tick`]. Holds an honest
/// `&mut Scene` — the component is not itself reachable through it, since the
/// scene removed the owning entity from its map before building this context.
pub struct TickContext<'a> {
    pub scene: &'a mut Scene,
    pub entity_id: EntityId,
    pub node_id: NodeId,
    pub dt: f32,
}

/// Passed to [`RenderComponent::render`]. Read-only: rendering never mutates
/// scene state, so no removal dance is needed here.
pub struct RenderContext<'a> {
    pub scene: &'a Scene,
    pub entity_id: EntityId,
    pub node_id: NodeId,
}

/// A polymorphic capability attached to an entity.
pub trait Component: Any + Send + Sync {
    /// Called once, immediately after the component is inserted into its
    /// entity.
    fn setup(&mut self, _ctx: &mut TickContext) {}

    /// Called once per frame, in ascending component-id (attachment) order.
    fn tick(&mut self, _ctx: &mut TickContext) {}

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Returns `Some` for components that also contribute to the draw list.
    fn as_render_component(&self) -> Option<&dyn RenderComponent> {
        None
    }

    /// Returns `Some` for components that also participate in AABB collision.
    fn as_collider(&self) -> Option<&dyn ColliderComponent> {
        None
    }
    fn as_collider_mut(&mut self) -> Option<&mut dyn ColliderComponent> {
        None
    }
}

/// The render-contributing subset of [`Component`].
pub trait RenderComponent: Component {
    fn render(&self, ctx: &RenderContext, out: &mut DrawList);
}

/// The collider subset of [`Component`]. `size` is the local-space AABB extent
/// centered on the entity's global position; `ignore_channels` is a bitmask two
/// colliders both set and intersecting in will skip testing against each
/// other: "both set AND intersect ⇒ skip".
pub trait ColliderComponent: Send + Sync {
    fn size(&self) -> Vector3<f32>;
    fn ignore_channels(&self) -> u32;
    /// Invoked once per colliding pair per frame, for each side of the pair.
    fn on_collision(&mut self, _other: EntityId) {}
}

struct ComponentSlot {
    component_id: u32,
    type_id: TypeId,
    component: Box<dyn Component>,
}

/// Fields needed to spawn an [`Entity`].
#[derive(Debug, Clone, Default)]
pub struct EntityCreateInfo {
    pub name: String,
    pub parent: NodeId,
}

/// A container of components bound to a node in the scene graph.
pub struct Entity {
    id: EntityId,
    pub node_id: NodeId,
    pub active: bool,
    components: Vec<ComponentSlot>,
    next_component_id: u32,
    deferred_detach: Vec<TypeId>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, node_id: NodeId) -> Self {
        Self {
            id,
            node_id,
            active: true,
            components: Vec::new(),
            next_component_id: 0,
            deferred_detach: Vec::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn has<T: Component + 'static>(&self) -> bool {
        self.find::<T>().is_some()
    }

    pub fn find<T: Component + 'static>(&self) -> Option<&T> {
        let type_id = TypeId::of::<T>();
        self.components
            .iter()
            .find(|slot| slot.type_id == type_id)
            .and_then(|slot| slot.component.as_any().downcast_ref::<T>())
    }

    pub fn find_mut<T: Component + 'static>(&mut self) -> Option<&mut T> {
        let type_id = TypeId::of::<T>();
        self.components
            .iter_mut()
            .find(|slot| slot.type_id == type_id)
            .and_then(|slot| slot.component.as_any_mut().downcast_mut::<T>())
    }

    /// Pushes `type_id` onto the pending-detach list, consumed at the end of
    /// the next tick. Safe to call from within a component's own `tick`.
    pub fn detach<T: Component + 'static>(&mut self) {
        self.deferred_detach.push(TypeId::of::<T>());
    }

    pub(crate) fn has_type(&self, type_id: TypeId) -> bool {
        self.components.iter().any(|slot| slot.type_id == type_id)
    }

    pub(crate) fn push_component(&mut self, type_id: TypeId, component: Box<dyn Component>) {
        let component_id = self.next_component_id;
        self.next_component_id += 1;
        self.components.push(ComponentSlot {
            component_id,
            type_id,
            component,
        });
    }

    /// The component most recently attached, for running its one-time
    /// `setup` immediately after [`Entity::push_component`].
    pub(crate) fn last_component_mut(&mut self) -> Option<&mut dyn Component> {
        self.components.last_mut().map(|slot| &mut *slot.component)
    }

    /// Ticks every component in ascending `component_id` (attachment) order,
    /// then applies deferred detaches.
    pub(crate) fn tick_components(&mut self, dt: f32, scene: &mut Scene) {
        debug_assert!(self
            .components
            .windows(2)
            .all(|pair| pair[0].component_id < pair[1].component_id));
        for slot in self.components.iter_mut() {
            let mut ctx = TickContext {
                scene: &mut *scene,
                entity_id: self.id,
                node_id: self.node_id,
                dt,
            };
            slot.component.tick(&mut ctx);
        }
        for type_id in self.deferred_detach.drain(..) {
            self.components.retain(|slot| slot.type_id != type_id);
        }
    }

    /// Renders every render-capable component, in insertion order.
    pub(crate) fn render(&self, scene: &Scene, out: &mut DrawList) {
        let ctx = RenderContext {
            scene,
            entity_id: self.id,
            node_id: self.node_id,
        };
        for slot in &self.components {
            if let Some(render_component) = slot.component.as_render_component() {
                render_component.render(&ctx, out);
            }
        }
    }

    pub(crate) fn colliders(&self) -> impl Iterator<Item = &dyn ColliderComponent> {
        self.components
            .iter()
            .filter_map(|slot| slot.component.as_collider())
    }

    pub(crate) fn colliders_mut(&mut self) -> impl Iterator<Item = &mut dyn ColliderComponent> {
        self.components
            .iter_mut()
            .filter_map(|slot| slot.component.as_collider_mut())
    }

    /// Gives simultaneous mutable access to one component of each of two
    /// distinct concrete types attached to this entity, for the rare pair
    /// that must coordinate directly (a skeleton controller driving its
    /// sibling skinned-mesh renderer's joints). `None` if either type is
    /// missing, or if `A` and `B` name the same type (a single slot cannot be
    /// borrowed twice).
    pub fn find_pair_mut<A: Component + 'static, B: Component + 'static>(
        &mut self,
    ) -> Option<(&mut A, &mut B)> {
        let type_a = TypeId::of::<A>();
        let type_b = TypeId::of::<B>();
        if type_a == type_b {
            return None;
        }
        let index_a = self.components.iter().position(|slot| slot.type_id == type_a)?;
        let index_b = self.components.iter().position(|slot| slot.type_id == type_b)?;
        let (lo, hi) = if index_a < index_b { (index_a, index_b) } else { (index_b, index_a) };
        let (left, right) = self.components.split_at_mut(hi);
        let (slot_lo, slot_hi) = (&mut left[lo], &mut right[0]);
        let (slot_a, slot_b) = if index_a < index_b {
            (slot_lo, slot_hi)
        } else {
            (slot_hi, slot_lo)
        };
        let a = slot_a.component.as_any_mut().downcast_mut::<A>()?;
        let b = slot_b.component.as_any_mut().downcast_mut::<B>()?;
        Some((a, b))
    }

    pub(crate) fn warn_duplicate(&self, type_id: TypeId) {
        let _ = type_id;
        LevkLog::warn(format!(
            "entity {}: refusing to attach a second component of the same type",
            self.id
        ));
    }
}
