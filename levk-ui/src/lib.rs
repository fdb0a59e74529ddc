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

//! The 2D view tree: anchor-relative frames stacked over the 3D scene,
//! ticked and rendered once per frame alongside it. A [`view::ViewTree`] is
//! addressed by [`view::ViewId`] the same way [`levk_scene::NodeTree`] is
//! addressed by `NodeId`; [`text::TextContent`] is the one built-in content
//! kind, backed by a fixed-grid [`font::AsciiFont`].

pub mod font;
pub mod text;
pub mod view;

pub use font::AsciiFont;
pub use text::TextContent;
pub use view::{View, ViewContent, ViewCreateInfo, ViewId, ViewTree, WorldFrame};
