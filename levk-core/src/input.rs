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

//! The input-state contract the windowing back-end fills in once per frame
//! before the runtime loop ticks anything. The concrete capture of keyboard,
//! mouse and gamepad events lives in that external back-end; this crate only
//! carries the shape every downstream consumer (the UI view tree, user
//! components) reads from.

use crate::math::Vector2;

/// Pointer/keyboard state as of the most recent window poll. Extending this
/// with additional fields (keys held, scroll delta, multi-touch) is expected
/// as concrete windowing back-ends are wired in; everything here is plain
/// data, never owned by a specific backend type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputState {
    pub pointer_position: Vector2<f32>,
    pub pointer_down: bool,
    /// `true` for exactly the one frame in which the window emitted a close
    /// request; the runtime loop reads this to break out of its poll loop.
    pub close_requested: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            pointer_position: Vector2::new(0.0, 0.0),
            pointer_down: false,
            close_requested: false,
        }
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_state_has_no_pointer_interaction() {
        let state = InputState::new();
        assert!(!state.pointer_down);
        assert!(!state.close_requested);
        assert_eq!(state.pointer_position, Vector2::new(0.0, 0.0));
    }
}
