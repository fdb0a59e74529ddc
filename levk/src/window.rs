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

//! The windowing/input back-end contract (spec.md §1 names this as an
//! external collaborator, specified only through the surface-source,
//! framebuffer-extent and input-state it supplies). `Window` extends
//! [`levk_scene::SurfaceSource`] with the one operation the runtime loop itself
//! needs every frame: polling OS events into an [`levk_core::InputState`]
//! snapshot, including the close-request flag that is the loop's sole
//! cancellation signal.

use levk_core::InputState;
use levk_scene::SurfaceSource;

/// A window capable of producing a swapchain surface and reporting input.
/// Implemented by the concrete windowing back-end (e.g. a `winit` wrapper);
/// `levk` itself never names a concrete windowing crate.
pub trait Window: SurfaceSource {
    /// Polls pending OS events, updating and returning the input snapshot for
    /// this frame. `InputState::close_requested` is `true` for exactly the
    /// one poll in which the window received a close request.
    fn poll(&mut self) -> InputState;
}

#[cfg(test)]
mod test {
    use super::*;
    use std::any::Any;

    struct StubWindow {
        state: InputState,
        polls: u32,
    }

    impl SurfaceSource for StubWindow {
        fn framebuffer_extent(&self) -> (u32, u32) {
            (1280, 720)
        }
        fn raw_handle(&self) -> &dyn Any {
            &()
        }
    }

    impl Window for StubWindow {
        fn poll(&mut self) -> InputState {
            self.polls += 1;
            if self.polls == 3 {
                self.state.close_requested = true;
            }
            self.state
        }
    }

    #[test]
    fn close_requested_fires_on_the_expected_poll() {
        let mut window = StubWindow { state: InputState::new(), polls: 0 };
        assert!(!window.poll().close_requested);
        assert!(!window.poll().close_requested);
        assert!(window.poll().close_requested);
    }
}
