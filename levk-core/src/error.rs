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

//! The handful of error conditions that are genuinely fatal (device init, swapchain
//! acquire/submit). Content problems (bad JSON, missing assets, unknown node ids)
//! are never represented here: they are logged and degrade to a fallback instead.

/// A fatal, unrecoverable engine error. Surfacing one of these from the runtime
/// loop means the process exits with a non-zero status.
#[derive(thiserror::Error, Debug)]
pub enum LevkError {
    #[error("failed to initialize render device: {0}")]
    DeviceInit(String),

    #[error("swapchain acquire failed: {0}")]
    SwapchainAcquire(String),

    #[error("frame submission failed: {0}")]
    FrameSubmit(String),

    #[error("configuration error: {0}")]
    Config(String),
}
