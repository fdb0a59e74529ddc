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

//! CPU-side texture payload. Upload to a GPU image happens behind
//! [`crate::device::Device`]; this type only carries decoded pixels plus the
//! fallback constructors the texture provider substitutes on a load miss.

use image::GenericImageView;
use levk_core::log::LevkLog;
use levk_core::Uri;
use levk_resource::vfs::DataSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
}

pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

impl Texture {
    /// A 1x1 opaque white texture, the fallback for albedo/unlit-tint slots.
    pub fn white() -> Self {
        Self::solid(0xFF, 0xFF, 0xFF, 0xFF)
    }

    /// A 1x1 opaque black texture, the fallback for emissive/occlusion slots.
    pub fn black() -> Self {
        Self::solid(0x00, 0x00, 0x00, 0xFF)
    }

    fn solid(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            width: 1,
            height: 1,
            format: PixelFormat::Rgba8,
            pixels: vec![r, g, b, a],
        }
    }

    /// Decodes a PNG/JPEG byte buffer read from the VFS. Returns `None` (the
    /// caller substitutes a fallback) on any decode failure.
    pub fn decode(uri: &Uri, bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        match image::load_from_memory(bytes) {
            Ok(image) => {
                let (width, height) = image.dimensions();
                Some(Self {
                    width,
                    height,
                    format: PixelFormat::Rgba8,
                    pixels: image.to_rgba8().into_raw(),
                })
            }
            Err(error) => {
                LevkLog::warn(format!("texture '{uri}' failed to decode: {error}"));
                None
            }
        }
    }
}

/// Reads the raw image bytes at `uri` from `vfs` and decodes them, for use as
/// an [`levk_resource::AssetProvider::get`] loader closure. The texture
/// depends only on its own uri.
pub fn load(vfs: &dyn DataSource, uri: &Uri) -> Option<(Texture, Vec<Uri>)> {
    let bytes = vfs.read(uri);
    Texture::decode(uri, &bytes).map(|texture| (texture, vec![uri.clone()]))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn white_fallback_is_one_opaque_white_texel() {
        let white = Texture::white();
        assert_eq!(white.pixels, vec![255, 255, 255, 255]);
    }

    #[test]
    fn decode_of_empty_bytes_is_none_s4() {
        assert!(Texture::decode(&Uri::new("missing.json"), &[]).is_none());
    }

    struct EmptyVfs;
    impl DataSource for EmptyVfs {
        fn read(&self, _uri: &Uri) -> Vec<u8> {
            Vec::new()
        }
    }

    #[test]
    fn load_of_missing_file_is_none() {
        assert!(load(&EmptyVfs, &Uri::new("missing.png")).is_none());
    }
}
