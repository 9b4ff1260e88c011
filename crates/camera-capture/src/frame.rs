//! Video frame types

/// Decoded RGBA video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Interleaved RGBA pixel data (width * height * 4)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new frame from raw RGBA data.
    ///
    /// Returns `None` when the buffer length does not match the dimensions
    /// or the frame has zero area.
    pub fn from_rgba(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        if data.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        })
    }

    /// Create a frame from interleaved RGB data, padding alpha to 255.
    pub fn from_rgb(data: &[u8], width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) * 3 {
            return None;
        }
        let mut rgba = Vec::with_capacity(data.len() / 3 * 4);
        for px in data.chunks_exact(3) {
            rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }
        Self::from_rgba(rgba, width, height, timestamp_ns, sequence)
    }

    /// Get RGBA pixel at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        Some([
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ])
    }

    /// Number of pixels in the frame
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}
