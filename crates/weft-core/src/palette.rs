//! Color palettes for index formats.

/// A palette of straight-alpha RGBA8 entries for the `Index*` formats.
///
/// Buffers share palettes through `Arc`; views borrow them. Conversion to
/// RGBA8 is a lookup; conversion back is a nearest-color search, exact
/// only for colors actually present.
///
/// # Example
///
/// ```rust
/// use weft_core::Palette;
///
/// let pal = Palette::new(vec![[0, 0, 0, 255], [255, 255, 255, 255]]);
/// assert_eq!(pal.lookup(1), [255, 255, 255, 255]);
/// assert_eq!(pal.nearest([250, 250, 250, 255]), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<[u8; 4]>,
}

impl Palette {
    /// Creates a palette from RGBA8 entries; truncated to 256.
    pub fn new(mut entries: Vec<[u8; 4]>) -> Self {
        entries.truncate(256);
        Self { entries }
    }

    /// Grayscale ramp palette with `n` evenly spaced opaque entries.
    pub fn gray_ramp(n: usize) -> Self {
        let n = n.clamp(2, 256);
        let entries = (0..n)
            .map(|i| {
                let v = (i * 255 / (n - 1)) as u8;
                [v, v, v, 255]
            })
            .collect();
        Self { entries }
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when the palette has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up an index, clamping past-the-end indices to the last entry.
    ///
    /// An empty palette yields transparent black.
    #[inline]
    pub fn lookup(&self, index: u8) -> [u8; 4] {
        match self.entries.get(index as usize) {
            Some(px) => *px,
            None => *self.entries.last().unwrap_or(&[0, 0, 0, 0]),
        }
    }

    /// Index of the entry closest to `rgba` (squared distance over all
    /// four channels; first match wins ties).
    pub fn nearest(&self, rgba: [u8; 4]) -> u8 {
        let mut best = 0usize;
        let mut best_dist = u32::MAX;
        for (i, entry) in self.entries.iter().enumerate() {
            let mut dist = 0u32;
            for c in 0..4 {
                let d = entry[c] as i32 - rgba[c] as i32;
                dist += (d * d) as u32;
            }
            if dist < best_dist {
                best_dist = dist;
                best = i;
                if dist == 0 {
                    break;
                }
            }
        }
        best as u8
    }

    /// All entries.
    #[inline]
    pub fn entries(&self) -> &[[u8; 4]] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_clamps() {
        let pal = Palette::new(vec![[1, 2, 3, 255], [4, 5, 6, 255]]);
        assert_eq!(pal.lookup(0), [1, 2, 3, 255]);
        assert_eq!(pal.lookup(200), [4, 5, 6, 255]);
    }

    #[test]
    fn test_nearest_exact_and_approximate() {
        let pal = Palette::new(vec![
            [0, 0, 0, 255],
            [255, 0, 0, 255],
            [0, 255, 0, 255],
        ]);
        assert_eq!(pal.nearest([255, 0, 0, 255]), 1);
        assert_eq!(pal.nearest([200, 30, 10, 255]), 1);
        assert_eq!(pal.nearest([10, 10, 10, 255]), 0);
    }

    #[test]
    fn test_gray_ramp() {
        let pal = Palette::gray_ramp(4);
        assert_eq!(pal.len(), 4);
        assert_eq!(pal.lookup(0), [0, 0, 0, 255]);
        assert_eq!(pal.lookup(3), [255, 255, 255, 255]);
    }
}
