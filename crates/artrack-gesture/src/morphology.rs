//! Binary morphology with elliptical structuring elements.

use artrack_core::GrayImage;

/// Elliptical structuring element inscribed in a `size × size` box.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Kernel {
    size: usize,
    offsets: Vec<(isize, isize)>,
}

impl Kernel {
    pub fn ellipse(size: usize) -> Self {
        let size = size.max(1);
        let r = (size / 2) as isize;
        let c = r;
        let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };

        let mut offsets = Vec::new();
        for i in 0..size as isize {
            let dy = i - r;
            if dy.abs() > r {
                continue;
            }
            let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as isize;
            let j1 = (c - dx).max(0);
            let j2 = (c + dx + 1).min(size as isize);
            for j in j1..j2 {
                offsets.push((j - c, dy));
            }
        }
        Self { size, offsets }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn contains(&self, dx: isize, dy: isize) -> bool {
        self.offsets.contains(&(dx, dy))
    }
}

fn apply(src: &GrayImage, kernel: &Kernel, erode: bool) -> GrayImage {
    let (w, h) = (src.width as isize, src.height as isize);
    // Outside the image: foreground for erosion, background for dilation.
    let border = if erode { 255 } else { 0 };
    let mut out = GrayImage::new(src.width, src.height);
    for y in 0..h {
        for x in 0..w {
            let mut acc = if erode { 255u8 } else { 0u8 };
            for &(dx, dy) in &kernel.offsets {
                let (sx, sy) = (x + dx, y + dy);
                let v = if sx < 0 || sy < 0 || sx >= w || sy >= h {
                    border
                } else {
                    src.data[(sy * w + sx) as usize]
                };
                acc = if erode { acc.min(v) } else { acc.max(v) };
            }
            out.data[(y * w + x) as usize] = acc;
        }
    }
    out
}

pub fn erode(src: &GrayImage, kernel: &Kernel) -> GrayImage {
    apply(src, kernel, true)
}

pub fn dilate(src: &GrayImage, kernel: &Kernel) -> GrayImage {
    apply(src, kernel, false)
}

/// Erode then dilate: removes specks smaller than the kernel.
pub fn open(src: &GrayImage, kernel: &Kernel) -> GrayImage {
    dilate(&erode(src, kernel), kernel)
}

/// Dilate then erode: fills holes smaller than the kernel.
pub fn close(src: &GrayImage, kernel: &Kernel) -> GrayImage {
    erode(&dilate(src, kernel), kernel)
}
