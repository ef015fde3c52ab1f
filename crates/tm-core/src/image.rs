use crate::Error;

/// RGBA pixel as delivered by a decoded photo or camera frame.
pub type Rgba8 = [u8; 4];

/// Owned, row-major image. Stages never edit an `Image` in place; each
/// produces a fresh one.
#[derive(Debug, Clone, PartialEq)]
pub struct Image<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

fn pixel_count(width: usize, height: usize, actual: usize) -> Result<usize, Error> {
    width.checked_mul(height).ok_or(Error::SizeMismatch {
        expected: usize::MAX,
        actual,
    })
}

impl<T> Image<T> {
    /// Wraps a packed row-major buffer of exactly `width * height` pixels.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self, Error> {
        let expected = pixel_count(width, height, data.len())?;
        if data.len() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Builds an image by evaluating `f(x, y)` in row-major order.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let data = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        (x < self.width && y < self.height).then(|| &self.data[y * self.width + x])
    }

    pub fn as_view(&self) -> ImageView<'_, T> {
        ImageView {
            width: self.width,
            height: self.height,
            stride: self.width,
            data: &self.data,
        }
    }

    /// Borrowed window of `width x height` pixels starting at `(x, y)`, e.g.
    /// one frame of a side-by-side multi-snap capture.
    pub fn crop(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<ImageView<'_, T>, Error> {
        let fits = x.checked_add(width).is_some_and(|r| r <= self.width)
            && y.checked_add(height).is_some_and(|b| b <= self.height);
        if !fits {
            return Err(Error::RegionOutOfBounds {
                x,
                y,
                width,
                height,
                image_width: self.width,
                image_height: self.height,
            });
        }
        let start = if width == 0 || height == 0 {
            0
        } else {
            y * self.width + x
        };
        ImageView::from_slice(width, height, self.width, &self.data[start..])
    }

    /// Per-pixel transform into a new image of the same size.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Image<U> {
        Image {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl<T: Clone> Image<T> {
    /// Uniform image, e.g. a blank background.
    pub fn new_fill(width: usize, height: usize, value: T) -> Self {
        Self::from_fn(width, height, |_, _| value.clone())
    }
}

/// Borrowed view with element stride (`stride >= width`).
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a, T> {
    width: usize,
    height: usize,
    stride: usize,
    data: &'a [T],
}

impl<'a, T> ImageView<'a, T> {
    pub fn from_slice(
        width: usize,
        height: usize,
        stride: usize,
        data: &'a [T],
    ) -> Result<Self, Error> {
        if stride < width {
            return Err(Error::InvalidStride);
        }
        // The last row only needs `width` elements, not a full stride.
        let needed = match height.checked_sub(1) {
            Some(_) if width == 0 => Some(0),
            Some(rows) => rows.checked_mul(stride).and_then(|n| n.checked_add(width)),
            None => Some(0),
        }
        .ok_or(Error::SizeMismatch {
            expected: usize::MAX,
            actual: data.len(),
        })?;
        if data.len() < needed {
            return Err(Error::SizeMismatch {
                expected: needed,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Pixels of row `y`; panics when `y` is out of range.
    pub fn row(&self, y: usize) -> &'a [T] {
        assert!(y < self.height, "row {y} outside a view of height {}", self.height);
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        (x < self.width && y < self.height).then(|| &self.row(y)[x])
    }
}

impl<T: Copy> ImageView<'_, T> {
    /// Packs the view into an owned image, dropping any stride padding.
    pub fn to_image(&self) -> Image<T> {
        let data = (0..self.height).flat_map(|y| self.row(y).iter().copied()).collect();
        Image {
            width: self.width,
            height: self.height,
            data,
        }
    }
}
