use alloc::vec::Vec;

/// A 2-dimensional buffer of texels or render-target cells.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Buffer2d<T> {
    size: [usize; 2],
    items: Vec<T>,
}

impl<T> Buffer2d<T> {
    /// Create a new buffer with the given size, filled with duplicates of the given element.
    #[inline]
    pub fn fill(size: [usize; 2], item: T) -> Self
    where
        T: Clone,
    {
        Self::fill_with(size, || item.clone())
    }

    /// Create a new buffer with the given size, filled by calling the function for each
    /// element.
    ///
    /// If your type implements [`Clone`], use [`Buffer2d::fill`] instead.
    pub fn fill_with<F: FnMut() -> T>(size: [usize; 2], mut f: F) -> Self {
        let len = size[0].checked_mul(size[1]).unwrap();
        Self {
            size,
            items: (0..len).map(|_| f()).collect::<Vec<_>>(),
        }
    }

    /// Create a buffer from row-major raw contents.
    ///
    /// # Panics
    ///
    /// Panics if the item count does not match the size.
    pub fn from_raw(size: [usize; 2], items: Vec<T>) -> Self {
        assert_eq!(
            items.len(),
            size[0].checked_mul(size[1]).unwrap(),
            "buffer contents do not match its size {:?}",
            size,
        );
        Self { size, items }
    }

    #[inline]
    pub fn size(&self) -> [usize; 2] {
        self.size
    }

    /// Convert the given index into a linear index into the raw data of this buffer.
    #[inline]
    pub fn linear_index(&self, [x, y]: [usize; 2]) -> usize {
        y * self.size[0] + x
    }

    /// View this buffer as a linear slice of elements.
    #[inline]
    pub fn raw(&self) -> &[T] {
        &self.items
    }

    /// View this buffer as a linear mutable slice of elements.
    #[inline]
    pub fn raw_mut(&mut self) -> &mut [T] {
        &mut self.items
    }

    /// Get a reference to the item at the given index.
    ///
    /// # Panics
    ///
    /// This function will panic if the index is not within bounds.
    #[inline]
    pub fn get(&self, index: [usize; 2]) -> &T {
        let idx = self.linear_index(index);
        match self.items.get(idx) {
            Some(item) => item,
            None => panic!(
                "Attempted to read buffer of size {:?} at out-of-bounds location {:?}",
                self.size, index
            ),
        }
    }

    /// Get a mutable reference to the item at the given index.
    ///
    /// # Panics
    ///
    /// This function will panic if the index is not within bounds.
    #[inline]
    pub fn get_mut(&mut self, index: [usize; 2]) -> &mut T {
        let idx = self.linear_index(index);
        match self.items.get_mut(idx) {
            Some(item) => item,
            None => panic!(
                "Attempted to write buffer of size {:?} at out-of-bounds location {:?}",
                self.size, index
            ),
        }
    }

    /// Overwrite the item at the given index.
    #[inline]
    pub fn write(&mut self, index: [usize; 2], item: T) {
        *self.get_mut(index) = item;
    }

    /// Reset every element to the given value.
    pub fn clear(&mut self, item: T)
    where
        T: Clone,
    {
        self.items.iter_mut().for_each(|i| *i = item.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexing_is_row_major() {
        let mut buf = Buffer2d::fill([4, 3], 0u32);
        buf.write([2, 1], 7);
        assert_eq!(buf.linear_index([2, 1]), 6);
        assert_eq!(buf.raw()[6], 7);
        assert_eq!(*buf.get([2, 1]), 7);
    }

    #[test]
    #[should_panic(expected = "out-of-bounds")]
    fn out_of_bounds_reads_panic() {
        let buf = Buffer2d::fill([2, 2], 0u32);
        let _ = buf.get([2, 0]);
    }
}
