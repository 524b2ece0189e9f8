use std::fmt;

/// Growable row indexed around zero: `push_right` extends to 0, 1, 2…,
/// `push_left` extends to -1, -2….
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidirectionalArray<T> {
    right: Vec<T>,
    left: Vec<T>,
}

impl<T> Default for BidirectionalArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BidirectionalArray<T> {
    pub fn new() -> Self {
        Self {
            right: Vec::new(),
            left: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.right.len() + self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn right_len(&self) -> usize {
        self.right.len()
    }

    pub fn left_len(&self) -> usize {
        self.left.len()
    }

    /// Lowest valid index (0 when nothing was pushed left).
    pub fn left_index(&self) -> isize {
        -(self.left.len() as isize)
    }

    /// Highest valid index (-1 when nothing was pushed right).
    pub fn right_index(&self) -> isize {
        self.right.len() as isize - 1
    }

    pub fn contains_index(&self, index: isize) -> bool {
        index >= self.left_index() && index <= self.right_index()
    }

    pub fn get(&self, index: isize) -> Option<&T> {
        if index >= 0 {
            self.right.get(index as usize)
        } else {
            self.left.get((-index - 1) as usize)
        }
    }

    pub fn get_mut(&mut self, index: isize) -> Option<&mut T> {
        if index >= 0 {
            self.right.get_mut(index as usize)
        } else {
            self.left.get_mut((-index - 1) as usize)
        }
    }

    /// Replaces an existing slot, or extends by one at either end.
    ///
    /// Returns the previous element, or gives `element` back when `index`
    /// is not adjacent to the current range.
    pub fn set(&mut self, index: isize, element: T) -> Result<Option<T>, T> {
        if let Some(slot) = self.get_mut(index) {
            return Ok(Some(std::mem::replace(slot, element)));
        }
        if index == self.right_index() + 1 && index >= 0 {
            self.right.push(element);
            return Ok(None);
        }
        if index == self.left_index() - 1 && index < 0 {
            self.left.push(element);
            return Ok(None);
        }
        Err(element)
    }

    pub fn push_right(&mut self, element: T) -> usize {
        self.right.push(element);
        self.len()
    }

    pub fn push_left(&mut self, element: T) -> usize {
        self.left.push(element);
        self.len()
    }

    pub fn indexes(&self) -> impl Iterator<Item = isize> {
        self.left_index()..=self.right_index()
    }

    pub fn iter(&self) -> impl Iterator<Item = (isize, &T)> {
        self.indexes().zip(self.left.iter().rev().chain(self.right.iter()))
    }

    /// Left-to-right view padded with `None` so at least `pad_left` slots sit
    /// left of zero and `pad_right` slots from zero rightwards.
    pub fn normalize(&self, pad_left: usize, pad_right: usize) -> Vec<Option<&T>> {
        let mut out = Vec::with_capacity(self.len() + pad_left + pad_right);
        out.extend(std::iter::repeat_with(|| None).take(pad_left.saturating_sub(self.left.len())));
        out.extend(self.left.iter().rev().map(Some));
        out.extend(self.right.iter().map(Some));
        out.extend(std::iter::repeat_with(|| None).take(pad_right.saturating_sub(self.right.len())));
        out
    }
}

impl<T: fmt::Display> fmt::Display for BidirectionalArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (pos, (_, value)) in self.iter().enumerate() {
            if pos > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("]")
    }
}
