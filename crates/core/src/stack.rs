use crate::RngState;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("could not populate the stack with new elements")]
    Exhausted,
}

type Refill<T> = Box<dyn FnMut() -> Vec<T> + Send>;

/// Draw pile that rebuilds itself from `refill` whenever it runs dry.
pub struct SelfReplenishingStack<T> {
    refill: Refill<T>,
    shuffle: bool,
    items: Vec<T>,
    pops: usize,
}

impl<T> SelfReplenishingStack<T> {
    pub fn new(
        refill: impl FnMut() -> Vec<T> + Send + 'static,
        shuffle: bool,
        rng: &mut RngState,
    ) -> Self {
        let mut stack = Self {
            refill: Box::new(refill),
            shuffle,
            items: Vec::new(),
            pops: 0,
        };
        stack.replenish(rng);
        stack
    }

    /// Pops the top element. Refills before popping from an empty stack and
    /// again right after the pop that empties it.
    pub fn pop(&mut self, rng: &mut RngState) -> Result<T, StackError> {
        if self.items.is_empty() {
            self.replenish(rng);
        }
        let value = self.items.pop().ok_or(StackError::Exhausted)?;
        if self.items.is_empty() {
            self.replenish(rng);
        }
        self.pops += 1;
        Ok(value)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.pops = 0;
    }

    pub fn set_refill(&mut self, refill: impl FnMut() -> Vec<T> + Send + 'static) {
        self.refill = Box::new(refill);
        self.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn pop_count(&self) -> usize {
        self.pops
    }

    fn replenish(&mut self, rng: &mut RngState) {
        self.items = (self.refill)();
        if self.shuffle {
            rng.shuffle(&mut self.items);
        }
        log::trace!("draw stack refilled with {} elements", self.items.len());
    }
}

impl<T: fmt::Debug> fmt::Debug for SelfReplenishingStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelfReplenishingStack")
            .field("shuffle", &self.shuffle)
            .field("items", &self.items)
            .field("pops", &self.pops)
            .finish()
    }
}
