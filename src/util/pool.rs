/// Fixed number of slots handed out round-robin. A slot stays taken until
/// freed, so two live items never share one.
#[derive(Debug)]
pub struct Pool<T> {
    items: Vec<Option<T>>,
    cursor: usize,
}

impl<T> Pool<T> {
    pub fn with_capacity(cap: usize) -> Self {
        let mut items = Vec::with_capacity(cap);
        items.resize_with(cap, || None);
        Self { items, cursor: 0 }
    }

    /// Place `item` in the next free slot at or after the cursor.
    /// Hands the item back when every slot is taken.
    pub fn alloc(&mut self, item: T) -> Result<usize, T> {
        let cap = self.items.len();
        for step in 0..cap {
            let idx = (self.cursor + step) % cap;
            if self.items[idx].is_none() {
                self.items[idx] = Some(item);
                self.cursor = (idx + 1) % cap;
                return Ok(idx);
            }
        }
        Err(item)
    }

    /// Empty a slot, returning what was in it.
    pub fn free(&mut self, idx: usize) -> Option<T> {
        self.items.get_mut(idx)?.take()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| item.as_ref().map(|t| (i, t)))
    }
}
