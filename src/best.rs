use arrayvec::ArrayVec;

/// Keeps the `N` entries with the greatest keys seen so far, sorted by key
/// in descending order. Among equal keys the earlier entry ranks first.
#[derive(Clone, Debug)]
pub struct BestN<K, V, const N: usize> {
    items: ArrayVec<(K, V), N>,
}

impl<K, V, const N: usize> Default for BestN<K, V, N> {
    fn default() -> Self {
        BestN {
            items: ArrayVec::new(),
        }
    }
}

impl<K: PartialOrd, V, const N: usize> BestN<K, V, N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer an entry. Returns true if it was kept.
    pub fn update(&mut self, key: K, val: V) -> bool {
        let pos = self
            .items
            .iter()
            .position(|(k, _)| *k < key)
            .unwrap_or(self.items.len());
        if pos >= N {
            return false;
        }
        if self.items.is_full() {
            self.items.pop();
        }
        self.items.insert(pos, (key, val));
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The entry with the greatest key.
    pub fn best(&self) -> Option<&(K, V)> {
        self.items.first()
    }

    /// Entries from the greatest key to the smallest.
    pub fn as_slice(&self) -> &[(K, V)] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (K, V)> {
        self.items.iter()
    }
}

#[cfg(test)]
mod test {
    use super::BestN;

    #[test]
    fn t_keeps_greatest() {
        let mut best = BestN::<f32, char, 3>::new();
        assert!(best.is_empty());
        assert!(best.update(1.0, 'a'));
        assert!(best.update(5.0, 'b'));
        assert!(best.update(3.0, 'c'));
        assert!(best.update(4.0, 'd'));
        assert!(!best.update(0.5, 'e'));
        let vals: String = best.iter().map(|(_, v)| *v).collect();
        assert_eq!(vals, "bdc");
        assert_eq!(best.best(), Some(&(5.0, 'b')));
    }

    #[test]
    fn t_ties_keep_first() {
        let mut best = BestN::<u32, u32, 2>::new();
        best.update(7, 0);
        best.update(7, 1);
        assert!(!best.update(7, 2));
        assert_eq!(best.as_slice(), &[(7, 0), (7, 1)]);
    }
}
