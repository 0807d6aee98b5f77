/// Splits a continuous sample stream into fixed-size analysis windows.
///
/// Samples that do not fill a whole window stay pending until more arrive.
#[derive(Clone, Debug)]
pub struct WindowChunker {
    window: usize,
    pending: Vec<f32>,
}

impl WindowChunker {
    pub fn new(window: usize) -> Self {
        assert!(window > 0, "window must be > 0");
        Self {
            window,
            pending: Vec::with_capacity(window),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        self.pending.extend_from_slice(samples);
        let full = self.pending.len() / self.window;
        if full == 0 {
            return Vec::new();
        }
        let rest = self.pending.split_off(full * self.window);
        let ready = std::mem::replace(&mut self.pending, rest);
        ready.chunks_exact(self.window).map(<[f32]>::to_vec).collect()
    }

    /// Returns the incomplete tail, if any.
    pub fn finish(self) -> Option<Vec<f32>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_full_windows_and_keeps_leftover() {
        let mut chunker = WindowChunker::new(4);
        assert!(chunker.push(&[1.0, 2.0, 3.0]).is_empty());
        assert_eq!(chunker.pending(), 3);

        let windows = chunker.push(&[4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(
            windows,
            vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]]
        );
        assert_eq!(chunker.pending(), 1);
        assert_eq!(chunker.finish(), Some(vec![9.0]));
    }

    #[test]
    fn exact_fill_leaves_nothing() {
        let mut chunker = WindowChunker::new(2);
        assert_eq!(chunker.push(&[1.0, 2.0]).len(), 1);
        assert_eq!(chunker.finish(), None);
    }
}
