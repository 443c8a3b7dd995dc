use std::iter::Peekable;

/// The Luby sequence scaled by `base`: 1, 1, 2, 1, 1, 2, 4, ...
pub struct Luby {
    base: usize,
    uv: (isize, isize),
}

impl Luby {
    pub fn new(base: usize) -> Self {
        Self { base, uv: (1, 1) }
    }
}

impl Iterator for Luby {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let (u, v) = self.uv;
        // Based on Knuth's formula, see https://oeis.org/A182105.
        self.uv = if u & -u == v { (u + 1, 1) } else { (u, 2 * v) };
        Some(self.base * v as usize)
    }
}

/// Counts conflicts and signals when the current Luby interval is used up.
pub struct Restarts {
    conflicts: usize,
    threshold: Peekable<Luby>,
}

impl Restarts {
    pub fn new(base: usize) -> Self {
        Self {
            conflicts: 0,
            threshold: Luby::new(base).peekable(),
        }
    }

    pub fn on_conflict(&mut self) {
        self.conflicts += 1;
    }

    /// Returns true (and starts the next interval) once enough conflicts
    /// have accumulated.
    pub fn due(&mut self) -> bool {
        let limit = self.threshold.peek().copied().unwrap_or(usize::MAX);
        if self.conflicts < limit {
            return false;
        }
        self.conflicts = 0;
        self.threshold.next();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{Luby, Restarts};

    #[test]
    fn basic() {
        let expected = vec![1, 1, 2, 1, 1, 2, 4, 1, 1, 2, 1, 1, 2, 4, 8, 1, 1, 2, 1, 1];
        let actual: Vec<usize> = Luby::new(1).take(20).collect();
        assert_eq!(expected, actual);
    }

    #[test]
    fn restarts_follow_sequence() {
        let mut restarts = Restarts::new(2);
        let mut fired = vec![];
        for conflict in 1..=12 {
            restarts.on_conflict();
            if restarts.due() {
                fired.push(conflict);
            }
        }
        // intervals 2, 2, 4, 2, 2
        assert_eq!(fired, vec![2, 4, 8, 10, 12]);
    }
}
