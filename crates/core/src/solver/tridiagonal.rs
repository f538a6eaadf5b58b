//! Thomas algorithm with buffers reused across iterations
//!
//! Row `i` reads `lower[i]·x[i−1] + diagonal[i]·x[i] + upper[i]·x[i+1] = rhs[i]`;
//! `lower[0]` and `upper[n−1]` are ignored.

/// Tridiagonal system whose storage survives between solves.
#[derive(Debug, Clone, Default)]
pub struct TridiagonalSystem {
    pub lower: Vec<f64>,
    pub diagonal: Vec<f64>,
    pub upper: Vec<f64>,
    pub rhs: Vec<f64>,
    sweep: Vec<f64>,
}

impl TridiagonalSystem {
    #[must_use]
    pub fn with_capacity(n: usize) -> Self {
        let mut system = Self::default();
        system.resize(n);
        system
    }

    /// Set the number of rows, zeroing all coefficients.
    pub fn resize(&mut self, n: usize) {
        for v in [
            &mut self.lower,
            &mut self.diagonal,
            &mut self.upper,
            &mut self.rhs,
            &mut self.sweep,
        ] {
            v.clear();
            v.resize(n, 0.0);
        }
    }

    pub fn len(&self) -> usize {
        self.diagonal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagonal.is_empty()
    }

    /// Solve in place; the solution replaces `rhs`.
    ///
    /// Returns `false` on a zero or non-finite pivot, leaving `rhs`
    /// undefined.
    pub fn solve(&mut self) -> bool {
        let n = self.len();
        if n == 0 {
            return true;
        }

        // Forward sweep
        let mut pivot = self.diagonal[0];
        if pivot == 0.0 || !pivot.is_finite() {
            return false;
        }
        self.sweep[0] = self.upper[0] / pivot;
        self.rhs[0] /= pivot;
        for i in 1..n {
            pivot = self.diagonal[i] - self.lower[i] * self.sweep[i - 1];
            if pivot == 0.0 || !pivot.is_finite() {
                return false;
            }
            self.sweep[i] = if i + 1 < n { self.upper[i] / pivot } else { 0.0 };
            self.rhs[i] = (self.rhs[i] - self.lower[i] * self.rhs[i - 1]) / pivot;
        }

        // Back substitution
        for i in (0..n - 1).rev() {
            self.rhs[i] -= self.sweep[i] * self.rhs[i + 1];
        }
        true
    }

    /// Solution of the last successful [`solve`](Self::solve).
    pub fn solution(&self) -> &[f64] {
        &self.rhs
    }
}
