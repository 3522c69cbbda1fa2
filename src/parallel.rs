//! Fork-join helpers and the explicit parallel configuration threaded through
//! every kernel entry point.

use crate::linalg::LinalgError;

/// Parallelism strategy that can be passed to the kernels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parallelism {
    /// No parallelism. The kernel runs sequentially on the calling thread.
    None,
    /// Rayon parallelism over the global pool.
    ///
    /// The value is the number of threads the kernel may use. `0` means the
    /// size of the current rayon pool.
    Rayon(usize),
}

impl Default for Parallelism {
    fn default() -> Self {
        Parallelism::Rayon(0)
    }
}

/// Thresholds and degree of parallelism read by the kernels.
///
/// Passed explicitly to every entry point; there is no process-wide state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Worker budget.
    pub parallelism: Parallelism,
    /// Smallest matrix dimension for which the multiply kernel forks.
    pub parallelize_order: usize,
    /// Smallest column range for which the Cholesky and QR updates fork.
    pub parallelize_elements: usize,
    /// Largest dimension handled by the multiply base case.
    pub block_size: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            parallelism: Parallelism::default(),
            parallelize_order: 64,
            parallelize_elements: 300,
            block_size: 64,
        }
    }
}

impl ParallelConfig {
    /// Default thresholds with all work on the calling thread.
    pub fn sequential() -> Self {
        Self {
            parallelism: Parallelism::None,
            ..Self::default()
        }
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_parallelize_order(mut self, order: usize) -> Self {
        self.parallelize_order = order;
        self
    }

    pub fn with_parallelize_elements(mut self, elements: usize) -> Self {
        self.parallelize_elements = elements;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Reject configurations the kernels cannot run with.
    pub fn validate(&self) -> Result<(), LinalgError> {
        if self.block_size == 0 {
            return Err(LinalgError::InvalidConfiguration(
                "block size must be at least one",
            ));
        }
        if self.parallelize_order == 0 {
            return Err(LinalgError::InvalidConfiguration(
                "parallelize order must be at least one",
            ));
        }
        Ok(())
    }

    /// Number of workers this configuration resolves to.
    #[inline]
    pub fn degree(&self) -> usize {
        degree(self.parallelism)
    }
}

/// The amount of threads that should ideally execute an operation with the
/// given parallelism.
#[inline]
pub fn degree(parallelism: Parallelism) -> usize {
    match parallelism {
        Parallelism::None => 1,
        Parallelism::Rayon(0) => rayon::current_num_threads(),
        Parallelism::Rayon(n_threads) => n_threads,
    }
}

/// Executes the two operations, possibly in parallel, while splitting the
/// amount of parallelism between the two.
#[inline]
pub fn join<A, B>(op_a: A, op_b: B, parallelism: Parallelism)
where
    A: Send + FnOnce(Parallelism),
    B: Send + FnOnce(Parallelism),
{
    match parallelism {
        Parallelism::None => {
            op_a(parallelism);
            op_b(parallelism);
        }
        Parallelism::Rayon(n_threads) => {
            let n_threads = if n_threads > 0 {
                n_threads
            } else {
                rayon::current_num_threads()
            };
            if n_threads == 1 {
                op_a(Parallelism::None);
                op_b(Parallelism::None);
            } else {
                log::trace!(target: "managed_linalg", "fork with {n_threads} workers");
                let parallelism = Parallelism::Rayon(n_threads - n_threads / 2);
                rayon::join(|| op_a(parallelism), || op_b(parallelism));
            }
        }
    }
}
