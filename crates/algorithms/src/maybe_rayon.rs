//! `into_par_iter` for the site fan-out, with or without rayon.
//!
//! [`ProcessingMode::par_map`](crate::parallel::ProcessingMode::par_map) only
//! ever calls `(0..len).into_par_iter().map(f).collect()`. With the `parallel`
//! feature that is rayon's parallel iterator; without it the same call
//! resolves to a plain `Range` iterator.

#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    pub trait IntoParallelIterator: IntoIterator + Sized {
        fn into_par_iter(self) -> Self::IntoIter {
            self.into_iter()
        }
    }

    impl<I: IntoIterator> IntoParallelIterator for I {}
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;
