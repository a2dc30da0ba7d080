use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

#[macro_export]
macro_rules! try_log {
    (
        $expr:expr,
        expect $must:literal $(
            (
                $($must_args:expr),* $(,)?
            )
        )?
        or $never:expr
    ) => {
        {
            #[allow(clippy::question_mark, reason = "the fallback may not be a return")]
            if let Some(value) = $crate::TryLog::convert_or_log(
                $expr,
                format_args!($must, $($($must_args),*)?),
            ) {
                value
            } else {
                $never
            }
        }
    }
}

pub use try_log;

#[macro_export]
macro_rules! try_log_return {
    ($expr:expr, expect $must:literal $(, $($must_args:expr),*)? $(,)?) => {
        $crate::try_log!($expr, expect $must $(($($must_args),*))? or return)
    }
}

pub use try_log_return;

/// Lookups in keyed collections that are expected to succeed.
///
/// A failed lookup is an integrity violation:
/// it is logged and the caller receives `None`.
pub trait MapExt<K, V> {
    fn log_get(&self, key: &K) -> Option<&V>;

    fn log_get_mut(&mut self, key: &K) -> Option<&mut V>;
}

impl<K: Eq + Hash + fmt::Debug, V> MapExt<K, V> for HashMap<K, V> {
    fn log_get(&self, key: &K) -> Option<&V> {
        if let Some(value) = self.get(key) {
            Some(value)
        } else {
            bevy::log::error!("Expected {key:?} to have a {}", type_name::<V>());
            None
        }
    }

    fn log_get_mut(&mut self, key: &K) -> Option<&mut V> {
        if let Some(value) = self.get_mut(key) {
            Some(value)
        } else {
            bevy::log::error!("Expected {key:?} to have a {}", type_name::<V>());
            None
        }
    }
}

/// An expression that can be used for `$expr` in [`try_log!`](crate::try_log!).
pub trait TryLog<T> {
    /// Returns the successful result as `Some`, or log the error with `must`.
    fn convert_or_log(this: Self, must: impl fmt::Display) -> Option<T>;
}

impl<T> TryLog<T> for Option<T> {
    fn convert_or_log(this: Self, must: impl fmt::Display) -> Option<T> {
        if let Some(value) = this {
            Some(value)
        } else {
            bevy::log::error!("{must}");
            None
        }
    }
}

impl<T, E: fmt::Display> TryLog<T> for Result<T, E> {
    fn convert_or_log(this: Self, must: impl fmt::Display) -> Option<T> {
        match this {
            Ok(value) => Some(value),
            Err(err) => {
                bevy::log::error!("{must}: {err}");
                None
            }
        }
    }
}
