//! Built-in local functions
//!
//! A small set of in-process functions every deployment gets: `echo`,
//! `current_time` and `sleep`. Backend services plug in next to them by
//! implementing [`LocalFunction`](toolmesh_application::LocalFunction).

mod functions;

pub use functions::{CURRENT_TIME, CurrentTime, ECHO, Echo, MAX_SLEEP_MS, SLEEP, Sleep};

use std::sync::Arc;
use toolmesh_application::LocalFunctionRegistry;

/// Registry holding every built-in function.
pub fn builtin_registry() -> LocalFunctionRegistry {
    LocalFunctionRegistry::new()
        .with(Arc::new(Echo))
        .with(Arc::new(CurrentTime))
        .with(Arc::new(Sleep))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        let registry = builtin_registry();
        assert_eq!(registry.names(), vec![CURRENT_TIME, ECHO, SLEEP]);
    }
}
