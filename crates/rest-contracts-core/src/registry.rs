//! Process-wide registry of declared `(method, path)` pairs.
//!
//! The registry starts empty and is filled while descriptors are declared,
//! normally during startup. After that it is only read. Registration is
//! guarded by a mutex so descriptors declared from concurrent
//! initialization paths still see each other.
//!
//! [`reset`] clears the registry. It exists for test isolation; calling it
//! in production lets duplicate declarations go unnoticed.

use std::collections::BTreeMap;
use std::panic::Location;

use parking_lot::Mutex;

use crate::error::DuplicateRouteError;
use crate::method::Method;

type RouteKey = (Method, String);

static REGISTRY: Mutex<BTreeMap<RouteKey, &'static Location<'static>>> =
    parking_lot::const_mutex(BTreeMap::new());

/// A claimed `(method, path)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// HTTP method.
    pub method: Method,
    /// Path template.
    pub path: String,
    /// Where the descriptor was declared.
    pub origin: &'static Location<'static>,
}

/// Claims a `(method, path)` pair.
///
/// # Errors
///
/// Returns [`DuplicateRouteError`] naming both declaration sites if the
/// pair is already claimed.
pub fn register(
    method: Method,
    path: &str,
    origin: &'static Location<'static>,
) -> Result<(), DuplicateRouteError> {
    let mut routes = REGISTRY.lock();
    let key = (method, path.to_string());

    if let Some(original) = routes.get(&key).copied() {
        return Err(DuplicateRouteError {
            method,
            path: key.1,
            original,
            duplicate: origin,
        });
    }

    routes.insert(key, origin);
    Ok(())
}

/// Returns `true` if the pair has been claimed.
#[must_use]
pub fn is_registered(method: Method, path: &str) -> bool {
    REGISTRY.lock().contains_key(&(method, path.to_string()))
}

/// Returns every claimed pair, ordered by method then path.
#[must_use]
pub fn registered_routes() -> Vec<Registration> {
    REGISTRY
        .lock()
        .iter()
        .map(|((method, path), origin)| Registration {
            method: *method,
            path: path.clone(),
            origin: *origin,
        })
        .collect()
}

/// Clears every registration.
pub fn reset() {
    REGISTRY.lock().clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_duplicate() {
        let here = Location::caller();
        register(Method::Put, "/registry/a", here).unwrap();
        assert!(is_registered(Method::Put, "/registry/a"));

        let err = register(Method::Put, "/registry/a", here).unwrap_err();
        assert_eq!(err.path, "/registry/a");
        assert_eq!(err.method, Method::Put);
    }

    #[test]
    fn test_method_is_part_of_the_key() {
        let here = Location::caller();
        register(Method::Get, "/registry/b", here).unwrap();
        register(Method::Delete, "/registry/b", here).unwrap();
        assert!(!is_registered(Method::Post, "/registry/b"));
    }

    #[test]
    fn test_paths_are_compared_verbatim() {
        let here = Location::caller();
        register(Method::Get, "/registry/c", here).unwrap();
        register(Method::Get, "/registry/c/", here).unwrap();
    }

    #[test]
    fn test_registered_routes_lists_claims() {
        let here = Location::caller();
        register(Method::Patch, "/registry/d", here).unwrap();
        let routes = registered_routes();
        assert!(routes
            .iter()
            .any(|route| route.method == Method::Patch && route.path == "/registry/d"));
    }

    #[test]
    fn test_concurrent_registration_admits_one_winner() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| register(Method::Post, "/registry/race", Location::caller()))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(Result::is_ok)
            .count();
        assert_eq!(winners, 1);
    }
}
