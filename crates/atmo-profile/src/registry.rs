//! Profile sources and the identifier registry.
//!
//! A [`Profile`] turns into a canonical [`Dataset`] on demand. Sources are
//! registered under a string identifier with a constructor taking
//! free-form parameters, and instantiated by identifier through
//! [`create`]. The global registry is seeded with the built-in sources;
//! registering an existing identifier replaces it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use atmo_units::Quantity;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{ProfileError, Result};
use crate::interp::InterpMethod;
use crate::profiles;
use crate::schema::Dataset;

/// Constructor parameters of a profile source.
pub type Params = Map<String, Value>;

/// Builds a profile source from its parameters.
pub type ProfileConstructor = fn(&Params) -> Result<Box<dyn Profile>>;

/// A source of atmospheric thermophysical profiles.
pub trait Profile: fmt::Debug + Send + Sync {
    /// The profile as a canonical dataset.
    ///
    /// Without `z` the source returns its native grid (or a default grid
    /// for closed-form models). With `z`, fixed-grid sources interpolate
    /// with `interp_method` and `conserve_column`, closed-form sources
    /// evaluate directly.
    fn to_dataset(
        &self,
        z: Option<&Quantity>,
        interp_method: Option<&InterpMethod>,
        conserve_column: bool,
    ) -> Result<Dataset>;
}

// ============================================================================
// Factory
// ============================================================================

/// Identifier to constructor mapping.
#[derive(Clone, Default)]
pub struct ProfileFactory {
    registry: BTreeMap<String, ProfileConstructor>,
}

impl fmt::Debug for ProfileFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileFactory")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}

impl ProfileFactory {
    /// An empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory holding the built-in profile sources.
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        profiles::register_builtins(&mut factory);
        factory
    }

    /// Bind `identifier` to `constructor`, replacing any previous binding.
    pub fn register(&mut self, identifier: &str, constructor: ProfileConstructor) {
        if self
            .registry
            .insert(identifier.to_string(), constructor)
            .is_some()
        {
            warn!(identifier, "overwriting existing profile registration");
        } else {
            debug!(identifier, "registered profile");
        }
    }

    /// Instantiate the source registered under `identifier`.
    pub fn create(&self, identifier: &str, params: &Params) -> Result<Box<dyn Profile>> {
        let constructor = self
            .registry
            .get(identifier)
            .ok_or_else(|| ProfileError::UnknownProfile(identifier.to_string()))?;
        let profile = constructor(params)?;
        info!(identifier, "created profile");
        Ok(profile)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.registry.contains_key(identifier)
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<String> {
        self.registry.keys().cloned().collect()
    }
}

// ============================================================================
// Global registry
// ============================================================================

static REGISTRY: Lazy<RwLock<ProfileFactory>> =
    Lazy::new(|| RwLock::new(ProfileFactory::with_builtins()));

/// Register a profile source in the global registry.
pub fn register(identifier: &str, constructor: ProfileConstructor) {
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(identifier, constructor);
}

/// Instantiate a profile source from the global registry.
pub fn create(identifier: &str, params: &Params) -> Result<Box<dyn Profile>> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .create(identifier, params)
}

/// Identifiers of the global registry, sorted.
pub fn identifiers() -> Vec<String> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .identifiers()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::IsothermalProfile;

    #[derive(Debug)]
    struct Fixed(f64);

    impl Profile for Fixed {
        fn to_dataset(
            &self,
            z: Option<&Quantity>,
            _interp_method: Option<&InterpMethod>,
            _conserve_column: bool,
        ) -> Result<Dataset> {
            let mut params = Params::new();
            params.insert("temperature".to_string(), Value::from(self.0));
            IsothermalProfile::from_params(&params)?.to_dataset(z, None, false)
        }
    }

    fn cold(_: &Params) -> Result<Box<dyn Profile>> {
        Ok(Box::new(Fixed(200.0)))
    }

    fn warm(_: &Params) -> Result<Box<dyn Profile>> {
        Ok(Box::new(Fixed(300.0)))
    }

    fn surface_temperature(profile: &dyn Profile) -> f64 {
        profile.to_dataset(None, None, false).unwrap().require("t").unwrap().values[0]
    }

    #[test]
    fn test_builtins_registered() {
        let factory = ProfileFactory::with_builtins();
        assert_eq!(
            factory.identifiers(),
            vec!["isothermal".to_string(), "tabulated".to_string()]
        );
    }

    #[test]
    fn test_register_overwrites() {
        let mut factory = ProfileFactory::new();
        factory.register("fixed", cold);
        factory.register("fixed", warm);
        assert_eq!(factory.identifiers(), vec!["fixed".to_string()]);
        let profile = factory.create("fixed", &Params::new()).unwrap();
        assert_eq!(surface_temperature(profile.as_ref()), 300.0);
    }

    #[test]
    fn test_create_unknown_identifier() {
        let err = ProfileFactory::new()
            .create("does-not-exist", &Params::new())
            .unwrap_err();
        assert!(matches!(err, ProfileError::UnknownProfile(_)));
        assert!(err.to_string().contains("does-not-exist"));
    }

    #[test]
    fn test_global_registry() {
        register("registry-test-fixed", cold);
        assert!(identifiers().contains(&"registry-test-fixed".to_string()));
        let profile = create("registry-test-fixed", &Params::new()).unwrap();
        assert_eq!(surface_temperature(profile.as_ref()), 200.0);
        assert!(create("registry-test-missing", &Params::new()).is_err());
    }
}
