//! Product families (Abstract Factory).
//!
//! A [`FamilyFactory`] knows how to make one [`Product`] for each [`Role`] it
//! declares. The [`FamilyRegistry`] maps family names to factories and hands
//! out whole [`Family`] bundles: either every role is built, or the call
//! fails and nothing is returned.

use std::any::Any;
use std::borrow::Borrow;
use std::collections::btree_map::{self, Entry};
use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use tracing::{debug, trace};

use crate::error::{BoxError, Error, Result};

// ============================================================================
// Roles and products
// ============================================================================

/// Name of an abstract capability, e.g. `"chair"` or `"main-course"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Role(String);

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Role(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        Role(name.to_string())
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        Role(name)
    }
}

impl Borrow<str> for Role {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared capability set of every concrete product.
///
/// `Send + Sync` so a populated registry can be shared across threads.
pub trait Product: fmt::Debug + Send + Sync {
    /// Tag of the family this product was made for.
    fn family(&self) -> &str;

    fn describe(&self) -> String;

    /// Field-by-field copy into a fresh allocation.
    fn clone_product(&self) -> Box<dyn Product>;

    fn as_any(&self) -> &dyn Any;
}

/// Raised when a factory hands back a product stamped for another family.
#[derive(Error, Debug)]
#[error("product is tagged `{found}`, expected `{expected}`")]
struct TagMismatch {
    expected: String,
    found: String,
}

#[derive(Error, Debug)]
#[error("role is declared more than once by the factory")]
struct RepeatedRole;

// ============================================================================
// Factories
// ============================================================================

pub trait FamilyFactory: Send + Sync {
    /// Roles this factory produces, one product each. Each role appears once.
    fn roles(&self) -> Vec<Role>;

    /// Build the product for `role`, tagged with `family`.
    fn create(&self, family: &str, role: &Role) -> std::result::Result<Box<dyn Product>, BoxError>;
}

type Constructor = Box<dyn Fn(&str) -> std::result::Result<Box<dyn Product>, BoxError> + Send + Sync>;

/// Factory assembled from one closure per role.
///
/// ```
/// use patternkit::catalog::{ModernChair, ModernSofa};
/// use patternkit::{FamilyRegistry, RoleTable};
///
/// let mut registry = FamilyRegistry::new();
/// registry
///     .register_family(
///         "modern",
///         RoleTable::new()
///             .role("chair", |family| Ok(Box::new(ModernChair::new(family))))
///             .role("sofa", |family| Ok(Box::new(ModernSofa::new(family)))),
///     )
///     .unwrap();
/// let family = registry.create_family("modern").unwrap();
/// assert_eq!(family.len(), 2);
/// ```
#[derive(Default)]
pub struct RoleTable {
    constructors: BTreeMap<Role, Constructor>,
}

impl RoleTable {
    pub fn new() -> Self {
        RoleTable::default()
    }

    pub fn role<F>(mut self, role: impl Into<Role>, make: F) -> Self
    where
        F: Fn(&str) -> std::result::Result<Box<dyn Product>, BoxError> + Send + Sync + 'static,
    {
        self.constructors.insert(role.into(), Box::new(make));
        self
    }
}

impl FamilyFactory for RoleTable {
    fn roles(&self) -> Vec<Role> {
        self.constructors.keys().cloned().collect()
    }

    fn create(&self, family: &str, role: &Role) -> std::result::Result<Box<dyn Product>, BoxError> {
        match self.constructors.get(role) {
            Some(make) => make(family),
            None => Err(format!("no constructor for role `{}`", role).into()),
        }
    }
}

// ============================================================================
// Family bundle
// ============================================================================

/// One product per role, all tagged with the same family name.
#[derive(Debug)]
pub struct Family {
    name: String,
    products: BTreeMap<Role, Box<dyn Product>>,
}

impl Family {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, role: &str) -> Option<&dyn Product> {
        self.products.get(role).map(|p| p.as_ref())
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.products.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Role, &dyn Product)> {
        self.products.iter().map(|(role, p)| (role, p.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn into_products(self) -> BTreeMap<Role, Box<dyn Product>> {
        self.products
    }
}

impl IntoIterator for Family {
    type Item = (Role, Box<dyn Product>);
    type IntoIter = btree_map::IntoIter<Role, Box<dyn Product>>;

    fn into_iter(self) -> Self::IntoIter {
        self.products.into_iter()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Family name -> factory. Populate once, then share read-only.
#[derive(Default)]
pub struct FamilyRegistry {
    factories: BTreeMap<String, Box<dyn FamilyFactory>>,
}

impl FamilyRegistry {
    pub fn new() -> Self {
        FamilyRegistry::default()
    }

    pub fn register_family<F>(&mut self, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: FamilyFactory + 'static,
    {
        match self.factories.entry(name.into()) {
            Entry::Occupied(entry) => Err(Error::DuplicateFamily {
                name: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                debug!(family = %entry.key(), roles = factory.roles().len(), "registered product family");
                entry.insert(Box::new(factory));
                Ok(())
            }
        }
    }

    /// Build every role of `name`. Any failing role discards the whole bundle.
    pub fn create_family(&self, name: &str) -> Result<Family> {
        let factory = self.factories.get(name).ok_or_else(|| Error::UnknownFamily {
            name: name.to_string(),
        })?;

        let construction_error = |role: &Role, source: BoxError| Error::FamilyConstruction {
            family: name.to_string(),
            role: role.to_string(),
            source,
        };

        let mut products: BTreeMap<Role, Box<dyn Product>> = BTreeMap::new();
        for role in factory.roles() {
            if products.contains_key(&role) {
                return Err(construction_error(&role, RepeatedRole.into()));
            }
            let product = factory
                .create(name, &role)
                .map_err(|source| construction_error(&role, source))?;
            if product.family() != name {
                let mismatch = TagMismatch {
                    expected: name.to_string(),
                    found: product.family().to_string(),
                };
                return Err(construction_error(&role, mismatch.into()));
            }
            trace!(family = name, role = %role, "constructed product");
            products.insert(role, product);
        }

        Ok(Family {
            name: name.to_string(),
            products,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered family names, sorted.
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for FamilyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FamilyRegistry")
            .field("families", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
