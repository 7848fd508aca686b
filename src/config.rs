//! Catalog configuration: product families and step orders described as TOML.
//!
//! ```toml
//! [families.modern]
//! chair = "Sitting on a modern chair."
//! sofa = "Lying on a modern sofa."
//!
//! [assembly]
//! steps = ["main-course", "side-dish", "drink"]
//! ```

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::assembler::Assembler;
use crate::error::{BoxError, Error, Result};
use crate::family::{FamilyFactory, FamilyRegistry, Product, Role};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// family name -> role -> description
    #[serde(default)]
    pub families: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub assembly: AssemblyConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssemblyConfig {
    #[serde(default)]
    pub steps: Vec<String>,
}

impl CatalogConfig {
    pub fn from_toml(src: &str) -> Result<Self> {
        let config: CatalogConfig = toml::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    /// Every family must declare the same, non-empty role set.
    pub fn validate(&self) -> Result<()> {
        let mut expected: Option<BTreeSet<&str>> = None;
        for (family, roles) in &self.families {
            if roles.is_empty() {
                return Err(Error::Config(format!("family `{}` declares no roles", family)));
            }
            let declared: BTreeSet<&str> = roles.keys().map(String::as_str).collect();
            let first = expected.get_or_insert_with(|| declared.clone());
            if *first != declared {
                return Err(Error::RoleMismatch {
                    family: family.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn registry(&self) -> Result<FamilyRegistry> {
        let mut registry = FamilyRegistry::new();
        for (family, roles) in &self.families {
            let items = roles
                .iter()
                .map(|(role, description)| (Role::new(role.as_str()), description.clone()))
                .collect();
            registry.register_family(family.as_str(), CatalogFactory { items })?;
        }
        Ok(registry)
    }

    pub fn step_order<S>(&self) -> Result<Assembler<S>>
    where
        S: FromStr + Copy + fmt::Display,
    {
        Assembler::parse(&self.assembly.steps)
    }
}

/// Product described purely by configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogItem {
    pub family: String,
    pub role: String,
    pub description: String,
}

impl Product for CatalogItem {
    fn family(&self) -> &str {
        &self.family
    }

    fn describe(&self) -> String {
        self.description.clone()
    }

    fn clone_product(&self) -> Box<dyn Product> {
        Box::new(CatalogItem {
            family: self.family.clone(),
            role: self.role.clone(),
            description: self.description.clone(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct CatalogFactory {
    items: BTreeMap<Role, String>,
}

impl FamilyFactory for CatalogFactory {
    fn roles(&self) -> Vec<Role> {
        self.items.keys().cloned().collect()
    }

    fn create(&self, family: &str, role: &Role) -> std::result::Result<Box<dyn Product>, BoxError> {
        let description = self
            .items
            .get(role)
            .ok_or_else(|| format!("role `{}` is not in the catalog", role))?;
        Ok(Box::new(CatalogItem {
            family: family.to_string(),
            role: role.to_string(),
            description: description.clone(),
        }))
    }
}
