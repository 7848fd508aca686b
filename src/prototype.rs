//! Named templates duplicated on demand (Prototype).
//!
//! Duplication goes through [`Prototype::duplicate`], written out per type,
//! instead of `Clone`. A derived `Clone` copies `Rc` handles and would let a
//! copy share mutable state with its template.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::family::Product;

pub trait Prototype: Sized {
    /// Copy every owned field, recursively. The result aliases nothing in `self`.
    fn duplicate(&self) -> Self;
}

impl Prototype for Box<dyn Product> {
    fn duplicate(&self) -> Self {
        self.clone_product()
    }
}

impl<T: Prototype> Prototype for Vec<T> {
    fn duplicate(&self) -> Self {
        self.iter().map(Prototype::duplicate).collect()
    }
}

impl<T: Prototype> Prototype for Option<T> {
    fn duplicate(&self) -> Self {
        self.as_ref().map(Prototype::duplicate)
    }
}

impl Prototype for String {
    fn duplicate(&self) -> Self {
        self.clone()
    }
}

pub struct PrototypeRegistry<T> {
    templates: BTreeMap<String, T>,
}

impl<T> Default for PrototypeRegistry<T> {
    fn default() -> Self {
        PrototypeRegistry {
            templates: BTreeMap::new(),
        }
    }
}

impl<T: Prototype> PrototypeRegistry<T> {
    pub fn new() -> Self {
        PrototypeRegistry::default()
    }

    pub fn register_template(&mut self, key: impl Into<String>, template: T) -> Result<()> {
        match self.templates.entry(key.into()) {
            Entry::Occupied(entry) => Err(Error::DuplicateTemplate {
                key: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                debug!(key = %entry.key(), "registered template");
                entry.insert(template);
                Ok(())
            }
        }
    }

    /// Fresh deep copy of the template stored under `key`.
    pub fn clone_template(&self, key: &str) -> Result<T> {
        let template = self.templates.get(key).ok_or_else(|| Error::UnknownTemplate {
            key: key.to_string(),
        })?;
        trace!(key, "cloning template");
        Ok(template.duplicate())
    }

    pub fn template(&self, key: &str) -> Option<&T> {
        self.templates.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl<T> fmt::Debug for PrototypeRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrototypeRegistry")
            .field("keys", &self.templates.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone)]
    struct Palette {
        name: String,
        colors: Rc<RefCell<Vec<String>>>,
    }

    impl Palette {
        fn new(name: &str, colors: &[&str]) -> Self {
            Palette {
                name: name.to_string(),
                colors: Rc::new(RefCell::new(colors.iter().map(|c| c.to_string()).collect())),
            }
        }
    }

    impl Prototype for Palette {
        fn duplicate(&self) -> Self {
            Palette {
                name: self.name.clone(),
                colors: Rc::new(RefCell::new(self.colors.borrow().clone())),
            }
        }
    }

    #[test]
    fn duplicate_does_not_share_cells() {
        let mut registry = PrototypeRegistry::new();
        registry
            .register_template("warm", Palette::new("warm", &["red", "orange"]))
            .unwrap();

        let a = registry.clone_template("warm").unwrap();
        let b = registry.clone_template("warm").unwrap();
        assert!(!Rc::ptr_eq(&a.colors, &b.colors));
        assert_eq!(*a.colors.borrow(), *b.colors.borrow());

        a.colors.borrow_mut().push("yellow".into());
        assert_eq!(b.colors.borrow().len(), 2);
        assert_eq!(registry.template("warm").unwrap().colors.borrow().len(), 2);
    }

    #[test]
    fn derived_clone_would_alias() {
        let palette = Palette::new("cool", &["blue"]);
        let shallow = palette.clone();
        assert!(Rc::ptr_eq(&palette.colors, &shallow.colors));
        assert!(!Rc::ptr_eq(&palette.colors, &palette.duplicate().colors));
    }

    #[test]
    fn duplicate_and_unknown_keys() {
        let mut registry = PrototypeRegistry::new();
        registry.register_template("a", String::from("first")).unwrap();

        let err = registry.register_template("a", String::from("second")).unwrap_err();
        assert!(matches!(err, Error::DuplicateTemplate { ref key } if key == "a"));
        assert_eq!(registry.template("a").map(String::as_str), Some("first"));

        let err = registry.clone_template("b").unwrap_err();
        assert!(matches!(err, Error::UnknownTemplate { ref key } if key == "b"));
        assert_eq!(registry.len(), 1);
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn product_templates_clone_across_threads() {
        use crate::catalog::ModernChair;

        assert_send_sync::<PrototypeRegistry<Box<dyn Product>>>();

        let mut registry: PrototypeRegistry<Box<dyn Product>> = PrototypeRegistry::new();
        registry
            .register_template("chair", Box::new(ModernChair::new("modern")))
            .unwrap();
        let registry = &registry;

        let described: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| scope.spawn(move || registry.clone_template("chair").unwrap().describe()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(described, ["Sitting on a modern chair.", "Sitting on a modern chair."]);
    }

    proptest! {
        #[test]
        fn clones_are_independent(colors in prop::collection::vec("[a-z]{1,8}", 0..10), extra in "[a-z]{1,8}") {
            let refs: Vec<&str> = colors.iter().map(String::as_str).collect();
            let mut registry = PrototypeRegistry::new();
            registry.register_template("p", Palette::new("p", &refs)).unwrap();

            let first = registry.clone_template("p").unwrap();
            let second = registry.clone_template("p").unwrap();
            prop_assert_eq!(&*first.colors.borrow(), &colors);

            first.colors.borrow_mut().push(extra);
            prop_assert_eq!(&*second.colors.borrow(), &colors);
            prop_assert_eq!(&*registry.template("p").unwrap().colors.borrow(), &colors);
        }
    }
}
