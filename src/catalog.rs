//! Stock scenarios built on the toolkit: furniture families, meal builders,
//! a document template and org-chart payloads.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assembler::{Assembler, StepBuilder};
use crate::composite::{Describe, NodeId, Tree};
use crate::error::{BoxError, Result};
use crate::family::{FamilyRegistry, Product, RoleTable};
use crate::prototype::Prototype;

// ============================================================================
// Furniture families
// ============================================================================

macro_rules! furniture {
    ($name:ident, $material:expr, $text:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            family: String,
            material: &'static str,
        }

        impl $name {
            pub fn new(family: &str) -> Self {
                $name {
                    family: family.to_string(),
                    material: $material,
                }
            }

            pub fn material(&self) -> &str {
                self.material
            }
        }

        impl Product for $name {
            fn family(&self) -> &str {
                &self.family
            }

            fn describe(&self) -> String {
                $text.to_string()
            }

            fn clone_product(&self) -> Box<dyn Product> {
                Box::new($name {
                    family: self.family.clone(),
                    material: self.material,
                })
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

furniture!(ModernChair, "steel", "Sitting on a modern chair.");
furniture!(ModernSofa, "leather", "Lying on a modern sofa.");
furniture!(VictorianChair, "walnut", "Sitting on a victorian chair.");
furniture!(VictorianSofa, "velvet", "Lying on a victorian sofa.");

pub const CHAIR: &str = "chair";
pub const SOFA: &str = "sofa";

/// Registry with the `"modern"` and `"victorian"` families.
pub fn furniture_registry() -> Result<FamilyRegistry> {
    let mut registry = FamilyRegistry::new();
    registry.register_family(
        "modern",
        RoleTable::new()
            .role(CHAIR, |family| Ok(Box::new(ModernChair::new(family))))
            .role(SOFA, |family| Ok(Box::new(ModernSofa::new(family)))),
    )?;
    registry.register_family(
        "victorian",
        RoleTable::new()
            .role(CHAIR, |family| Ok(Box::new(VictorianChair::new(family))))
            .role(SOFA, |family| Ok(Box::new(VictorianSofa::new(family)))),
    )?;
    Ok(registry)
}

// ============================================================================
// Meals
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    pub main_course: String,
    pub side_dish: String,
    pub drink: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MealStep {
    MainCourse,
    SideDish,
    Drink,
}

impl MealStep {
    pub const ALL: [MealStep; 3] = [MealStep::MainCourse, MealStep::SideDish, MealStep::Drink];

    pub fn as_str(self) -> &'static str {
        match self {
            MealStep::MainCourse => "main-course",
            MealStep::SideDish => "side-dish",
            MealStep::Drink => "drink",
        }
    }
}

impl fmt::Display for MealStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown meal step `{0}`")]
pub struct UnknownMealStep(pub String);

impl FromStr for MealStep {
    type Err = UnknownMealStep;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        MealStep::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| UnknownMealStep(s.to_string()))
    }
}

/// Main course, then side dish, then drink.
pub fn standard_meal_order() -> Assembler<MealStep> {
    Assembler::new(MealStep::ALL)
}

fn set_course(meal: &mut Meal, step: MealStep, value: &str) {
    let slot = match step {
        MealStep::MainCourse => &mut meal.main_course,
        MealStep::SideDish => &mut meal.side_dish,
        MealStep::Drink => &mut meal.drink,
    };
    *slot = value.to_string();
}

#[derive(Debug, Default)]
pub struct VegetarianMealBuilder {
    meal: Meal,
}

impl VegetarianMealBuilder {
    pub fn new() -> Self {
        VegetarianMealBuilder::default()
    }
}

impl StepBuilder for VegetarianMealBuilder {
    type Step = MealStep;
    type Product = Meal;

    fn run_step(&mut self, step: MealStep) -> std::result::Result<(), BoxError> {
        let value = match step {
            MealStep::MainCourse => "Veggie Burger",
            MealStep::SideDish => "Fries",
            MealStep::Drink => "Juice",
        };
        set_course(&mut self.meal, step, value);
        Ok(())
    }

    fn product(&self) -> Meal {
        self.meal.clone()
    }
}

#[derive(Debug, Default)]
pub struct NonVegetarianMealBuilder {
    meal: Meal,
}

impl NonVegetarianMealBuilder {
    pub fn new() -> Self {
        NonVegetarianMealBuilder::default()
    }
}

impl StepBuilder for NonVegetarianMealBuilder {
    type Step = MealStep;
    type Product = Meal;

    fn run_step(&mut self, step: MealStep) -> std::result::Result<(), BoxError> {
        let value = match step {
            MealStep::MainCourse => "Chicken Burger",
            MealStep::SideDish => "Onion Rings",
            MealStep::Drink => "Coke",
        };
        set_course(&mut self.meal, step, value);
        Ok(())
    }

    fn product(&self) -> Meal {
        self.meal.clone()
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("no {0} was chosen")]
pub struct EmptyChoice(pub MealStep);

/// Builder fed with the caller's own choices; a blank choice fails its step.
#[derive(Debug)]
pub struct CustomMealBuilder {
    choices: Meal,
    meal: Meal,
}

impl CustomMealBuilder {
    pub fn new(choices: Meal) -> Self {
        CustomMealBuilder {
            choices,
            meal: Meal::default(),
        }
    }
}

impl StepBuilder for CustomMealBuilder {
    type Step = MealStep;
    type Product = Meal;

    fn run_step(&mut self, step: MealStep) -> std::result::Result<(), BoxError> {
        let choice = match step {
            MealStep::MainCourse => &self.choices.main_course,
            MealStep::SideDish => &self.choices.side_dish,
            MealStep::Drink => &self.choices.drink,
        };
        if choice.trim().is_empty() {
            return Err(Box::new(EmptyChoice(step)));
        }
        set_course(&mut self.meal, step, choice);
        Ok(())
    }

    fn product(&self) -> Meal {
        self.meal.clone()
    }
}

// ============================================================================
// Document template
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Style {
    pub font: String,
    pub size: u16,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub body: String,
}

impl Prototype for Section {
    fn duplicate(&self) -> Self {
        Section {
            heading: self.heading.clone(),
            body: self.body.clone(),
        }
    }
}

/// Pre-filled document whose style cell is shared by handle.
#[derive(Debug, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub tags: Vec<String>,
    pub sections: Vec<Section>,
    pub style: Rc<RefCell<Style>>,
}

impl Document {
    pub fn new(title: impl Into<String>, style: Style) -> Self {
        Document {
            title: title.into(),
            tags: Vec::new(),
            sections: Vec::new(),
            style: Rc::new(RefCell::new(style)),
        }
    }

    pub fn section(mut self, heading: impl Into<String>, body: impl Into<String>) -> Self {
        self.sections.push(Section {
            heading: heading.into(),
            body: body.into(),
        });
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

impl Prototype for Document {
    fn duplicate(&self) -> Self {
        Document {
            title: self.title.clone(),
            tags: self.tags.duplicate(),
            sections: self.sections.duplicate(),
            style: Rc::new(RefCell::new(self.style.borrow().clone())),
        }
    }
}

// ============================================================================
// Org chart
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Employee {
    pub name: String,
    pub title: String,
    pub salary: u64,
}

impl Employee {
    pub fn new(name: impl Into<String>, title: impl Into<String>, salary: u64) -> Self {
        Employee {
            name: name.into(),
            title: title.into(),
            salary,
        }
    }
}

impl Describe for Employee {
    fn describe(&self) -> String {
        format!("{} ({})", self.name, self.title)
    }
}

/// Sum of leaf salaries under `id`, saturating at `u64::MAX`.
pub fn payroll(tree: &Tree<Employee>, id: NodeId) -> Result<u64> {
    tree.fold(id, 0, |total, employee| total.saturating_add(employee.salary))
}
