//! Stepwise assembly (Builder).
//!
//! A [`StepBuilder`] exposes one operation per step plus a `product`
//! accessor. The [`Assembler`] is the director: it owns a fixed step order
//! and drives any builder for that step type through it.
//!
//! Re-running the assembler on the same builder re-executes every step and
//! overwrites earlier values. Calling `product` before any run yields the
//! builder's unset state; nothing here guards against that.

use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::error::{BoxError, Error, Result};

pub trait StepBuilder {
    /// Step identifier, usually a fieldless enum.
    type Step: Copy + fmt::Display;
    type Product;

    fn run_step(&mut self, step: Self::Step) -> std::result::Result<(), BoxError>;

    fn product(&self) -> Self::Product;
}

/// Run `order` against `builder`, stopping at the first failing step.
///
/// `product` is only called once every step has succeeded.
pub fn run_steps<B>(builder: &mut B, order: &[B::Step]) -> Result<B::Product>
where
    B: StepBuilder + ?Sized,
{
    for &step in order {
        trace!(step = %step, "running assembly step");
        builder.run_step(step).map_err(|source| Error::StepFailed {
            step: step.to_string(),
            source,
        })?;
    }
    Ok(builder.product())
}

/// Fixed step ordering shared by every builder of one step type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembler<S> {
    order: Vec<S>,
}

impl<S: Copy + fmt::Display> Assembler<S> {
    pub fn new(order: impl Into<Vec<S>>) -> Self {
        Assembler {
            order: order.into(),
        }
    }

    /// Build the order from step names, e.g. loaded from configuration.
    pub fn parse<I, T>(names: I) -> Result<Self>
    where
        S: FromStr,
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let order = names
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                name.parse::<S>()
                    .map_err(|_| Error::Config(format!("unknown assembly step `{}`", name)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Assembler { order })
    }

    pub fn order(&self) -> &[S] {
        &self.order
    }

    pub fn assemble<B>(&self, builder: &mut B) -> Result<B::Product>
    where
        B: StepBuilder<Step = S> + ?Sized,
    {
        run_steps(builder, &self.order)
    }
}
