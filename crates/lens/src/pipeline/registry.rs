use std::collections::HashMap;

use super::context::StepContext;
use super::error::StepError;
use crate::job::Step;

pub trait StepHandler: Send + Sync {
    fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError>;
}

impl<F> StepHandler for F
where
    F: Fn(&mut StepContext<'_>) -> Result<(), StepError> + Send + Sync,
{
    fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        self(ctx)
    }
}

/// One handler per step. Steps without a handler fail when reached.
#[derive(Default)]
pub struct StepRegistry {
    handlers: HashMap<Step, Box<dyn StepHandler>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `step`, replacing any previous one.
    pub fn register(&mut self, step: Step, handler: impl StepHandler + 'static) {
        self.handlers.insert(step, Box::new(handler));
    }

    pub fn register_fn<F>(&mut self, step: Step, f: F)
    where
        F: Fn(&mut StepContext<'_>) -> Result<(), StepError> + Send + Sync + 'static,
    {
        self.handlers.insert(step, Box::new(f));
    }

    pub fn with(mut self, step: Step, handler: impl StepHandler + 'static) -> Self {
        self.register(step, handler);
        self
    }

    pub fn with_fn<F>(mut self, step: Step, f: F) -> Self
    where
        F: Fn(&mut StepContext<'_>) -> Result<(), StepError> + Send + Sync + 'static,
    {
        self.register_fn(step, f);
        self
    }

    pub fn get(&self, step: Step) -> Option<&dyn StepHandler> {
        self.handlers.get(&step).map(|h| h.as_ref())
    }

    pub fn contains(&self, step: Step) -> bool {
        self.handlers.contains_key(&step)
    }

    /// Steps with a handler, in execution order.
    pub fn steps(&self) -> Vec<Step> {
        Step::ALL
            .iter()
            .copied()
            .filter(|step| self.contains(*step))
            .collect()
    }
}

impl std::fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRegistry")
            .field("steps", &self.steps())
            .finish()
    }
}
