//! Action handler registry
//!
//! The engine knows nothing about individual action kinds; each kind is one
//! registry entry. Kinds without an entry are skipped at run time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use action_locator::ElementResolver;
use async_trait::async_trait;
use softlight_core_types::{Action, ActionKind};
use surface_driver::SurfaceDriver;

use crate::config::EngineConfig;
use crate::errors::StepError;
use crate::handlers;
use crate::types::StepOutcome;

/// What a handler gets to work with for one step
pub struct StepEnv<'a> {
    pub surface: &'a dyn SurfaceDriver,
    pub resolver: &'a dyn ElementResolver,
    pub config: &'a EngineConfig,
    /// 1-based step number
    pub step: usize,
}

#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(&self, action: &Action, env: &StepEnv<'_>) -> Result<StepOutcome, StepError>;
}

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<ActionKind, Arc<dyn ActionHandler>>,
}

impl HandlerRegistry {
    /// Registry with no handlers
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with a handler for every built-in kind
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(ActionKind::Open, Arc::new(handlers::OpenHandler));
        registry.register(ActionKind::FindAndClick, Arc::new(handlers::ClickHandler));
        registry.register(ActionKind::Fill, Arc::new(handlers::FillHandler));
        registry.register(ActionKind::Press, Arc::new(handlers::PressHandler));
        registry.register(ActionKind::Expect, Arc::new(handlers::ExpectHandler));
        registry.register(ActionKind::WaitFor, Arc::new(handlers::WaitHandler));
        registry.register(ActionKind::MarkCompleted, Arc::new(handlers::MarkCompletedHandler));
        registry.register(ActionKind::DeleteTodo, Arc::new(handlers::DeleteTodoHandler));
        registry.register(ActionKind::ClearCompleted, Arc::new(handlers::ClearCompletedHandler));
        registry
    }

    /// Install `handler` for `kind`, returning the one it replaces
    pub fn register(
        &mut self,
        kind: ActionKind,
        handler: Arc<dyn ActionHandler>,
    ) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.insert(kind, handler)
    }

    pub fn unregister(&mut self, kind: ActionKind) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.remove(&kind)
    }

    pub fn get(&self, kind: ActionKind) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(&kind).cloned()
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Registered kinds in declaration order
    pub fn kinds(&self) -> Vec<ActionKind> {
        let mut kinds: Vec<ActionKind> = self.handlers.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
