//! Recursive target interpreter.
//!
//! [`Executor::run`] dispatches on the [`Target`] variant: names are resolved
//! through the registry, composites fan out serially or in parallel, and
//! actions are invoked with lifecycle events around them. Errors travel back up
//! unchanged; the only conversion happens when an action panics.
//!
//! Each executor carries the chain of names it is currently resolving. A name
//! that reappears in its own chain fails with [`Error::Cycle`] instead of
//! recursing forever.

use crate::cairn::Cairn;
use crate::error::{Error, Result};
use crate::target::{Action, Composite, Context, ExecutionMode, Target};
use async_recursion::async_recursion;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Placeholder used in panic errors raised by anonymous actions.
const ANONYMOUS: &str = "<anonymous>";

/// Runs targets against one facade with one context.
#[derive(Clone)]
pub struct Executor {
    cairn: Cairn,
    context: Context,
    resolving: Arc<[String]>,
}

impl Executor {
    /// Create an executor for a single invocation.
    pub fn new(cairn: Cairn, context: Context) -> Self {
        Self {
            cairn,
            context,
            resolving: Arc::from(Vec::new()),
        }
    }

    /// An executor whose resolution chain is extended by `name`.
    fn entering(&self, name: &str) -> Result<Self> {
        let chain: Vec<String> = self
            .resolving
            .iter()
            .cloned()
            .chain(std::iter::once(name.to_string()))
            .collect();
        if self.resolving.iter().any(|seen| seen == name) {
            tracing::debug!(chain = ?chain, "Target cycle detected");
            return Err(Error::cycle(chain));
        }
        Ok(Self {
            cairn: self.cairn.clone(),
            context: self.context.clone(),
            resolving: chain.into(),
        })
    }

    /// Run `target`, attributing events to `reporting` where one is known.
    #[async_recursion]
    pub async fn run(&self, target: &Target, reporting: Option<&str>) -> Result<()> {
        match target {
            Target::Absent | Target::Marker => Ok(()),
            Target::Name(name) => self.run_name(name, reporting).await,
            Target::Composite(composite) => self.run_composite(composite, reporting).await,
            Target::Action(action) => self.run_action(action, reporting).await,
        }
    }

    async fn run_name(&self, name: &str, reporting: Option<&str>) -> Result<()> {
        let Some(bound) = self.cairn.registry().get(name) else {
            tracing::debug!(target_name = %name, "Target not registered");
            return Err(Error::not_found(name));
        };
        let reporting = reporting.unwrap_or(name);
        tracing::debug!(
            target_name = %name,
            reporting = %reporting,
            kind = bound.kind(),
            "Resolved target"
        );
        self.entering(name)?.run(bound, Some(reporting)).await
    }

    async fn run_composite(&self, composite: &Composite, reporting: Option<&str>) -> Result<()> {
        match composite.mode() {
            ExecutionMode::Serial => self.run_serial(composite.elements(), reporting).await,
            ExecutionMode::Parallel => self.run_parallel(composite.elements(), reporting).await,
        }
    }

    async fn run_serial(&self, elements: &[Target], reporting: Option<&str>) -> Result<()> {
        for element in elements {
            self.run(element, reporting).await?;
        }
        Ok(())
    }

    async fn run_parallel(&self, elements: &[Target], reporting: Option<&str>) -> Result<()> {
        match elements {
            [] => return Ok(()),
            [single] => return self.run(single, reporting).await,
            _ => {}
        }

        let reporting: Option<Arc<str>> = reporting.map(Arc::from);
        let mut join_set = JoinSet::new();
        let mut indices = HashMap::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            let executor = self.clone();
            let element = element.clone();
            let reporting = reporting.clone();
            let handle = join_set.spawn(async move {
                executor.run(&element, reporting.as_deref()).await
            });
            indices.insert(handle.id(), index);
        }

        let mut results: Vec<Option<Error>> = vec![None; elements.len()];
        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((id, Ok(()))) => {
                    tracing::trace!(index = ?indices.get(&id), "Parallel element finished");
                }
                Ok((id, Err(e))) => {
                    if let Some(&index) = indices.get(&id) {
                        results[index] = Some(e);
                    }
                }
                Err(e) => {
                    let index = indices.get(&e.id()).copied().unwrap_or_default();
                    let message = if e.is_panic() {
                        panic_message(e.into_panic().as_ref())
                    } else {
                        e.to_string()
                    };
                    results[index] = Some(Error::ActionPanicked {
                        target: reporting.as_deref().unwrap_or(ANONYMOUS).to_string(),
                        message,
                    });
                }
            }
        }

        match results.into_iter().flatten().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn run_action(&self, action: &Action, reporting: Option<&str>) -> Result<()> {
        let bus = self.cairn.bus();
        bus.target_execution_started(reporting);

        let outcome = match std::panic::catch_unwind(AssertUnwindSafe(|| {
            action.invoke(self.cairn.clone(), self.context.clone())
        })) {
            Ok(future) => match AssertUnwindSafe(future).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(panicked(reporting, payload.as_ref())),
            },
            Err(payload) => Err(panicked(reporting, payload.as_ref())),
        };

        match outcome {
            Ok(()) => {
                bus.target_execution_completed(reporting);
                Ok(())
            }
            Err(error) => {
                tracing::debug!(target_name = ?reporting, error = %error, "Action failed");
                bus.target_execution_failed(reporting, Arc::new(error.clone()));
                Err(error)
            }
        }
    }
}

fn panicked(reporting: Option<&str>, payload: &(dyn Any + Send)) -> Error {
    Error::ActionPanicked {
        target: reporting.unwrap_or(ANONYMOUS).to_string(),
        message: panic_message(payload),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
