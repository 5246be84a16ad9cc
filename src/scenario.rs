use std::future::Future;
use std::marker::PhantomData;

use typed_builder::TypedBuilder;

use crate::{aggregate::Aggregate, executor::Executor};

/// Glue that ties a storm together: a named action and the executor that
/// drives it. The action is invoked once per attempt and receives the index
/// of the virtual client issuing it, so attempts can be attributed.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Scenario<A, E, F, Fut>
where
    A: Aggregate,
    E: Executor<A, F, Fut> + Send + Sync,
    F: Fn(usize) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = A::Metric> + Send + 'static,
{
    #[builder(setter(into))]
    pub name: String,
    pub action: F,
    pub executor: E,
    #[builder(default, setter(skip))]
    aggregator: PhantomData<fn() -> (A, Fut)>,
}

impl<A, E, F, Fut> Scenario<A, E, F, Fut>
where
    A: Aggregate,
    E: Executor<A, F, Fut> + Send + Sync,
    F: Fn(usize) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = A::Metric> + Send + 'static,
{
    pub async fn run(&mut self) -> Result<A, E::Error> {
        self.executor.exec(self).await
    }
}
