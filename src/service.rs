//! Serial work queue in front of a [`Context`].
//!
//! A single worker thread owns the context and runs submitted operations in
//! FIFO order, so two operations never interleave on the connection.

use crate::context::Context;
use crate::error::{OrmError, Result};
use crate::mapper::MappedObject;
use crate::registry::Registry;
use crate::sqlite::SqliteConfig;
use crate::value::{Params, Value};
use futures::channel::oneshot;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tracing::{info, warn};

type Job = Box<dyn FnOnce(&mut Context) + Send + 'static>;

pub struct SqliteService {
    sender: Option<mpsc::UnboundedSender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl SqliteService {
    /// Spawns the worker and opens the database.
    pub async fn start(config: SqliteConfig, registry: Registry) -> Result<Self> {
        info!(path = %config.db_path.display(), "starting sqlite service");
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let worker = thread::Builder::new()
            .name("sqlite-orm-worker".to_string())
            .spawn(move || {
                let mut context = Context::new(config, registry);
                while let Some(job) = receiver.blocking_recv() {
                    job(&mut context);
                }
                if let Err(error) = context.close() {
                    warn!(%error, "failed to close database on shutdown");
                }
            })
            .map_err(|e| OrmError::Open(e.to_string()))?;

        let service = Self {
            sender: Some(sender),
            worker: Some(worker),
        };
        service.execute(Context::initialize_database).await?;
        Ok(service)
    }

    /// Queues `operation` and waits for its result.
    pub async fn execute<R, F>(&self, operation: F) -> Result<R>
    where
        F: FnOnce(&mut Context) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        let job: Job = Box::new(move |context| {
            let _ = reply.send(operation(context));
        });
        self.sender
            .as_ref()
            .ok_or(OrmError::QueueClosed)?
            .send(job)
            .map_err(|_| OrmError::QueueClosed)?;
        response.await.map_err(|_| OrmError::QueueClosed)?
    }

    /// Like [`execute`](Self::execute), blocking the calling thread.
    pub fn execute_blocking<R, F>(&self, operation: F) -> Result<R>
    where
        F: FnOnce(&mut Context) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        futures::executor::block_on(self.execute(operation))
    }

    pub async fn create<T: MappedObject>(&self, values: Params) -> Result<T> {
        self.execute(move |context| context.create::<T>(&values))
            .await
    }

    pub async fn find<T: MappedObject>(&self, pk: impl Into<Value>) -> Result<Option<T>> {
        let pk = pk.into();
        self.execute(move |context| context.find::<T>(pk)).await
    }

    pub async fn all<T: MappedObject>(&self) -> Result<Vec<T>> {
        self.execute(|context| context.all::<T>()).await
    }

    pub async fn update<T: MappedObject>(
        &self,
        pk: impl Into<Value>,
        values: Params,
    ) -> Result<usize> {
        let pk = pk.into();
        self.execute(move |context| context.update::<T>(pk, &values))
            .await
    }

    pub async fn exists<T: MappedObject>(&self, pk: impl Into<Value>) -> Result<bool> {
        let pk = pk.into();
        self.execute(move |context| context.exists::<T>(pk)).await
    }

    pub async fn delete<T: MappedObject>(&self, pk: impl Into<Value>) -> Result<usize> {
        let pk = pk.into();
        self.execute(move |context| context.delete::<T>(pk)).await
    }

    pub async fn create_or_update<T: MappedObject>(
        &self,
        pk: impl Into<Value>,
        values: Params,
    ) -> Result<T> {
        let pk = pk.into();
        self.execute(move |context| context.create_or_update::<T>(pk, &values))
            .await
    }

    /// Closes the database and stops the worker.
    pub async fn stop(mut self) -> Result<()> {
        let closed = self.execute(Context::close).await;
        self.shutdown();
        info!("sqlite service stopped");
        closed
    }

    fn shutdown(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("sqlite worker panicked");
            }
        }
    }
}

impl Drop for SqliteService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
