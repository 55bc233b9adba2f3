//! In-memory engine that records every request, for unit tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use super::{ContainerSpec, Engine, EngineError, Inspection, ProgressStream};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Pull(String),
    Create(ContainerSpec),
    Start(String),
    Inspect(String),
    Stop(String),
    Remove(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Pull,
    Progress,
    Create,
    Start,
    Inspect,
    Stop,
    Remove,
}

pub const ID: &str = "c0ffee";

#[derive(Clone, Default)]
pub struct Fake {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub progress: Vec<Vec<u8>>,
    pub inspection: Inspection,
    pub fail: Option<Step>,
    pub hang: Option<Step>,
}

impl Fake {
    pub fn new() -> Self {
        Self {
            progress: vec![
                b"{\"status\":\"Pulling fs layer\"}\n".to_vec(),
                b"{\"status\":\"Download complete\"}\n".to_vec(),
            ],
            inspection: Inspection {
                exposed_ports: vec!["6379/tcp".to_string()],
                published: [("6379/tcp".to_string(), vec![49153])].into(),
            },
            ..Default::default()
        }
    }

    pub fn failing(step: Step) -> Self {
        Self {
            fail: Some(step),
            ..Self::new()
        }
    }

    pub fn hanging(step: Step) -> Self {
        Self {
            hang: Some(step),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn outcome(&self, step: Step) -> Result<(), EngineError> {
        if self.hang == Some(step) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        if self.fail == Some(step) {
            return Err(EngineError::DockerResponseServerError {
                status_code: 500,
                message: format!("{step:?} exploded"),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Engine for Fake {
    fn pull_image(&self, reference: &str) -> ProgressStream<'_> {
        self.record(Call::Pull(reference.to_string()));

        if self.fail == Some(Step::Pull) {
            return futures::stream::once(async {
                Err::<Vec<u8>, _>(EngineError::DockerResponseServerError {
                    status_code: 404,
                    message: "pull access denied".to_string(),
                })
            })
            .boxed();
        }

        let mut items: Vec<Result<Vec<u8>, EngineError>> =
            self.progress.iter().cloned().map(Ok).collect();

        // fails halfway through the stream
        if self.fail == Some(Step::Progress) {
            items.insert(
                1,
                Err(EngineError::DockerStreamError {
                    error: "unexpected EOF".to_string(),
                }),
            );
        }

        futures::stream::iter(items).boxed()
    }

    async fn create_container(&self, spec: ContainerSpec) -> Result<String, EngineError> {
        self.record(Call::Create(spec));
        self.outcome(Step::Create).await?;
        Ok(ID.to_string())
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.record(Call::Start(id.to_string()));
        self.outcome(Step::Start).await
    }

    async fn inspect_container(&self, id: &str) -> Result<Inspection, EngineError> {
        self.record(Call::Inspect(id.to_string()));
        self.outcome(Step::Inspect).await?;
        Ok(self.inspection.clone())
    }

    async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        self.record(Call::Stop(id.to_string()));
        self.outcome(Step::Stop).await
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        self.record(Call::Remove(id.to_string()));
        self.outcome(Step::Remove).await
    }
}
