use std::collections::HashMap;
use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, ListContainersOptions};
use bollard::errors::Error as DockerError;
use bollard::models::EventMessage;
use bollard::system::EventsOptions;
use bollard::{Docker, API_DEFAULT_VERSION};
use chrono::Utc;
use futures::{future, StreamExt};
use anyhow::{Context, Result};
use shared::types::{ContainerDescriptor, ContainerId, RuntimeEvent};
use crate::config::DockerConfig;
use super::{ContainerRuntime, EventStream, RuntimeError};

const SOCKET_TIMEOUT_SECS: u64 = 120;

/// [`ContainerRuntime`] talking to the docker engine API.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub async fn connect(config: &DockerConfig) -> Result<Self> {
        let docker = match &config.socket {
            Some(path) => Docker::connect_with_socket(
                &path.to_string_lossy(),
                SOCKET_TIMEOUT_SECS,
                API_DEFAULT_VERSION,
            ),
            None => Docker::connect_with_local_defaults(),
        }
        .context("Failed to create docker client")?;

        docker
            .ping()
            .await
            .context("Failed to reach the docker daemon")?;

        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_containers(&self, label: &str) -> Result<Vec<ContainerDescriptor>, RuntimeError> {
        let options = ListContainersOptions::<String> {
            filters: HashMap::from([("label".to_string(), vec![label.to_string()])]),
            ..Default::default()
        };

        let summaries = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| RuntimeError::Api(e.to_string()))?;

        Ok(summaries
            .into_iter()
            .filter_map(|summary| {
                Some(ContainerDescriptor {
                    id: ContainerId::new(summary.id?),
                    name: summary
                        .names
                        .and_then(|names| names.into_iter().next())
                        .map(|name| name.trim_start_matches('/').to_string()),
                    labels: summary.labels.unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn get_container(&self, id: &ContainerId) -> Result<ContainerDescriptor, RuntimeError> {
        let inspect = self
            .docker
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(|e| match e {
                DockerError::DockerResponseServerError { status_code: 404, .. } => {
                    RuntimeError::NotFound(id.clone())
                }
                other => RuntimeError::Api(other.to_string()),
            })?;

        Ok(ContainerDescriptor {
            id: inspect.id.map(ContainerId::new).unwrap_or_else(|| id.clone()),
            name: inspect.name.map(|name| name.trim_start_matches('/').to_string()),
            labels: inspect
                .config
                .and_then(|config| config.labels)
                .unwrap_or_default(),
        })
    }

    fn events(&self) -> EventStream {
        // The request goes out on first poll; `since` makes the daemon replay
        // anything emitted between now and then.
        let options = EventsOptions::<String> {
            since: Some(Utc::now()),
            until: None,
            filters: HashMap::from([("type".to_string(), vec!["container".to_string()])]),
        };

        self.docker
            .events(Some(options))
            .filter_map(|message| {
                future::ready(match message {
                    Ok(message) => to_runtime_event(message).map(Ok),
                    Err(e) => Some(Err(RuntimeError::Api(e.to_string()))),
                })
            })
            .boxed()
    }
}

fn to_runtime_event(message: EventMessage) -> Option<RuntimeEvent> {
    let actor_id = message.actor.and_then(|actor| actor.id)?;
    Some(RuntimeEvent {
        kind: message.typ.map(|typ| typ.to_string()).unwrap_or_default(),
        action: message.action.unwrap_or_default(),
        actor_id: ContainerId::new(actor_id),
    })
}
