use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{Job, JobId, Service, ServiceEnvelope, User, Volume},
    error::OperationError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesResponse {
    #[serde(rename = "Services", default)]
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsResponse {
    #[serde(rename = "Jobs", default)]
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumesResponse {
    #[serde(rename = "Volumes", default)]
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    #[serde(rename = "User")]
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreatedResponse {
    #[serde(rename = "jobID")]
    pub job_id: JobId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPhase {
    Start,
    Success,
    Empty,
    Error,
}

impl EventPhase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Start)
    }
}

/// One start-to-terminal event sequence. A single operation may run more than
/// one lifecycle (port edits chain into a service update).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    ServiceList,
    ServiceFetch,
    ServiceUpdate,
    JobList,
    JobRemoval,
    JobOutput,
    VolumeList,
    VolumeInspect,
    UserFetch,
    IoAdd,
    IoRemove,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceEvent {
    ListFetchStart,
    ListFetchSuccess { services: Vec<Service> },
    ListFetchError { error: OperationError },
    FetchStart,
    FetchSuccess { service: ServiceEnvelope },
    FetchError { error: OperationError },
    UpdateStart,
    UpdateSuccess,
    UpdateError { error: OperationError },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobEvent {
    ListFetchStart,
    ListFetchSuccess { jobs: Vec<Job> },
    ListFetchError { error: OperationError },
    RemovalStart,
    RemovalSuccess { data: Value },
    RemovalError { error: OperationError },
    OutputFetchStart,
    OutputFetchSuccess { data: Value },
    OutputFetchEmpty { data: Value },
    OutputFetchError { error: OperationError },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeEvent {
    ListFetchStart,
    ListFetchSuccess { volumes: Vec<Volume> },
    ListFetchError { error: OperationError },
    InspectStart,
    InspectSuccess { data: Value },
    InspectEmpty { data: Value },
    InspectError { error: OperationError },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserEvent {
    FetchStart,
    FetchSuccess { user: User },
    FetchError { error: OperationError },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IoEvent {
    AddStart,
    AddSuccess { service: Service },
    AddError { error: OperationError },
    RemoveStart,
    RemoveSuccess { service: Service },
    RemoveError { error: OperationError },
}

/// Every state transition the dispatcher can publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    Service(ServiceEvent),
    Job(JobEvent),
    Volume(VolumeEvent),
    User(UserEvent),
    Io(IoEvent),
}

impl DispatchEvent {
    pub fn lifecycle(&self) -> Lifecycle {
        match self {
            Self::Service(event) => match event {
                ServiceEvent::ListFetchStart
                | ServiceEvent::ListFetchSuccess { .. }
                | ServiceEvent::ListFetchError { .. } => Lifecycle::ServiceList,
                ServiceEvent::FetchStart
                | ServiceEvent::FetchSuccess { .. }
                | ServiceEvent::FetchError { .. } => Lifecycle::ServiceFetch,
                ServiceEvent::UpdateStart
                | ServiceEvent::UpdateSuccess
                | ServiceEvent::UpdateError { .. } => Lifecycle::ServiceUpdate,
            },
            Self::Job(event) => match event {
                JobEvent::ListFetchStart
                | JobEvent::ListFetchSuccess { .. }
                | JobEvent::ListFetchError { .. } => Lifecycle::JobList,
                JobEvent::RemovalStart
                | JobEvent::RemovalSuccess { .. }
                | JobEvent::RemovalError { .. } => Lifecycle::JobRemoval,
                JobEvent::OutputFetchStart
                | JobEvent::OutputFetchSuccess { .. }
                | JobEvent::OutputFetchEmpty { .. }
                | JobEvent::OutputFetchError { .. } => Lifecycle::JobOutput,
            },
            Self::Volume(event) => match event {
                VolumeEvent::ListFetchStart
                | VolumeEvent::ListFetchSuccess { .. }
                | VolumeEvent::ListFetchError { .. } => Lifecycle::VolumeList,
                VolumeEvent::InspectStart
                | VolumeEvent::InspectSuccess { .. }
                | VolumeEvent::InspectEmpty { .. }
                | VolumeEvent::InspectError { .. } => Lifecycle::VolumeInspect,
            },
            Self::User(_) => Lifecycle::UserFetch,
            Self::Io(event) => match event {
                IoEvent::AddStart | IoEvent::AddSuccess { .. } | IoEvent::AddError { .. } => {
                    Lifecycle::IoAdd
                }
                IoEvent::RemoveStart
                | IoEvent::RemoveSuccess { .. }
                | IoEvent::RemoveError { .. } => Lifecycle::IoRemove,
            },
        }
    }

    pub fn phase(&self) -> EventPhase {
        match self {
            Self::Service(event) => match event {
                ServiceEvent::ListFetchStart
                | ServiceEvent::FetchStart
                | ServiceEvent::UpdateStart => EventPhase::Start,
                ServiceEvent::ListFetchSuccess { .. }
                | ServiceEvent::FetchSuccess { .. }
                | ServiceEvent::UpdateSuccess => EventPhase::Success,
                ServiceEvent::ListFetchError { .. }
                | ServiceEvent::FetchError { .. }
                | ServiceEvent::UpdateError { .. } => EventPhase::Error,
            },
            Self::Job(event) => match event {
                JobEvent::ListFetchStart | JobEvent::RemovalStart | JobEvent::OutputFetchStart => {
                    EventPhase::Start
                }
                JobEvent::ListFetchSuccess { .. }
                | JobEvent::RemovalSuccess { .. }
                | JobEvent::OutputFetchSuccess { .. } => EventPhase::Success,
                JobEvent::OutputFetchEmpty { .. } => EventPhase::Empty,
                JobEvent::ListFetchError { .. }
                | JobEvent::RemovalError { .. }
                | JobEvent::OutputFetchError { .. } => EventPhase::Error,
            },
            Self::Volume(event) => match event {
                VolumeEvent::ListFetchStart | VolumeEvent::InspectStart => EventPhase::Start,
                VolumeEvent::ListFetchSuccess { .. } | VolumeEvent::InspectSuccess { .. } => {
                    EventPhase::Success
                }
                VolumeEvent::InspectEmpty { .. } => EventPhase::Empty,
                VolumeEvent::ListFetchError { .. } | VolumeEvent::InspectError { .. } => {
                    EventPhase::Error
                }
            },
            Self::User(event) => match event {
                UserEvent::FetchStart => EventPhase::Start,
                UserEvent::FetchSuccess { .. } => EventPhase::Success,
                UserEvent::FetchError { .. } => EventPhase::Error,
            },
            Self::Io(event) => match event {
                IoEvent::AddStart | IoEvent::RemoveStart => EventPhase::Start,
                IoEvent::AddSuccess { .. } | IoEvent::RemoveSuccess { .. } => EventPhase::Success,
                IoEvent::AddError { .. } | IoEvent::RemoveError { .. } => EventPhase::Error,
            },
        }
    }

    pub fn error(&self) -> Option<&OperationError> {
        match self {
            Self::Service(
                ServiceEvent::ListFetchError { error }
                | ServiceEvent::FetchError { error }
                | ServiceEvent::UpdateError { error },
            )
            | Self::Job(
                JobEvent::ListFetchError { error }
                | JobEvent::RemovalError { error }
                | JobEvent::OutputFetchError { error },
            )
            | Self::Volume(
                VolumeEvent::ListFetchError { error } | VolumeEvent::InspectError { error },
            )
            | Self::User(UserEvent::FetchError { error })
            | Self::Io(IoEvent::AddError { error } | IoEvent::RemoveError { error }) => Some(error),
            _ => None,
        }
    }
}

impl From<ServiceEvent> for DispatchEvent {
    fn from(value: ServiceEvent) -> Self {
        Self::Service(value)
    }
}

impl From<JobEvent> for DispatchEvent {
    fn from(value: JobEvent) -> Self {
        Self::Job(value)
    }
}

impl From<VolumeEvent> for DispatchEvent {
    fn from(value: VolumeEvent) -> Self {
        Self::Volume(value)
    }
}

impl From<UserEvent> for DispatchEvent {
    fn from(value: UserEvent) -> Self {
        Self::User(value)
    }
}

impl From<IoEvent> for DispatchEvent {
    fn from(value: IoEvent) -> Self {
        Self::Io(value)
    }
}
