//! Reference state store fed by dispatcher events.

use std::sync::Arc;

use serde_json::Value;
use shared::{
    domain::{Job, PortSide, Service, ServiceEnvelope, User, Volume},
    error::OperationError,
    protocol::{DispatchEvent, IoEvent, JobEvent, Lifecycle, ServiceEvent, UserEvent, VolumeEvent},
};
use tokio::{
    sync::{mpsc, RwLock},
    task::JoinHandle,
};
use tracing::debug;

use crate::merge::PortDraft;

/// Values of the service edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceEditForm {
    pub service_name: Option<String>,
    pub service_version: Option<String>,
    pub service_description: Option<String>,
    pub input_source_name: Option<String>,
    pub input_source_path: Option<String>,
    pub output_source_name: Option<String>,
    pub output_source_path: Option<String>,
}

impl ServiceEditForm {
    pub fn port_draft(&self, side: PortSide) -> PortDraft {
        match side {
            PortSide::Input => PortDraft {
                name: self.input_source_name.clone(),
                path: self.input_source_path.clone(),
            },
            PortSide::Output => PortDraft {
                name: self.output_source_name.clone(),
                path: self.output_source_path.clone(),
            },
        }
    }
}

/// Field values of the job submission form, in entry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobCreatorForm {
    pub values: Vec<(String, String)>,
}

impl JobCreatorForm {
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.values.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.values.push((key, value)),
        }
    }
}

/// Read-only view handed to an operation at invocation time.
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot {
    pub selected_service: Option<ServiceEnvelope>,
    pub services: Vec<Service>,
    pub service_edit: ServiceEditForm,
    pub job_creator: JobCreatorForm,
}

impl StateSnapshot {
    pub fn selected(&self) -> Option<&Service> {
        self.selected_service.as_ref().map(|envelope| &envelope.service)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingFlags {
    pub services: bool,
    pub service: bool,
    pub service_update: bool,
    pub jobs: bool,
    pub job_removal: bool,
    pub console_output: bool,
    pub volumes: bool,
    pub volume_content: bool,
    pub user: bool,
    pub io: bool,
}

impl LoadingFlags {
    fn slot(&mut self, lifecycle: Lifecycle) -> &mut bool {
        match lifecycle {
            Lifecycle::ServiceList => &mut self.services,
            Lifecycle::ServiceFetch => &mut self.service,
            Lifecycle::ServiceUpdate => &mut self.service_update,
            Lifecycle::JobList => &mut self.jobs,
            Lifecycle::JobRemoval => &mut self.job_removal,
            Lifecycle::JobOutput => &mut self.console_output,
            Lifecycle::VolumeList => &mut self.volumes,
            Lifecycle::VolumeInspect => &mut self.volume_content,
            Lifecycle::UserFetch => &mut self.user,
            Lifecycle::IoAdd | Lifecycle::IoRemove => &mut self.io,
        }
    }

    pub fn any(&self) -> bool {
        self.services
            || self.service
            || self.service_update
            || self.jobs
            || self.job_removal
            || self.console_output
            || self.volumes
            || self.volume_content
            || self.user
            || self.io
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub services: Vec<Service>,
    pub selected_service: Option<ServiceEnvelope>,
    pub jobs: Vec<Job>,
    pub volumes: Vec<Volume>,
    pub volume_content: Value,
    pub console_output: Value,
    pub user: Option<User>,
    pub service_edit: ServiceEditForm,
    pub job_creator: JobCreatorForm,
    pub loading: LoadingFlags,
    pub last_error: Option<(Lifecycle, OperationError)>,
}

impl AppState {
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            selected_service: self.selected_service.clone(),
            services: self.services.clone(),
            service_edit: self.service_edit.clone(),
            job_creator: self.job_creator.clone(),
        }
    }

    pub fn apply(&mut self, event: &DispatchEvent) {
        let lifecycle = event.lifecycle();
        *self.loading.slot(lifecycle) = !event.phase().is_terminal();
        if let Some(error) = event.error() {
            self.last_error = Some((lifecycle, error.clone()));
        }

        match event {
            DispatchEvent::Service(event) => self.apply_service(event),
            DispatchEvent::Job(event) => self.apply_job(event),
            DispatchEvent::Volume(event) => self.apply_volume(event),
            DispatchEvent::User(event) => match event {
                UserEvent::FetchStart | UserEvent::FetchError { .. } => {}
                UserEvent::FetchSuccess { user } => self.user = Some(user.clone()),
            },
            DispatchEvent::Io(event) => match event {
                IoEvent::AddStart
                | IoEvent::RemoveStart
                | IoEvent::AddError { .. }
                | IoEvent::RemoveError { .. } => {}
                IoEvent::AddSuccess { service } | IoEvent::RemoveSuccess { service } => {
                    self.replace_selected(service.clone())
                }
            },
        }
    }

    fn apply_service(&mut self, event: &ServiceEvent) {
        match event {
            ServiceEvent::ListFetchStart
            | ServiceEvent::FetchStart
            | ServiceEvent::UpdateStart
            | ServiceEvent::UpdateSuccess
            | ServiceEvent::ListFetchError { .. }
            | ServiceEvent::FetchError { .. }
            | ServiceEvent::UpdateError { .. } => {}
            ServiceEvent::ListFetchSuccess { services } => self.services = services.clone(),
            ServiceEvent::FetchSuccess { service } => {
                self.selected_service = Some(service.clone())
            }
        }
    }

    fn apply_job(&mut self, event: &JobEvent) {
        match event {
            JobEvent::ListFetchStart
            | JobEvent::RemovalStart
            | JobEvent::OutputFetchStart
            | JobEvent::RemovalSuccess { .. }
            | JobEvent::ListFetchError { .. }
            | JobEvent::RemovalError { .. }
            | JobEvent::OutputFetchError { .. } => {}
            JobEvent::ListFetchSuccess { jobs } => self.jobs = jobs.clone(),
            JobEvent::OutputFetchSuccess { data } | JobEvent::OutputFetchEmpty { data } => {
                self.console_output = data.clone()
            }
        }
    }

    fn apply_volume(&mut self, event: &VolumeEvent) {
        match event {
            VolumeEvent::ListFetchStart
            | VolumeEvent::InspectStart
            | VolumeEvent::ListFetchError { .. }
            | VolumeEvent::InspectError { .. } => {}
            VolumeEvent::ListFetchSuccess { volumes } => self.volumes = volumes.clone(),
            VolumeEvent::InspectSuccess { data } | VolumeEvent::InspectEmpty { data } => {
                self.volume_content = data.clone()
            }
        }
    }

    /// Optimistic port edits replace the selected record before the server
    /// confirms them.
    fn replace_selected(&mut self, service: Service) {
        match self.selected_service.as_mut() {
            Some(envelope) => envelope.service = service,
            None => self.selected_service = Some(ServiceEnvelope::from(service)),
        }
    }
}

/// Process-wide store applying events in arrival order.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    state: Arc<RwLock<AppState>>,
}

impl SharedStore {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub async fn snapshot(&self) -> StateSnapshot {
        self.state.read().await.snapshot()
    }

    pub async fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&*self.state.read().await)
    }

    pub async fn update<R>(&self, f: impl FnOnce(&mut AppState) -> R) -> R {
        f(&mut *self.state.write().await)
    }

    pub async fn apply(&self, event: &DispatchEvent) {
        self.state.write().await.apply(event);
    }

    /// Applies every event from `events` until the dispatcher is dropped.
    ///
    /// Takes the lossless feed from `Dispatcher::subscribe_ordered`.
    pub fn spawn_reducer(
        &self,
        mut events: mpsc::UnboundedReceiver<DispatchEvent>,
    ) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                debug!(lifecycle = ?event.lifecycle(), phase = ?event.phase(), "store: applying event");
                store.apply(&event).await;
            }
        })
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
