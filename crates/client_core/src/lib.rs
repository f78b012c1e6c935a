use std::sync::{Arc, Mutex};

use serde_json::Value;
use shared::{
    domain::{JobId, PortSide, Service, ServiceId, VolumeId},
    error::OperationError,
    protocol::{DispatchEvent, IoEvent, JobEvent, ServiceEvent, UserEvent, VolumeEvent},
};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

pub mod config;
pub mod merge;
pub mod store;
pub mod transport;

pub use merge::{
    next_port_id, replace_in_collection, service_update_record, with_port_added,
    with_port_removed, PortDraft,
};
pub use store::{AppState, JobCreatorForm, ServiceEditForm, SharedStore, StateSnapshot};
pub use transport::{HttpResourceApi, JobSubmission, ResourceApi};

const FETCH_JOBS_FAILED: &str = "Cannot fetch job information from the server.";
const REMOVE_JOB_FAILED: &str = "Cannot remove the job.";
const FETCH_SERVICES_FAILED: &str = "Cannot fetch service information from the server.";
const FETCH_VOLUMES_FAILED: &str = "Cannot fetch volume information from the server.";
const INSPECT_VOLUME_FAILED: &str = "Cannot fetch volume content information from the server.";
const CONSOLE_OUTPUT_FAILED: &str = "Cannot fetch the console content.";
const UPDATE_SERVICE_FAILED: &str = "Cannot update the service.";
const UPDATE_SERVICE_SUCCEEDED: &str = "Service metadata has been successfully updated";
const SUBMIT_JOB_SUCCEEDED: &str = "Your job has been successfully submitted";
const SUBMIT_JOB_FAILED: &str = "An error occurred during submitting your job";
const FETCH_USER_FAILED: &str = "Error fetching user information from the server.";
const NO_SELECTION: &str = "No service is selected.";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid api base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("unsupported api base url scheme: {0}")]
    UnsupportedScheme(String),
    #[error(transparent)]
    Rejected(#[from] ValidationError),
}

/// Failures detected locally, before any request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no service is selected")]
    NoSelection,
    #[error("{} name and path cannot be empty", side_label(*side))]
    EmptyPort { side: PortSide },
}

fn side_label(side: PortSide) -> &'static str {
    match side {
        PortSide::Input => "Input",
        PortSide::Output => "Output",
    }
}

impl ValidationError {
    /// Message shown to the user when this error ends an operation locally.
    fn notice(&self) -> &'static str {
        match self {
            Self::NoSelection => NO_SELECTION,
            Self::EmptyPort {
                side: PortSide::Input,
            } => "Input name and path cannot be empty",
            Self::EmptyPort {
                side: PortSide::Output,
            } => "Output name and path cannot be empty",
        }
    }
}

impl ClientError {
    pub fn to_operation_error(&self) -> OperationError {
        match self {
            Self::Http(err) => {
                OperationError::network(err.to_string(), err.status().map(|s| s.as_u16()))
            }
            Self::InvalidBaseUrl(_) | Self::UnsupportedScheme(_) => {
                OperationError::network(self.to_string(), None)
            }
            Self::Rejected(_) => OperationError::validation(self.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Error,
}

/// User-facing notification sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotifyLevel, message: &str);
}

pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Info => info!(notice = message, "notify"),
            NotifyLevel::Error => error!(notice = message, "notify"),
        }
    }
}

/// Location changes requested after an operation completes.
pub trait Navigator: Send + Sync {
    fn navigate(&self, location: &str);
}

pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, location: &str) {
        info!(location, "navigate");
    }
}

/// Runs the catalog of resource operations and publishes their events.
///
/// Every lifecycle emits one start event followed by exactly one terminal
/// event. Failures are reported through a notification and an error event and
/// are never returned to the caller.
///
/// Events go out on two kinds of channel. The broadcast side is bounded and a
/// slow subscriber may lag; ordered subscribers receive every event.
pub struct Dispatcher {
    api: Arc<dyn ResourceApi>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    events: broadcast::Sender<DispatchEvent>,
    ordered: Mutex<Vec<mpsc::UnboundedSender<DispatchEvent>>>,
}

impl Dispatcher {
    pub fn new(api: Arc<dyn ResourceApi>) -> Self {
        Self::new_with_dependencies(
            api,
            Arc::new(TracingNotifier),
            Arc::new(TracingNavigator),
            1024,
        )
    }

    pub fn new_with_dependencies(
        api: Arc<dyn ResourceApi>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        event_buffer: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            api,
            notifier,
            navigator,
            events,
            ordered: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DispatchEvent> {
        self.events.subscribe()
    }

    /// Lossless feed for consumers that must apply every event, such as the
    /// store reducer. The receiver closes when the dispatcher is dropped.
    pub fn subscribe_ordered(&self) -> mpsc::UnboundedReceiver<DispatchEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.ordered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tx);
        rx
    }

    fn emit(&self, event: impl Into<DispatchEvent>) {
        let event = event.into();
        debug!(lifecycle = ?event.lifecycle(), phase = ?event.phase(), "dispatch: event");
        self.ordered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .retain(|tx| tx.send(event.clone()).is_ok());
        let _ = self.events.send(event);
    }

    fn report(&self, notice: &str, err: &ClientError) -> OperationError {
        error!(error = %err, "{notice}");
        self.notifier.notify(NotifyLevel::Error, notice);
        err.to_operation_error()
    }

    fn reject(&self, err: ValidationError) -> OperationError {
        warn!(error = %err, "dispatch: rejected before request");
        self.notifier.notify(NotifyLevel::Error, err.notice());
        ClientError::from(err).to_operation_error()
    }

    pub async fn fetch_services(&self) {
        self.emit(ServiceEvent::ListFetchStart);
        match self.api.list_services().await {
            Ok(services) => {
                debug!(count = services.len(), "services: fetched");
                self.emit(ServiceEvent::ListFetchSuccess { services });
            }
            Err(err) => {
                let error = self.report(FETCH_SERVICES_FAILED, &err);
                self.emit(ServiceEvent::ListFetchError { error });
            }
        }
    }

    pub async fn fetch_service(&self, service_id: &ServiceId) {
        self.emit(ServiceEvent::FetchStart);
        match self.api.get_service(service_id).await {
            Ok(service) => {
                debug!(service_id = %service_id, "services: fetched one");
                self.emit(ServiceEvent::FetchSuccess { service });
            }
            Err(err) => {
                let error = self.report(FETCH_SERVICES_FAILED, &err);
                self.emit(ServiceEvent::FetchError { error });
            }
        }
    }

    pub async fn fetch_jobs(&self) {
        self.emit(JobEvent::ListFetchStart);
        match self.api.list_jobs().await {
            Ok(jobs) => {
                debug!(count = jobs.len(), "jobs: fetched");
                self.emit(JobEvent::ListFetchSuccess { jobs });
            }
            Err(err) => {
                let error = self.report(FETCH_JOBS_FAILED, &err);
                self.emit(JobEvent::ListFetchError { error });
            }
        }
    }

    pub async fn fetch_volumes(&self) {
        self.emit(VolumeEvent::ListFetchStart);
        match self.api.list_volumes().await {
            Ok(volumes) => {
                debug!(count = volumes.len(), "volumes: fetched");
                self.emit(VolumeEvent::ListFetchSuccess { volumes });
            }
            Err(err) => {
                let error = self.report(FETCH_VOLUMES_FAILED, &err);
                self.emit(VolumeEvent::ListFetchError { error });
            }
        }
    }

    pub async fn fetch_user(&self) {
        self.emit(UserEvent::FetchStart);
        match self.api.current_user().await {
            Ok(user) => self.emit(UserEvent::FetchSuccess { user }),
            Err(err) => {
                let error = self.report(FETCH_USER_FAILED, &err);
                self.emit(UserEvent::FetchError { error });
            }
        }
    }

    /// An absent or empty ID ends the lifecycle with an empty listing and no request.
    pub async fn inspect_volume(&self, volume_id: Option<&VolumeId>) {
        self.emit(VolumeEvent::InspectStart);
        let Some(volume_id) = volume_id.filter(|id| !id.is_empty()) else {
            self.emit(VolumeEvent::InspectEmpty {
                data: Value::Array(Vec::new()),
            });
            return;
        };

        match self.api.inspect_volume(volume_id).await {
            Ok(data) => self.emit(VolumeEvent::InspectSuccess { data }),
            Err(err) => {
                let error = self.report(INSPECT_VOLUME_FAILED, &err);
                self.emit(VolumeEvent::InspectError { error });
            }
        }
    }

    pub async fn fetch_job_output(&self, job_id: Option<&JobId>) {
        self.emit(JobEvent::OutputFetchStart);
        let Some(job_id) = job_id.filter(|id| !id.is_empty()) else {
            self.emit(JobEvent::OutputFetchEmpty {
                data: Value::Array(Vec::new()),
            });
            return;
        };

        match self.api.job_output(job_id).await {
            Ok(data) => self.emit(JobEvent::OutputFetchSuccess { data }),
            Err(err) => {
                let error = self.report(CONSOLE_OUTPUT_FAILED, &err);
                self.emit(JobEvent::OutputFetchError { error });
            }
        }
    }

    /// Deletes the job, then re-fetches the whole job list.
    pub async fn remove_job(&self, job_id: &JobId) {
        self.emit(JobEvent::RemovalStart);
        match self.api.delete_job(job_id).await {
            Ok(data) => {
                info!(job_id = %job_id, "jobs: removed");
                self.emit(JobEvent::RemovalSuccess { data });
                self.fetch_jobs().await;
            }
            Err(err) => {
                let error = self.report(REMOVE_JOB_FAILED, &err);
                self.emit(JobEvent::RemovalError { error });
            }
        }
    }

    /// Persists the edit form's metadata onto the selected service.
    ///
    /// On success the service event is published before the recomputed
    /// collection.
    pub async fn update_service(&self, snapshot: &StateSnapshot) {
        let Some(current) = snapshot.selected() else {
            self.emit(ServiceEvent::UpdateStart);
            let error = self.reject(ValidationError::NoSelection);
            self.emit(ServiceEvent::UpdateError { error });
            return;
        };
        let record = service_update_record(current, &snapshot.service_edit);

        self.emit(ServiceEvent::UpdateStart);
        match self.api.update_service(&record).await {
            Ok(response) => {
                info!(service_id = %response.service.id, "services: metadata updated");
                self.notifier
                    .notify(NotifyLevel::Info, UPDATE_SERVICE_SUCCEEDED);
                let services = replace_in_collection(&snapshot.services, &response.service);
                self.emit(ServiceEvent::UpdateSuccess);
                self.emit(ServiceEvent::FetchSuccess { service: response });
                self.emit(ServiceEvent::ListFetchSuccess { services });
            }
            Err(err) => {
                let error = self.report(UPDATE_SERVICE_FAILED, &err);
                self.emit(ServiceEvent::UpdateError { error });
            }
        }
    }

    /// Submits a job for the selected service and navigates to it.
    ///
    /// No store events are published; failures only notify.
    pub async fn submit_job(&self, snapshot: &StateSnapshot) {
        let Some(current) = snapshot.selected() else {
            self.reject(ValidationError::NoSelection);
            return;
        };
        let submission = JobSubmission {
            service_id: current.id.clone(),
            fields: snapshot.job_creator.values.clone(),
        };

        match self.api.create_job(submission).await {
            Ok(job_id) => {
                info!(job_id = %job_id, service_id = %current.id, "jobs: submitted");
                self.notifier.notify(NotifyLevel::Info, SUBMIT_JOB_SUCCEEDED);
                self.navigator.navigate(&format!("/jobs/{job_id}"));
            }
            Err(err) => {
                self.report(SUBMIT_JOB_FAILED, &err);
            }
        }
    }

    /// Appends a port built from the edit form and persists the service.
    ///
    /// The add lifecycle completes optimistically before the update request.
    pub async fn add_io_port(&self, snapshot: &StateSnapshot, side: PortSide) {
        self.emit(IoEvent::AddStart);
        let added = snapshot
            .selected()
            .ok_or(ValidationError::NoSelection)
            .and_then(|current| {
                with_port_added(current, side, &snapshot.service_edit.port_draft(side))
            });
        let record = match added {
            Ok(record) => record,
            Err(err) => {
                let error = self.reject(err);
                self.emit(IoEvent::AddError { error });
                return;
            }
        };

        if record.port_count() > 0 {
            self.emit(IoEvent::AddSuccess {
                service: record.clone(),
            });
            self.persist_service(&record).await;
        }
    }

    /// Drops the port at `index` and persists the service.
    pub async fn remove_io_port(&self, snapshot: &StateSnapshot, side: PortSide, index: usize) {
        self.emit(IoEvent::RemoveStart);
        let Some(current) = snapshot.selected() else {
            let error = self.reject(ValidationError::NoSelection);
            self.emit(IoEvent::RemoveError { error });
            return;
        };

        let record = with_port_removed(current, side, index);
        self.emit(IoEvent::RemoveSuccess {
            service: record.clone(),
        });
        self.persist_service(&record).await;
    }

    async fn persist_service(&self, record: &Service) {
        self.emit(ServiceEvent::UpdateStart);
        match self.api.update_service(record).await {
            Ok(response) => {
                info!(service_id = %response.service.id, ports = response.service.port_count(), "services: ports updated");
                self.emit(ServiceEvent::UpdateSuccess);
                self.emit(ServiceEvent::FetchSuccess { service: response });
            }
            Err(err) => {
                let error = self.report(UPDATE_SERVICE_FAILED, &err);
                self.emit(ServiceEvent::UpdateError { error });
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
