//! Request-facing operations shared by the GraphQL schema and page routes.

use async_graphql::SimpleObject;
use entity::{PhotoPayload, RecordTable, SessionUser};
use platform_api::{ApiError, ApiResult};
use platform_authn::{AuthnService, SessionStore};
use products_hr::{
    AnalyticsView, Dashboard, EmployeeDetail, FilterCriteria, PhotoResult, RelayDevice, Workspace,
    WorkspaceError,
};
use serde::Serialize;
use uuid::Uuid;

use crate::store::{RecordStore, StoreStatus};

/// The caller attached to a request once its session cookie resolves.
#[derive(Clone, Debug)]
pub struct RequestSession {
    pub id: Uuid,
    pub user: SessionUser,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, SimpleObject)]
pub struct CameraStatus {
    pub streaming: bool,
    pub employee_id: Option<usize>,
    pub frames_received: u64,
}

impl CameraStatus {
    fn of(workspace: &mut Workspace) -> Self {
        let employee_id = workspace.camera.employee_id();
        let frames_received = workspace
            .camera
            .stream_mut()
            .map(|stream| stream.frames_received())
            .unwrap_or(0);
        Self {
            streaming: employee_id.is_some(),
            employee_id,
            frames_received,
        }
    }
}

/// Outcome of a capture request. `photo` is empty while no frame has arrived.
#[derive(Clone, Debug, Serialize, SimpleObject)]
pub struct CaptureOutcome {
    pub photo: Option<PhotoResult>,
    pub camera: CameraStatus,
}

fn workspace_error(err: WorkspaceError) -> ApiError {
    match err {
        WorkspaceError::UnknownEmployee(_) => ApiError::NotFound,
        WorkspaceError::Capture(err) => ApiError::invalid(err.to_string()),
    }
}

/// Missing employees are `Unavailable` until the first fetch resolves.
fn missing_employee(loading: bool) -> ApiError {
    if loading {
        ApiError::Unavailable
    } else {
        ApiError::NotFound
    }
}

fn lookup_error(loading: bool) -> impl Fn(WorkspaceError) -> ApiError {
    move |err| match err {
        WorkspaceError::UnknownEmployee(_) => missing_employee(loading),
        other => workspace_error(other),
    }
}

pub struct Portal {
    pub records: RecordStore,
    pub sessions: SessionStore<Workspace>,
    pub authn: AuthnService,
    devices: RelayDevice,
}

impl Portal {
    pub fn new(records: RecordStore, sessions: SessionStore<Workspace>, authn: AuthnService) -> Self {
        Self {
            records,
            sessions,
            authn,
            devices: RelayDevice,
        }
    }

    /// Run `f` against the caller's workspace and the current table snapshot.
    async fn with_workspace<R>(
        &self,
        session: &RequestSession,
        f: impl FnOnce(&RecordTable, &mut Workspace) -> R,
    ) -> ApiResult<R> {
        let table = self.records.snapshot().await;
        self.sessions
            .with_workspace(session.id, |_, workspace| f(&table, workspace))
            .await
            .ok_or(ApiError::Unauthorized)
    }

    pub async fn dashboard(
        &self,
        session: &RequestSession,
        criteria: &FilterCriteria,
    ) -> ApiResult<Dashboard> {
        let loading = self.records.is_loading().await;
        self.with_workspace(session, |table, workspace| {
            products_hr::dashboard(table, criteria, &workspace.photos, loading)
        })
        .await
    }

    pub async fn employee(&self, session: &RequestSession, id: usize) -> ApiResult<EmployeeDetail> {
        let loading = self.records.is_loading().await;
        self.with_workspace(session, |table, workspace| {
            products_hr::employee_detail(table, id, &workspace.photos)
        })
        .await?
        .ok_or_else(|| missing_employee(loading))
    }

    pub async fn analytics(&self) -> AnalyticsView {
        let table = self.records.snapshot().await;
        products_hr::analytics(&table)
    }

    pub async fn photo_result(&self, session: &RequestSession) -> ApiResult<PhotoResult> {
        self.with_workspace(session, |table, workspace| {
            products_hr::photo_result(table, workspace)
        })
        .await
    }

    pub async fn store_status(&self) -> StoreStatus {
        self.records.status().await
    }

    pub async fn refresh(&self) -> StoreStatus {
        self.records.refresh().await
    }

    pub async fn upload_photo(
        &self,
        session: &RequestSession,
        employee_id: usize,
        photo: PhotoPayload,
    ) -> ApiResult<PhotoResult> {
        let loading = self.records.is_loading().await;
        self.with_workspace(session, |table, workspace| {
            workspace.upload(table, employee_id, photo)?;
            Ok::<_, WorkspaceError>(products_hr::photo_result(table, workspace))
        })
        .await?
        .map_err(lookup_error(loading))
    }

    pub async fn start_camera(
        &self,
        session: &RequestSession,
        employee_id: usize,
    ) -> ApiResult<CameraStatus> {
        let devices = self.devices;
        let loading = self.records.is_loading().await;
        self.with_workspace(session, |table, workspace| {
            workspace.start_camera(&devices, table, employee_id)?;
            Ok::<_, WorkspaceError>(CameraStatus::of(workspace))
        })
        .await?
        .map_err(lookup_error(loading))
    }

    pub async fn push_frame(
        &self,
        session: &RequestSession,
        frame: PhotoPayload,
    ) -> ApiResult<CameraStatus> {
        self.with_workspace(session, |_, workspace| {
            workspace.push_frame(frame)?;
            Ok::<_, WorkspaceError>(CameraStatus::of(workspace))
        })
        .await?
        .map_err(workspace_error)
    }

    pub async fn capture_photo(&self, session: &RequestSession) -> ApiResult<CaptureOutcome> {
        self.with_workspace(session, |table, workspace| {
            let captured = workspace.capture()?.is_some();
            Ok::<_, WorkspaceError>(CaptureOutcome {
                photo: captured.then(|| products_hr::photo_result(table, workspace)),
                camera: CameraStatus::of(workspace),
            })
        })
        .await?
        .map_err(workspace_error)
    }

    pub async fn stop_camera(&self, session: &RequestSession) -> ApiResult<CameraStatus> {
        self.with_workspace(session, |_, workspace| {
            workspace.stop_camera();
            CameraStatus::of(workspace)
        })
        .await
    }
}
