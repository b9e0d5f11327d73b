use entity::{PhotoOverrides, PhotoPayload, RecordTable};
use serde::Serialize;
use thiserror::Error;

use crate::capture::{CaptureError, CaptureSession, MediaDevices, RelayStream};

const PLACEHOLDER: &str = "No image captured yet.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("no employee with id {0}")]
    UnknownEmployee(usize),
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedPhoto {
    pub employee_id: usize,
    pub photo: PhotoPayload,
}

/// Per-session photo state: overrides, the latest capture and the camera.
#[derive(Debug, Default)]
pub struct Workspace {
    pub photos: PhotoOverrides,
    pub last_capture: Option<CapturedPhoto>,
    pub camera: CaptureSession<RelayStream>,
}

impl Workspace {
    /// Store an uploaded photo; uploads and captures are treated alike.
    pub fn upload(
        &mut self,
        table: &RecordTable,
        employee_id: usize,
        photo: PhotoPayload,
    ) -> Result<&CapturedPhoto, WorkspaceError> {
        ensure_employee(table, employee_id)?;
        Ok(self.record(employee_id, photo))
    }

    pub fn start_camera<D>(
        &mut self,
        devices: &D,
        table: &RecordTable,
        employee_id: usize,
    ) -> Result<(), WorkspaceError>
    where
        D: MediaDevices<Stream = RelayStream>,
    {
        ensure_employee(table, employee_id)?;
        self.camera.start(devices, employee_id)?;
        Ok(())
    }

    pub fn push_frame(&mut self, frame: PhotoPayload) -> Result<u64, WorkspaceError> {
        let stream = self.camera.stream_mut()?;
        stream.push_frame(frame);
        Ok(stream.frames_received())
    }

    /// `Ok(None)` when the camera has not delivered a frame yet.
    pub fn capture(&mut self) -> Result<Option<&CapturedPhoto>, WorkspaceError> {
        match self.camera.capture()? {
            Some((employee_id, photo)) => Ok(Some(self.record(employee_id, photo))),
            None => Ok(None),
        }
    }

    pub fn stop_camera(&mut self) {
        self.camera.stop();
    }

    fn record(&mut self, employee_id: usize, photo: PhotoPayload) -> &CapturedPhoto {
        self.photos.set(employee_id, photo.clone());
        tracing::info!(employee_id, mime = photo.mime(), "profile photo updated");
        self.last_capture.insert(CapturedPhoto { employee_id, photo })
    }
}

fn ensure_employee(table: &RecordTable, employee_id: usize) -> Result<(), WorkspaceError> {
    if table.get(employee_id).is_some() {
        Ok(())
    } else {
        Err(WorkspaceError::UnknownEmployee(employee_id))
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[cfg_attr(feature = "graphql", derive(async_graphql::SimpleObject))]
pub struct PhotoResult {
    pub image: Option<String>,
    pub employee_id: Option<usize>,
    pub employee_name: Option<String>,
    pub message: String,
    pub placeholder: Option<String>,
}

pub fn photo_result(table: &RecordTable, workspace: &Workspace) -> PhotoResult {
    let capture = workspace.last_capture.as_ref();
    let employee_name = capture
        .and_then(|c| table.get(c.employee_id))
        .map(|record| record.name.clone())
        .filter(|name| !name.is_empty());
    let message = match &employee_name {
        Some(name) => format!("{name}'s profile photo has been updated."),
        None => "Review the latest captured photo.".to_string(),
    };
    PhotoResult {
        image: capture.map(|c| c.photo.to_data_url()),
        employee_id: capture.map(|c| c.employee_id),
        employee_name,
        message,
        placeholder: capture.is_none().then(|| PLACEHOLDER.to_string()),
    }
}
