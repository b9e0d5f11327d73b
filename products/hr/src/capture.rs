//! Camera capture lifecycle.
//!
//! A stream is opened on request, previewed, snapshotted once and released.
//! [`StreamGuard`] owns the stream so that its tracks are stopped exactly once,
//! whether the capture completes, the user stops it, another employee's view
//! takes over, or the owning session is dropped.

use entity::PhotoPayload;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("camera is not streaming")]
    NotStreaming,
}

/// A live video stream.
pub trait MediaStream: Send {
    /// The frame currently shown in the preview, if any has arrived.
    fn current_frame(&self) -> Option<&PhotoPayload>;

    /// Release every track of the stream.
    fn stop(&mut self);
}

pub trait MediaDevices {
    type Stream: MediaStream;

    fn open_video(&self) -> Result<Self::Stream, CaptureError>;
}

#[derive(Debug)]
pub struct StreamGuard<S: MediaStream> {
    stream: S,
    stopped: bool,
}

impl<S: MediaStream> StreamGuard<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            stopped: false,
        }
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn stop(&mut self) {
        if !self.stopped {
            self.stream.stop();
            self.stopped = true;
        }
    }
}

impl<S: MediaStream> Drop for StreamGuard<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug)]
struct ActiveCapture<S: MediaStream> {
    employee_id: usize,
    guard: StreamGuard<S>,
}

/// The camera panel of one detail view.
#[derive(Debug)]
pub struct CaptureSession<S: MediaStream> {
    active: Option<ActiveCapture<S>>,
}

impl<S: MediaStream> Default for CaptureSession<S> {
    fn default() -> Self {
        Self { active: None }
    }
}

impl<S: MediaStream> CaptureSession<S> {
    /// Open a stream for `employee_id`, releasing any stream already running.
    pub fn start<D>(&mut self, devices: &D, employee_id: usize) -> Result<(), CaptureError>
    where
        D: MediaDevices<Stream = S>,
    {
        self.stop();
        let stream = devices.open_video()?;
        tracing::debug!(employee_id, "camera stream started");
        self.active = Some(ActiveCapture {
            employee_id,
            guard: StreamGuard::new(stream),
        });
        Ok(())
    }

    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    pub fn employee_id(&self) -> Option<usize> {
        self.active.as_ref().map(|active| active.employee_id)
    }

    pub fn stream_mut(&mut self) -> Result<&mut S, CaptureError> {
        self.active
            .as_mut()
            .map(|active| active.guard.stream_mut())
            .ok_or(CaptureError::NotStreaming)
    }

    /// Snapshot the current frame and release the camera.
    ///
    /// With no frame yet the stream keeps running and `None` is returned.
    pub fn capture(&mut self) -> Result<Option<(usize, PhotoPayload)>, CaptureError> {
        let active = self.active.as_ref().ok_or(CaptureError::NotStreaming)?;
        let Some(frame) = active.guard.stream().current_frame().cloned() else {
            return Ok(None);
        };
        let employee_id = active.employee_id;
        self.stop();
        Ok(Some((employee_id, frame)))
    }

    pub fn stop(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.guard.stop();
            tracing::debug!(employee_id = active.employee_id, "camera stream stopped");
        }
    }
}

/// Device whose preview frames are relayed by the client.
#[derive(Clone, Copy, Debug, Default)]
pub struct RelayDevice;

impl MediaDevices for RelayDevice {
    type Stream = RelayStream;

    fn open_video(&self) -> Result<RelayStream, CaptureError> {
        Ok(RelayStream::default())
    }
}

#[derive(Debug, Default)]
pub struct RelayStream {
    frame: Option<PhotoPayload>,
    frames_received: u64,
    stopped: bool,
}

impl RelayStream {
    pub fn push_frame(&mut self, frame: PhotoPayload) {
        self.frame = Some(frame);
        self.frames_received += 1;
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl MediaStream for RelayStream {
    fn current_frame(&self) -> Option<&PhotoPayload> {
        self.frame.as_ref()
    }

    fn stop(&mut self) {
        self.frame = None;
        self.stopped = true;
    }
}
