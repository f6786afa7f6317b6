//! Chat platform boundary.
//!
//! The runtime turns core actions into calls on a [`Platform`]: moving and
//! disconnecting members, managing room channels, playing audio and sending
//! direct messages. Voice membership changes flow the other way as core
//! events fed through [`crate::EventSender`].

use std::future::Future;

use office_hours_core::{ChannelSnapshot, Recipient, StaffId, StudentId, WaitingMember};

/// Platform call failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The member is no longer connected to voice.
    #[error("member is not connected to voice")]
    NotInVoice,

    /// The staff member has no room channel.
    #[error("staff member {0} has no channel")]
    MissingChannel(StaffId),

    /// The platform rejected or failed the request.
    #[error("{operation} failed: {reason}")]
    Request {
        /// Operation that failed
        operation: &'static str,
        /// Platform-provided reason
        reason: String,
    },
}

/// Voice membership at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Membership {
    /// Existing room channels and who is inside
    pub channels: Vec<ChannelSnapshot>,
    /// Waiting channel members in platform order
    pub waiting: Vec<WaitingMember>,
}

/// Chat platform operations used by the runtime.
///
/// Implementations are cheap handles (Clone) shared with spawned tasks.
pub trait Platform: Clone + Send + Sync + 'static {
    /// Current voice membership, used to rebuild state on startup.
    fn membership(&self) -> impl Future<Output = Result<Membership, PlatformError>> + Send;

    /// Move a student into the named channel.
    fn move_student(
        &self,
        student: StudentId,
        channel: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Disconnect a member from voice.
    fn disconnect(
        &self,
        member: Recipient,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Show or clear a student's `(#n)` queue position marker.
    fn set_queue_position(
        &self,
        student: StudentId,
        position: Option<usize>,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Create a staff member's room channel, reusing one with the same name.
    fn ensure_channel(
        &self,
        staff: StaffId,
        name: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Rename a staff member's room channel.
    fn rename_channel(
        &self,
        staff: StaffId,
        name: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Delete a staff member's room channel.
    fn delete_channel(
        &self,
        staff: StaffId,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Play an audio asset into a room channel, resolving when playback ends.
    fn play_audio(
        &self,
        staff: StaffId,
        asset: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Send a direct message.
    fn send_message(
        &self,
        to: Recipient,
        text: &str,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;

    /// Add or remove the on-break marker on a staff member's nickname.
    fn mark_on_break(
        &self,
        staff: StaffId,
        on_break: bool,
    ) -> impl Future<Output = Result<(), PlatformError>> + Send;
}

/// Platform that performs nothing and logs every call.
///
/// Backs the development console: events are typed in by hand and the
/// resulting platform calls show up in the log.
#[derive(Debug, Clone, Default)]
pub struct LoggingPlatform;

impl LoggingPlatform {
    /// Create a logging platform.
    pub fn new() -> Self {
        Self
    }
}

impl Platform for LoggingPlatform {
    async fn membership(&self) -> Result<Membership, PlatformError> {
        Ok(Membership::default())
    }

    async fn move_student(&self, student: StudentId, channel: &str) -> Result<(), PlatformError> {
        tracing::info!(%student, channel, "move student");
        Ok(())
    }

    async fn disconnect(&self, member: Recipient) -> Result<(), PlatformError> {
        tracing::info!(?member, "disconnect");
        Ok(())
    }

    async fn set_queue_position(
        &self,
        student: StudentId,
        position: Option<usize>,
    ) -> Result<(), PlatformError> {
        tracing::info!(%student, ?position, "queue position");
        Ok(())
    }

    async fn ensure_channel(&self, staff: StaffId, name: &str) -> Result<(), PlatformError> {
        tracing::info!(%staff, name, "ensure channel");
        Ok(())
    }

    async fn rename_channel(&self, staff: StaffId, name: &str) -> Result<(), PlatformError> {
        tracing::info!(%staff, name, "rename channel");
        Ok(())
    }

    async fn delete_channel(&self, staff: StaffId) -> Result<(), PlatformError> {
        tracing::info!(%staff, "delete channel");
        Ok(())
    }

    async fn play_audio(&self, staff: StaffId, asset: &str) -> Result<(), PlatformError> {
        tracing::info!(%staff, asset, "play audio");
        Ok(())
    }

    async fn send_message(&self, to: Recipient, text: &str) -> Result<(), PlatformError> {
        tracing::info!(?to, text, "message");
        Ok(())
    }

    async fn mark_on_break(&self, staff: StaffId, on_break: bool) -> Result<(), PlatformError> {
        tracing::info!(%staff, on_break, "break marker");
        Ok(())
    }
}
