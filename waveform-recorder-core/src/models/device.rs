use serde::{Deserialize, Serialize};

/// Kind of a media device, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    AudioInput,
    AudioOutput,
    VideoInput,
}

/// A media device the platform can enumerate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    pub device_id: String,
    pub label: String,
    pub kind: DeviceKind,
}

impl DeviceDescriptor {
    pub fn is_audio_input(&self) -> bool {
        self.kind == DeviceKind::AudioInput
    }

    /// Label for a device picker; platforms hide labels until access is granted.
    pub fn display_name(&self) -> &str {
        if self.label.is_empty() {
            &self.device_id
        } else {
            &self.label
        }
    }
}
