use serde::{Deserialize, Serialize};

/// Identity of one perception channel.
///
/// The route and payload key follow the display service's HTTP API:
/// results for `Hands` are posted to `/set_hands` as
/// `{"handLandmarkerResult": ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelId {
    Face,
    Hands,
    Pose,
}

impl ChannelId {
    pub const ALL: &[ChannelId] = &[ChannelId::Face, ChannelId::Hands, ChannelId::Pose];

    /// Path segment of the `set_<route>` dispatch endpoint.
    pub fn route(self) -> &'static str {
        match self {
            ChannelId::Face => "face",
            ChannelId::Hands => "hands",
            ChannelId::Pose => "pose",
        }
    }

    /// JSON key wrapping the result in a dispatch body.
    pub fn payload_key(self) -> &'static str {
        match self {
            ChannelId::Face => "faceLandmarkerResult",
            ChannelId::Hands => "handLandmarkerResult",
            ChannelId::Pose => "poseLandmarkerResult",
        }
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.route())
    }
}

impl std::str::FromStr for ChannelId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "face" => Ok(ChannelId::Face),
            "hand" | "hands" => Ok(ChannelId::Hands),
            "pose" => Ok(ChannelId::Pose),
            other => Err(format!("unknown channel '{other}' (expected face, hands or pose)")),
        }
    }
}

/// Fixed-size map with one slot per [`ChannelId`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelMap<T> {
    face: T,
    hands: T,
    pose: T,
}

impl<T> ChannelMap<T> {
    pub fn from_fn(mut f: impl FnMut(ChannelId) -> T) -> Self {
        Self {
            face: f(ChannelId::Face),
            hands: f(ChannelId::Hands),
            pose: f(ChannelId::Pose),
        }
    }

    pub fn get(&self, id: ChannelId) -> &T {
        match id {
            ChannelId::Face => &self.face,
            ChannelId::Hands => &self.hands,
            ChannelId::Pose => &self.pose,
        }
    }

    pub fn get_mut(&mut self, id: ChannelId) -> &mut T {
        match id {
            ChannelId::Face => &mut self.face,
            ChannelId::Hands => &mut self.hands,
            ChannelId::Pose => &mut self.pose,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChannelId, &T)> {
        ChannelId::ALL.iter().map(move |&id| (id, self.get(id)))
    }
}
