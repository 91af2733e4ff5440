use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub type ActivityName = String;

/// One activity as the upstream API reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub description: String,
    pub schedule: String,
    pub max_participants: i64,
    // Signup order, duplicates kept as sent.
    #[serde(default)]
    pub participants: Vec<String>,
}

impl Activity {
    /// Can go negative when the upstream over-books; callers render it as-is.
    pub fn spots_left(&self) -> i64 {
        self.max_participants - self.participants.len() as i64
    }
}

/// Full activity map as last confirmed by the server.
///
/// Iteration follows the order of the upstream JSON object. A snapshot is
/// never edited in place: [`Snapshot::without_participant`] returns a new one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(IndexMap<ActivityName, Activity>);

impl Snapshot {
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn get(&self, name: &str) -> Option<&Activity> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ActivityName, &Activity)> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &ActivityName> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy of this snapshot with the first `email` row removed from
    /// `activity`. Returns `None` when there is nothing to remove.
    pub fn without_participant(&self, activity: &str, email: &str) -> Option<Snapshot> {
        let index = self
            .0
            .get(activity)?
            .participants
            .iter()
            .position(|p| p == email)?;

        let mut next = self.clone();
        if let Some(entry) = next.0.get_mut(activity) {
            entry.participants.remove(index);
        }
        Some(next)
    }
}

impl FromIterator<(ActivityName, Activity)> for Snapshot {
    fn from_iter<T: IntoIterator<Item = (ActivityName, Activity)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
