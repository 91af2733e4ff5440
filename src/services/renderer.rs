use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::models::{MutationKind, PendingMutation, Snapshot};

const BADGE_SEPARATORS: [char; 4] = ['.', '_', '-', ' '];

/// Text that has already been HTML-escaped and can be inserted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Escaped(String);

impl Escaped {
    pub fn new(raw: &str) -> Self {
        Self(escape_html(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Escaped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayTree {
    pub activities: Vec<ActivityCard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityCard {
    pub name: Escaped,
    pub description: Escaped,
    pub schedule: Escaped,
    pub spots_left: i64,
    pub participants: Vec<ParticipantRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantRow {
    pub email: Escaped,
    pub badge: Escaped,
    pub unregister_title: Escaped,
    /// Set while an unregistration for this row is in flight.
    pub pending: bool,
    #[serde(skip)]
    raw_email: String,
}

/// What the view model publishes for the page to draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardView {
    /// `None` until the first successful load.
    pub tree: Option<DisplayTree>,
    pub load_error: Option<String>,
    pub pending: Vec<PendingMutation>,
}

impl BoardView {
    pub fn is_loading(&self) -> bool {
        self.tree.is_none() && self.load_error.is_none()
    }
}

pub fn render(snapshot: &Snapshot) -> DisplayTree {
    let activities = snapshot
        .iter()
        .map(|(name, activity)| ActivityCard {
            name: Escaped::new(name),
            description: Escaped::new(&activity.description),
            schedule: Escaped::new(&activity.schedule),
            spots_left: activity.spots_left(),
            participants: activity
                .participants
                .iter()
                .map(|email| ParticipantRow {
                    email: Escaped::new(email),
                    badge: Escaped::new(&badge_for(email)),
                    unregister_title: Escaped::new(&format!("Unregister {}", email)),
                    pending: false,
                    raw_email: email.clone(),
                })
                .collect(),
        })
        .collect();

    DisplayTree { activities }
}

pub fn render_board(
    snapshot: Option<&Snapshot>,
    load_error: Option<&str>,
    pending: &BTreeMap<PendingMutation, usize>,
) -> BoardView {
    let tree = snapshot.map(|snapshot| {
        let mut tree = render(snapshot);
        for (card, (name, _)) in tree.activities.iter_mut().zip(snapshot.iter()) {
            for row in card.participants.iter_mut() {
                row.pending = pending.keys().any(|p| {
                    p.kind == MutationKind::Unregister
                        && p.activity == *name
                        && p.email == row.raw_email
                });
            }
        }
        tree
    });

    BoardView {
        tree,
        load_error: load_error.map(str::to_string),
        pending: pending.keys().cloned().collect(),
    }
}

/// Two-letter label from the email's local part.
///
/// `jane.doe@x.com` -> `JD` (initials of the first two segments),
/// `bob@x.com` -> `BO` (a lone segment gives its first two letters),
/// `_@x.com` -> `@X` (no segments: the email minus separators).
pub fn badge_for(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let segments: Vec<&str> = local
        .split(BADGE_SEPARATORS)
        .filter(|part| !part.is_empty())
        .take(2)
        .collect();

    let source: String = match segments.as_slice() {
        [first, second] => [first, second]
            .iter()
            .filter_map(|part| part.chars().next())
            .collect(),
        [only] => only.chars().take(2).collect(),
        _ => {
            let stripped: String = email
                .chars()
                .filter(|c| !BADGE_SEPARATORS.contains(c))
                .take(2)
                .collect();
            if stripped.is_empty() {
                email.chars().take(2).collect()
            } else {
                stripped
            }
        }
    };
    source.chars().flat_map(char::to_uppercase).collect()
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Activity;

    fn activity(description: &str, max: i64, participants: &[&str]) -> Activity {
        Activity {
            description: description.to_string(),
            schedule: "Mondays".to_string(),
            max_participants: max,
            participants: participants.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn snapshot(entries: Vec<(&str, Activity)>) -> Snapshot {
        entries
            .into_iter()
            .map(|(name, activity)| (name.to_string(), activity))
            .collect()
    }

    #[test]
    fn badges() {
        assert_eq!(badge_for("jane.doe@x.com"), "JD");
        assert_eq!(badge_for("bob@x.com"), "BO");
        assert_eq!(badge_for("_@x.com"), "@X");
        assert_eq!(badge_for("mary_ann-lee@x.com"), "MA");
        assert_eq!(badge_for("a  b@x.com"), "AB");
        assert_eq!(badge_for("a@x.com"), "A");
        assert_eq!(badge_for("ölaf@x.com"), "ÖL");
        assert_eq!(badge_for("._-"), "._");
    }

    #[test]
    fn rendering_is_repeatable() {
        let snap = snapshot(vec![("Chess Club", activity("Strategy", 12, &["a@x.com"]))]);
        assert_eq!(render(&snap), render(&snap));
    }

    #[test]
    fn computes_spots_left_without_clamping() {
        let snap = snapshot(vec![
            ("Chess Club", activity("Strategy", 2, &["a@x.com"])),
            ("Gym Class", activity("Sports", 1, &["a@x.com", "b@x.com"])),
        ]);
        let tree = render(&snap);
        assert_eq!(tree.activities[0].spots_left, 1);
        assert_eq!(tree.activities[1].spots_left, -1);
    }

    #[test]
    fn escapes_every_dynamic_field() {
        let hostile = r#"<script>alert("x")</script> & 'quoted'"#;
        let mut fixture = activity(hostile, 3, &[hostile]);
        fixture.schedule = hostile.to_string();
        let snap = snapshot(vec![(hostile, fixture)]);

        let tree = render(&snap);
        let card = &tree.activities[0];
        let row = &card.participants[0];
        for text in [
            card.name.as_str(),
            card.description.as_str(),
            card.schedule.as_str(),
            row.email.as_str(),
            row.badge.as_str(),
            row.unregister_title.as_str(),
        ] {
            assert!(!text.contains(['<', '>', '"', '\'']), "raw markup in {text}");
            assert!(
                text.replace("&amp;", "")
                    .replace("&lt;", "")
                    .replace("&gt;", "")
                    .replace("&quot;", "")
                    .replace("&#039;", "")
                    .find('&')
                    .is_none(),
                "bare ampersand in {text}"
            );
        }
        assert_eq!(
            card.name.as_str(),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#039;quoted&#039;"
        );
    }

    #[test]
    fn marks_pending_unregistrations() {
        let snap = snapshot(vec![("Chess Club", activity("Strategy", 12, &["a@x.com", "b@x.com"]))]);
        let pending: BTreeMap<PendingMutation, usize> = [
            PendingMutation {
                kind: MutationKind::Unregister,
                activity: "Chess Club".to_string(),
                email: "b@x.com".to_string(),
            },
            PendingMutation {
                kind: MutationKind::Register,
                activity: "Chess Club".to_string(),
                email: "a@x.com".to_string(),
            },
        ]
        .into_iter()
        .map(|mutation| (mutation, 1))
        .collect();

        let view = render_board(Some(&snap), None, &pending);
        let rows = &view.tree.as_ref().unwrap().activities[0].participants;
        assert!(!rows[0].pending);
        assert!(rows[1].pending);
        assert_eq!(view.pending.len(), 2);
    }

    #[test]
    fn loading_and_failed_views() {
        let loading = render_board(None, None, &BTreeMap::new());
        assert!(loading.is_loading());

        let failed = render_board(None, Some("boom"), &BTreeMap::new());
        assert!(!failed.is_loading());
        assert_eq!(failed.load_error.as_deref(), Some("boom"));
    }
}
