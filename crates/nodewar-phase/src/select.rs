//! Opponent selection.

use tracing::warn;

use crate::collab::Collaborators;

/// Lists the stored opponent layouts. Owns no graph or combat state.
#[derive(Debug, Clone, Default)]
pub struct SelectPhase {
    opponents: Vec<String>,
    chosen: Option<String>,
}

impl SelectPhase {
    /// A store that cannot list opponents leaves the list empty.
    pub fn new(collab: &mut Collaborators) -> Self {
        let opponents = match collab.store.opponents() {
            Ok(names) => names,
            Err(err) => {
                warn!(%err, "could not list opponents");
                collab.overlay.notice("opponents unavailable");
                Vec::new()
            }
        };
        collab
            .overlay
            .notice(&format!("{} opponents available", opponents.len()));
        Self {
            opponents,
            chosen: None,
        }
    }

    pub fn opponents(&self) -> &[String] {
        &self.opponents
    }

    /// Remember `name` as the next opponent. Returns `false` for names not
    /// in the list.
    pub fn choose(&mut self, name: &str) -> bool {
        if !self.opponents.iter().any(|o| o == name) {
            return false;
        }
        self.chosen = Some(name.to_string());
        true
    }

    pub fn chosen(&self) -> Option<&str> {
        self.chosen.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::MemoryStore;

    #[test]
    fn lists_and_chooses_opponents() {
        let store = MemoryStore::new()
            .with_opponent("beta", "{}")
            .with_opponent("alpha", "{}");
        let mut collab = Collaborators::headless(store);
        let mut select = SelectPhase::new(&mut collab);
        assert_eq!(select.opponents(), ["alpha", "beta"]);
        assert!(!select.choose("gamma"));
        assert_eq!(select.chosen(), None);
        assert!(select.choose("beta"));
        assert_eq!(select.chosen(), Some("beta"));
    }
}
