use serde::{Deserialize, Serialize};

/// One row of the implicit-feedback log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user: i64,
    pub item: i64,
    pub hours: f32,
    pub timestamp: i64,
}

impl Interaction {
    pub fn new(user: i64, item: i64, hours: f32, timestamp: i64) -> Interaction {
        Interaction {
            user,
            item,
            hours,
            timestamp,
        }
    }
}

/// An owned sequence of interactions.
#[derive(Debug, Clone, Default)]
pub struct InteractionLog {
    interactions: Vec<Interaction>,
}

impl InteractionLog {
    pub fn new() -> InteractionLog {
        InteractionLog::default()
    }

    pub fn push(&mut self, interaction: Interaction) {
        self.interactions.push(interaction);
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interaction> {
        self.interactions.iter()
    }

    pub fn data(&self) -> &[Interaction] {
        &self.interactions
    }
}

impl From<Vec<Interaction>> for InteractionLog {
    fn from(interactions: Vec<Interaction>) -> InteractionLog {
        InteractionLog { interactions }
    }
}

impl FromIterator<Interaction> for InteractionLog {
    fn from_iter<I: IntoIterator<Item = Interaction>>(iter: I) -> InteractionLog {
        InteractionLog {
            interactions: iter.into_iter().collect(),
        }
    }
}
