use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::message::Conversation;

/// Upper bound on stored conversations. The oldest (by last update) are
/// dropped at save time, so the store file cannot grow without limit.
pub const MAX_CONVERSATIONS: usize = 50;

const STORE_FILE: &str = "conversations.json";

/// JSON-file persistence for conversation transcripts. The whole store
/// is one array of conversations, rewritten on every save; the last
/// writer wins and nothing is merged.
pub struct ConversationStore {
    path: PathBuf,
}

impl ConversationStore {
    pub fn open() -> Result<Self> {
        let data_dir = dirs::data_dir().ok_or_else(|| anyhow!("could not determine data directory"))?;
        Ok(Self::at(data_dir.join("socratic").join(STORE_FILE)))
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Absent or unreadable data means "no conversations", never an error.
    pub fn load_all(&self) -> Vec<Conversation> {
        let Ok(data) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        serde_json::from_str(&data).unwrap_or_default()
    }

    pub fn load(&self, id: &str) -> Option<Conversation> {
        self.load_all().into_iter().find(|c| c.id == id)
    }

    /// Most recently updated conversation for a scenario, if any.
    pub fn latest_for_scenario(&self, scenario_id: &str) -> Option<Conversation> {
        self.load_all()
            .into_iter()
            .filter(|c| c.scenario_id == scenario_id)
            .max_by_key(|c| c.updated_at)
    }

    /// Upsert by conversation id, then trim to the retention bound.
    pub fn save(&self, conversation: &Conversation) -> Result<()> {
        let mut all = self.load_all();
        match all.iter_mut().find(|c| c.id == conversation.id) {
            Some(existing) => *existing = conversation.clone(),
            None => all.push(conversation.clone()),
        }

        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        all.truncate(MAX_CONVERSATIONS);

        self.write(&all)
    }

    /// Remove every conversation belonging to a scenario. Returns how
    /// many were dropped.
    pub fn clear_scenario(&self, scenario_id: &str) -> Result<usize> {
        let all = self.load_all();
        let before = all.len();
        let kept: Vec<Conversation> = all
            .into_iter()
            .filter(|c| c.scenario_id != scenario_id)
            .collect();
        let removed = before - kept.len();
        if removed > 0 {
            self.write(&kept)?;
        }
        Ok(removed)
    }

    fn write(&self, conversations: &[Conversation]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(conversations)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, ToolInvocation};
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> ConversationStore {
        ConversationStore::at(dir.path().join("conversations.json"))
    }

    #[test]
    fn round_trip_preserves_structure() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut convo = Conversation::open("decision-making", "What choice are you facing?");
        convo.push(Message::user("Two job offers."));
        convo.push(Message::tool_call(
            "",
            vec![ToolInvocation {
                id: "call_1".into(),
                name: "AskUserQuestion".into(),
                arguments: r#"{"questions":[]}"#.into(),
            }],
        ));
        convo.push(Message::tool_result("call_1", r#"{"question_0":"Growth"}"#));

        store.save(&convo).unwrap();
        let loaded = store.load(&convo.id).unwrap();
        assert_eq!(loaded, convo);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).load_all().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(dir.path().join("conversations.json"), "{not json").unwrap();
        assert!(store.load_all().is_empty());
    }

    #[test]
    fn save_upserts_by_id() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut convo = Conversation::open("career-advice", "What do you do right now?");
        store.save(&convo).unwrap();
        convo.push(Message::user("I write firmware."));
        store.save(&convo).unwrap();

        let all = store.load_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].messages.len(), 2);
    }

    #[test]
    fn retention_drops_oldest_conversations() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut ids = Vec::new();
        for _ in 0..(MAX_CONVERSATIONS + 5) {
            let convo = Conversation::open("career-advice", "opening");
            ids.push(convo.id.clone());
            store.save(&convo).unwrap();
        }

        let all = store.load_all();
        assert_eq!(all.len(), MAX_CONVERSATIONS);
        // The five oldest are gone, the newest survives.
        assert!(all.iter().all(|c| c.id != ids[0]));
        assert!(all.iter().any(|c| c.id == *ids.last().unwrap()));
    }

    #[test]
    fn latest_for_scenario_picks_most_recent() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let first = Conversation::open("career-advice", "opening");
        store.save(&first).unwrap();
        let mut second = Conversation::open("career-advice", "opening");
        second.push(Message::user("newer"));
        store.save(&second).unwrap();
        store
            .save(&Conversation::open("decision-making", "opening"))
            .unwrap();

        let latest = store.latest_for_scenario("career-advice").unwrap();
        assert_eq!(latest.id, second.id);
    }

    #[test]
    fn clear_scenario_removes_only_that_scenario() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.save(&Conversation::open("career-advice", "o")).unwrap();
        store.save(&Conversation::open("career-advice", "o")).unwrap();
        store.save(&Conversation::open("decision-making", "o")).unwrap();

        assert_eq!(store.clear_scenario("career-advice").unwrap(), 2);
        let all = store.load_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].scenario_id, "decision-making");
    }
}
