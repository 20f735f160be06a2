use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;

use crate::api::ApiClient;
use crate::message::{Conversation, Message, MessageBody, ToolInvocation};
use crate::panel::{Answers, QuestionPanel};
use crate::relay::RelayReply;
use crate::scenario::Scenario;
use crate::store::ConversationStore;
use crate::tool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Picker,
    Chat,
}

/// Where the current turn stands. The machine cycles between these for
/// the life of the conversation; there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Awaiting free-text input from the user.
    Idle,
    /// One relay call in flight; free-text submission is disabled.
    AwaitingModel,
    /// A question form is open; normal input is suspended.
    AwaitingAnswers,
}

/// A transcript line as shown in the chat view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub from_user: bool,
    pub text: String,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub store: ConversationStore,
    pub api: ApiClient,

    // Scenario picker state
    pub picker_state: ListState,

    // Conversation state
    pub scenario: Option<&'static Scenario>,
    pub conversation: Option<Conversation>,
    pub turn: TurnState,
    pub panel: Option<QuestionPanel>,
    pub relay_task: Option<JoinHandle<anyhow::Result<RelayReply>>>,
    pub finished: bool,

    // Free-text input
    pub input: String,
    pub input_cursor: usize, // cursor position in chars

    // Status line (errors and notices; cleared on the next turn)
    pub status: Option<String>,

    // Chat viewport
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,

    // Loading animation
    pub animation_frame: u8,

    // Areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub picker_area: Option<Rect>,
    pub panel_tab_areas: Vec<Rect>,
    pub panel_submit_area: Option<Rect>,
    pub panel_option_areas: Vec<Rect>,
}

impl App {
    pub fn new(store: ConversationStore, api: ApiClient) -> Self {
        let mut picker_state = ListState::default();
        picker_state.select(Some(0));

        Self {
            should_quit: false,
            screen: Screen::Picker,
            store,
            api,

            picker_state,

            scenario: None,
            conversation: None,
            turn: TurnState::Idle,
            panel: None,
            relay_task: None,
            finished: false,

            input: String::new(),
            input_cursor: 0,

            status: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            chat_area: None,
            picker_area: None,
            panel_tab_areas: Vec::new(),
            panel_submit_area: None,
            panel_option_areas: Vec::new(),
        }
    }

    /// Enter a scenario's chat. With `resume`, the most recent stored
    /// conversation is reopened (always in `Idle`: a turn that was in
    /// flight when the app last closed is simply dropped); otherwise a
    /// fresh transcript starts with the scenario's opening question.
    pub fn start_scenario(&mut self, scenario: &'static Scenario, resume: bool) {
        let conversation = if resume {
            self.store.latest_for_scenario(scenario.id)
        } else {
            None
        };

        let conversation = conversation.unwrap_or_else(|| {
            let convo = Conversation::open(scenario.id, scenario.opening_question);
            if let Err(e) = self.store.save(&convo) {
                self.status = Some(format!("could not persist conversation: {e}"));
            }
            convo
        });

        self.scenario = Some(scenario);
        self.conversation = Some(conversation);
        self.screen = Screen::Chat;
        self.turn = TurnState::Idle;
        self.panel = None;
        self.relay_task = None;
        self.finished = false;
        self.input.clear();
        self.input_cursor = 0;
        self.status = None;

        // A resumed transcript may end on a question form that was never
        // answered; reopen it so the pending invocation is not stranded
        // without a result.
        let pending = self
            .conversation
            .as_ref()
            .and_then(|c| c.messages.last())
            .and_then(|m| match &m.body {
                MessageBody::ToolCall { calls, .. } => calls
                    .iter()
                    .find(|c| c.name == tool::ASK_USER_QUESTION)
                    .cloned(),
                _ => None,
            });
        if let Some(invocation) = pending {
            if let Ok(questions) = tool::parse_questions(&invocation.arguments) {
                self.panel = Some(QuestionPanel::new(invocation.id, questions));
                self.turn = TurnState::AwaitingAnswers;
            }
        }

        self.scroll_to_bottom();
    }

    // ---- turn transitions ----

    /// Idle -> AwaitingModel: append the user's message, persist, and
    /// fire the relay call.
    pub fn submit_input(&mut self) {
        if self.turn != TurnState::Idle {
            return;
        }
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return;
        }

        self.append_and_persist(Message::user(text));
        self.input.clear();
        self.input_cursor = 0;
        self.start_relay();
    }

    /// AwaitingAnswers -> AwaitingModel: commit the form's answers as a
    /// tool result and fire the next relay call.
    pub fn submit_answers(&mut self, answers: Answers) {
        let Some(panel) = self.panel.take() else {
            return;
        };
        let content = match serde_json::to_string(&answers) {
            Ok(json) => json,
            Err(e) => {
                // Shouldn't happen for a map of strings; keep the form.
                self.status = Some(format!("could not encode answers: {e}"));
                self.panel = Some(panel);
                return;
            }
        };

        self.append_and_persist(Message::tool_result(panel.call_id, content));
        self.start_relay();
    }

    /// Apply a relay reply. A reply carrying an AskUserQuestion
    /// invocation opens the form; anything else lands as a plain
    /// assistant message and returns the turn to Idle.
    pub fn apply_reply(&mut self, reply: RelayReply) {
        self.finished = reply.finished;

        let ask = reply
            .tool_calls
            .iter()
            .find(|c| c.name == tool::ASK_USER_QUESTION)
            .cloned();

        match ask {
            Some(invocation) => self.apply_tool_call(reply.content, invocation),
            None => {
                // Unrecognized invocations are dropped: nothing could
                // ever answer them, and the schema declares one tool.
                self.append_and_persist(Message::assistant(reply.content));
                self.turn = TurnState::Idle;
            }
        }
        self.scroll_to_bottom();
    }

    fn apply_tool_call(&mut self, content: String, invocation: ToolInvocation) {
        self.append_and_persist(Message::tool_call(content, vec![invocation.clone()]));

        match tool::parse_questions(&invocation.arguments) {
            Ok(questions) => {
                self.panel = Some(QuestionPanel::new(invocation.id, questions));
                self.turn = TurnState::AwaitingAnswers;
            }
            Err(e) => {
                // Recoverable: fall back to free-text input rather than
                // stalling the conversation.
                self.status = Some(format!(
                    "The model sent an unusable question form ({e}); answer in free text instead."
                ));
                self.turn = TurnState::Idle;
            }
        }
    }

    /// A failed relay call drops the turn: the already-persisted message
    /// stays, nothing is retried, and input unlocks for a resubmit.
    pub fn fail_turn(&mut self, error: &str) {
        self.status = Some(error.to_string());
        self.turn = TurnState::Idle;
    }

    fn start_relay(&mut self) {
        let (Some(scenario), Some(conversation)) = (self.scenario, self.conversation.as_ref())
        else {
            return;
        };

        let api = self.api.clone();
        let scenario_id = scenario.id.to_string();
        let messages = conversation.to_wire();

        self.status = None;
        self.turn = TurnState::AwaitingModel;
        self.relay_task = Some(tokio::spawn(async move {
            api.chat(&scenario_id, &messages).await
        }));
        self.scroll_to_bottom();
    }

    /// Called from the run loop: settle the in-flight relay call once
    /// its task has finished. Only one call is ever outstanding.
    pub async fn poll_relay(&mut self) {
        let done = self
            .relay_task
            .as_ref()
            .map(JoinHandle::is_finished)
            .unwrap_or(false);
        if !done {
            return;
        }

        if let Some(task) = self.relay_task.take() {
            match task.await {
                Ok(Ok(reply)) => self.apply_reply(reply),
                Ok(Err(e)) => self.fail_turn(&e.to_string()),
                Err(e) => self.fail_turn(&format!("relay task panicked: {e}")),
            }
        }
    }

    fn append_and_persist(&mut self, message: Message) {
        let Some(conversation) = self.conversation.as_mut() else {
            return;
        };
        conversation.push(message);
        if let Err(e) = self.store.save(conversation) {
            self.status = Some(format!("could not persist conversation: {e}"));
        }
    }

    // ---- transcript view ----

    /// Flatten the conversation into displayable lines. Tool results
    /// are shown as the user's side with a readable answer summary;
    /// tool-call messages with no prose are skipped (the form itself
    /// is rendered separately).
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        let Some(conversation) = self.conversation.as_ref() else {
            return Vec::new();
        };

        conversation
            .messages
            .iter()
            .filter_map(|m| match &m.body {
                MessageBody::User { content } => Some(TranscriptEntry {
                    from_user: true,
                    text: content.clone(),
                }),
                MessageBody::Assistant { content } | MessageBody::ToolCall { content, .. } => {
                    if content.is_empty() {
                        None
                    } else {
                        Some(TranscriptEntry {
                            from_user: false,
                            text: content.clone(),
                        })
                    }
                }
                MessageBody::ToolResult { content, .. } => Some(TranscriptEntry {
                    from_user: true,
                    text: summarize_answers(content),
                }),
            })
            .collect()
    }

    // ---- viewport ----

    pub fn tick_animation(&mut self) {
        if self.turn == TurnState::AwaitingModel {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        let max = self.total_chat_lines().saturating_sub(self.chat_height);
        if self.chat_scroll < max {
            self.chat_scroll += 1;
        }
    }

    /// Pin the viewport to the newest content so the loading indicator
    /// stays visible.
    pub fn scroll_to_bottom(&mut self) {
        let total = self.total_chat_lines();
        let visible = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_scroll = total.saturating_sub(visible);
    }

    fn total_chat_lines(&self) -> u16 {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            60
        };

        let mut total: u16 = 0;
        for entry in self.transcript() {
            total += 1; // speaker line
            for line in entry.text.lines() {
                // Character count, not byte length, for UTF-8 safety.
                let chars = line.chars().count();
                total += ((chars / wrap_width) + 1) as u16;
            }
            total += 1; // blank line between messages
        }

        if self.turn == TurnState::AwaitingModel {
            total += 2; // speaker line + "Thinking..."
        }

        total
    }
}

/// Turn a tool-result JSON record into a short human-readable line.
fn summarize_answers(content: &str) -> String {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str(content) else {
        return content.to_string();
    };

    let parts: Vec<String> = map
        .values()
        .map(|v| match v {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(|i| i.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            other => other.to_string(),
        })
        .collect();

    parts.join("; ")
}
