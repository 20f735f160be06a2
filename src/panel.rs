use std::collections::BTreeMap;

use serde::Serialize;

use crate::tool::Question;

/// Per-question answer state. The custom ("Other") entry is its own
/// variant instead of a magic string prefix, so an option label that
/// happens to begin with "Other: " can never collide with it.
///
/// Invariants kept by the panel operations: `Chosen` never holds an
/// empty list, and `ChosenPlusCustom` always has at least one label
/// (those states collapse to `None` / `Custom` instead).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Chosen(Vec<String>),
    Custom(String),
    ChosenPlusCustom(Vec<String>, String),
}

impl Answer {
    /// Empty custom text does not count as an answer; a chosen label
    /// always does.
    fn is_complete(&self) -> bool {
        match self {
            Answer::Chosen(labels) => !labels.is_empty(),
            Answer::Custom(text) => !text.is_empty(),
            Answer::ChosenPlusCustom(labels, _) => !labels.is_empty(),
        }
    }

    fn has_custom(&self) -> bool {
        matches!(self, Answer::Custom(_) | Answer::ChosenPlusCustom(..))
    }

    fn custom_text(&self) -> Option<&str> {
        match self {
            Answer::Custom(text) | Answer::ChosenPlusCustom(_, text) => Some(text),
            Answer::Chosen(_) => None,
        }
    }

    fn labels(&self) -> &[String] {
        match self {
            Answer::Chosen(labels) | Answer::ChosenPlusCustom(labels, _) => labels,
            Answer::Custom(_) => &[],
        }
    }
}

/// A flattened answer value as it appears in the tool result: one string
/// for single-select questions, a list for multi-select.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum AnswerValue {
    One(String),
    Many(Vec<String>),
}

/// The submitted record: `question_<index>` keys in index order.
pub type Answers = BTreeMap<String, AnswerValue>;

/// Interactive state for one AskUserQuestion invocation. Owns the
/// decoded questions, the working answers, and keyboard focus; the
/// controller discards the whole panel after submission.
pub struct QuestionPanel {
    pub call_id: String,
    pub questions: Vec<Question>,
    /// Index of the question currently shown.
    pub current: usize,
    /// Focused slot within the current question; `options.len()` is the
    /// trailing "Other" slot.
    pub focused: usize,
    /// Whether keystrokes currently go to the "Other" text field.
    pub editing_other: bool,
    answers: Vec<Option<Answer>>,
    /// Remembered "Other" text per question, so deselecting and
    /// reselecting does not lose what the user typed.
    drafts: Vec<String>,
}

impl QuestionPanel {
    pub fn new(call_id: String, questions: Vec<Question>) -> Self {
        let count = questions.len();
        Self {
            call_id,
            questions,
            current: 0,
            focused: 0,
            editing_other: false,
            answers: vec![None; count],
            drafts: vec![String::new(); count],
        }
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    /// Options plus the trailing "Other" slot.
    pub fn slot_count(&self) -> usize {
        self.current_question().options.len() + 1
    }

    pub fn other_slot(&self) -> usize {
        self.current_question().options.len()
    }

    // ---- navigation ----

    pub fn focus_up(&mut self) {
        let total = self.slot_count();
        self.focused = (self.focused + total - 1) % total;
    }

    pub fn focus_down(&mut self) {
        self.focused = (self.focused + 1) % self.slot_count();
    }

    pub fn prev_question(&mut self) {
        let total = self.questions.len();
        if total > 1 {
            self.goto_question((self.current + total - 1) % total);
        }
    }

    pub fn next_question(&mut self) {
        let total = self.questions.len();
        if total > 1 {
            self.goto_question((self.current + 1) % total);
        }
    }

    pub fn goto_question(&mut self, index: usize) {
        if index < self.questions.len() {
            self.current = index;
            self.focused = 0;
            self.editing_other = false;
        }
    }

    // ---- selection ----

    /// Choose an ordinary option by index. Single-select replaces the
    /// whole answer (dropping any custom text); multi-select toggles the
    /// label and leaves a coexisting custom entry alone.
    pub fn select_option(&mut self, index: usize) {
        let question = &self.questions[self.current];
        let Some(option) = question.options.get(index) else {
            return;
        };
        let label = option.label.clone();
        let multi = question.multi_select;
        let slot = &mut self.answers[self.current];

        if !multi {
            *slot = Some(Answer::Chosen(vec![label]));
            self.editing_other = false;
            return;
        }

        *slot = match slot.take() {
            None => Some(Answer::Chosen(vec![label])),
            Some(Answer::Chosen(mut labels)) => {
                toggle_label(&mut labels, label);
                if labels.is_empty() {
                    None
                } else {
                    Some(Answer::Chosen(labels))
                }
            }
            Some(Answer::Custom(text)) => Some(Answer::ChosenPlusCustom(vec![label], text)),
            Some(Answer::ChosenPlusCustom(mut labels, text)) => {
                toggle_label(&mut labels, label);
                if labels.is_empty() {
                    Some(Answer::Custom(text))
                } else {
                    Some(Answer::ChosenPlusCustom(labels, text))
                }
            }
        };
    }

    /// Toggle the "Other" entry. Turning it on restores the question's
    /// remembered draft text and moves keyboard focus into the field;
    /// turning it off leaves chosen labels (multi-select) untouched.
    pub fn toggle_other(&mut self) {
        let multi = self.questions[self.current].multi_select;
        let draft = self.drafts[self.current].clone();
        let slot = &mut self.answers[self.current];

        let (next, editing) = match (slot.take(), multi) {
            // Toggling off.
            (Some(Answer::Custom(_)), _) => (None, false),
            (Some(Answer::ChosenPlusCustom(labels, _)), _) => (Some(Answer::Chosen(labels)), false),
            // Toggling on.
            (Some(Answer::Chosen(labels)), true) => {
                (Some(Answer::ChosenPlusCustom(labels, draft)), true)
            }
            // Single-select: "Other" supersedes any chosen option.
            (_, false) => (Some(Answer::Custom(draft)), true),
            (None, true) => (Some(Answer::Custom(draft)), true),
        };
        *slot = next;
        self.editing_other = editing;
    }

    /// Type into the "Other" field. Editing never toggles the entry's
    /// selection; it only rewrites its text.
    pub fn input_other(&mut self, c: char) {
        if !self.editing_other {
            return;
        }
        self.edit_custom(|text| text.push(c));
    }

    pub fn backspace_other(&mut self) {
        if !self.editing_other {
            return;
        }
        self.edit_custom(|text| {
            text.pop();
        });
    }

    /// Esc inside the field: drop keyboard focus, keep the entry.
    pub fn stop_editing_other(&mut self) {
        self.editing_other = false;
    }

    fn edit_custom(&mut self, f: impl FnOnce(&mut String)) {
        if let Some(answer) = &mut self.answers[self.current] {
            match answer {
                Answer::Custom(text) | Answer::ChosenPlusCustom(_, text) => {
                    f(text);
                    self.drafts[self.current] = text.clone();
                }
                Answer::Chosen(_) => {}
            }
        }
    }

    // ---- queries for rendering ----

    pub fn is_selected(&self, option_index: usize) -> bool {
        let question = &self.questions[self.current];
        match (&self.answers[self.current], question.options.get(option_index)) {
            (Some(answer), Some(option)) => answer.labels().iter().any(|l| *l == option.label),
            _ => false,
        }
    }

    pub fn other_selected(&self) -> bool {
        self.answers[self.current]
            .as_ref()
            .map(Answer::has_custom)
            .unwrap_or(false)
    }

    pub fn other_text(&self) -> &str {
        self.answers[self.current]
            .as_ref()
            .and_then(Answer::custom_text)
            .unwrap_or(&self.drafts[self.current])
    }

    pub fn answer(&self, index: usize) -> Option<&Answer> {
        self.answers.get(index).and_then(Option::as_ref)
    }

    pub fn is_answered(&self, index: usize) -> bool {
        self.answers
            .get(index)
            .and_then(Option::as_ref)
            .map(Answer::is_complete)
            .unwrap_or(false)
    }

    pub fn all_answered(&self) -> bool {
        (0..self.questions.len()).all(|i| self.is_answered(i))
    }

    // ---- keyboard contract ----

    /// Space: toggle whatever is focused.
    pub fn activate_focused(&mut self) {
        if self.focused < self.other_slot() {
            self.select_option(self.focused);
        } else {
            self.toggle_other();
        }
    }

    /// Enter: submit once everything is answered, otherwise behave like
    /// Space on the focused slot.
    pub fn handle_enter(&mut self) -> Option<Answers> {
        if self.all_answered() {
            return self.finalize();
        }
        self.activate_focused();
        None
    }

    /// Tab: jump to the next unanswered question (wrapping), or submit
    /// when none remain.
    pub fn handle_tab(&mut self) -> Option<Answers> {
        if self.all_answered() {
            return self.finalize();
        }
        for i in 0..self.questions.len() {
            let candidate = (self.current + 1 + i) % self.questions.len();
            if !self.is_answered(candidate) {
                self.goto_question(candidate);
                break;
            }
        }
        None
    }

    /// Flatten the working state into the submitted record. Returns
    /// `None` while any question is unanswered. Custom text contributes
    /// its raw text; empty custom text alongside chosen labels is
    /// silently dropped.
    pub fn finalize(&self) -> Option<Answers> {
        if !self.all_answered() {
            return None;
        }

        let mut result = Answers::new();
        for (i, question) in self.questions.iter().enumerate() {
            let answer = self.answers[i].as_ref()?;
            let value = if question.multi_select {
                let mut values: Vec<String> = answer.labels().to_vec();
                if let Some(text) = answer.custom_text() {
                    if !text.is_empty() {
                        values.push(text.to_string());
                    }
                }
                AnswerValue::Many(values)
            } else {
                match answer {
                    Answer::Custom(text) => AnswerValue::One(text.clone()),
                    Answer::Chosen(labels) | Answer::ChosenPlusCustom(labels, _) => {
                        AnswerValue::One(labels[0].clone())
                    }
                }
            };
            result.insert(format!("question_{i}"), value);
        }
        Some(result)
    }
}

fn toggle_label(labels: &mut Vec<String>, label: String) {
    if let Some(pos) = labels.iter().position(|l| *l == label) {
        labels.remove(pos);
    } else {
        labels.push(label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::QuestionOption;

    fn question(header: &str, labels: &[&str], multi: bool) -> Question {
        Question {
            question: format!("{header}?"),
            header: header.to_string(),
            options: labels
                .iter()
                .map(|l| QuestionOption {
                    label: l.to_string(),
                    description: format!("about {l}"),
                })
                .collect(),
            multi_select: multi,
        }
    }

    fn single_panel() -> QuestionPanel {
        QuestionPanel::new(
            "call_1".into(),
            vec![question("Priority", &["Salary", "Growth"], false)],
        )
    }

    fn multi_panel() -> QuestionPanel {
        QuestionPanel::new(
            "call_1".into(),
            vec![question("Factors", &["A", "B", "C"], true)],
        )
    }

    #[test]
    fn multi_select_toggle_is_idempotent() {
        let mut panel = multi_panel();
        panel.select_option(1);
        let before = panel.answer(0).cloned();
        panel.select_option(0);
        panel.select_option(0);
        assert_eq!(panel.answer(0).cloned(), before);

        // And all the way back to empty.
        panel.select_option(1);
        assert_eq!(panel.answer(0), None);
    }

    #[test]
    fn single_select_other_is_mutually_exclusive() {
        let mut panel = single_panel();
        panel.toggle_other();
        for c in "X".chars() {
            panel.input_other(c);
        }
        assert_eq!(panel.answer(0), Some(&Answer::Custom("X".into())));

        panel.select_option(1);
        assert_eq!(panel.answer(0), Some(&Answer::Chosen(vec!["Growth".into()])));

        let answers = panel.finalize().unwrap();
        assert_eq!(answers["question_0"], AnswerValue::One("Growth".into()));
    }

    #[test]
    fn multi_select_custom_coexists_and_flattens() {
        let mut panel = multi_panel();
        panel.select_option(0);
        panel.toggle_other();
        panel.input_other('B');
        assert_eq!(
            panel.answer(0),
            Some(&Answer::ChosenPlusCustom(vec!["A".into()], "B".into()))
        );

        let answers = panel.finalize().unwrap();
        assert_eq!(
            answers["question_0"],
            AnswerValue::Many(vec!["A".into(), "B".into()])
        );
    }

    #[test]
    fn toggling_an_option_does_not_disturb_custom_entry() {
        let mut panel = multi_panel();
        panel.toggle_other();
        panel.input_other('z');
        panel.select_option(1);
        panel.select_option(1);
        assert_eq!(panel.answer(0), Some(&Answer::Custom("z".into())));
    }

    #[test]
    fn editing_updates_text_without_retoggling() {
        let mut panel = multi_panel();
        panel.select_option(2);
        panel.toggle_other();
        panel.input_other('h');
        panel.input_other('i');
        panel.backspace_other();
        assert_eq!(
            panel.answer(0),
            Some(&Answer::ChosenPlusCustom(vec!["C".into()], "h".into()))
        );
    }

    #[test]
    fn deselecting_other_keeps_draft_for_reselect() {
        let mut panel = single_panel();
        panel.toggle_other();
        panel.input_other('X');
        panel.toggle_other();
        assert_eq!(panel.answer(0), None);
        panel.toggle_other();
        assert_eq!(panel.answer(0), Some(&Answer::Custom("X".into())));
    }

    #[test]
    fn empty_custom_text_is_not_an_answer() {
        let mut panel = single_panel();
        panel.toggle_other();
        assert!(!panel.is_answered(0));
        assert!(panel.finalize().is_none());
        panel.input_other('x');
        assert!(panel.is_answered(0));
    }

    #[test]
    fn submitted_record_has_one_nonempty_entry_per_question() {
        let mut panel = QuestionPanel::new(
            "call_1".into(),
            vec![
                question("One", &["A", "B"], false),
                question("Two", &["C", "D"], true),
            ],
        );
        panel.select_option(0);
        panel.next_question();
        panel.select_option(1);

        let answers = panel.finalize().unwrap();
        assert_eq!(answers.len(), 2);
        for value in answers.values() {
            match value {
                AnswerValue::One(s) => assert!(!s.is_empty()),
                AnswerValue::Many(list) => {
                    assert!(!list.is_empty());
                    assert!(list.iter().all(|s| !s.is_empty()));
                }
            }
        }
    }

    #[test]
    fn question_navigation_wraps_both_ways() {
        let mut panel = QuestionPanel::new(
            "call_1".into(),
            vec![
                question("Q0", &["A", "B"], false),
                question("Q1", &["A", "B"], false),
                question("Q2", &["A", "B"], false),
                question("Q3", &["A", "B"], false),
            ],
        );
        panel.goto_question(3);
        panel.next_question();
        assert_eq!(panel.current, 0);
        panel.prev_question();
        assert_eq!(panel.current, 3);
    }

    #[test]
    fn option_focus_wraps_over_other_slot() {
        let mut panel = single_panel();
        // 2 options + Other = 3 slots.
        panel.focus_down();
        panel.focus_down();
        assert_eq!(panel.focused, panel.other_slot());
        panel.focus_down();
        assert_eq!(panel.focused, 0);
        panel.focus_up();
        assert_eq!(panel.focused, panel.other_slot());
    }

    #[test]
    fn enter_activates_then_submits() {
        let mut panel = single_panel();
        panel.focus_down(); // focus "Growth"
        assert!(panel.handle_enter().is_none());
        assert!(panel.all_answered());

        let answers = panel.handle_enter().unwrap();
        assert_eq!(answers["question_0"], AnswerValue::One("Growth".into()));
    }

    #[test]
    fn tab_jumps_to_next_unanswered_then_submits() {
        let mut panel = QuestionPanel::new(
            "call_1".into(),
            vec![
                question("Q0", &["A", "B"], false),
                question("Q1", &["A", "B"], false),
                question("Q2", &["A", "B"], false),
            ],
        );
        panel.select_option(0);
        panel.goto_question(1);
        // Tab scans forward from the question after the current one.
        assert!(panel.handle_tab().is_none());
        assert_eq!(panel.current, 2);
    }

    #[test]
    fn tab_wraps_to_earlier_unanswered() {
        let mut panel = QuestionPanel::new(
            "call_1".into(),
            vec![
                question("Q0", &["A", "B"], false),
                question("Q1", &["A", "B"], false),
            ],
        );
        panel.goto_question(1);
        panel.select_option(0);
        assert!(panel.handle_tab().is_none());
        assert_eq!(panel.current, 0);
        panel.select_option(1);
        assert!(panel.handle_tab().is_some());
    }

    #[test]
    fn answers_serialize_to_expected_json() {
        let mut panel = QuestionPanel::new(
            "call_1".into(),
            vec![
                question("One", &["Salary", "Growth"], false),
                question("Two", &["A", "B"], true),
            ],
        );
        panel.select_option(1);
        panel.next_question();
        panel.select_option(0);
        panel.toggle_other();
        panel.input_other('B');
        panel.input_other('2');

        let json = serde_json::to_value(panel.finalize().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "question_0": "Growth",
                "question_1": ["A", "B2"]
            })
        );
    }
}
