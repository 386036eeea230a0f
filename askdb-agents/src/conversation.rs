use askdb_llm_sdk::types::{Message, Role};

/// Append-only message log for a single agent run.
///
/// The first message is always the system prompt. Messages are never edited or
/// removed once pushed.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt), Message::user(question)],
        }
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_system(&mut self, content: impl Into<String>) {
        self.messages.push(Message::system(content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_role(&self) -> Option<Role> {
        self.messages.last().map(|m| m.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_with_system_then_question() {
        let conversation = Conversation::new("prompt", "How many albums?");
        let messages = conversation.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "prompt");
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(conversation.last_role(), Some(Role::User));
    }

    #[test]
    fn test_appends_in_order() {
        let mut conversation = Conversation::new("p", "q");
        conversation.push_assistant("{\"type\":\"sql\"}");
        conversation.push_user("Query returned 0 rows:\n[]");
        conversation.push_system("reminder");

        let roles: Vec<Role> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::System
            ]
        );
    }
}
