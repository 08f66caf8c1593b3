pub mod car;
pub mod chat_room;
pub mod chatbot_conversation;
pub mod chatbot_knowledge;
pub mod chatbot_knowledge_tag;
pub mod chatbot_tag;
pub mod report;
pub mod report_distribution;
pub mod review;
pub mod transaction;
pub mod user;

pub use car::{Entity as Car, Model as CarModel};
pub use chat_room::{Entity as ChatRoom, Model as ChatRoomModel};
pub use chatbot_conversation::{Entity as ChatbotConversation, Model as ChatbotConversationModel};
pub use chatbot_knowledge::{Entity as ChatbotKnowledge, Model as ChatbotKnowledgeModel};
pub use chatbot_knowledge_tag::Entity as ChatbotKnowledgeTag;
pub use chatbot_tag::{Entity as ChatbotTag, Model as ChatbotTagModel};
pub use report::{Entity as Report, Model as ReportModel};
pub use report_distribution::{Entity as ReportDistribution, Model as ReportDistributionModel};
pub use review::{Entity as Review, Model as ReviewModel};
pub use transaction::{Entity as Transaction, Model as TransactionModel};
pub use user::{Entity as User, Model as UserModel};

use crate::error::{AppError, AppResult};
use sea_orm::{ActiveEnum, Iterable};

/// Parse a string-backed column enum from user input, case-insensitively.
/// `field` is the Indonesian label used in the error message.
pub fn parse_enum<E>(raw: &str, field: &str) -> AppResult<E>
where
    E: ActiveEnum<Value = String> + Iterable,
{
    let normalized = raw.trim().to_ascii_lowercase();
    E::try_from_value(&normalized).map_err(|_| {
        let allowed: Vec<String> = E::iter().map(|v| v.to_value()).collect();
        AppError::validation(format!(
            "{} tidak valid: '{}'. Pilihan: {}",
            field,
            raw.trim(),
            allowed.join(", ")
        ))
    })
}

/// Like [`parse_enum`] but passes `None` through.
pub fn parse_optional_enum<E>(raw: Option<&str>, field: &str) -> AppResult<Option<E>>
where
    E: ActiveEnum<Value = String> + Iterable,
{
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| parse_enum(s, field))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::car::CarStatus;
    use super::*;

    #[test]
    fn parse_enum_is_case_insensitive() {
        let status: CarStatus = parse_enum(" Available ", "Status").unwrap();
        assert_eq!(status, CarStatus::Available);
    }

    #[test]
    fn parse_enum_lists_allowed_values() {
        let err = parse_enum::<CarStatus>("flying", "Status").unwrap_err();
        let msg = err.public_message();
        assert!(msg.contains("Status tidak valid"));
        assert!(msg.contains("available"));
        assert!(msg.contains("reserved"));
    }

    #[test]
    fn parse_optional_enum_skips_blank() {
        let parsed: Option<CarStatus> = parse_optional_enum(Some("  "), "Status").unwrap();
        assert!(parsed.is_none());
    }
}
